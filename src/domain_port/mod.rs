// store

mod invalidation_store;

pub use invalidation_store::*;

// repo

mod user_repo;

pub use user_repo::*;
