mod invalidation_store_memory;
mod user_repo_memory;

pub use invalidation_store_memory::*;
pub use user_repo_memory::*;
