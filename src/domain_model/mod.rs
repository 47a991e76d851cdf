mod identity;
mod user;

pub use identity::*;
pub use user::*;
