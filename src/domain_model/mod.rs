mod refresh;
mod user;

pub use refresh::*;
pub use user::*;
