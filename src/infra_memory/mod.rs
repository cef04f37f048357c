mod clock;
mod refresh_token_repo_memory;

pub use clock::*;
pub use refresh_token_repo_memory::*;
