mod auth_service;
mod request_guard;

pub use auth_service::*;
pub use request_guard::*;
