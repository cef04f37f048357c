mod auth_service_impl;
mod identity_provider_fake;
mod identity_provider_impl;
mod jwt_codec;
mod refresh_store;
mod request_guard;
mod session_issuer;

pub use auth_service_impl::*;
pub use identity_provider_fake::*;
pub use identity_provider_impl::*;
pub use jwt_codec::*;
pub use refresh_store::*;
pub use request_guard::*;
pub use session_issuer::*;
