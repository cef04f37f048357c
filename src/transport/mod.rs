//! Wire conventions for carrying session credentials.
//!
//! Browsers get strict http-only cookies, native clients a bearer header plus
//! `x-refresh-token`. Fresh credentials are echoed as response headers for both.

mod transport_adapter;

pub use transport_adapter::*;
