//! Process-wide tracing subscriber with a filter that can be swapped once
//! settings are parsed. Token values must never be passed as fields.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
