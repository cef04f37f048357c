//! Layered settings: built-in defaults, then the TOML file picked by `--settings`,
//! then `TALLYGUARD__SECTION__KEY` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
