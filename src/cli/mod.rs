//! CLI command implementations

pub mod collect;
pub mod error;
pub mod status;

pub use collect::{Cli, CollectArgs, Commands, LogLevel, OutputFormat};
pub use error::CliError;
pub use status::{StatusArgs, StatusReport};
