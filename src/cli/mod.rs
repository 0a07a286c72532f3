//! CLI module for the data-transfer-cli binary

#[cfg(feature = "cli")]
pub mod commands;
#[cfg(feature = "cli")]
pub mod error;
#[cfg(feature = "cli")]
pub mod output;

#[cfg(feature = "cli")]
pub use error::CliError;
