//! Command-line adapter for bgdl.
//!
//! `bootstrap` is the composition root; `handlers` hold one thin function per
//! subcommand that talks to the download registry and formats output.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use anyhow as _;
use tracing_subscriber as _;

#[cfg(test)]
use tempfile as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
