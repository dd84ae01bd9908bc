//! Terminal front end for newscast.
//!
//! `main.rs` is the composition root; everything it wires lives here so
//! it can be tested without a terminal.

#![deny(unused_crate_dependencies)]

// Used by main.rs only
use tracing_subscriber as _;

pub mod adapters;
pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod paths;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
