//! CLI layer: argument parsing, command execution, terminal diagnostics

pub mod args;
pub mod commands;
pub mod error;
pub mod output;

pub use args::{Cli, Directive, Invocation};
pub use error::{CliError, CliResult};
