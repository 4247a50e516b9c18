//! vtscan: command-line client for a file-reputation service
//!
//! Layers, innermost first: `domain` (configuration, actions, responses),
//! `application` (the scan session), `infrastructure` (HTTP client, DI
//! container), `cli` (argument handling and dispatch).

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
