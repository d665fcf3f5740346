//! gfxtrace Library
//!
//! Command-line client for a gfxtrace replay server.

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Command};
pub use commands::{execute, run};
