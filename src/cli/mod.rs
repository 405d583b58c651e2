//! CLI command handlers
//!
//! Each subcommand of the `elicit` binary is implemented in its own module.

pub mod chat;
pub mod config;
