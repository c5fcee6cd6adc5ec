//! lambda-tail CLI library.
//!
//! This crate provides the command-line interface around the tailing engine.

mod cli;
mod config;
pub mod console;
pub mod tail;

pub use cli::{Cli, Target};
pub use config::Config;
