//! Frontend components
//!
//! Manifest loading, configuration and the CLI that form the
//! user-facing interface of rgo.

pub mod cli;
pub mod config;
pub mod manifest;

pub use cli::main as cli_main;
pub use config::Config;
pub use manifest::Manifest;
