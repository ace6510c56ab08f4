//! domflow command line
//!
//! Exposes the configuration model and CLI plumbing for integration testing.

pub mod cli;
pub mod config;

pub use config::AppConfig;
