pub mod app;
pub mod commands;
pub mod config;
pub mod connect;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod runtime;
pub mod status;
pub mod swap;

pub use env::CliArgs;
pub use runtime::{init_logging, load_config, LoadedConfig};
