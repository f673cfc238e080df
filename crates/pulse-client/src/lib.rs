//! Pulse dashboard client.
//!
//! Wires the session store, the session bridge and the feed loader together
//! and renders their states to the terminal.

pub mod app;
pub mod command;
pub mod config;
pub mod render;

pub use app::App;
pub use command::Command;
pub use config::{load_config, Config, ConfigError, LoggingConfig};
