//! Configuration module for ringin.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `RINGIN_CONFIG` environment variable (explicit path)
//! 2. `./ringin.toml` (current directory)
//! 3. The platform config directory (`~/.config/ringin/ringin.toml` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `RINGIN_SERIAL_PORT=/dev/ttyS0`
//! - `RINGIN_SERIAL_BAUD_RATE=2400`
//! - `RINGIN_PROGRAM_COMMAND=/usr/games/fortune`
//! - `RINGIN_LOG_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,ignore
//! use ringin::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Modem on {} at {} baud", config.serial.port, config.serial.baud_rate);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
    CONFIG_FILE_NAME,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, ModemConfig, ParityCfg, ProgramSpec, SerialConfig,
};
