//! Configuration file parsing for simsubd
//!
//! Supports:
//! - `config.toml` - device policy, modem timeouts, network mode sync, PLMN table path

pub mod settings;
pub mod types;

pub use settings::{default_config_path, init_config_file, load_settings, CONFIG_ENV};
pub use types::*;
