//! Settings loading from config.toml

use std::path::{Path, PathBuf};

use simsub_core::prelude::*;

use super::types::Settings;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SIMSUB_CONFIG";

const CONFIG_DIR: &str = "simsub";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# simsubd configuration

[device]
# Number of radio slots
slots = 2
# A higher layer owns default-data switching
primary_card = false
# The SIM stays powered while in airplane mode
apm_sim_not_pwdn = false

[modem]
# Bound on each pending modem command
command_timeout_ms = 30000

[network_mode]
# Push network modes to the modem after every resolved activation round
sync_on_ready = true

[plmn]
override_file = "/system/etc/plmn-conf.xml"
"#;

/// Config file location: `$SIMSUB_CONFIG`, else `<config dir>/simsub/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILENAME))
}

/// Load settings from `config_path`, falling back to defaults
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write the commented default config to `config_path` unless it exists
pub fn init_config_file(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        debug!("Config file {:?} already exists", config_path);
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    std::fs::write(config_path, DEFAULT_CONFIG)
        .map_err(|e| Error::config(format!("Failed to write {:?}: {}", config_path, e)))?;
    info!("Wrote default config to {:?}", config_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_load_settings_missing_file() {
        let temp = tempdir().unwrap();
        let settings = load_settings(&temp.path().join("config.toml"));

        assert_eq!(settings.device.slots, 2);
        assert!(settings.network_mode.sync_on_ready);
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");

        let config = r#"
[device]
slots = 3
apm_sim_not_pwdn = true

[modem]
command_timeout_ms = 500
"#;
        std::fs::write(&path, config).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.device.slots, 3);
        assert!(settings.device.apm_sim_not_pwdn);
        assert!(!settings.device.primary_card);
        assert_eq!(settings.modem.command_timeout_ms, 500);
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "not valid toml {{{{").unwrap();

        // Should return defaults
        let settings = load_settings(&path);
        assert_eq!(settings.device.slots, 2);
    }

    #[test]
    fn test_init_config_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("simsub").join("config.toml");

        init_config_file(&path).unwrap();
        assert!(path.exists());

        // Content should be valid TOML matching the defaults
        let content = std::fs::read_to_string(&path).unwrap();
        let settings: Settings = toml::from_str(&content).expect("Default config should be valid TOML");
        assert_eq!(settings.device.slots, Settings::default().device.slots);
    }

    #[test]
    fn test_init_config_file_keeps_existing() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[device]\nslots = 1\n").unwrap();

        init_config_file(&path).unwrap();
        assert_eq!(load_settings(&path).device.slots, 1);
    }

    #[test]
    #[serial]
    fn test_default_config_path_env_override() {
        std::env::set_var(CONFIG_ENV, "/tmp/simsub-test.toml");
        let path = default_config_path();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(path, Some(PathBuf::from("/tmp/simsub-test.toml")));
    }

    #[test]
    #[serial]
    fn test_default_config_path_without_override() {
        std::env::remove_var(CONFIG_ENV);
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("simsub/config.toml"));
        }
    }
}
