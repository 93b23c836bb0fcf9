//! Configuration type definitions

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use simsub_core::prelude::*;
use simsub_core::{DEFAULT_PLMN_OVERRIDE_PATH, MAX_SLOTS};

/// Daemon settings (config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub modem: ModemSettings,

    #[serde(default)]
    pub network_mode: NetworkModeSettings,

    #[serde(default)]
    pub plmn: PlmnSettings,
}

impl Settings {
    /// Reject values the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.device.slots == 0 {
            return Err(Error::config_invalid("device.slots must be at least 1"));
        }
        if self.device.slots > MAX_SLOTS {
            return Err(Error::config_invalid(format!(
                "device.slots = {} exceeds the supported maximum of {}",
                self.device.slots, MAX_SLOTS
            )));
        }
        if self.modem.command_timeout_ms == 0 {
            return Err(Error::config_invalid(
                "modem.command_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Device policy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Number of radio slots
    #[serde(default = "default_slots")]
    pub slots: usize,

    /// A higher layer owns default-data switching; stack-ready events do
    /// not request one
    #[serde(default)]
    pub primary_card: bool,

    /// The SIM stays powered while in airplane mode
    #[serde(default)]
    pub apm_sim_not_pwdn: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            primary_card: false,
            apm_sim_not_pwdn: false,
        }
    }
}

/// Modem channel settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModemSettings {
    /// Bound on each pending modem command
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl ModemSettings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for ModemSettings {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

/// Network mode reconciliation settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkModeSettings {
    /// Push network modes to the modem after every resolved activation round
    #[serde(default = "default_true")]
    pub sync_on_ready: bool,
}

impl Default for NetworkModeSettings {
    fn default() -> Self {
        Self {
            sync_on_ready: true,
        }
    }
}

/// PLMN override table settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlmnSettings {
    #[serde(default = "default_override_file")]
    pub override_file: PathBuf,
}

impl Default for PlmnSettings {
    fn default() -> Self {
        Self {
            override_file: default_override_file(),
        }
    }
}

fn default_slots() -> usize {
    2
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_override_file() -> PathBuf {
    PathBuf::from(DEFAULT_PLMN_OVERRIDE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.device.slots, 2);
        assert!(!settings.device.primary_card);
        assert!(!settings.device.apm_sim_not_pwdn);
        assert_eq!(settings.modem.command_timeout(), Duration::from_secs(30));
        assert!(settings.network_mode.sync_on_ready);
        assert_eq!(
            settings.plmn.override_file,
            PathBuf::from("/system/etc/plmn-conf.xml")
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let settings: Settings = toml::from_str("[device]\nprimary_card = true\n").unwrap();
        assert!(settings.device.primary_card);
        assert_eq!(settings.device.slots, 2);
        assert_eq!(settings.modem.command_timeout_ms, 30_000);
    }

    #[test]
    fn test_validate_rejects_slot_counts() {
        let mut settings = Settings::default();
        settings.device.slots = 0;
        assert!(settings.validate().unwrap_err().is_fatal());

        settings.device.slots = MAX_SLOTS + 1;
        assert!(settings.validate().is_err());

        settings.device.slots = MAX_SLOTS;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut settings = Settings::default();
        settings.modem.command_timeout_ms = 0;
        assert!(settings.validate().is_err());
    }
}
