//! Error type shared by every simsub crate

use thiserror::Error;

use crate::types::SlotId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup error: {message}")]
    Startup { message: String },

    /// Config or override file could not be written or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Settings parsed but describe an impossible device
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    /// The modem answered in a way the caller cannot use
    #[error("Modem error: {message}")]
    Modem { message: String },

    #[error("Modem command '{command}' timed out after {timeout_ms}ms")]
    CommandTimeout { command: String, timeout_ms: u64 },

    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Modem binding already claimed by a running engine")]
    AlreadyInitialized,

    #[error("Slot {slot} out of range (device has {slots} slots)")]
    InvalidSlot { slot: SlotId, slots: usize },

    #[error("Expected SIM status for {expected} slots, got {actual}")]
    SlotCountMismatch { expected: usize, actual: usize },
}

impl Error {
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn modem(message: impl Into<String>) -> Self {
        Self::Modem {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn command_timeout(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self::CommandTimeout {
            command: command.into(),
            timeout_ms,
        }
    }

    pub fn invalid_slot(slot: SlotId, slots: usize) -> Self {
        Self::InvalidSlot { slot, slots }
    }

    /// A failed modem exchange. The coordinator records these as a failed
    /// request and keeps running.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Modem { .. } | Error::CommandTimeout { .. } | Error::ChannelSend { .. }
        )
    }

    /// The daemon cannot start or keep running after this
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::AlreadyInitialized | Error::Startup { .. } | Error::ConfigInvalid { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::modem("radio not connected").to_string(),
            "Modem error: radio not connected"
        );
        assert_eq!(
            Error::command_timeout("uicc.setSubscription", 30_000).to_string(),
            "Modem command 'uicc.setSubscription' timed out after 30000ms"
        );
        assert_eq!(
            Error::invalid_slot(3, 2).to_string(),
            "Slot 3 out of range (device has 2 slots)"
        );
    }

    #[test]
    fn test_io_conversion() {
        fn open() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/simsub.toml")?)
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }

    #[test]
    fn test_classification() {
        assert!(Error::AlreadyInitialized.is_fatal());
        assert!(Error::config_invalid("slots = 0").is_fatal());
        assert!(!Error::modem("test").is_fatal());

        assert!(Error::command_timeout("nw.getPreferredNetworkType", 10).is_transport());
        assert!(Error::channel_send("closed").is_transport());
        assert!(!Error::invalid_slot(2, 2).is_transport());
    }
}
