//! Unsolicited indications reported by the modem

use serde::{Deserialize, Serialize};

use crate::types::{RefreshKind, SlotId};

/// An indication the modem sends without a matching request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ModemIndication {
    /// The card in `slot` was refreshed
    IccRefresh { slot: SlotId, result: RefreshKind },
}

impl ModemIndication {
    pub fn slot(&self) -> SlotId {
        match self {
            ModemIndication::IccRefresh { slot, .. } => *slot,
        }
    }

    /// Short label for logging
    pub fn summary(&self) -> String {
        match self {
            ModemIndication::IccRefresh { slot, result } => {
                format!("iccRefresh slot={} result={:?}", slot, result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indication_serde() {
        let ind: ModemIndication =
            serde_json::from_str(r#"{"event":"iccRefresh","slot":1,"result":"reset"}"#).unwrap();
        assert_eq!(
            ind,
            ModemIndication::IccRefresh {
                slot: 1,
                result: RefreshKind::Reset
            }
        );
        assert_eq!(ind.slot(), 1);
        assert!(ind.summary().contains("Reset"));
    }
}
