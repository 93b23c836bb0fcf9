//! Line protocol handling for the modem channel
//!
//! Every line is one JSON object. Responses carry the `id` of the request
//! they answer; indications carry an `event` name and `params`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use simsub_core::ModemIndication;

/// A raw modem message (before parsing into typed indications)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMessage {
    /// A response to a request we sent
    Response {
        id: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    /// An indication from the modem (unsolicited)
    Event { event: String, params: Value },
}

impl RawMessage {
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }

    /// Get a human-readable summary of this message
    pub fn summary(&self) -> String {
        match self {
            RawMessage::Response { id, error, .. } => {
                if error.is_some() {
                    format!("Response #{}: error", id)
                } else {
                    format!("Response #{}: ok", id)
                }
            }
            RawMessage::Event { event, .. } => format!("Event: {}", event),
        }
    }
}

/// A parsed line from the modem
#[derive(Debug, Clone, PartialEq)]
pub enum ModemMessage {
    Response {
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    },
    Indication(ModemIndication),
    /// Well-formed event this daemon has no use for
    UnknownEvent { event: String },
}

/// Parses one line read from the modem channel.
///
/// Returns `None` for blank lines, non-JSON output and responses whose id is
/// not a request id we could have issued.
pub fn parse_modem_line(line: &str) -> Option<ModemMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let raw = RawMessage::parse(trimmed)?;
    tracing::trace!("modem: {}", raw.summary());

    match raw {
        RawMessage::Response { id, result, error } => Some(ModemMessage::Response {
            id: id.as_u64()?,
            result,
            error,
        }),
        RawMessage::Event { event, params } => Some(parse_event(event, params)),
    }
}

/// Parse an event by name and parameters
fn parse_event(event: String, params: Value) -> ModemMessage {
    let Value::Object(mut fields) = params else {
        return ModemMessage::UnknownEvent { event };
    };
    fields.insert("event".to_string(), Value::String(event.clone()));

    match serde_json::from_value::<ModemIndication>(Value::Object(fields)) {
        Ok(indication) => ModemMessage::Indication(indication),
        Err(_) => ModemMessage::UnknownEvent { event },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simsub_core::RefreshKind;

    #[test]
    fn test_parse_response() {
        let msg = parse_modem_line(r#"{"id":4,"result":[9]}"#).unwrap();
        match msg {
            ModemMessage::Response { id, result, error } => {
                assert_eq!(id, 4);
                assert_eq!(result, Some(serde_json::json!([9])));
                assert!(error.is_none());
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_response() {
        let msg = parse_modem_line(r#"{"id":5,"error":"RADIO_NOT_AVAILABLE"}"#).unwrap();
        assert!(matches!(msg, ModemMessage::Response { id: 5, error: Some(_), .. }));
    }

    #[test]
    fn test_parse_refresh_indication() {
        let msg =
            parse_modem_line(r#"{"event":"iccRefresh","params":{"slot":1,"result":"reset"}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ModemMessage::Indication(ModemIndication::IccRefresh {
                slot: 1,
                result: RefreshKind::Reset
            })
        );
    }

    #[test]
    fn test_parse_unknown_event() {
        let msg = parse_modem_line(r#"{"event":"signalStrength","params":{"rssi":-80}}"#).unwrap();
        assert_eq!(
            msg,
            ModemMessage::UnknownEvent {
                event: "signalStrength".to_string()
            }
        );
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert!(parse_modem_line("").is_none());
        assert!(parse_modem_line("   ").is_none());
        assert!(parse_modem_line("AT+CFUN=1").is_none());
        assert!(parse_modem_line(r#"{"id":"abc","result":0}"#).is_none());
    }
}
