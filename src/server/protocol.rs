//! JSON message protocol between the relay and its subscribers.
//!
//! Messages are line-delimited JSON objects tagged by a `type` field, one
//! object per line in both directions.

use serde::{Deserialize, Serialize};

/// Messages a subscriber may send to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Clear session state; `content == "clear"` wipes buffered audio and
    /// the accumulated transcript.
    Reset { content: String },
    /// Forward text to the chat-completion collaborator. `star` requests
    /// the configured system instructions to be applied.
    Prompt {
        content: String,
        #[serde(default)]
        star: bool,
    },
    /// Any unrecognized message type. Ignored, so newer clients can talk
    /// to older relays.
    #[serde(other)]
    Unknown,
}

/// Messages broadcast by the relay to all subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Newly merged transcript text.
    Transcribe { content: String },
    /// Echo of a prompt that was forwarded to the chat collaborator.
    Prompt { content: String },
    /// The chat collaborator's reply.
    Response { content: String },
}

impl Inbound {
    /// Deserialize a message from one JSON line.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl Outbound {
    /// Serialize the message to a single JSON line (no trailing newline).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_reset_parses() {
        let msg = Inbound::from_json(r#"{"type":"reset","content":"clear"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Reset {
                content: "clear".to_string()
            }
        );
    }

    #[test]
    fn test_inbound_prompt_parses() {
        let msg =
            Inbound::from_json(r#"{"type":"prompt","content":"summarize this","star":true}"#)
                .unwrap();
        assert_eq!(
            msg,
            Inbound::Prompt {
                content: "summarize this".to_string(),
                star: true
            }
        );
    }

    #[test]
    fn test_inbound_prompt_star_defaults_to_false() {
        let msg = Inbound::from_json(r#"{"type":"prompt","content":"hi"}"#).unwrap();
        assert_eq!(
            msg,
            Inbound::Prompt {
                content: "hi".to_string(),
                star: false
            }
        );
    }

    #[test]
    fn test_inbound_unknown_type_is_forward_compatible() {
        let msg = Inbound::from_json(r#"{"type":"ping","content":"x"}"#).unwrap();
        assert_eq!(msg, Inbound::Unknown);
    }

    #[test]
    fn test_inbound_malformed_json_is_an_error() {
        assert!(Inbound::from_json("not json at all").is_err());
        assert!(Inbound::from_json(r#"{"no_type":"here"}"#).is_err());
    }

    #[test]
    fn test_outbound_transcribe_format() {
        let msg = Outbound::Transcribe {
            content: "the lazy dog".to_string(),
        };
        assert_eq!(
            msg.to_json().unwrap(),
            r#"{"type":"transcribe","content":"the lazy dog"}"#
        );
    }

    #[test]
    fn test_outbound_prompt_and_response_format() {
        let prompt = Outbound::Prompt {
            content: "question".to_string(),
        };
        assert_eq!(
            prompt.to_json().unwrap(),
            r#"{"type":"prompt","content":"question"}"#
        );

        let response = Outbound::Response {
            content: "answer".to_string(),
        };
        assert_eq!(
            response.to_json().unwrap(),
            r#"{"type":"response","content":"answer"}"#
        );
    }

    #[test]
    fn test_outbound_roundtrip() {
        let msg = Outbound::Transcribe {
            content: r#"quotes "inside" and \n escapes"#.to_string(),
        };
        let json = msg.to_json().unwrap();
        let parsed: Outbound = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, parsed);
    }

    #[test]
    fn test_outbound_json_is_single_line() {
        let msg = Outbound::Response {
            content: "line one\nline two".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(!json.contains('\n'), "newline must be escaped, got: {}", json);
    }
}
