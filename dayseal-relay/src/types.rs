//! Relay wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A signed relay event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEvent {
    /// Lowercase hex SHA-256 of the canonical serialization.
    pub id: String,
    /// Lowercase hex x-only public key of the author.
    pub pubkey: String,
    /// Unix seconds.
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Lowercase hex BIP-340 signature over the id.
    pub sig: String,
}

impl RelayEvent {
    /// Value of the first `d` tag, if any.
    pub fn d_tag(&self) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some("d"))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

/// Subscription filter. Only the fields this crate queries by.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<u16>,
    #[serde(rename = "#d", default, skip_serializing_if = "Vec::is_empty")]
    pub d_tags: Vec<String>,
}

impl Filter {
    /// Whether `event` satisfies this filter. Used by in-process relays.
    pub fn matches(&self, event: &RelayEvent) -> bool {
        (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && (self.kinds.is_empty() || self.kinds.contains(&event.kind))
            && (self.d_tags.is_empty()
                || event
                    .d_tag()
                    .is_some_and(|d| self.d_tags.iter().any(|t| t == d)))
    }
}

/// Outcome of broadcasting one event to every configured relay.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub event_id: String,
    /// Relays that answered `OK true`.
    pub accepted: Vec<String>,
    /// Relays that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl PublishReport {
    /// At least one relay stored the event.
    pub fn is_accepted(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// Messages a client sends.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    Event(RelayEvent),
    Req { subscription_id: String, filter: Filter },
    Close { subscription_id: String },
}

impl ClientMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        let value = match self {
            ClientMessage::Event(event) => {
                serde_json::json!(["EVENT", event])
            }
            ClientMessage::Req {
                subscription_id,
                filter,
            } => serde_json::json!(["REQ", subscription_id, filter]),
            ClientMessage::Close { subscription_id } => {
                serde_json::json!(["CLOSE", subscription_id])
            }
        };
        serde_json::to_string(&value)
    }

    /// Parses a client frame. In-process relays use this to decode what the
    /// client sent.
    pub fn from_json(text: &str) -> Option<Self> {
        let Value::Array(items) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };
        match items.first()?.as_str()? {
            "EVENT" => Some(ClientMessage::Event(
                serde_json::from_value(items.get(1)?.clone()).ok()?,
            )),
            "REQ" => Some(ClientMessage::Req {
                subscription_id: items.get(1)?.as_str()?.to_string(),
                filter: serde_json::from_value(items.get(2)?.clone()).ok()?,
            }),
            "CLOSE" => Some(ClientMessage::Close {
                subscription_id: items.get(1)?.as_str()?.to_string(),
            }),
            _ => None,
        }
    }
}

/// Messages a relay sends.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayMessage {
    Event {
        subscription_id: String,
        event: RelayEvent,
    },
    Ok {
        event_id: String,
        accepted: bool,
        message: String,
    },
    Eose {
        subscription_id: String,
    },
    Closed {
        subscription_id: String,
        message: String,
    },
    Notice {
        message: String,
    },
}

impl RelayMessage {
    /// Parses a relay frame. Unknown or malformed frames yield `None`.
    pub fn from_json(text: &str) -> Option<Self> {
        let Value::Array(items) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };
        let string_at = |i: usize| items.get(i).and_then(Value::as_str).map(str::to_string);
        match items.first()?.as_str()? {
            "EVENT" => Some(RelayMessage::Event {
                subscription_id: string_at(1)?,
                event: serde_json::from_value(items.get(2)?.clone()).ok()?,
            }),
            "OK" => Some(RelayMessage::Ok {
                event_id: string_at(1)?,
                accepted: items.get(2)?.as_bool()?,
                message: string_at(3).unwrap_or_default(),
            }),
            "EOSE" => Some(RelayMessage::Eose {
                subscription_id: string_at(1)?,
            }),
            "CLOSED" => Some(RelayMessage::Closed {
                subscription_id: string_at(1)?,
                message: string_at(2).unwrap_or_default(),
            }),
            "NOTICE" => Some(RelayMessage::Notice {
                message: string_at(1).unwrap_or_default(),
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let value = match self {
            RelayMessage::Event {
                subscription_id,
                event,
            } => serde_json::json!(["EVENT", subscription_id, event]),
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => serde_json::json!(["OK", event_id, accepted, message]),
            RelayMessage::Eose { subscription_id } => serde_json::json!(["EOSE", subscription_id]),
            RelayMessage::Closed {
                subscription_id,
                message,
            } => serde_json::json!(["CLOSED", subscription_id, message]),
            RelayMessage::Notice { message } => serde_json::json!(["NOTICE", message]),
        };
        serde_json::to_string(&value)
    }
}
