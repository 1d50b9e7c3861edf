//! Event classification for `data: <json>` lines

use serde_json::Value;

use super::types::DecodeFault;

/// Literal prefix identifying an event-carrying line
pub const EVENT_MARKER: &str = "data: ";

/// Name of the discriminator field inside each event payload
const TYPE_FIELD: &str = "type";

/// Maximum payload length echoed back in a [`DecodeFault`]
const FAULT_PREVIEW_CHARS: usize = 100;

/// Discriminator of a decoded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Error,
    Complete,
}

impl EventKind {
    /// Classify a payload by its `type` field
    ///
    /// Unknown values, a missing field, or a non-object payload all count as
    /// a message.
    pub fn of(payload: &Value) -> Self {
        match payload.get(TYPE_FIELD).and_then(Value::as_str) {
            Some("error") => Self::Error,
            Some("complete") => Self::Complete,
            _ => Self::Message,
        }
    }
}

/// A decoded server event
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Arbitrary payload, forwarded unchanged
    Message(Value),
    /// Server-side failure; `type` has been stripped from the payload
    Error(Value),
    /// Normal end of the report
    Complete(Value),
}

impl StreamEvent {
    /// Parse one logical line
    ///
    /// Returns `None` for lines without the event marker (comments,
    /// keepalives, other SSE fields).
    pub fn parse_line(line: &str) -> Option<Result<Self, DecodeFault>> {
        line.strip_prefix(EVENT_MARKER).map(Self::from_data)
    }

    /// Parse the text following the event marker
    pub fn from_data(data: &str) -> Result<Self, DecodeFault> {
        serde_json::from_str::<Value>(data)
            .map(Self::from_payload)
            .map_err(|e| DecodeFault {
                line: preview(data),
                reason: e.to_string(),
            })
    }

    /// Wrap an already-parsed payload
    pub fn from_payload(mut payload: Value) -> Self {
        match EventKind::of(&payload) {
            EventKind::Message => Self::Message(payload),
            EventKind::Complete => Self::Complete(payload),
            EventKind::Error => {
                if let Some(fields) = payload.as_object_mut() {
                    fields.remove(TYPE_FIELD);
                }
                Self::Error(payload)
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::Error(_) => EventKind::Error,
            Self::Complete(_) => EventKind::Complete,
        }
    }

    pub fn payload(&self) -> &Value {
        match self {
            Self::Message(payload) | Self::Error(payload) | Self::Complete(payload) => payload,
        }
    }

    /// Get a string field from the payload
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.payload().get(field).and_then(Value::as_str)
    }
}

fn preview(data: &str) -> String {
    if data.chars().count() > FAULT_PREVIEW_CHARS {
        let head: String = data.chars().take(FAULT_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        data.to_string()
    }
}
