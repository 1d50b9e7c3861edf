//! Types shared by the streaming pipeline

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Failures of the underlying HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server answered with a non-2xx status before any chunk was read
    #[error("Server error ({status}): {message}")]
    Status { status: u16, message: String },

    /// HTTP/connection error
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    /// Endpoint could not be joined onto the base URL
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Body read failed for a reason not originating in reqwest
    #[error("Read error: {0}")]
    Read(String),
}

/// Outcome of a failed open or read on the transport
#[derive(Debug, Error)]
pub enum StreamError {
    /// Transport failure (fatal to the session)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The cancel token fired
    #[error("Stream cancelled")]
    Cancelled,
}

/// Result type for streaming operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// A single event line whose payload was not valid JSON
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse event JSON: {reason} (data: {line})")]
pub struct DecodeFault {
    /// Payload text after the event marker, truncated for display
    pub line: String,
    /// Parser message
    pub reason: String,
}

/// Payload handed to [`ReportHandler::on_error`](super::ReportHandler::on_error)
#[derive(Debug, Error)]
pub enum ReportError {
    /// Server sent an explicit `error` event; the payload has its `type` field removed
    #[error("Server reported error: {0}")]
    Protocol(Value),

    /// One event line was malformed; the stream keeps going
    #[error(transparent)]
    DecodeFault(#[from] DecodeFault),

    /// The HTTP exchange failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ReportError {
    /// Whether this error ended the session
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DecodeFault(_))
    }

    /// The server's error payload, if this is a protocol error
    pub fn protocol_payload(&self) -> Option<&Value> {
        match self {
            Self::Protocol(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Final classification of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminalState {
    /// Still dispatching events
    #[default]
    Open,
    /// Server sent `complete`, or the body ended cleanly
    Completed,
    /// Server sent `error`, or the transport failed
    Errored,
    /// Caller closed the session
    Cancelled,
}

impl TerminalState {
    pub fn is_terminal(self) -> bool {
        self != Self::Open
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
