//! Video Analysis Report Stream Client
//!
//! Consumes the analysis server's streaming report endpoints: a POST whose
//! chunked response body carries one `data: <json>` event per line.
//!
//! # Example
//!
//! ```rust,no_run
//! use vidan_stream::{ClientConfig, ReportClient, TerminalState};
//! use vidan_stream::testing::RecordingHandler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load()?;
//!     let client = ReportClient::from_config(&config)?;
//!
//!     // Open synchronously to see connection errors up front
//!     let params = vec![("query".to_string(), "unboxing".to_string())];
//!     let session = client.open_stream(client.report_path(), params).await?;
//!
//!     let recorder = RecordingHandler::new();
//!     let state = session.run(recorder.clone()).await;
//!     assert_eq!(state, TerminalState::Completed);
//!     println!("{} sections", recorder.messages().len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Event Semantics
//!
//! - `{"type":"message",...}` (or any unknown type) goes to `on_message`
//! - `{"type":"error",...}` goes to `on_error` and ends the stream
//! - `{"type":"complete"}` goes to `on_complete` and ends the stream
//! - A line that is not valid JSON is reported to `on_error` and skipped
//! - A body that ends without `complete` still fires `on_complete` once
//!
//! # Testing
//!
//! The `testing` module provides utilities for integration testing:
//!
//! ```rust,ignore
//! use vidan_stream::testing::{RecordingHandler, TestServer};
//!
//! let server = TestServer::start(router).await?;
//! let handle = server.client.stream_report("/report", params, RecordingHandler::new());
//! ```

mod client;
mod config;
mod error;
pub mod streaming;
pub mod testing;
mod types;

pub use client::ReportClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_REPORT_PATH};
pub use error::{ReportClientError, Result};
pub use types::*;

// Re-export streaming types for convenience
pub use streaming::{
    Callbacks, CancelToken, ReportError, ReportHandle, ReportHandler, StreamError, StreamEvent,
    StreamSession, TerminalState, TransportError,
};
