//! Streaming report support
//!
//! The report endpoint answers a POST with a chunked body of
//! `data: <json>` lines. This module frames that body into lines,
//! classifies each event, and drives caller callbacks until the stream
//! terminates.
//!
//! # Example
//!
//! ```no_run
//! use vidan_stream::{Callbacks, ComparisonReportQuery, ReportClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ReportClient::new("http://127.0.0.1:8000")?;
//!
//! let query = ComparisonReportQuery::new("unboxing stage").with_product_name("X1");
//! let handle = client.comparison_report(
//!     &query,
//!     Callbacks::new(
//!         |payload| println!("section: {}", payload),
//!         |error| eprintln!("report error: {}", error),
//!         || println!("report complete"),
//!     ),
//! );
//!
//! // handle.close() cancels; join waits for the terminal state
//! let state = handle.join().await?;
//! println!("finished: {}", state);
//! # Ok(())
//! # }
//! ```

mod decoder;
mod dispatcher;
mod event;
mod session;
mod transport;
mod types;

pub use decoder::LineDecoder;
pub use dispatcher::{Callbacks, Dispatcher, LoopExit, ReportHandler};
pub use event::{EventKind, StreamEvent, EVENT_MARKER};
pub use session::{ReportHandle, StreamSession};
pub use transport::{open, request_url, ByteReader, CancelToken, ChunkStream, EVENT_STREAM_MEDIA_TYPE};
pub use types::{DecodeFault, ReportError, StreamError, StreamResult, TerminalState, TransportError};
