//! Transport handle: one streaming POST plus a cooperative cancel switch

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio::sync::Notify;
use tracing::debug;
use url::Url;

use super::types::{StreamError, StreamResult, TransportError};

/// Media type requested for the report body
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Longest error body kept from a non-2xx response
const ERROR_BODY_LIMIT: usize = 1024;

/// Boxed chunk source consumed by a [`ByteReader`]
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Cancellation switch shared between a session and its owner
///
/// Cloning yields another handle to the same switch. Cancelling is idempotent
/// and may happen from any task or thread.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the switch and wake any pending read
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Pulls raw chunks off a response body, honoring a [`CancelToken`]
pub struct ByteReader {
    chunks: ChunkStream,
    token: CancelToken,
}

impl ByteReader {
    /// Build a reader over any chunk source
    pub fn from_stream<S>(chunks: S, token: CancelToken) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            chunks: Box::pin(chunks),
            token,
        }
    }

    /// Read the next chunk
    ///
    /// `Ok(None)` marks a clean end of body. Cancellation takes priority over
    /// a chunk that is already available.
    pub async fn next_chunk(&mut self) -> StreamResult<Option<Bytes>> {
        if self.token.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StreamError::Cancelled),
            chunk = self.chunks.next() => match chunk {
                Some(Ok(bytes)) => Ok(Some(bytes)),
                Some(Err(e)) => Err(StreamError::Transport(e)),
                None => Ok(None),
            },
        }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl fmt::Debug for ByteReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteReader")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Build the request URL: `base` joined with `endpoint`, plus query pairs
pub fn request_url(base: &Url, endpoint: &str, params: &[(String, String)]) -> StreamResult<Url> {
    let mut url = base.join(endpoint).map_err(TransportError::from)?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

/// Issue the streaming request
///
/// Fails without yielding chunks on a non-2xx status. Both the connect phase
/// and the error-body read race `token`, so a session closed before any
/// chunk arrives never blocks on the server.
pub async fn open(
    client: &Client,
    url: Url,
    token: CancelToken,
) -> StreamResult<ByteReader> {
    debug!("Opening report stream: {}", url);

    let request = client
        .post(url)
        .header(ACCEPT, EVENT_STREAM_MEDIA_TYPE)
        .send();

    let response = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(StreamError::Cancelled),
        response = request => response.map_err(TransportError::from)?,
    };

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = error_message(response, &token).await?;
        return Err(TransportError::Status { status, message }.into());
    }

    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(TransportError::from));

    Ok(ByteReader::from_stream(chunks, token))
}

/// First chunk of an error body, truncated
///
/// Only one chunk is read so a server that stalls after the status line
/// cannot hold the open.
async fn error_message(response: reqwest::Response, token: &CancelToken) -> StreamResult<String> {
    let body = response.bytes_stream();
    tokio::pin!(body);
    let first = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(StreamError::Cancelled),
        chunk = body.next() => chunk,
    };

    let message = match first {
        Some(Ok(bytes)) => {
            let end = bytes.len().min(ERROR_BODY_LIMIT);
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        }
        _ => String::new(),
    };
    Ok(message)
}
