//! Test utilities for vidan-stream
//!
//! Provides an in-process HTTP server and a callback recorder for
//! exercising report streams end to end.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;

use crate::streaming::{DecodeFault, ReportError, ReportHandler};
use crate::{ReportClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: ReportClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Create a new test server from an axum Router
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Router};
    /// use vidan_stream::testing::TestServer;
    ///
    /// let router = Router::new().route("/report", post(|| async { "data: {}\n" }));
    /// let server = TestServer::start(router).await?;
    /// let session = server.client.open_stream("/report", Vec::new()).await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(2)).await
    }

    /// Create a new test server with a custom connect timeout
    pub async fn start_with_timeout<S>(
        router: axum::Router<S>,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = ReportClient::with_config(&base_url, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One recorded handler invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Message(Value),
    /// Server `error` event payload
    Protocol(Value),
    DecodeFault(DecodeFault),
    /// Transport failure, as its display string
    Transport(String),
    Complete,
}

/// [`ReportHandler`] that records every invocation
///
/// Clones share the same log, so one clone can be handed to a session while
/// another is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the calls so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn messages(&self) -> Vec<Value> {
        self.lock()
            .iter()
            .filter_map(|call| match call {
                Call::Message(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.lock().push(call);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Call>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportHandler for RecordingHandler {
    fn on_message(&mut self, payload: Value) {
        self.record(Call::Message(payload));
    }

    fn on_error(&mut self, error: ReportError) {
        let call = match error {
            ReportError::Protocol(payload) => Call::Protocol(payload),
            ReportError::DecodeFault(fault) => Call::DecodeFault(fault),
            ReportError::Transport(e) => Call::Transport(e.to_string()),
        };
        self.record(call);
    }

    fn on_complete(&mut self) {
        self.record(Call::Complete);
    }
}

/// Wait for a condition with timeout
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    false
}
