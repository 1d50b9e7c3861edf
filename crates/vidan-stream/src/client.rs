//! Report HTTP client implementation

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use tracing::{debug, instrument, Instrument};
use url::Url;

use crate::config::{ClientConfig, DEFAULT_REPORT_PATH};
use crate::error::{ReportClientError, Result};
use crate::streaming::{
    self, CancelToken, Dispatcher, LoopExit, ReportHandle, ReportHandler, StreamSession,
};
use crate::types::ComparisonReportQuery;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the streaming report endpoints of the analysis server
///
/// Only connection setup is timed out: report bodies can stay open for as
/// long as the server keeps generating.
#[derive(Debug, Clone)]
pub struct ReportClient {
    client: Client,
    base_url: Url,
    report_path: String,
}

impl ReportClient {
    /// Create a new report client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the analysis server (e.g., "http://127.0.0.1:8000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new report client with a custom connect timeout
    pub fn with_config(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            base_url,
            report_path: DEFAULT_REPORT_PATH.to_string(),
        })
    }

    /// Create a new report client that sends a bearer token with every request
    pub fn with_bearer_token(base_url: &str, token: &str) -> Result<Self> {
        let config = ClientConfig::default()
            .with_base_url(base_url)
            .with_bearer_token(token);
        Self::from_config(&config)
    }

    /// Build a client from loaded configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout());

        if let Some(token) = &config.bearer_token {
            let mut headers = HeaderMap::new();
            let header_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ReportClientError::config(format!("Invalid auth token: {}", e)))?;
            headers.insert(AUTHORIZATION, header_value);
            builder = builder.default_headers(headers);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: Url::parse(&config.base_url)?,
            report_path: config.report_path.clone(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Path used by [`comparison_report`](Self::comparison_report)
    pub fn report_path(&self) -> &str {
        &self.report_path
    }

    /// Full URL for a streaming call
    pub fn stream_url(&self, path: &str, params: &[(String, String)]) -> Result<Url> {
        Ok(streaming::request_url(&self.base_url, path, params)?)
    }

    /// Open a stream and return the session without starting it
    ///
    /// Connection failures and non-2xx statuses surface here, before any
    /// callback could fire.
    #[instrument(skip(self, params))]
    pub async fn open_stream(
        &self,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<StreamSession> {
        self.open_stream_with(path, params, CancelToken::new()).await
    }

    /// Like [`open_stream`](Self::open_stream), with a caller-owned cancel token
    ///
    /// Cancelling the token while connecting aborts the open.
    pub async fn open_stream_with(
        &self,
        path: &str,
        params: Vec<(String, String)>,
        token: CancelToken,
    ) -> Result<StreamSession> {
        let url = self.stream_url(path, &params)?;
        let reader = streaming::open(&self.client, url, token).await?;
        Ok(StreamSession::new(reader, params))
    }

    /// Spawn a streaming call that reports everything through `handler`
    ///
    /// A failure to open is delivered as a single `on_error`. Closing the
    /// returned handle before data arrives fires no callback at all.
    #[instrument(skip(self, params, handler))]
    pub fn stream_report<H>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
        handler: H,
    ) -> ReportHandle
    where
        H: ReportHandler + Send + 'static,
    {
        let token = CancelToken::new();
        let session_token = token.clone();
        let client = self.client.clone();
        let url = streaming::request_url(&self.base_url, path, &params);

        let task = tokio::spawn(
            async move {
                let opened = match url {
                    Ok(url) => streaming::open(&client, url, session_token).await,
                    Err(e) => Err(e),
                };
                match opened {
                    Ok(reader) => StreamSession::new(reader, params).run(handler).await,
                    Err(e) => {
                        debug!("Report stream did not open: {}", e);
                        Dispatcher::new(handler).finish(LoopExit::from(e)).0
                    }
                }
            }
            .instrument(tracing::Span::current()),
        );

        ReportHandle::new(token, task)
    }

    /// Stream a comparison report for the configured report path
    pub fn comparison_report<H>(&self, query: &ComparisonReportQuery, handler: H) -> ReportHandle
    where
        H: ReportHandler + Send + 'static,
    {
        self.stream_report(&self.report_path, query.to_params(), handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHandler;
    use crate::TerminalState;
    use std::sync::{Arc, Mutex};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::{Layer, Registry};

    #[test]
    fn test_client_creation() {
        let client = ReportClient::new("http://127.0.0.1:8000");
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = ReportClient::new("not a url");
        assert!(matches!(client, Err(ReportClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_bearer_token() {
        let client = ReportClient::with_bearer_token("http://127.0.0.1:8000", "bad\ntoken");
        assert!(matches!(client, Err(ReportClientError::ConfigError(_))));
    }

    #[test]
    fn test_from_config_uses_report_path() {
        let config = ClientConfig {
            report_path: "/custom/report".into(),
            ..ClientConfig::default()
        };
        let client = ReportClient::from_config(&config).unwrap();
        assert_eq!(client.report_path(), "/custom/report");
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_stream_url() {
        let client = ReportClient::new("http://127.0.0.1:8000").unwrap();
        let query = ComparisonReportQuery::new("unboxing stage").with_product_name("X1");
        let url = client
            .stream_url(client.report_path(), &query.to_params())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/video-analysis/rag/generate-comparison-report\
             ?query=unboxing+stage&similarity_threshold=0.7&product_name=X1"
        );
    }

    /// Records the span scope of every event logged from this crate
    #[derive(Clone, Default)]
    struct ScopeRecorder(Arc<Mutex<Vec<(String, Vec<String>)>>>);

    impl<S> Layer<S> for ScopeRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let target = event.metadata().target();
            if !target.starts_with("vidan_stream") {
                return;
            }
            let scope = ctx
                .event_scope(event)
                .map(|scope| scope.map(|span| span.name().to_string()).collect())
                .unwrap_or_default();
            self.0.lock().unwrap().push((target.to_string(), scope));
        }
    }

    #[tokio::test]
    async fn test_spawned_session_logs_inside_caller_span() {
        let recorder = ScopeRecorder::default();
        let _guard = tracing::subscriber::set_default(Registry::default().with(recorder.clone()));

        // Nothing listens on a port we just released
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReportClient::new(&format!("http://{}", addr)).unwrap();
        let state = client
            .stream_report("/report", Vec::new(), RecordingHandler::new())
            .join()
            .await
            .unwrap();
        assert_eq!(state, TerminalState::Errored);

        let events = recorder.0.lock().unwrap().clone();
        let open_failure = events
            .iter()
            .find(|(target, _)| target == "vidan_stream::client")
            .expect("open failure was logged");
        assert!(open_failure.1.iter().any(|name| name == "stream_report"));
    }
}
