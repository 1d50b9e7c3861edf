//! Stream sessions: the pull loop tying transport, decoder and dispatcher

use tokio::task::JoinHandle;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::decoder::LineDecoder;
use super::dispatcher::{Dispatcher, LoopExit, ReportHandler};
use super::transport::{ByteReader, CancelToken};
use super::types::{StreamError, TerminalState};
use crate::error::Result;

impl From<StreamError> for LoopExit {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Cancelled => Self::Cancelled,
            StreamError::Transport(e) => Self::Transport(e),
        }
    }
}

/// One streaming call, from an open body to its terminal state
///
/// Consumed by [`run`](Self::run); a finished session cannot be restarted.
///
/// # Example
///
/// ```ignore
/// let session = client.open_stream("/report", &params).await?;
/// let closer = session.closer();
/// let state = session.run(handler).await;
/// ```
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    params: Vec<(String, String)>,
    reader: ByteReader,
    decoder: LineDecoder,
}

impl StreamSession {
    /// Wrap an opened reader
    pub fn new(reader: ByteReader, params: Vec<(String, String)>) -> Self {
        Self {
            id: Uuid::new_v4(),
            params,
            reader,
            decoder: LineDecoder::new(),
        }
    }

    /// Session id used in log spans
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Query parameters the stream was opened with
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Handle that cancels this session from another task
    pub fn closer(&self) -> CancelToken {
        self.reader.token().clone()
    }

    /// Pull chunks until a terminal event, end of body, failure, or cancel
    ///
    /// The reader is released before the final callback fires.
    #[instrument(name = "report_stream", skip_all, fields(session = %self.id))]
    pub async fn run<H: ReportHandler>(self, handler: H) -> TerminalState {
        let Self {
            mut reader,
            mut decoder,
            ..
        } = self;
        let mut dispatcher = Dispatcher::new(handler);

        let exit = 'read: loop {
            match reader.next_chunk().await {
                Ok(Some(chunk)) => {
                    for line in decoder.feed(&chunk) {
                        if dispatcher.dispatch_line(&line).is_break() {
                            break 'read LoopExit::Terminal;
                        }
                    }
                }
                Ok(None) => {
                    decoder.finish();
                    break LoopExit::EndOfStream;
                }
                Err(e) => break LoopExit::from(e),
            }
        };
        drop(reader);

        let (state, _) = dispatcher.finish(exit);
        debug!(%state, "Report stream finished");
        state
    }
}

/// Owner's side of a spawned session
///
/// Dropping the handle closes the session.
#[derive(Debug)]
pub struct ReportHandle {
    token: CancelToken,
    task: JoinHandle<TerminalState>,
    cancel_on_drop: CancelOnDrop,
}

impl ReportHandle {
    pub(crate) fn new(token: CancelToken, task: JoinHandle<TerminalState>) -> Self {
        Self {
            cancel_on_drop: CancelOnDrop(token.clone()),
            token,
            task,
        }
    }

    /// Cancel the session; a no-op once it has terminated
    pub fn close(&self) {
        self.token.cancel();
    }

    /// Cancel token, e.g. to race against an idle timer
    pub fn closer(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to reach its terminal state
    ///
    /// Dropping the returned future before it resolves closes the session.
    pub async fn join(self) -> Result<TerminalState> {
        let Self {
            task,
            cancel_on_drop: _cancel_on_drop,
            ..
        } = self;
        Ok(task.await?)
    }
}

/// Cancels the token when dropped
#[derive(Debug)]
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
