//! Routes decoded lines to caller callbacks under a terminal-state guard

use std::ops::ControlFlow;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::event::StreamEvent;
use super::types::{ReportError, TerminalState, TransportError};

/// Receiver of stream notifications
///
/// For one session, `on_message` may fire any number of times and
/// `on_error` may fire for each decode fault; after that at most one
/// terminal notification (`on_complete`, or a fatal `on_error`) is delivered.
pub trait ReportHandler {
    /// A `message` event (or any event with an unknown discriminator)
    fn on_message(&mut self, payload: Value);

    /// A server `error` event, a transport failure, or a non-fatal decode fault
    fn on_error(&mut self, error: ReportError);

    /// Normal end of the report
    fn on_complete(&mut self);
}

/// Adapts three closures to [`ReportHandler`]
pub struct Callbacks<M, E, C> {
    on_message: M,
    on_error: E,
    on_complete: C,
}

impl<M, E, C> Callbacks<M, E, C>
where
    M: FnMut(Value),
    E: FnMut(ReportError),
    C: FnMut(),
{
    pub fn new(on_message: M, on_error: E, on_complete: C) -> Self {
        Self {
            on_message,
            on_error,
            on_complete,
        }
    }
}

impl<M, E, C> ReportHandler for Callbacks<M, E, C>
where
    M: FnMut(Value),
    E: FnMut(ReportError),
    C: FnMut(),
{
    fn on_message(&mut self, payload: Value) {
        (self.on_message)(payload)
    }

    fn on_error(&mut self, error: ReportError) {
        (self.on_error)(error)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }
}

impl<H: ReportHandler + ?Sized> ReportHandler for Box<H> {
    fn on_message(&mut self, payload: Value) {
        (**self).on_message(payload)
    }

    fn on_error(&mut self, error: ReportError) {
        (**self).on_error(error)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }
}

/// Why the pull loop stopped
#[derive(Debug)]
pub enum LoopExit {
    /// The body ended cleanly
    EndOfStream,
    /// The dispatcher reached a terminal event
    Terminal,
    /// The cancel token fired
    Cancelled,
    /// Opening or reading the body failed
    Transport(TransportError),
}

/// Owns a handler and the session's terminal state
#[derive(Debug)]
pub struct Dispatcher<H> {
    handler: H,
    state: TerminalState,
}

impl<H: ReportHandler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: TerminalState::Open,
        }
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    /// Classify one logical line and notify the handler
    ///
    /// Breaks once the session has reached a terminal state.
    pub fn dispatch_line(&mut self, line: &str) -> ControlFlow<()> {
        if self.state.is_terminal() {
            return ControlFlow::Break(());
        }

        match StreamEvent::parse_line(line) {
            None => {
                trace!("Ignoring non-event line ({} bytes)", line.len());
                ControlFlow::Continue(())
            }
            Some(Err(fault)) => {
                warn!("Skipping malformed event: {}", fault);
                self.handler.on_error(ReportError::DecodeFault(fault));
                ControlFlow::Continue(())
            }
            Some(Ok(event)) => self.dispatch(event),
        }
    }

    /// Deliver one decoded event
    pub fn dispatch(&mut self, event: StreamEvent) -> ControlFlow<()> {
        if self.state.is_terminal() {
            return ControlFlow::Break(());
        }

        match event {
            StreamEvent::Message(payload) => {
                self.handler.on_message(payload);
                ControlFlow::Continue(())
            }
            StreamEvent::Error(payload) => {
                debug!("Server reported error event");
                self.state = TerminalState::Errored;
                self.handler.on_error(ReportError::Protocol(payload));
                ControlFlow::Break(())
            }
            StreamEvent::Complete(_) => {
                debug!("Server reported completion");
                self.state = TerminalState::Completed;
                self.handler.on_complete();
                ControlFlow::Break(())
            }
        }
    }

    /// Settle the terminal state once the pull loop has stopped
    ///
    /// Fires at most one final callback, and none if a terminal event was
    /// already delivered or the caller cancelled.
    pub fn finish(mut self, exit: LoopExit) -> (TerminalState, H) {
        if !self.state.is_terminal() {
            match exit {
                LoopExit::EndOfStream | LoopExit::Terminal => {
                    self.state = TerminalState::Completed;
                    self.handler.on_complete();
                }
                LoopExit::Transport(e) => {
                    warn!("Report stream failed: {}", e);
                    self.state = TerminalState::Errored;
                    self.handler.on_error(ReportError::Transport(e));
                }
                LoopExit::Cancelled => {
                    debug!("Report stream cancelled by caller");
                    self.state = TerminalState::Cancelled;
                }
            }
        }
        (self.state, self.handler)
    }
}
