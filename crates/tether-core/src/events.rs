//! Agent notifications.
//!
//! The loop reports progress through an [`AgentObserver`] injected at
//! construction. Every method has a no-op default, so observers implement
//! only what they display. [`ChannelObserver`] turns the callbacks into an
//! [`AgentEvent`] stream for consumers running on another task.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::toolset::ToolResult;

// ── Observer ─────────────────────────────────────────────────

/// Synchronous callbacks fired on the loop's own task.
pub trait AgentObserver: Send {
    /// Reasoning text parsed from the model turn.
    fn on_thought(&mut self, _thought: &str) {}

    /// Raw command text about to be executed.
    fn on_command(&mut self, _command: &str) {}

    fn on_tool_result(&mut self, _result: &ToolResult) {}

    /// Free-form progress line, e.g. `Step 3/25`.
    fn on_progress(&mut self, _message: &str) {}

    /// The task finished; `summary` is the FINISH text.
    fn on_finish(&mut self, _summary: &str) {}

    /// An agent-level error ended the task.
    fn on_error(&mut self, _error: &str) {}

    /// One generated token during inference.
    fn on_stream(&mut self, _token: &str) {}
}

/// Ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}

// ── Event Stream ─────────────────────────────────────────────

/// Owned form of one observer callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum AgentEvent {
    Thought(String),
    Command(String),
    ToolResult(ToolResult),
    Progress(String),
    Finish(String),
    Error(String),
    Stream(String),
}

/// Forwards callbacks as [`AgentEvent`]s over an unbounded channel.
///
/// Sends never block the loop; events are dropped once the stream is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    event_tx: mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelObserver {
    /// Create an observer and the stream that receives its events.
    pub fn new() -> (Self, AgentStream) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self { event_tx }, AgentStream { event_rx })
    }

    fn send(&self, event: AgentEvent) {
        // receiver dropped: nobody is listening
        let _ = self.event_tx.send(event);
    }
}

impl AgentObserver for ChannelObserver {
    fn on_thought(&mut self, thought: &str) {
        self.send(AgentEvent::Thought(thought.to_owned()));
    }

    fn on_command(&mut self, command: &str) {
        self.send(AgentEvent::Command(command.to_owned()));
    }

    fn on_tool_result(&mut self, result: &ToolResult) {
        self.send(AgentEvent::ToolResult(result.clone()));
    }

    fn on_progress(&mut self, message: &str) {
        self.send(AgentEvent::Progress(message.to_owned()));
    }

    fn on_finish(&mut self, summary: &str) {
        self.send(AgentEvent::Finish(summary.to_owned()));
    }

    fn on_error(&mut self, error: &str) {
        self.send(AgentEvent::Error(error.to_owned()));
    }

    fn on_stream(&mut self, token: &str) {
        self.send(AgentEvent::Stream(token.to_owned()));
    }
}

/// Receiving end of a [`ChannelObserver`].
#[derive(Debug)]
pub struct AgentStream {
    event_rx: mpsc::UnboundedReceiver<AgentEvent>,
}

impl AgentStream {
    /// Get the next event.
    ///
    /// Returns `None` once every sender, including the one owned by the
    /// agent, has been dropped.
    pub async fn next(&mut self) -> Option<AgentEvent> {
        self.event_rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_next(&mut self) -> Option<AgentEvent> {
        self.event_rx.try_recv().ok()
    }
}
