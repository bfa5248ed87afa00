//! Progress event streaming
//!
//! Units of work push [`ResolutionEvent`]s into an unbounded channel; the HTTP
//! layer drains it as NDJSON, one event per line, with no buffering between
//! emission and the write. The channel closes when every sender is dropped,
//! which ends the response body.

use crate::types::{EventLevel, LogEntry, ResolutionEvent};
use futures::Stream;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Content type of the progress stream
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Cloneable handle for publishing progress events
///
/// Emitting after the consumer went away is a no-op.
#[derive(Clone, Debug)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<ResolutionEvent>,
}

impl EventEmitter {
    /// Create an emitter and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResolutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// An emitter nobody listens to
    pub fn detached() -> Self {
        Self::channel().0
    }

    /// Publish one event
    pub fn emit(&self, event: ResolutionEvent) {
        // The receiver is gone once the client disconnects; resolution continues regardless
        if self.tx.send(event).is_err() {
            tracing::trace!("progress consumer disconnected, dropping event");
        }
    }

    /// Whether the consumer is still attached
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Per-link event publisher that also keeps the link's log history
#[derive(Debug)]
pub struct LinkReporter {
    id: i64,
    emitter: EventEmitter,
    logs: Vec<LogEntry>,
}

impl LinkReporter {
    /// Reporter for link `id` publishing through `emitter`
    pub fn new(id: i64, emitter: EventEmitter) -> Self {
        Self {
            id,
            emitter,
            logs: Vec::new(),
        }
    }

    /// The link id every event is tagged with
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Emit a progress log line
    pub fn log(&mut self, message: impl Into<String>, level: EventLevel) {
        let message = message.into();
        self.record(&message, level);
        self.emitter
            .emit(ResolutionEvent::log(self.id, message, level));
    }

    /// Emit the terminal success event
    pub fn done(&mut self, message: impl Into<String>, final_link: &str) {
        let message = message.into();
        self.record(&message, EventLevel::Success);
        self.emitter
            .emit(ResolutionEvent::done(self.id, message, final_link));
    }

    /// Emit the terminal failure event
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.record(&message, EventLevel::Error);
        self.emitter.emit(ResolutionEvent::error(self.id, message));
    }

    /// Emit the end-of-stream marker for this link
    pub fn finished(&self) {
        self.emitter.emit(ResolutionEvent::finished(self.id));
    }

    /// Messages emitted so far, in order
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Consume the reporter, keeping its history
    pub fn into_logs(self) -> Vec<LogEntry> {
        self.logs
    }

    fn record(&mut self, message: &str, level: EventLevel) {
        self.logs.push(LogEntry {
            message: message.to_string(),
            level,
        });
    }
}

/// Serialize one event as a newline-terminated JSON line
pub fn encode_line(event: &ResolutionEvent) -> String {
    match serde_json::to_string(event) {
        Ok(mut line) => {
            line.push('\n');
            line
        }
        Err(e) => {
            // Events are plain data; this only guards against a broken serializer
            tracing::error!(link_id = event.id, error = %e, "failed to encode event");
            String::new()
        }
    }
}

/// Turn the event receiver into an NDJSON body stream
pub fn ndjson_stream(
    rx: mpsc::UnboundedReceiver<ResolutionEvent>,
) -> impl Stream<Item = std::result::Result<String, Infallible>> + Send + 'static {
    UnboundedReceiverStream::new(rx)
        .map(|event| encode_line(&event))
        .filter(|line| !line.is_empty())
        .map(Ok)
}
