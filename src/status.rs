//! Status reporting for the transcription pipeline
//!
//! Every pipeline stage reports progress through a [`StatusSink`] rather
//! than mutating shared UI state. The daemon wires a channel-backed sink
//! so any frontend (or the log) can observe the stream of updates.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Severity/phase of a status update, mirrored into the UI styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Loading,
    Success,
    Error,
}

/// A single status update from the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            message: message.into(),
        }
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Loading,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            message: message.into(),
        }
    }
}

/// Observer interface for status updates.
///
/// Implementations must be cheap and non-blocking; the pipeline calls
/// `emit` from async context between stages.
pub trait StatusSink: Send + Sync + 'static {
    fn emit(&self, status: Status);
}

/// Sink that forwards updates over an mpsc channel to whoever renders
/// them. Send failures mean the receiver is gone; they are logged and
/// dropped rather than propagated into the pipeline.
pub struct ChannelStatusSink {
    tx: mpsc::UnboundedSender<Status>,
}

impl ChannelStatusSink {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Status>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn emit(&self, status: Status) {
        if status.level != StatusLevel::Loading {
            log::info!("Status [{:?}]: {}", status.level, status.message);
        }
        if self.tx.send(status).is_err() {
            log::debug!("Status receiver dropped; update discarded");
        }
    }
}

/// Sink that only logs. Used by the daemon when no frontend is attached,
/// and by tests that don't assert on statuses.
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn emit(&self, status: Status) {
        match status.level {
            StatusLevel::Error => log::error!("Status: {}", status.message),
            StatusLevel::Loading => log::debug!("Status: {}", status.message),
            _ => log::info!("Status: {}", status.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_updates_in_order() {
        let (sink, mut rx) = ChannelStatusSink::new();
        sink.emit(Status::loading("Preparing audio file..."));
        sink.emit(Status::success("Transcription complete!"));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, StatusLevel::Loading);
        let second = rx.try_recv().unwrap();
        assert_eq!(second.level, StatusLevel::Success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelStatusSink::new();
        drop(rx);
        // Must not panic.
        sink.emit(Status::error("Error: no receiver"));
    }

    #[test]
    fn status_serializes_with_lowercase_level() {
        let json = serde_json::to_string(&Status::info("hi")).unwrap();
        assert!(json.contains("\"info\""));
    }
}
