use serde::Serialize;
use tokio::sync::mpsc;

use crate::processing::{DebugPayload, ProblemInfo, SolutionPayload};

/// Lifecycle events pushed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ProcessingEvent {
    InitialStart,
    NoScreenshots,
    ProblemExtracted(ProblemInfo),
    SolutionSuccess(SolutionPayload),
    InitialSolutionError(String),
    ApiKeyInvalid,
    DebugStart,
    DebugSuccess(DebugPayload),
    DebugError(String),
}

impl ProcessingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingEvent::InitialStart => "initial-start",
            ProcessingEvent::NoScreenshots => "no-screenshots",
            ProcessingEvent::ProblemExtracted(_) => "problem-extracted",
            ProcessingEvent::SolutionSuccess(_) => "solution-success",
            ProcessingEvent::InitialSolutionError(_) => "initial-solution-error",
            ProcessingEvent::ApiKeyInvalid => "api-key-invalid",
            ProcessingEvent::DebugStart => "debug-start",
            ProcessingEvent::DebugSuccess(_) => "debug-success",
            ProcessingEvent::DebugError(_) => "debug-error",
        }
    }
}

/// Fire-and-forget status surface. Implementations must not block and must
/// quietly drop updates once the UI is gone.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str, percent: u8);

    fn emit(&self, event: ProcessingEvent);
}

/// Writes every update to the log. Useful headless and as a default.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl StatusSink for LogSink {
    fn notify(&self, message: &str, percent: u8) {
        log::info!("[{:>3}%] {}", percent, message);
    }

    fn emit(&self, event: ProcessingEvent) {
        match &event {
            ProcessingEvent::InitialSolutionError(msg) | ProcessingEvent::DebugError(msg) => {
                log::error!("{}: {}", event.name(), msg)
            }
            _ => log::info!("event: {}", event.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Progress { message: String, percent: u8 },
    Event(ProcessingEvent),
}

/// Forwards updates over an unbounded channel to whatever drives the UI.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn notify(&self, message: &str, percent: u8) {
        let _ = self.tx.send(StatusUpdate::Progress {
            message: message.to_string(),
            percent: percent.min(100),
        });
    }

    fn emit(&self, event: ProcessingEvent) {
        let _ = self.tx.send(StatusUpdate::Event(event));
    }
}
