pub mod ai;
pub mod capture;
pub mod config;
pub mod error;
pub mod events;
pub mod processing;
pub mod session;

pub use ai::router::{ModelRouter, ProviderAdapter, StageModels};
pub use ai::{AiRequest, ImageData, ProviderClient, Stage};
pub use capture::ScreenshotStore;
pub use config::{AppConfig, ApiProvider, ConfigState};
pub use error::{ErrorKind, ProviderError};
pub use events::{ChannelSink, LogSink, ProcessingEvent, StatusSink, StatusUpdate};
pub use processing::orchestrator::RequestOrchestrator;
pub use processing::{DebugPayload, FlowOutcome, FlowStage, ProblemInfo, SolutionPayload};
pub use session::manager::SessionManager;
pub use session::{View, ViewController};

/// Installs the env_logger backend, `info` unless `RUST_LOG` says otherwise.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
