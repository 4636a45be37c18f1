//! Pipeline controller for the main (extract then solve) and debug flows.
//!
//! Each flow owns one cancellation handle for its whole lifetime, held in a
//! [`FlowSlot`] and released by a scoped [`FlowGuard`] whatever the outcome.
//! ProblemInfo is only committed after a complete extraction parse of a flow
//! that was not canceled.

use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{
    DebugPayload, FlowGuard, FlowKind, FlowOutcome, FlowSlot, FlowStage, ProblemInfo,
    SolutionPayload,
};
use crate::ai::parser;
use crate::ai::prompts;
use crate::ai::router::ModelRouter;
use crate::ai::ImageData;
use crate::capture::screen::{existing_paths, load_screenshots};
use crate::capture::{Screenshot, ScreenshotStore};
use crate::config::{ApiProvider, ConfigState};
use crate::error::{AiResult, ProviderError};
use crate::events::{ProcessingEvent, StatusSink};
use crate::session::{View, ViewController};

const CANCELED_MESSAGE: &str = "Processing was canceled by the user.";

pub struct RequestOrchestrator {
    config: ConfigState,
    router: RwLock<Arc<ModelRouter>>,
    store: Arc<dyn ScreenshotStore>,
    view: Arc<dyn ViewController>,
    sink: Arc<dyn StatusSink>,
    main_flow: FlowSlot,
    debug_flow: FlowSlot,
    latest_solution: Mutex<Option<SolutionPayload>>,
    latest_debug: Mutex<Option<DebugPayload>>,
}

impl RequestOrchestrator {
    pub fn new(
        config: ConfigState,
        store: Arc<dyn ScreenshotStore>,
        view: Arc<dyn ViewController>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        let router = ModelRouter::from_config(&config.lock(), sink.clone());
        Self::with_router(config, router, store, view, sink)
    }

    pub fn with_router(
        config: ConfigState,
        router: ModelRouter,
        store: Arc<dyn ScreenshotStore>,
        view: Arc<dyn ViewController>,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            config,
            router: RwLock::new(Arc::new(router)),
            store,
            view,
            sink,
            main_flow: FlowSlot::default(),
            debug_flow: FlowSlot::default(),
            latest_solution: Mutex::new(None),
            latest_debug: Mutex::new(None),
        }
    }

    /// Rebuilds the provider adapter from the current config. Call after the
    /// settings change; flows already running keep the router they started with.
    pub fn reinitialize(&self) {
        let router = ModelRouter::from_config(&self.config.lock(), self.sink.clone());
        log::info!(
            "Provider re-initialized: {}",
            router.provider().display_name()
        );
        *self.router.write() = Arc::new(router);
    }

    /// Replaces the router outright, e.g. with one wrapping a custom client.
    pub fn set_router(&self, router: ModelRouter) {
        *self.router.write() = Arc::new(router);
    }

    fn router(&self) -> Arc<ModelRouter> {
        self.router.read().clone()
    }

    pub fn provider(&self) -> ApiProvider {
        self.router().provider()
    }

    pub fn language(&self) -> String {
        self.config.lock().language().to_string()
    }

    pub fn active_stage(&self) -> FlowStage {
        match self.main_flow.stage() {
            FlowStage::Idle => self.debug_flow.stage(),
            stage => stage,
        }
    }

    pub fn is_running(&self, kind: FlowKind) -> bool {
        match kind {
            FlowKind::Main => self.main_flow.is_active(),
            FlowKind::Debug => self.debug_flow.is_active(),
        }
    }

    pub fn latest_solution(&self) -> Option<SolutionPayload> {
        self.latest_solution.lock().clone()
    }

    pub fn latest_debug(&self) -> Option<DebugPayload> {
        self.latest_debug.lock().clone()
    }

    /// Runs the main flow from the queue view, the debug flow otherwise.
    pub async fn process_screenshots(&self) -> FlowOutcome {
        match self.view.view() {
            View::Queue => self.run_main_flow().await,
            View::Solutions => self.run_debug_flow().await,
        }
    }

    pub async fn run_main_flow(&self) -> FlowOutcome {
        let paths = existing_paths(self.store.list_primary_queue()).await;
        if paths.is_empty() {
            log::info!("No screenshots in the main queue");
            self.sink.emit(ProcessingEvent::NoScreenshots);
            return FlowOutcome::NoScreenshots;
        }

        self.sink.emit(ProcessingEvent::InitialStart);
        let guard = self.main_flow.begin();

        match self.extract_and_solve(&guard, paths).await {
            Ok(solution) => {
                *self.latest_solution.lock() = Some(solution.clone());
                self.store.clear_secondary_queue();
                self.sink.notify("Solution generated successfully", 100);
                self.sink.emit(ProcessingEvent::SolutionSuccess(solution));
                self.view.set_view(View::Solutions);
                FlowOutcome::Completed
            }
            Err(err) => {
                log::error!("Main flow failed: {}", err);
                self.view.set_view(View::Queue);
                if err.is_canceled() {
                    self.sink.emit(ProcessingEvent::InitialSolutionError(
                        CANCELED_MESSAGE.to_string(),
                    ));
                } else if err.looks_like_credential_problem() {
                    self.sink.emit(ProcessingEvent::ApiKeyInvalid);
                } else {
                    self.sink
                        .emit(ProcessingEvent::InitialSolutionError(err.message.clone()));
                }
                FlowOutcome::Failed(err)
            }
        }
    }

    async fn extract_and_solve(
        &self,
        guard: &FlowGuard<'_>,
        paths: Vec<PathBuf>,
    ) -> AiResult<SolutionPayload> {
        let token = guard.token();
        let router = self.router();
        let language = self.language();

        guard.set_stage(FlowStage::Extracting);
        let screenshots = load_screenshots(paths, None).await?;
        ensure_live(token)?;

        let request = prompts::extraction_request(&language, images_of(screenshots));
        let raw = router.dispatch(&request, token).await?;
        let problem = parser::parse_problem_info(&raw)?;
        ensure_live(token)?;

        self.view.set_problem_info(Some(problem.clone()));
        self.sink
            .emit(ProcessingEvent::ProblemExtracted(problem.clone()));
        self.sink.notify(
            "Problem analyzed successfully. Preparing to generate solution...",
            40,
        );

        guard.set_stage(FlowStage::Solving);
        self.generate_solution(&router, &problem, &language, token)
            .await
    }

    async fn generate_solution(
        &self,
        router: &ModelRouter,
        problem: &ProblemInfo,
        language: &str,
        token: &CancellationToken,
    ) -> AiResult<SolutionPayload> {
        let request = prompts::solution_request(problem, language);
        let raw = router.dispatch(&request, token).await?;
        ensure_live(token)?;
        Ok(parser::parse_solution(&raw))
    }

    pub async fn run_debug_flow(&self) -> FlowOutcome {
        let extra = existing_paths(self.store.list_secondary_queue()).await;
        if extra.is_empty() {
            log::info!("No screenshots in the debug queue");
            self.sink.emit(ProcessingEvent::NoScreenshots);
            return FlowOutcome::NoScreenshots;
        }

        let Some(problem) = self.view.problem_info() else {
            let err = ProviderError::generic("No problem info available");
            self.sink
                .emit(ProcessingEvent::DebugError(err.message.clone()));
            return FlowOutcome::Failed(err);
        };

        self.sink.emit(ProcessingEvent::DebugStart);
        let guard = self.debug_flow.begin();

        match self.debug(&guard, &problem, extra).await {
            Ok(payload) => {
                *self.latest_debug.lock() = Some(payload.clone());
                self.view.set_has_debugged(true);
                self.sink.notify("Debug analysis complete", 100);
                self.sink.emit(ProcessingEvent::DebugSuccess(payload));
                FlowOutcome::Completed
            }
            Err(err) => {
                log::error!("Debug flow failed: {}", err);
                if err.is_canceled() {
                    self.sink
                        .emit(ProcessingEvent::DebugError(CANCELED_MESSAGE.to_string()));
                } else if err.looks_like_credential_problem() {
                    self.sink.emit(ProcessingEvent::ApiKeyInvalid);
                } else {
                    self.sink
                        .emit(ProcessingEvent::DebugError(err.message.clone()));
                }
                FlowOutcome::Failed(err)
            }
        }
    }

    async fn debug(
        &self,
        guard: &FlowGuard<'_>,
        problem: &ProblemInfo,
        extra: Vec<PathBuf>,
    ) -> AiResult<DebugPayload> {
        let token = guard.token();
        let router = self.router();
        let language = self.language();

        guard.set_stage(FlowStage::DebugPreparing);
        self.sink.notify("Processing debug screenshots...", 30);

        let mut paths = existing_paths(self.store.list_primary_queue()).await;
        paths.extend(extra);
        let screenshots = load_screenshots(paths, Some(self.store.as_ref())).await?;
        ensure_live(token)?;

        guard.set_stage(FlowStage::Debugging);
        let request = prompts::debug_request(problem, &language, images_of(screenshots));
        let raw = router.dispatch(&request, token).await?;
        ensure_live(token)?;
        Ok(parser::parse_debug(&raw))
    }

    /// Aborts whichever flows are running and forgets the current problem.
    pub fn cancel_ongoing_requests(&self) {
        let main_aborted = self.main_flow.abort();
        let debug_aborted = self.debug_flow.abort();

        self.view.set_has_debugged(false);
        self.view.set_problem_info(None);

        if main_aborted || debug_aborted {
            log::info!(
                "Canceled in-flight requests (main: {}, debug: {})",
                main_aborted,
                debug_aborted
            );
            self.sink.emit(ProcessingEvent::NoScreenshots);
        }
    }
}

fn ensure_live(token: &CancellationToken) -> AiResult<()> {
    if token.is_cancelled() {
        Err(ProviderError::canceled())
    } else {
        Ok(())
    }
}

fn images_of(screenshots: Vec<Screenshot>) -> Vec<ImageData> {
    screenshots.into_iter().map(|s| s.image).collect()
}
