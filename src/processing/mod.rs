pub mod orchestrator;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ProviderError;

/// The coding problem as read off the screenshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInfo {
    pub problem_statement: String,
    #[serde(default)]
    pub constraints: String,
    #[serde(default)]
    pub example_input: String,
    #[serde(default)]
    pub example_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionPayload {
    pub code: String,
    pub thoughts: Vec<String>,
    pub time_complexity: String,
    pub space_complexity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugPayload {
    pub code: String,
    pub debug_analysis: String,
    pub thoughts: Vec<String>,
    pub time_complexity: String,
    pub space_complexity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    #[default]
    Idle,
    Extracting,
    Solving,
    DebugPreparing,
    Debugging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Main,
    Debug,
}

/// How a flow ended. Events carry the same information to the UI.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    /// Nothing to process; no provider was contacted.
    NoScreenshots,
    Completed,
    Failed(ProviderError),
}

impl FlowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FlowOutcome::Completed)
    }
}

#[derive(Debug, Default)]
struct FlowState {
    id: Option<Uuid>,
    token: Option<CancellationToken>,
    stage: FlowStage,
}

/// Holds the cancellation handle and stage of at most one in-flight flow of a kind.
#[derive(Debug, Default)]
pub struct FlowSlot {
    state: Mutex<FlowState>,
}

impl FlowSlot {
    /// Installs a fresh handle, replacing (without canceling) any previous one.
    pub fn begin(&self) -> FlowGuard<'_> {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        {
            let mut state = self.state.lock();
            state.id = Some(id);
            state.token = Some(token.clone());
            state.stage = FlowStage::Idle;
        }
        FlowGuard {
            slot: self,
            id,
            token,
        }
    }

    /// Cancels the current handle, if any. Returns whether something was aborted.
    pub fn abort(&self) -> bool {
        let token = self.state.lock().token.take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().token.is_some()
    }

    pub fn stage(&self) -> FlowStage {
        self.state.lock().stage
    }
}

/// Scoped ownership of a [`FlowSlot`]. Dropping it clears the slot unless a
/// newer flow has taken the slot over in the meantime.
pub struct FlowGuard<'a> {
    slot: &'a FlowSlot,
    id: Uuid,
    token: CancellationToken,
}

impl FlowGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn set_stage(&self, stage: FlowStage) {
        let mut state = self.slot.state.lock();
        if state.id == Some(self.id) {
            state.stage = stage;
        }
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.slot.state.lock();
        if state.id == Some(self.id) {
            *state = FlowState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_clears_slot_on_drop() {
        let slot = FlowSlot::default();
        {
            let guard = slot.begin();
            guard.set_stage(FlowStage::Extracting);
            assert!(slot.is_active());
            assert_eq!(slot.stage(), FlowStage::Extracting);
        }
        assert!(!slot.is_active());
        assert_eq!(slot.stage(), FlowStage::Idle);
    }

    #[test]
    fn test_new_flow_replaces_without_canceling() {
        let slot = FlowSlot::default();
        let first = slot.begin();
        let second = slot.begin();

        assert!(!first.token().is_cancelled());
        drop(first);
        // the stale guard must not clear the newer flow
        assert!(slot.is_active());

        assert!(slot.abort());
        assert!(second.token().is_cancelled());
        assert!(!slot.is_active());
    }

    #[test]
    fn test_abort_without_flow() {
        let slot = FlowSlot::default();
        assert!(!slot.abort());
    }

    #[test]
    fn test_problem_info_optional_fields() {
        let info: ProblemInfo =
            serde_json::from_str(r#"{"problem_statement":"Two Sum"}"#).unwrap();
        assert_eq!(info.problem_statement, "Two Sum");
        assert!(info.constraints.is_empty());
        assert!(serde_json::from_str::<ProblemInfo>(r#"{"constraints":"x"}"#).is_err());
    }
}
