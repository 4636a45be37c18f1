pub mod manager;

use serde::{Deserialize, Serialize};

use crate::processing::ProblemInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Queue,
    Solutions,
}

/// The UI-facing session state the orchestrator reads and writes.
pub trait ViewController: Send + Sync {
    fn set_view(&self, view: View);

    fn view(&self) -> View;

    fn set_problem_info(&self, info: Option<ProblemInfo>);

    fn problem_info(&self) -> Option<ProblemInfo>;

    fn set_has_debugged(&self, value: bool);

    fn has_debugged(&self) -> bool;
}
