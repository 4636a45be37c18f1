use parking_lot::Mutex;
use serde::Serialize;

use super::{View, ViewController};
use crate::processing::ProblemInfo;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Session {
    pub view: View,
    pub problem_info: Option<ProblemInfo>,
    pub has_debugged: bool,
}

/// In-memory [`ViewController`] for headless use and for embedders that keep
/// their own UI state elsewhere.
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Mutex<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Session {
        self.current.lock().clone()
    }

    /// Back to an empty queue view, as when a new capture cycle starts.
    pub fn reset(&self) {
        *self.current.lock() = Session::default();
    }
}

impl ViewController for SessionManager {
    fn set_view(&self, view: View) {
        self.current.lock().view = view;
    }

    fn view(&self) -> View {
        self.current.lock().view
    }

    fn set_problem_info(&self, info: Option<ProblemInfo>) {
        self.current.lock().problem_info = info;
    }

    fn problem_info(&self) -> Option<ProblemInfo> {
        self.current.lock().problem_info.clone()
    }

    fn set_has_debugged(&self, value: bool) {
        self.current.lock().has_debugged = value;
    }

    fn has_debugged(&self) -> bool {
        self.current.lock().has_debugged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_queue_view() {
        let mgr = SessionManager::new();
        assert_eq!(mgr.view(), View::Queue);
        assert!(mgr.problem_info().is_none());
        assert!(!mgr.has_debugged());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mgr = SessionManager::new();
        mgr.set_view(View::Solutions);
        mgr.set_has_debugged(true);
        mgr.set_problem_info(Some(ProblemInfo {
            problem_statement: "p".to_string(),
            constraints: String::new(),
            example_input: String::new(),
            example_output: String::new(),
        }));

        mgr.reset();
        let session = mgr.snapshot();
        assert_eq!(session.view, View::Queue);
        assert!(session.problem_info.is_none());
        assert!(!session.has_debugged);
    }
}
