//! Events delivered to the TUI from background tasks

use crate::errors::ApiError;
use crate::models::ClassroomReceipt;

/// Results that arrive on the app channel while the UI keeps running.
///
/// `generation` names the form that started the task. Every "register
/// another class" bumps it, so results of an abandoned form are dropped.
#[derive(Debug)]
pub enum AppEvent {
    /// A spawned school search finished. `seq` identifies the keystroke it belongs to.
    SearchFinished {
        generation: u64,
        seq: u64,
        result: Result<Vec<String>, ApiError>,
    },
    /// A spawned class registration finished
    SubmitFinished {
        generation: u64,
        result: Result<ClassroomReceipt, ApiError>,
    },
}

impl AppEvent {
    pub fn generation(&self) -> u64 {
        match self {
            AppEvent::SearchFinished { generation, .. } | AppEvent::SubmitFinished { generation, .. } => {
                *generation
            }
        }
    }
}
