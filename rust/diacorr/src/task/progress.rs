use std::sync::atomic::{
    AtomicU8,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
};

use serde::Serialize;

use diaquery::{
    AtomicFraction,
    CancellationToken,
};

/// Processing stage of a running task, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPhase {
    Setup = 0,
    WindowMerge = 1,
    ChromatogramBuild = 2,
    RowCorrelation = 3,
    Finalize = 4,
}

impl TaskPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskPhase::Setup,
            1 => TaskPhase::WindowMerge,
            2 => TaskPhase::ChromatogramBuild,
            3 => TaskPhase::RowCorrelation,
            _ => TaskPhase::Finalize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Waiting = 0,
    Processing = 1,
    Finished = 2,
    Error = 3,
    Canceled = 4,
}

impl TaskStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Waiting,
            1 => TaskStatus::Processing,
            2 => TaskStatus::Finished,
            3 => TaskStatus::Error,
            _ => TaskStatus::Canceled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Error | TaskStatus::Canceled
        )
    }
}

/// Shared view on a running task.
///
/// The task is the only writer. Clones observe the same state, so a handle
/// can be given to a reporting thread before the task starts. Cancellation
/// requested through [`TaskProgress::cancel`] reaches the task and every
/// chromatogram building invocation it is running.
#[derive(Debug, Clone)]
pub struct TaskProgress {
    phase: Arc<AtomicU8>,
    status: Arc<AtomicU8>,
    pub(crate) chromatograms: AtomicFraction,
    pub(crate) rows: AtomicFraction,
    description: Arc<Mutex<String>>,
    cancel: CancellationToken,
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskProgress {
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(TaskPhase::Setup as u8)),
            status: Arc::new(AtomicU8::new(TaskStatus::Waiting as u8)),
            chromatograms: AtomicFraction::new(),
            rows: AtomicFraction::new(),
            description: Arc::new(Mutex::new(String::new())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn phase(&self) -> TaskPhase {
        TaskPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Overall progress: chromatogram building and row correlation weigh half each.
    pub fn finished_fraction(&self) -> f64 {
        0.5 * self.chromatograms.get() + 0.5 * self.rows.get()
    }

    pub fn description(&self) -> String {
        self.description
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            phase: self.phase(),
            status: self.status(),
            finished_fraction: self.finished_fraction(),
            description: self.description(),
        }
    }

    /// Back to the start of a run. The cancellation flag is kept.
    pub(crate) fn restart(&self) {
        self.set_phase(TaskPhase::Setup);
        self.set_status(TaskStatus::Waiting);
        self.chromatograms.reset();
        self.rows.reset();
        self.set_description("");
    }

    pub(crate) fn set_phase(&self, phase: TaskPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    pub(crate) fn set_description(&self, description: impl Into<String>) {
        if let Ok(mut current) = self.description.lock() {
            *current = description.into();
        }
    }
}

/// Point-in-time copy of a [`TaskProgress`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: TaskPhase,
    pub status: TaskStatus,
    pub finished_fraction: f64,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_weights_both_phases() {
        let progress = TaskProgress::new();
        assert_eq!(progress.finished_fraction(), 0.0);
        progress.chromatograms.raise_to(1.0);
        assert_eq!(progress.finished_fraction(), 0.5);
        progress.rows.set_ratio(1, 4);
        assert_eq!(progress.finished_fraction(), 0.625);
    }

    #[test]
    fn test_clones_share_state() {
        let progress = TaskProgress::new();
        let observer = progress.clone();
        progress.set_phase(TaskPhase::RowCorrelation);
        progress.set_status(TaskStatus::Processing);
        progress.set_description("Processing row 3/10");
        let snap = observer.snapshot();
        assert_eq!(snap.phase, TaskPhase::RowCorrelation);
        assert_eq!(snap.status, TaskStatus::Processing);
        assert_eq!(snap.description, "Processing row 3/10");

        observer.cancel();
        assert!(progress.cancellation_token().is_canceled());
    }

    #[test]
    fn test_restart_clears_progress_but_not_cancellation() {
        let progress = TaskProgress::new();
        progress.chromatograms.raise_to(1.0);
        progress.rows.raise_to(1.0);
        progress.set_phase(TaskPhase::Finalize);
        progress.set_status(TaskStatus::Finished);
        progress.cancel();

        progress.restart();
        let snap = progress.snapshot();
        assert_eq!(snap.finished_fraction, 0.0);
        assert_eq!(snap.phase, TaskPhase::Setup);
        assert_eq!(snap.status, TaskStatus::Waiting);
        assert!(snap.description.is_empty());
        assert!(progress.cancellation_token().is_canceled());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Canceled.is_terminal());
        assert!(TaskStatus::Finished.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }
}
