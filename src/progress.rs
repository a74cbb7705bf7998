//! Progress reporting and cooperative cancellation.
//!
//! Long jobs report a [`Progress`] value after every page or chunk and check a
//! [`CancellationToken`] at the same points. Nothing is interrupted mid-page.

use crate::error::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Job stage reported with progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Pattern pass over page text and form fields
    Patterns,
    /// Classifier pass over text chunks
    Classifier,
    /// Positioning matches on the page
    Locate,
    /// Removing confirmed entities
    Redact,
}

/// A progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Current stage
    pub stage: Stage,
    /// Units finished in this stage
    pub completed: usize,
    /// Units in this stage
    pub total: usize,
}

impl Progress {
    /// Create a report.
    pub fn new(stage: Stage, completed: usize, total: usize) -> Self {
        Self {
            stage,
            completed,
            total,
        }
    }

    /// Completed share in [0, 1]. An empty stage counts as done.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed as f32 / self.total as f32).min(1.0)
        }
    }
}

/// Progress callback as accepted by the pipeline and the coordinator.
pub type ProgressFn<'a> = &'a dyn Fn(&Progress);

pub(crate) fn report(progress: Option<ProgressFn<'_>>, stage: Stage, completed: usize, total: usize) {
    if let Some(callback) = progress {
        callback(&Progress::new(stage, completed, total));
    }
}

/// Shared cancellation flag.
///
/// Clones share the flag: cancel from any clone, and every job holding one stops
/// at its next check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub(crate) fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    cancel.map_or(Ok(()), CancellationToken::check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_missing_token_never_cancels() {
        assert!(check_cancelled(None).is_ok());
    }

    #[test]
    fn test_fraction() {
        assert_eq!(Progress::new(Stage::Redact, 1, 4).fraction(), 0.25);
        assert_eq!(Progress::new(Stage::Redact, 0, 0).fraction(), 1.0);
    }

    #[test]
    fn test_report_calls_callback() {
        let seen = RefCell::new(Vec::new());
        let callback = |p: &Progress| seen.borrow_mut().push(*p);
        report(Some(&callback), Stage::Patterns, 1, 2);
        report(None, Stage::Patterns, 2, 2);
        assert_eq!(seen.into_inner(), vec![Progress::new(Stage::Patterns, 1, 2)]);
    }
}
