use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ExtractionError;

/// Cooperative stop signal checked between extraction stages and OCR pages.
///
/// Clones share the flag, so a caller can keep one handle and cancel an
/// extraction running on another thread. An optional deadline turns the
/// same checks into a wall-clock budget.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also trips once `budget` has elapsed from now.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(budget),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail with `Cancelled` if the token has tripped. `boundary` names the
    /// point being checked, e.g. "before OCR".
    pub fn check(&self, boundary: &str) -> Result<(), ExtractionError> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(ExtractionError::Cancelled(boundary.to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ExtractionError::Cancelled(format!(
                "{boundary} (time budget exceeded)"
            )));
        }
        Ok(())
    }
}
