//! Cooperative cancellation and progress primitives shared between a running
//! task and whoever observes it.

use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    AtomicU64,
    Ordering,
};

use crate::errors::{
    DiaQueryError,
    Result,
};

/// Shared cancellation flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    /// Returns `Err(DiaQueryError::Canceled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_canceled() {
            Err(DiaQueryError::Canceled)
        } else {
            Ok(())
        }
    }
}

/// A fraction in `[0, 1]` stored as `f64` bits so it can be shared across threads.
///
/// Writes never move the value backwards, so readers always observe a
/// non-decreasing progress.
#[derive(Debug, Clone, Default)]
pub struct AtomicFraction {
    bits: Arc<AtomicU64>,
}

impl AtomicFraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Raises the stored value to `value` (clamped to `[0, 1]`), ignoring decreases.
    pub fn raise_to(&self, value: f64) {
        if value.is_nan() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::Relaxed, |current| {
                if f64::from_bits(current) < value {
                    Some(value.to_bits())
                } else {
                    None
                }
            });
    }

    /// Starts over from zero, for reuse across runs.
    pub fn reset(&self) {
        self.bits.store(0.0f64.to_bits(), Ordering::SeqCst);
    }

    /// Progress of `done` out of `total` steps. An empty workload counts as done.
    pub fn set_ratio(&self, done: usize, total: usize) {
        if total == 0 {
            self.raise_to(1.0);
        } else {
            self.raise_to(done as f64 / total as f64);
        }
    }
}
