//! Turning a sequence of scans into extracted ion chromatograms.

pub mod consecutive;

pub use consecutive::ConsecutiveScanChromatogramBuilder;

use serde::{
    Deserialize,
    Serialize,
};

use crate::Tolerance;
use crate::errors::Result;
use crate::models::{
    IonTimeSeries,
    Scan,
};
use crate::utils::{
    AtomicFraction,
    CancellationToken,
};

/// Thresholds handed to a [`ChromatogramBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramParams {
    pub tolerance: Tolerance,
    /// Minimum number of adjacent scans at or above `min_group_intensity`.
    pub min_consecutive: usize,
    pub min_group_intensity: f64,
    /// Intensity a point needs to seed a chromatogram, and the least apex height kept.
    pub min_highest_point: f64,
}

/// Batch algorithm producing chromatograms from scans.
///
/// Implementations must poll `cancel` while running and return
/// `Err(DiaQueryError::Canceled)` when it fires. `progress` is expected
/// to reach 1.0 on success. An empty result is a valid outcome.
pub trait ChromatogramBuilder: Send + Sync {
    fn build(
        &self,
        scans: &[&Scan],
        params: &ChromatogramParams,
        cancel: &CancellationToken,
        progress: &AtomicFraction,
    ) -> Result<Vec<IonTimeSeries>>;
}
