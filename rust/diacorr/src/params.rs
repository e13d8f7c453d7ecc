use serde::{
    Deserialize,
    Serialize,
};

use diaquery::models::tolerance::{
    MobilityTolerance,
    MzTolerance,
};
use diaquery::{
    ChromatogramParams,
    OptionallyRestricted,
    ScanSelection,
    Tolerance,
    TupleRange,
};

use crate::errors::{
    DiaCorrError,
    Result,
};

/// Minimum number of correlated points required on each side of the apex.
pub const MIN_EDGE_POINTS: usize = 2;

/// Half width, in percent of the feature mobility, of the fragment presence
/// window when the tolerance leaves mobility unrestricted.
pub const FALLBACK_MOBILITY_PCT: f32 = 3.0;

/// How fragments are paired with MS1 features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingAlgorithm {
    /// Shape correlation of fragment chromatograms against the MS1 feature.
    #[default]
    Correlation,
    /// Attach the closest MS2 scan without any shape filtering.
    ClosestScan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaCorrParameters {
    pub ms2_scan_selection: ScanSelection,
    pub min_ms1_intensity: f64,
    pub min_ms2_intensity: f64,
    pub min_corr_points: usize,
    pub min_pearson: f64,
    pub tolerance: Tolerance,
    /// Fraction of the feature height below which the MS1 shape is cut.
    pub correlation_floor_fraction: f64,
    pub algorithm: PairingAlgorithm,
}

impl Default for DiaCorrParameters {
    fn default() -> Self {
        Self {
            ms2_scan_selection: ScanSelection::default(),
            min_ms1_intensity: 1e3,
            min_ms2_intensity: 1e2,
            min_corr_points: 5,
            min_pearson: 0.8,
            tolerance: Tolerance {
                ms: MzTolerance::AbsoluteOrPpm {
                    da: 0.005,
                    ppm: 15.0,
                },
                mobility: MobilityTolerance::Unrestricted,
            },
            correlation_floor_fraction: 0.001,
            algorithm: PairingAlgorithm::default(),
        }
    }
}

impl DiaCorrParameters {
    pub fn validate(&self) -> Result<()> {
        if self.ms2_scan_selection.ms_level < 2 {
            return Err(DiaCorrError::configuration(format!(
                "MS2 scan selection must target MS level 2 or above, got {}",
                self.ms2_scan_selection.ms_level
            )));
        }
        if self.min_corr_points < 2 {
            return Err(DiaCorrError::configuration(format!(
                "At least 2 correlation points are required, got {}",
                self.min_corr_points
            )));
        }
        if !(-1.0..=1.0).contains(&self.min_pearson) {
            return Err(DiaCorrError::configuration(format!(
                "Minimum pearson correlation must be within [-1, 1], got {}",
                self.min_pearson
            )));
        }
        if !(self.correlation_floor_fraction > 0.0 && self.correlation_floor_fraction <= 1.0) {
            return Err(DiaCorrError::configuration(format!(
                "Correlation floor fraction must be within (0, 1], got {}",
                self.correlation_floor_fraction
            )));
        }
        for (name, value) in [
            ("min_ms1_intensity", self.min_ms1_intensity),
            ("min_ms2_intensity", self.min_ms2_intensity),
        ] {
            if !(value >= 0.0) {
                return Err(DiaCorrError::configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Thresholds for building fragment chromatograms of one isolation window.
    pub fn chromatogram_params(&self) -> ChromatogramParams {
        ChromatogramParams {
            tolerance: self.tolerance.clone(),
            min_consecutive: self.min_corr_points,
            min_group_intensity: self.min_ms2_intensity / 5.0,
            min_highest_point: self.min_ms2_intensity,
        }
    }

    /// Points below this are excluded from shape correlation.
    pub fn shape_noise_floor(&self) -> f64 {
        self.min_ms2_intensity / 3.0
    }

    /// Mobility window around a feature used for the fragment presence check.
    ///
    /// Always bounded: an unrestricted mobility tolerance falls back to
    /// [`FALLBACK_MOBILITY_PCT`] around `mobility`.
    pub fn feature_mobility_range(&self, mobility: f32) -> TupleRange<f32> {
        match self.tolerance.mobility_range(mobility) {
            OptionallyRestricted::Restricted(range) => range,
            OptionallyRestricted::Unrestricted => {
                let half_width = (mobility * FALLBACK_MOBILITY_PCT / 100.0).abs();
                TupleRange::spanning(mobility - half_width, mobility + half_width)
            }
        }
    }

    pub fn ms1_shape_floor(&self, feature_height: f64) -> f64 {
        feature_height * self.correlation_floor_fraction
    }

    pub fn pseudo_spectrum_description(&self) -> String {
        match self.algorithm {
            PairingAlgorithm::Correlation => format!("Pseudo MS2 (R >= {:.2})", self.min_pearson),
            PairingAlgorithm::ClosestScan => "Closest MS2 scan".to_string(),
        }
    }
}
