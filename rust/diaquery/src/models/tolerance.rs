use serde::{
    Deserialize,
    Serialize,
};

use crate::utils::{
    OptionallyRestricted,
    TupleRange,
};
use OptionallyRestricted::{
    Restricted,
    Unrestricted,
};

/// Tolerance settings for matching peaks across scans.
///
/// Example:
/// ```
/// use diaquery::Tolerance;
///
/// let tolerance = Tolerance::default();
/// assert!(tolerance.within_mz(500.0, 500.004));
/// ```
///
/// Convention:
/// Ranges are expressed in terms of positive values. A tolerance of (1,1) on a value
/// of 10 means a range of (9,11).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tolerance {
    pub ms: MzTolerance,
    #[serde(default)]
    pub mobility: MobilityTolerance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MzTolerance {
    #[serde(rename = "da")]
    Absolute((f64, f64)),
    #[serde(rename = "ppm")]
    Ppm((f64, f64)),
    /// Symmetric window, the wider of an absolute and a relative tolerance.
    #[serde(rename = "da_or_ppm")]
    AbsoluteOrPpm { da: f64, ppm: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub enum MobilityTolerance {
    #[serde(rename = "absolute")]
    Absolute((f32, f32)),
    #[serde(rename = "percent")]
    Pct((f32, f32)),
    #[default]
    Unrestricted,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            ms: MzTolerance::AbsoluteOrPpm {
                da: 0.005,
                ppm: 15.0,
            },
            mobility: MobilityTolerance::Unrestricted,
        }
    }
}

impl Tolerance {
    /// m/z tolerance range around `mz`.
    ///
    /// ```
    /// use diaquery::Tolerance;
    /// use diaquery::models::tolerance::MzTolerance;
    ///
    /// let tol = Tolerance {
    ///     ms: MzTolerance::Ppm((20.0, 20.0)),
    ///     ..Tolerance::default()
    /// };
    /// let range = tol.mz_range(500.0);
    ///
    /// // For 500 Da at 20 ppm: ±0.01 Da
    /// assert!((range.start() - 499.99).abs() < 0.001);
    /// assert!((range.end() - 500.01).abs() < 0.001);
    /// ```
    pub fn mz_range(&self, mz: f64) -> TupleRange<f64> {
        let (low, high) = match self.ms {
            MzTolerance::Absolute((low, high)) => (low.abs(), high.abs()),
            MzTolerance::Ppm((low, high)) => ((mz * low / 1e6).abs(), (mz * high / 1e6).abs()),
            MzTolerance::AbsoluteOrPpm { da, ppm } => {
                let width = da.abs().max((mz * ppm / 1e6).abs());
                (width, width)
            }
        };
        TupleRange::spanning(mz - low, mz + high)
    }

    pub fn within_mz(&self, reference: f64, other: f64) -> bool {
        self.mz_range(reference).contains(other)
    }

    /// Ion mobility tolerance range around `mobility`.
    ///
    /// - `Restricted(range)` - Mobility tolerance window
    /// - `Unrestricted` - No mobility filtering
    pub fn mobility_range(&self, mobility: f32) -> OptionallyRestricted<TupleRange<f32>> {
        match self.mobility {
            MobilityTolerance::Absolute((low, high)) => {
                Restricted(TupleRange::spanning(mobility - low.abs(), mobility + high.abs()))
            }
            MobilityTolerance::Pct((low, high)) => {
                let low = (mobility * (low / 100.0)).abs();
                let high = (mobility * (high / 100.0)).abs();
                Restricted(TupleRange::spanning(mobility - low, mobility + high))
            }
            MobilityTolerance::Unrestricted => Unrestricted,
        }
    }

    pub fn with_mz_tolerance(self, ms: MzTolerance) -> Self {
        Self { ms, ..self }
    }

    /// Create a new `Tolerance` with modified mobility tolerance (builder pattern).
    ///
    /// # Example
    ///
    /// ```
    /// use diaquery::Tolerance;
    /// use diaquery::models::tolerance::MobilityTolerance;
    /// use diaquery::OptionallyRestricted;
    ///
    /// let tol = Tolerance::default()
    ///     .with_mobility_tolerance(MobilityTolerance::Absolute((0.05, 0.05)));
    ///
    /// match tol.mobility_range(1.0) {
    ///     OptionallyRestricted::Restricted(range) => {
    ///         assert_eq!(range.start(), 0.95);
    ///         assert_eq!(range.end(), 1.05);
    ///     }
    ///     OptionallyRestricted::Unrestricted => panic!("Expected restricted range"),
    /// }
    /// ```
    pub fn with_mobility_tolerance(self, tol: MobilityTolerance) -> Self {
        Self {
            mobility: tol,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_or_ppm_takes_the_wider_window() {
        let tol = Tolerance::default().with_mz_tolerance(MzTolerance::AbsoluteOrPpm {
            da: 0.005,
            ppm: 15.0,
        });
        // 15 ppm of 100 is 0.0015, so the absolute part wins
        let low_mass = tol.mz_range(100.0);
        assert!((low_mass.end() - 100.005).abs() < 1e-9);
        // 15 ppm of 1000 is 0.015
        let high_mass = tol.mz_range(1000.0);
        assert!((high_mass.end() - 1000.015).abs() < 1e-9);
        assert!((high_mass.start() - 999.985).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_tolerance_is_asymmetric() {
        let tol = Tolerance::default().with_mz_tolerance(MzTolerance::Absolute((0.1, 0.2)));
        let range = tol.mz_range(50.0);
        assert!((range.start() - 49.9).abs() < 1e-9);
        assert!((range.end() - 50.2).abs() < 1e-9);
        assert!(tol.within_mz(50.0, 50.15));
        assert!(!tol.within_mz(50.0, 49.85));
    }

    #[test]
    fn test_tolerance_serde_names() {
        let tol = Tolerance {
            ms: MzTolerance::Ppm((10.0, 10.0)),
            mobility: MobilityTolerance::Pct((3.0, 3.0)),
        };
        let json = serde_json::to_string(&tol).unwrap();
        assert!(json.contains("\"ppm\""), "{json}");
        assert!(json.contains("\"percent\""), "{json}");
        let back: Tolerance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tol);
    }
}
