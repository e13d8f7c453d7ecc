use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::DataProcessingError;
use crate::utils::binary_search_range_by_key;
use crate::utils::streaming_calculators::RunningStatsCalculator;

/// Extracted ion chromatogram: one ion followed across consecutive scans.
///
/// All arrays are parallel and retention times are strictly ascending.
/// `scan_indices` are the `Scan::index` values of the backing scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IonTimeSeriesArrays")]
pub struct IonTimeSeries {
    pub mzs: Vec<f64>,
    pub rts: Vec<f32>,
    pub intensities: Vec<f32>,
    pub scan_indices: Vec<u32>,
}

/// Unchecked serialized form, only turned into a series through `try_new`.
#[derive(Deserialize)]
struct IonTimeSeriesArrays {
    mzs: Vec<f64>,
    rts: Vec<f32>,
    intensities: Vec<f32>,
    scan_indices: Vec<u32>,
}

impl TryFrom<IonTimeSeriesArrays> for IonTimeSeries {
    type Error = DataProcessingError;

    fn try_from(arrays: IonTimeSeriesArrays) -> Result<Self, Self::Error> {
        Self::try_new(
            arrays.mzs,
            arrays.rts,
            arrays.intensities,
            arrays.scan_indices,
        )
    }
}

impl IonTimeSeries {
    pub fn try_new(
        mzs: Vec<f64>,
        rts: Vec<f32>,
        intensities: Vec<f32>,
        scan_indices: Vec<u32>,
    ) -> Result<Self, DataProcessingError> {
        let series = Self {
            mzs,
            rts,
            intensities,
            scan_indices,
        };
        series.validate()?;
        Ok(series)
    }

    /// Checks the invariants `try_new` enforces. Fields are public, so series
    /// assembled by hand go through this before use.
    pub fn validate(&self) -> Result<(), DataProcessingError> {
        let Self {
            mzs,
            rts,
            intensities,
            scan_indices,
        } = self;
        if rts.is_empty() {
            return Err(DataProcessingError::ExpectedNonEmptyData {
                context: "ion time series",
            });
        }
        for (other, context) in [
            (mzs.len(), "ion time series m/z values"),
            (intensities.len(), "ion time series intensities"),
            (scan_indices.len(), "ion time series scans"),
        ] {
            if other != rts.len() {
                return Err(DataProcessingError::ExpectedVectorSameLength {
                    expected: rts.len(),
                    other,
                    context,
                });
            }
        }
        for (i, w) in rts.windows(2).enumerate() {
            if !(w[0] < w[1]) {
                return Err(DataProcessingError::UnorderedRetentionTimes {
                    scan_index: scan_indices[i + 1],
                    rt: w[1],
                    previous_rt: w[0],
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rts.is_empty()
    }

    /// Highest intensity of the series.
    pub fn height(&self) -> f32 {
        self.intensities.iter().copied().fold(0.0, f32::max)
    }

    /// Position of the most intense point, earliest on ties.
    pub fn apex_position(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &x) in self.intensities.iter().enumerate() {
            if best.map_or(true, |(_, b)| x > b) {
                best = Some((i, x));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Position of the point backed by the scan with this index.
    ///
    /// Scan indices ascend with retention time, so this is a binary search.
    pub fn position_of_scan(&self, scan_index: u32) -> Option<usize> {
        self.scan_indices.binary_search(&scan_index).ok()
    }

    /// Positions whose retention time lies in `[rt_start, rt_end]`.
    pub fn rt_positions(&self, rt_start: f32, rt_end: f32) -> std::ops::Range<usize> {
        binary_search_range_by_key(&self.rts, (rt_start, rt_end), |x| *x)
    }

    /// Intensity-weighted m/z over the points in `positions`.
    ///
    /// Zero-intensity padding points do not move the center. Falls back to
    /// the plain mean when every point in the range is zero.
    pub fn center_mz(&self, positions: std::ops::Range<usize>) -> Option<f64> {
        let positions = positions.start.min(self.len())..positions.end.min(self.len());
        let mut weighted = RunningStatsCalculator::new();
        let mut unweighted = RunningStatsCalculator::new();
        for i in positions {
            weighted.add(self.intensities[i] as f64, self.mzs[i]);
            unweighted.add(1.0, self.mzs[i]);
        }
        weighted.mean().or_else(|_| unweighted.mean()).ok()
    }

    /// Highest intensity among `positions`.
    pub fn max_intensity(&self, positions: std::ops::Range<usize>) -> Option<f32> {
        self.intensities
            .get(positions)?
            .iter()
            .copied()
            .reduce(f32::max)
    }

    /// Lowest and highest non-padding m/z of the series.
    pub fn mz_span(&self) -> Option<(f64, f64)> {
        let mut calc = RunningStatsCalculator::new();
        for (&mz, &intensity) in self.mzs.iter().zip(self.intensities.iter()) {
            if intensity > 0.0 {
                calc.add(intensity as f64, mz);
            }
        }
        Some((calc.min().ok()?, calc.max().ok()?))
    }
}
