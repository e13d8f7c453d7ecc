//! Counters describing why rows and windows did not contribute fragments.

use std::time::Duration;

use serde::Serialize;

/// Reasons a feature list row yields no pseudo spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkipReason {
    /// The row has no feature for the processed raw file.
    NoFeature,
    NotDetected,
    BelowMs1Intensity,
    /// The apex scan is unset or not part of the feature's chromatogram.
    MissingApex,
    /// Fewer shape points than the correlation needs.
    ShortShape,
    NoCandidateWindow,
    NoFragments,
}

/// Reasons a candidate isolation window contributes nothing to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSkipReason {
    TooFewScans,
    /// The feature RT lies outside the RT span of the window scans.
    OutOfRtBounds,
    NoEligibleEics,
    NoMobilityScans,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationStats {
    pub rows: usize,
    pub rows_with_spectrum: usize,

    pub skipped_no_feature: usize,
    pub skipped_not_detected: usize,
    pub skipped_below_ms1_intensity: usize,
    pub skipped_missing_apex: usize,
    pub skipped_short_shape: usize,
    pub skipped_no_candidate_window: usize,
    pub skipped_no_fragments: usize,

    pub windows_considered: usize,
    pub windows_too_few_scans: usize,
    pub windows_out_of_rt_bounds: usize,
    pub windows_no_eligible_eics: usize,
    pub windows_no_mobility_scans: usize,

    pub correlations_attempted: usize,
    pub correlations_accepted: usize,
    /// Accepted by shape but not observed near the feature's mobility.
    pub mobility_rejected: usize,
}

impl CorrelationStats {
    pub fn skip_row(&mut self, reason: RowSkipReason) {
        let counter = match reason {
            RowSkipReason::NoFeature => &mut self.skipped_no_feature,
            RowSkipReason::NotDetected => &mut self.skipped_not_detected,
            RowSkipReason::BelowMs1Intensity => &mut self.skipped_below_ms1_intensity,
            RowSkipReason::MissingApex => &mut self.skipped_missing_apex,
            RowSkipReason::ShortShape => &mut self.skipped_short_shape,
            RowSkipReason::NoCandidateWindow => &mut self.skipped_no_candidate_window,
            RowSkipReason::NoFragments => &mut self.skipped_no_fragments,
        };
        *counter += 1;
    }

    pub fn skip_window(&mut self, reason: WindowSkipReason) {
        let counter = match reason {
            WindowSkipReason::TooFewScans => &mut self.windows_too_few_scans,
            WindowSkipReason::OutOfRtBounds => &mut self.windows_out_of_rt_bounds,
            WindowSkipReason::NoEligibleEics => &mut self.windows_no_eligible_eics,
            WindowSkipReason::NoMobilityScans => &mut self.windows_no_mobility_scans,
        };
        *counter += 1;
    }

    pub fn rows_skipped(&self) -> usize {
        self.skipped_no_feature
            + self.skipped_not_detected
            + self.skipped_below_ms1_intensity
            + self.skipped_missing_apex
            + self.skipped_short_shape
            + self.skipped_no_candidate_window
            + self.skipped_no_fragments
    }
}

impl std::ops::AddAssign for CorrelationStats {
    fn add_assign(&mut self, rhs: Self) {
        self.rows += rhs.rows;
        self.rows_with_spectrum += rhs.rows_with_spectrum;
        self.skipped_no_feature += rhs.skipped_no_feature;
        self.skipped_not_detected += rhs.skipped_not_detected;
        self.skipped_below_ms1_intensity += rhs.skipped_below_ms1_intensity;
        self.skipped_missing_apex += rhs.skipped_missing_apex;
        self.skipped_short_shape += rhs.skipped_short_shape;
        self.skipped_no_candidate_window += rhs.skipped_no_candidate_window;
        self.skipped_no_fragments += rhs.skipped_no_fragments;
        self.windows_considered += rhs.windows_considered;
        self.windows_too_few_scans += rhs.windows_too_few_scans;
        self.windows_out_of_rt_bounds += rhs.windows_out_of_rt_bounds;
        self.windows_no_eligible_eics += rhs.windows_no_eligible_eics;
        self.windows_no_mobility_scans += rhs.windows_no_mobility_scans;
        self.correlations_attempted += rhs.correlations_attempted;
        self.correlations_accepted += rhs.correlations_accepted;
        self.mobility_rejected += rhs.mobility_rejected;
    }
}

/// Wall time spent in each phase of one task run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PhaseTimings {
    pub classification: Duration,
    pub chromatograms: Duration,
    pub correlation: Duration,
    pub finalization: Duration,
}

impl Serialize for PhaseTimings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PhaseTimings", 4)?;
        state.serialize_field("classification_ms", &self.classification.as_millis())?;
        state.serialize_field("chromatograms_ms", &self.chromatograms.as_millis())?;
        state.serialize_field("correlation_ms", &self.correlation.as_millis())?;
        state.serialize_field("finalization_ms", &self.finalization.as_millis())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_add_up() {
        let mut a = CorrelationStats::default();
        a.rows = 2;
        a.skip_row(RowSkipReason::NotDetected);
        a.skip_window(WindowSkipReason::TooFewScans);

        let mut b = CorrelationStats::default();
        b.rows = 1;
        b.skip_row(RowSkipReason::BelowMs1Intensity);
        b.correlations_attempted = 4;

        a += b;
        assert_eq!(a.rows, 3);
        assert_eq!(a.rows_skipped(), 2);
        assert_eq!(a.windows_too_few_scans, 1);
        assert_eq!(a.correlations_attempted, 4);
    }

    #[test]
    fn test_timings_serialize_as_millis() {
        let timings = PhaseTimings {
            chromatograms: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(timings).unwrap();
        assert_eq!(json["chromatograms_ms"], 1500);
        assert_eq!(json["classification_ms"], 0);
    }
}
