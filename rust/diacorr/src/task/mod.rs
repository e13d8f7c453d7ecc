//! Pseudo MS2 reconstruction for one raw data file and its feature list.

pub mod accumulator;
pub mod progress;
pub mod stats;

use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

use diaquery::{
    AtomicFraction,
    ChromatogramBuilder,
    ConsecutiveScanChromatogramBuilder,
    DiaQueryError,
    RawDataFile,
};

use crate::eic_index::EicRangeIndex;
use crate::errors::{
    DiaCorrError,
    Result,
};
use crate::features::{
    AppliedMethod,
    FeatureList,
    FeatureListRow,
    FeatureStatus,
    PseudoSpectrum,
};
use crate::pairing::{
    Ms2Pairing,
    PairingContext,
    WindowData,
};
use crate::params::DiaCorrParameters;
use crate::windows::{
    build_window_surrogate,
    classify_isolation_windows,
};
use accumulator::RowAccumulator;
pub use progress::{
    ProgressSnapshot,
    TaskPhase,
    TaskProgress,
    TaskStatus,
};
pub use stats::{
    CorrelationStats,
    PhaseTimings,
    RowSkipReason,
    WindowSkipReason,
};

/// Name under which runs are recorded in the feature list history.
pub const MODULE_NAME: &str = "DIA pseudo MS2 builder";

/// Summary of one task run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub num_windows: usize,
    /// Windows whose chromatogram building produced at least one chromatogram.
    pub num_windows_with_eics: usize,
    pub num_eics: usize,
    pub pseudo_spectra: usize,
    pub stats: CorrelationStats,
    pub timings: PhaseTimings,
}

impl TaskOutcome {
    fn new(status: TaskStatus) -> Self {
        Self {
            status,
            num_windows: 0,
            num_windows_with_eics: 0,
            num_eics: 0,
            pseudo_spectra: 0,
            stats: CorrelationStats::default(),
            timings: PhaseTimings::default(),
        }
    }
}

/// Builds pseudo MS2 spectra for the features of one raw data file.
///
/// Runs `SETUP → WINDOW_MERGE → CHROMATOGRAM_BUILD → ROW_CORRELATION → FINALIZE`
/// and ends in one of the terminal [`TaskStatus`]es. The pairing strategy is
/// chosen from the parameters once, at construction.
pub struct DiaMs2CorrTask<B: ChromatogramBuilder = ConsecutiveScanChromatogramBuilder> {
    params: DiaCorrParameters,
    pairing: Ms2Pairing,
    builder: B,
    progress: TaskProgress,
}

impl DiaMs2CorrTask<ConsecutiveScanChromatogramBuilder> {
    pub fn new(params: DiaCorrParameters) -> Result<Self> {
        Self::with_builder(params, ConsecutiveScanChromatogramBuilder)
    }
}

impl<B: ChromatogramBuilder> DiaMs2CorrTask<B> {
    pub fn with_builder(params: DiaCorrParameters, builder: B) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            pairing: Ms2Pairing::from(params.algorithm),
            params,
            builder,
            progress: TaskProgress::new(),
        })
    }

    pub fn params(&self) -> &DiaCorrParameters {
        &self.params
    }

    /// Handle for observing or canceling the task from another thread.
    pub fn progress(&self) -> TaskProgress {
        self.progress.clone()
    }

    /// Processes `raw` and annotates `flist` in place.
    ///
    /// Configuration problems end in [`TaskStatus::Error`] and are returned
    /// as `Err`. A canceled run returns `Ok` with [`TaskStatus::Canceled`] and
    /// leaves the feature list untouched.
    ///
    /// A task can run several times; progress starts from zero on every run.
    /// Cancellation is permanent: once canceled, every later run ends
    /// canceled as well.
    pub fn run(&self, flist: &mut FeatureList, raw: &RawDataFile) -> Result<TaskOutcome> {
        self.progress.restart();
        self.progress.set_status(TaskStatus::Processing);
        match self.process(flist, raw) {
            Ok(outcome) => {
                self.progress.set_status(TaskStatus::Finished);
                Ok(outcome)
            }
            Err(DiaCorrError::DiaQuery(DiaQueryError::Canceled)) => {
                info!("Pseudo MS2 building for {} was canceled", raw.name);
                self.progress.set_status(TaskStatus::Canceled);
                Ok(TaskOutcome::new(TaskStatus::Canceled))
            }
            Err(e) => {
                warn!("Pseudo MS2 building for {} failed: {}", raw.name, e);
                self.progress.set_status(TaskStatus::Error);
                Err(e)
            }
        }
    }

    fn process(&self, flist: &mut FeatureList, raw: &RawDataFile) -> Result<TaskOutcome> {
        let cancel = self.progress.cancellation_token();
        let mut outcome = TaskOutcome::new(TaskStatus::Finished);

        // SETUP
        self.progress.set_phase(TaskPhase::Setup);
        self.progress.set_description("Checking inputs");
        check_single_file(flist, raw)?;
        raw.validate()?;
        flist.validate()?;
        let mobility_mode = raw.has_mobility() && flist.has_mobility();

        let start = Instant::now();
        let windows = classify_isolation_windows(raw.matching_scans(&self.params.ms2_scan_selection));
        outcome.num_windows = windows.len();
        outcome.timings.classification = start.elapsed();
        info!(
            "Classified MS2 scans of {} into {} isolation windows (mobility: {}) in {:?}",
            raw.name,
            windows.len(),
            mobility_mode,
            outcome.timings.classification
        );

        // WINDOW_MERGE and CHROMATOGRAM_BUILD, one window at a time so merged
        // frames never outlive their chromatograms.
        let start = Instant::now();
        let chrom_params = self.params.chromatogram_params();
        let num_windows = windows.len();
        let mut window_data = Vec::with_capacity(num_windows);
        for (i, window_scans) in windows.into_iter().enumerate() {
            cancel.check()?;
            let base = i as f64 / num_windows as f64;
            let share = 1.0 / num_windows as f64;

            if mobility_mode {
                self.progress.set_phase(TaskPhase::WindowMerge);
                self.progress
                    .set_description(format!("Merging window {}/{}", i + 1, num_windows));
            }
            let surrogate = build_window_surrogate(
                &raw.name,
                &window_scans,
                &self.params.tolerance,
                mobility_mode,
            );
            let build_share = if mobility_mode {
                self.progress.chromatograms.raise_to(base + 0.5 * share);
                0.5 * share
            } else {
                share
            };

            self.progress.set_phase(TaskPhase::ChromatogramBuild);
            self.progress.set_description(format!(
                "Building chromatograms for window {}/{}",
                i + 1,
                num_windows
            ));
            let window_progress = AtomicFraction::new();
            let eics = self.builder.build(
                &surrogate.scans(),
                &chrom_params,
                cancel,
                &window_progress,
            )?;
            drop(surrogate);
            self.progress
                .chromatograms
                .raise_to(base + (share - build_share) + build_share * window_progress.get());
            self.progress.chromatograms.set_ratio(i + 1, num_windows);

            if eics.is_empty() {
                warn!(
                    "No chromatograms detected in window {} of {}",
                    window_scans.window, raw.name
                );
                continue;
            }
            debug!(
                "Window {}: {} scans, {} chromatograms",
                window_scans.window,
                window_scans.scans.len(),
                eics.len()
            );
            outcome.num_eics += eics.len();
            window_data.push(WindowData {
                window: window_scans.window,
                scans: window_scans.scans,
                index: EicRangeIndex::build(eics),
            });
        }
        self.progress.chromatograms.raise_to(1.0);
        outcome.num_windows_with_eics = window_data.len();
        outcome.timings.chromatograms = start.elapsed();
        info!(
            "Built {} chromatograms in {}/{} windows in {:?}",
            outcome.num_eics, outcome.num_windows_with_eics, num_windows, outcome.timings.chromatograms
        );

        if window_data.is_empty() {
            info!("No isolation window yielded chromatograms, nothing to correlate");
            self.progress.rows.raise_to(1.0);
            self.finalize(flist, &raw.name, Vec::new(), &mut outcome)?;
            return Ok(outcome);
        }

        // ROW_CORRELATION
        self.progress.set_phase(TaskPhase::RowCorrelation);
        let start = Instant::now();
        let ctx = PairingContext {
            params: &self.params,
            mobility_mode,
        };
        let num_rows = flist.rows.len();
        let done = AtomicUsize::new(0);
        let accumulator: RowAccumulator = flist
            .rows
            .par_iter()
            .enumerate()
            .map(|(position, row)| {
                if cancel.is_canceled() {
                    return (position, None, CorrelationStats::default());
                }
                let (spectrum, stats) = self.correlate_row(row, &raw.name, &window_data, &ctx);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                self.progress.rows.set_ratio(finished, num_rows);
                self.progress
                    .set_description(format!("Processing row {}/{}", finished, num_rows));
                (position, spectrum, stats)
            })
            .collect();
        cancel.check()?;
        self.progress.rows.raise_to(1.0);

        let (spectra, stats) = accumulator.into_sorted();
        outcome.stats = stats;
        outcome.timings.correlation = start.elapsed();
        info!(
            "Correlated {} rows in {:?}: {} with pseudo spectra, {} skipped, {}/{} fragment correlations accepted, {} rejected by mobility",
            outcome.stats.rows,
            outcome.timings.correlation,
            outcome.stats.rows_with_spectrum,
            outcome.stats.rows_skipped(),
            outcome.stats.correlations_accepted,
            outcome.stats.correlations_attempted,
            outcome.stats.mobility_rejected
        );
        debug!("Correlation statistics: {:?}", outcome.stats);

        self.finalize(flist, &raw.name, spectra, &mut outcome)?;
        Ok(outcome)
    }

    fn correlate_row(
        &self,
        row: &FeatureListRow,
        file_name: &str,
        windows: &[WindowData],
        ctx: &PairingContext,
    ) -> (Option<PseudoSpectrum>, CorrelationStats) {
        let mut stats = CorrelationStats {
            rows: 1,
            ..Default::default()
        };
        let Some(feature) = row.feature(file_name) else {
            stats.skip_row(RowSkipReason::NoFeature);
            return (None, stats);
        };
        if feature.status != FeatureStatus::Detected {
            stats.skip_row(RowSkipReason::NotDetected);
            return (None, stats);
        }
        if feature.height < self.params.min_ms1_intensity {
            stats.skip_row(RowSkipReason::BelowMs1Intensity);
            return (None, stats);
        }

        let mobility = if ctx.mobility_mode {
            feature.mobility
        } else {
            None
        };
        let candidates: Vec<&WindowData> = windows
            .iter()
            .filter(|w| w.window.contains_ion(feature.mz, mobility))
            .collect();
        if candidates.is_empty() {
            stats.skip_row(RowSkipReason::NoCandidateWindow);
            return (None, stats);
        }

        let spectrum = self.pairing.pair(feature, &candidates, ctx, &mut stats);
        if spectrum.is_some() {
            stats.rows_with_spectrum += 1;
        }
        (spectrum, stats)
    }

    fn finalize(
        &self,
        flist: &mut FeatureList,
        file_name: &str,
        spectra: Vec<(usize, PseudoSpectrum)>,
        outcome: &mut TaskOutcome,
    ) -> Result<()> {
        self.progress.set_phase(TaskPhase::Finalize);
        self.progress.set_description("Attaching pseudo spectra");
        let start = Instant::now();

        let parameters = serde_json::to_value(&self.params).map_err(|e| {
            DiaCorrError::configuration(format!("Parameters cannot be recorded: {}", e))
        })?;

        for (position, spectrum) in spectra {
            if let Some(feature) = flist
                .rows
                .get_mut(position)
                .and_then(|row| row.feature_mut(file_name))
            {
                feature.ms2 = Some(spectrum);
                outcome.pseudo_spectra += 1;
            }
        }
        flist.applied_methods.push(AppliedMethod {
            module: MODULE_NAME.to_string(),
            parameters,
            timestamp: Utc::now(),
        });
        outcome.timings.finalization = start.elapsed();
        info!(
            "Attached {} pseudo MS2 spectra to feature list {}",
            outcome.pseudo_spectra, flist.name
        );
        Ok(())
    }
}

/// The task handles exactly one raw data file, the one given alongside the list.
fn check_single_file(flist: &FeatureList, raw: &RawDataFile) -> Result<()> {
    match flist.raw_data_files.as_slice() {
        [name] if *name == raw.name => Ok(()),
        [name] => Err(DiaCorrError::configuration(format!(
            "Feature list {} belongs to raw file {}, but {} was given",
            flist.name, name, raw.name
        ))),
        files => Err(DiaCorrError::configuration(format!(
            "Feature list {} must contain exactly one raw data file, found {}. \
             Pseudo MS2 spectra are built for one raw data file at a time",
            flist.name,
            files.len()
        ))),
    }
}
