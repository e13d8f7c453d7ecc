//! Strategies that turn a feature and its candidate isolation windows into a
//! pseudo MS2 spectrum.

mod closest_scan;
mod correlated;

use diaquery::utils::closest_index_by_key;
use diaquery::{
    IsolationWindow,
    Scan,
};

use crate::eic_index::EicRangeIndex;
use crate::features::{
    Feature,
    PseudoSpectrum,
    PseudoSpectrumType,
};
use crate::params::{
    DiaCorrParameters,
    PairingAlgorithm,
};
use crate::task::stats::CorrelationStats;
use crate::windows::surrogate::merge_frame;

/// Everything the row correlation needs to know about one isolation window.
///
/// Holds the acquired scans (frames for mobility data) rather than the merged
/// surrogate, which is dropped once the chromatograms are built.
#[derive(Debug)]
pub struct WindowData<'a> {
    pub window: IsolationWindow,
    pub scans: Vec<&'a Scan>,
    pub index: EicRangeIndex,
}

impl WindowData<'_> {
    /// Position of the scan closest in RT to `rt`, `None` outside the scan span.
    pub fn closest_scan(&self, rt: f32) -> Option<usize> {
        closest_index_by_key(&self.scans, rt, |s| s.rt)
    }
}

/// Shared, read-only inputs of a pairing call.
#[derive(Debug, Clone, Copy)]
pub struct PairingContext<'a> {
    pub params: &'a DiaCorrParameters,
    /// Raw file and feature list both carry mobility.
    pub mobility_mode: bool,
}

impl PairingContext<'_> {
    /// Peaks of a window scan as seen by the window: frames are flattened
    /// over the window's mobility range first.
    fn window_peaks(&self, window: &IsolationWindow, scan: &Scan) -> (Vec<f64>, Vec<f64>) {
        if self.mobility_mode {
            if let Some(merged) = merge_frame(scan, window, &self.params.tolerance) {
                return (merged.mzs, merged.intensities);
            }
        }
        (scan.mzs.clone(), scan.intensities.clone())
    }

    fn spectrum(&self, feature: &Feature, mut peaks: Vec<(f64, f64)>) -> PseudoSpectrum {
        peaks.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        let (mzs, intensities) = peaks.into_iter().unzip();
        PseudoSpectrum {
            ms_level: 2,
            precursor_rt: feature.rt,
            precursor_mz: feature.mz,
            mzs,
            intensities,
            polarity: feature.polarity,
            description: self.params.pseudo_spectrum_description(),
            kind: PseudoSpectrumType::LcDia,
        }
    }
}

/// How fragments get attached to a feature, fixed when the task is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ms2Pairing {
    Correlated,
    ClosestScan,
}

impl From<PairingAlgorithm> for Ms2Pairing {
    fn from(algorithm: PairingAlgorithm) -> Self {
        match algorithm {
            PairingAlgorithm::Correlation => Ms2Pairing::Correlated,
            PairingAlgorithm::ClosestScan => Ms2Pairing::ClosestScan,
        }
    }
}

impl Ms2Pairing {
    /// Builds the pseudo spectrum of `feature` from its candidate windows.
    ///
    /// `windows` must already be restricted to windows containing the
    /// feature. Skip reasons are recorded in `stats`; `None` means the
    /// feature keeps no spectrum.
    pub fn pair(
        &self,
        feature: &Feature,
        windows: &[&WindowData],
        ctx: &PairingContext,
        stats: &mut CorrelationStats,
    ) -> Option<PseudoSpectrum> {
        match self {
            Ms2Pairing::Correlated => correlated::pair(feature, windows, ctx, stats),
            Ms2Pairing::ClosestScan => closest_scan::pair(feature, windows, ctx, stats),
        }
    }
}
