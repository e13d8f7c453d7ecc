//! Tolerance-bucketed merging of several spectra into one.

use std::collections::HashSet;

use serde::{
    Deserialize,
    Serialize,
};

use crate::models::Tolerance;
use crate::utils::range_map::MzRangeMap;
use crate::utils::streaming_calculators::RunningStatsCalculator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityMergingType {
    #[default]
    Summed,
    Maximum,
    Average,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSpectrum {
    pub mzs: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl MergedSpectrum {
    pub fn len(&self) -> usize {
        self.mzs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mzs.is_empty()
    }

    /// Whether any merged peak lies within tolerance of `mz`.
    pub fn contains_mz(&self, mz: f64, tolerance: &Tolerance) -> bool {
        let range = tolerance.mz_range(mz);
        let start = self.mzs.partition_point(|x| *x < range.start());
        self.mzs.get(start).is_some_and(|x| range.contains(*x))
    }
}

#[derive(Debug, Default)]
struct PeakGroup {
    mz: RunningStatsCalculator,
    intensity_sum: f64,
    intensity_max: f64,
    num_peaks: usize,
}

impl PeakGroup {
    fn push(&mut self, mz: f64, intensity: f64) {
        self.mz.add(intensity, mz);
        self.intensity_sum += intensity;
        self.intensity_max = self.intensity_max.max(intensity);
        self.num_peaks += 1;
    }

    fn merged_intensity(&self, merging: IntensityMergingType) -> f64 {
        match merging {
            IntensityMergingType::Summed => self.intensity_sum,
            IntensityMergingType::Maximum => self.intensity_max,
            IntensityMergingType::Average => self.intensity_sum / self.num_peaks as f64,
        }
    }

    fn merged_mz(&self) -> Option<f64> {
        // All-zero groups still have a position, the plain center of their extremes.
        self.mz
            .mean()
            .ok()
            .or_else(|| Some((self.mz.min().ok()? + self.mz.max().ok()?) / 2.0))
    }
}

/// Merges the peaks of several spectra into one centroided spectrum.
///
/// Peaks are visited from most to least intense. Each peak joins the bucket
/// whose m/z range contains it, otherwise it opens a new bucket spanning its
/// tolerance window, clipped so buckets never overlap. Two peaks of the same
/// source spectrum are never merged together. Buckets fed by fewer than
/// `min_num_peaks` peaks are dropped. The result is sorted by m/z.
///
/// ```
/// use diaquery::Tolerance;
/// use diaquery::models::tolerance::MzTolerance;
/// use diaquery::utils::spectra_merging::{merge_spectra, IntensityMergingType};
///
/// let tol = Tolerance::default().with_mz_tolerance(MzTolerance::Absolute((0.01, 0.01)));
/// let a = (vec![100.000, 200.0], vec![10.0, 5.0]);
/// let b = (vec![100.004, 300.0], vec![30.0, 5.0]);
/// let merged = merge_spectra(
///     [(&a.0[..], &a.1[..]), (&b.0[..], &b.1[..])],
///     &tol,
///     IntensityMergingType::Summed,
///     2,
/// );
/// assert_eq!(merged.len(), 1);
/// assert!((merged.mzs[0] - 100.003).abs() < 1e-9);
/// assert_eq!(merged.intensities[0], 40.0);
/// ```
pub fn merge_spectra<'a>(
    spectra: impl IntoIterator<Item = (&'a [f64], &'a [f64])>,
    tolerance: &Tolerance,
    merging: IntensityMergingType,
    min_num_peaks: usize,
) -> MergedSpectrum {
    let mut peaks: Vec<(usize, f64, f64)> = spectra
        .into_iter()
        .enumerate()
        .flat_map(|(source, (mzs, intensities))| {
            mzs.iter()
                .zip(intensities.iter())
                .map(move |(&mz, &intensity)| (source, mz, intensity))
        })
        .filter(|(_, mz, intensity)| mz.is_finite() && intensity.is_finite())
        .collect();
    if peaks.is_empty() {
        return MergedSpectrum::default();
    }
    peaks.sort_unstable_by(|a, b| b.2.total_cmp(&a.2).then(a.1.total_cmp(&b.1)));

    let mut groups: Vec<PeakGroup> = Vec::new();
    let mut buckets: MzRangeMap<usize> = MzRangeMap::new();
    // (group, source) pairs already merged
    let mut members: HashSet<(usize, usize)> = HashSet::new();

    for (source, mz, intensity) in peaks {
        let existing = buckets
            .get(mz)
            .copied()
            .filter(|&g| !members.contains(&(g, source)));

        let group_idx = match existing {
            Some(g) => g,
            None => {
                let idx = groups.len();
                groups.push(PeakGroup::default());
                if buckets.get(mz).is_none() {
                    let window = tolerance.mz_range(mz);
                    if let Some(gap) = buckets.free_gap_around(mz, window.start(), window.end()) {
                        buckets.insert_disjoint(gap, idx);
                    }
                }
                idx
            }
        };
        members.insert((group_idx, source));
        groups[group_idx].push(mz, intensity);
    }

    let mut merged: Vec<(f64, f64)> = groups
        .iter()
        .filter(|g| g.num_peaks >= min_num_peaks)
        .filter_map(|g| Some((g.merged_mz()?, g.merged_intensity(merging))))
        .collect();
    merged.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let (mzs, intensities) = merged.into_iter().unzip();
    MergedSpectrum { mzs, intensities }
}
