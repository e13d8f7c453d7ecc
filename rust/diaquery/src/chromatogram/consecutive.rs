use std::collections::BTreeMap;

use tracing::{
    debug,
    trace,
};

use super::{
    ChromatogramBuilder,
    ChromatogramParams,
};
use crate::errors::{
    DataProcessingError,
    Result,
};
use crate::models::{
    IonTimeSeries,
    Scan,
};
use crate::utils::range_map::MzRangeMap;
use crate::utils::streaming_calculators::RunningStatsCalculator;
use crate::utils::{
    AtomicFraction,
    CancellationToken,
};

const COLLECT_SHARE: f64 = 0.1;
const ASSIGN_SHARE: f64 = 0.45;
const PROGRESS_EVERY: usize = 4096;

/// Intensity-ordered chromatogram builder.
///
/// Every data point of every scan is visited from most to least intense.
/// A point joins the chromatogram whose m/z slot contains it. Otherwise it
/// seeds a new chromatogram (if it reaches `min_highest_point`) whose slot
/// is its tolerance window clipped against the slots already handed out.
/// A chromatogram keeps at most one point per scan, the most intense one.
///
/// Chromatograms survive when `min_consecutive` adjacent scans reach
/// `min_group_intensity`, and get one zero-intensity point padded on each
/// side when a neighbouring scan exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsecutiveScanChromatogramBuilder;

#[derive(Debug, Default)]
struct ChromatogramSeed {
    // scan position -> (mz, intensity)
    points: BTreeMap<usize, (f64, f64)>,
    mz: RunningStatsCalculator,
    highest: f64,
}

impl ChromatogramSeed {
    fn add(&mut self, scan_pos: usize, mz: f64, intensity: f64) {
        if self.points.contains_key(&scan_pos) {
            return;
        }
        self.points.insert(scan_pos, (mz, intensity));
        self.mz.add(intensity, mz);
        self.highest = self.highest.max(intensity);
    }

    fn longest_run(&self, min_group_intensity: f64) -> usize {
        let mut best = 0;
        let mut current = 0;
        let mut last_pos: Option<usize> = None;
        for (&pos, &(_, intensity)) in &self.points {
            if intensity < min_group_intensity {
                current = 0;
                last_pos = None;
                continue;
            }
            current = match last_pos {
                Some(prev) if prev + 1 == pos => current + 1,
                _ => 1,
            };
            last_pos = Some(pos);
            best = best.max(current);
        }
        best
    }

    fn into_series(mut self, scans: &[&Scan]) -> Result<IonTimeSeries> {
        let center = self.mz.mean().or_else(|_| self.mz.max()).unwrap_or(0.0);
        if let Some(&first) = self.points.keys().next() {
            if first > 0 {
                self.points.insert(first - 1, (center, 0.0));
            }
        }
        if let Some(&last) = self.points.keys().next_back() {
            if last + 1 < scans.len() {
                self.points.insert(last + 1, (center, 0.0));
            }
        }

        let mut mzs = Vec::with_capacity(self.points.len());
        let mut rts: Vec<f32> = Vec::with_capacity(self.points.len());
        let mut intensities: Vec<f32> = Vec::with_capacity(self.points.len());
        let mut scan_indices = Vec::with_capacity(self.points.len());
        for (pos, (mz, intensity)) in self.points {
            let scan = scans[pos];
            // Scans sharing a retention time collapse into the more intense point.
            if rts.last() == Some(&scan.rt) {
                let last = intensities.len() - 1;
                if intensity as f32 > intensities[last] {
                    intensities[last] = intensity as f32;
                    mzs[last] = mz;
                    scan_indices[last] = scan.index;
                }
                continue;
            }
            mzs.push(mz);
            rts.push(scan.rt);
            intensities.push(intensity as f32);
            scan_indices.push(scan.index);
        }
        Ok(IonTimeSeries::try_new(mzs, rts, intensities, scan_indices)?)
    }
}

fn check_rt_order(scans: &[&Scan]) -> Result<()> {
    let mut previous_rt = f32::NEG_INFINITY;
    for scan in scans {
        if scan.rt < previous_rt {
            return Err(DataProcessingError::UnorderedRetentionTimes {
                scan_index: scan.index,
                rt: scan.rt,
                previous_rt,
            }
            .into());
        }
        previous_rt = scan.rt;
    }
    Ok(())
}

impl ChromatogramBuilder for ConsecutiveScanChromatogramBuilder {
    fn build(
        &self,
        scans: &[&Scan],
        params: &ChromatogramParams,
        cancel: &CancellationToken,
        progress: &AtomicFraction,
    ) -> Result<Vec<IonTimeSeries>> {
        if scans.is_empty() {
            progress.raise_to(1.0);
            return Ok(Vec::new());
        }
        check_rt_order(scans)?;

        let mut points: Vec<(usize, f64, f64)> = Vec::new();
        for (pos, scan) in scans.iter().enumerate() {
            cancel.check()?;
            points.extend(
                scan.peaks()
                    .filter(|(mz, intensity)| !mz.is_nan() && !intensity.is_nan())
                    .map(|(mz, intensity)| (pos, mz, intensity)),
            );
            progress.raise_to(COLLECT_SHARE * (pos + 1) as f64 / scans.len() as f64);
        }
        points.sort_unstable_by(|a, b| b.2.total_cmp(&a.2));

        let mut slots: MzRangeMap<usize> = MzRangeMap::new();
        let mut seeds: Vec<ChromatogramSeed> = Vec::new();
        let num_points = points.len();
        for (i, (pos, mz, intensity)) in points.into_iter().enumerate() {
            if i % PROGRESS_EVERY == 0 {
                cancel.check()?;
                progress.raise_to(COLLECT_SHARE + ASSIGN_SHARE * i as f64 / num_points as f64);
            }
            if let Some(&seed_idx) = slots.get(mz) {
                seeds[seed_idx].add(pos, mz, intensity);
                continue;
            }
            if intensity < params.min_highest_point {
                continue;
            }
            let window = params.tolerance.mz_range(mz);
            let Some(slot) = slots.free_gap_around(mz, window.start(), window.end()) else {
                continue;
            };
            let seed_idx = seeds.len();
            let mut seed = ChromatogramSeed::default();
            seed.add(pos, mz, intensity);
            seeds.push(seed);
            slots.insert_disjoint(slot, seed_idx);
        }
        progress.raise_to(COLLECT_SHARE + ASSIGN_SHARE);

        // Slots iterate in m/z order, so the output is sorted by m/z.
        let ordered: Vec<usize> = slots.iter().map(|(_, idx)| *idx).collect();
        let num_seeds = ordered.len();
        let mut seeds: Vec<Option<ChromatogramSeed>> = seeds.into_iter().map(Some).collect();
        let mut out = Vec::new();
        let mut rejected = 0usize;
        for (i, seed_idx) in ordered.into_iter().enumerate() {
            cancel.check()?;
            progress.raise_to(
                COLLECT_SHARE + ASSIGN_SHARE + (1.0 - COLLECT_SHARE - ASSIGN_SHARE) * i as f64
                    / num_seeds as f64,
            );
            let Some(seed) = seeds[seed_idx].take() else {
                continue;
            };
            if seed.highest < params.min_highest_point
                || seed.longest_run(params.min_group_intensity) < params.min_consecutive
            {
                rejected += 1;
                continue;
            }
            out.push(seed.into_series(scans)?);
        }
        progress.raise_to(1.0);

        debug!(
            "Built {} chromatograms from {} scans ({} seeds rejected)",
            out.len(),
            scans.len(),
            rejected
        );
        trace!("Visited {} data points", num_points);
        Ok(out)
    }
}
