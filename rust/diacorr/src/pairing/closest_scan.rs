use tracing::trace;

use super::{
    PairingContext,
    WindowData,
};
use crate::features::{
    Feature,
    PseudoSpectrum,
};
use crate::task::stats::{
    CorrelationStats,
    RowSkipReason,
    WindowSkipReason,
};

/// Attaches the MS2 scan closest to the feature RT, without shape filtering.
///
/// Among all candidate windows the scan with the smallest RT distance wins,
/// earlier windows on ties. Only peaks at or above the MS2 intensity floor
/// are kept.
pub(super) fn pair(
    feature: &Feature,
    windows: &[&WindowData],
    ctx: &PairingContext,
    stats: &mut CorrelationStats,
) -> Option<PseudoSpectrum> {
    let mut best: Option<(f32, &WindowData, usize)> = None;
    for window in windows {
        stats.windows_considered += 1;
        let Some(pos) = window.closest_scan(feature.rt) else {
            stats.skip_window(WindowSkipReason::OutOfRtBounds);
            continue;
        };
        let distance = (window.scans[pos].rt - feature.rt).abs();
        if best.map_or(true, |(d, _, _)| distance < d) {
            best = Some((distance, *window, pos));
        }
    }

    let Some((_, window, pos)) = best else {
        stats.skip_row(RowSkipReason::NoFragments);
        return None;
    };
    let scan = window.scans[pos];
    let (mzs, intensities) = ctx.window_peaks(&window.window, scan);
    let peaks: Vec<(f64, f64)> = mzs
        .into_iter()
        .zip(intensities)
        .filter(|(_, intensity)| *intensity >= ctx.params.min_ms2_intensity)
        .collect();
    if peaks.is_empty() {
        stats.skip_row(RowSkipReason::NoFragments);
        return None;
    }
    trace!(
        "Feature m/z {:.4} rt {:.3} paired with scan #{} ({} peaks)",
        feature.mz,
        feature.rt,
        scan.index,
        peaks.len()
    );
    Some(ctx.spectrum(feature, peaks))
}
