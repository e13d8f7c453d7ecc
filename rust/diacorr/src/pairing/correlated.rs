use std::collections::BTreeSet;

use tracing::trace;

use diaquery::utils::binary_search_range_by_key;
use diaquery::utils::spectra_merging::{
    IntensityMergingType,
    MergedSpectrum,
    merge_spectra,
};
use diaquery::{
    IonTimeSeries,
    TupleRange,
};

use super::{
    PairingContext,
    WindowData,
};
use crate::features::{
    Feature,
    PseudoSpectrum,
};
use crate::params::MIN_EDGE_POINTS;
use crate::shape::{
    PeakShape,
    extract_shape,
};
use crate::task::stats::{
    CorrelationStats,
    RowSkipReason,
    WindowSkipReason,
};
use crate::utils::correlation::correlate_shapes;

/// A fragment accepted for a feature: its m/z and intensity.
type Fragment = (f64, f64);

pub(super) fn pair(
    feature: &Feature,
    windows: &[&WindowData],
    ctx: &PairingContext,
    stats: &mut CorrelationStats,
) -> Option<PseudoSpectrum> {
    let params = ctx.params;
    let Some(shape) = feature
        .apex_scan
        .and_then(|apex| extract_shape(params.ms1_shape_floor(feature.height), &feature.eic, apex))
    else {
        stats.skip_row(RowSkipReason::MissingApex);
        return None;
    };
    if shape.len() < params.min_corr_points {
        stats.skip_row(RowSkipReason::ShortShape);
        return None;
    }

    let mut fragments: Vec<Fragment> = Vec::new();
    for window in windows {
        stats.windows_considered += 1;
        match correlate_window(feature, &shape, window, ctx, stats) {
            Ok(found) => fragments.extend(found),
            Err(reason) => {
                trace!(
                    "Window {} skipped for feature m/z {:.4}: {:?}",
                    window.window, feature.mz, reason
                );
                stats.skip_window(reason);
            }
        }
    }

    if fragments.is_empty() {
        stats.skip_row(RowSkipReason::NoFragments);
        return None;
    }
    Some(ctx.spectrum(feature, fragments))
}

/// Correlates every eligible fragment chromatogram of one window against the MS1 shape.
fn correlate_window(
    feature: &Feature,
    shape: &PeakShape,
    window: &WindowData,
    ctx: &PairingContext,
    stats: &mut CorrelationStats,
) -> Result<Vec<Fragment>, WindowSkipReason> {
    let params = ctx.params;
    let (rt_start, rt_end) = shape
        .rt_bounds()
        .ok_or(WindowSkipReason::TooFewScans)?;

    let in_span = binary_search_range_by_key(&window.scans, (rt_start, rt_end), |s| s.rt);
    if in_span.len() < params.min_corr_points {
        return Err(WindowSkipReason::TooFewScans);
    }

    let closest = window
        .closest_scan(feature.rt)
        .ok_or(WindowSkipReason::OutOfRtBounds)?;
    let (mzs, intensities) = ctx.window_peaks(&window.window, window.scans[closest]);
    let candidates: BTreeSet<usize> = mzs
        .iter()
        .zip(intensities.iter())
        .filter(|(_, intensity)| **intensity >= params.min_ms2_intensity)
        .filter_map(|(mz, _)| window.index.lookup_position(*mz))
        .collect();
    if candidates.is_empty() {
        return Err(WindowSkipReason::NoEligibleEics);
    }

    let check_mobility = ctx.mobility_mode && feature.mobility.is_some();
    let mut mobility_spectrum: Option<MergedSpectrum> = None;
    let noise_floor = params.shape_noise_floor();

    let mut fragments = Vec::new();
    for position in candidates {
        let Some(eic) = window.index.get(position) else {
            continue;
        };
        stats.correlations_attempted += 1;
        let result = correlate_shapes(
            &shape.rts,
            &shape.intensities,
            &eic.rts,
            &eic.intensities,
            params.min_corr_points,
            MIN_EDGE_POINTS,
            noise_floor,
        );
        if !result.passes(params.min_pearson) {
            continue;
        }
        let Some((mz, intensity)) = fragment_of(eic, rt_start, rt_end) else {
            continue;
        };

        if check_mobility {
            if mobility_spectrum.is_none() {
                mobility_spectrum = Some(
                    merge_mobility_around(feature, window, ctx, in_span.clone())
                        .ok_or(WindowSkipReason::NoMobilityScans)?,
                );
            }
            if let Some(merged) = &mobility_spectrum {
                if merged.len() > 1 && !merged.contains_mz(mz, &params.tolerance) {
                    stats.mobility_rejected += 1;
                    continue;
                }
            }
        }

        trace!(
            "Fragment {:.4} accepted for feature m/z {:.4} (r = {:.3}, n = {})",
            mz, feature.mz, result.pearson_r, result.num_points
        );
        stats.correlations_accepted += 1;
        fragments.push((mz, intensity));
    }
    Ok(fragments)
}

/// Weighted m/z and highest intensity of `eic` within the correlated RT range.
fn fragment_of(eic: &IonTimeSeries, rt_start: f32, rt_end: f32) -> Option<Fragment> {
    let positions = eic.rt_positions(rt_start, rt_end);
    let mz = eic.center_mz(positions.clone())?;
    let intensity = eic.max_intensity(positions)?;
    Some((mz, intensity as f64))
}

/// Mobility range of the feature, clipped to the isolation window.
///
/// `None` when the feature carries no mobility or lies outside the window.
fn feature_mobility_window(
    feature: &Feature,
    window: &WindowData,
    ctx: &PairingContext,
) -> Option<TupleRange<f32>> {
    let range = feature
        .mobility_range
        .or_else(|| feature.mobility.map(|m| ctx.params.feature_mobility_range(m)))?;
    match window.window.mobility_range {
        Some(window_range) => range.try_intercept(window_range),
        None => Some(range),
    }
}

/// Merges the mobility sub-scans of the window frames in `span` that lie
/// around the feature mobility.
///
/// `None` when no frame in the span has a single sub-scan in that range.
fn merge_mobility_around(
    feature: &Feature,
    window: &WindowData,
    ctx: &PairingContext,
    span: std::ops::Range<usize>,
) -> Option<MergedSpectrum> {
    let mobility_range = feature_mobility_window(feature, window, ctx)?;
    let sub_scans: Vec<_> = window.scans[span]
        .iter()
        .flat_map(|frame| frame.mobility_scans_in(Some(mobility_range)))
        .collect();
    if sub_scans.is_empty() {
        return None;
    }
    Some(merge_spectra(
        sub_scans
            .iter()
            .map(|s| (s.mzs.as_slice(), s.intensities.as_slice())),
        &ctx.params.tolerance,
        IntensityMergingType::Summed,
        1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eic_index::EicRangeIndex;
    use crate::features::FeatureStatus;
    use crate::params::DiaCorrParameters;
    use diaquery::{
        IsolationWindow,
        MobilityScan,
        Polarity,
        Scan,
    };

    const RTS: [f32; 5] = [9.8, 9.9, 10.0, 10.1, 10.2];
    const SHAPE: [f32; 5] = [2e5, 6e5, 1e6, 7e5, 1e5];

    fn params() -> DiaCorrParameters {
        DiaCorrParameters {
            min_corr_points: 3,
            min_pearson: 0.8,
            ..Default::default()
        }
    }

    /// Chromatogram whose m/z drifts by 1 mDa per scan around `mz`.
    fn series(mz: f64, intensities: &[f32]) -> IonTimeSeries {
        IonTimeSeries::try_new(
            (0..intensities.len())
                .map(|i| mz - 0.002 + 0.001 * i as f64)
                .collect(),
            RTS.to_vec(),
            intensities.to_vec(),
            (0..intensities.len() as u32).collect(),
        )
        .unwrap()
    }

    fn feature() -> Feature {
        Feature {
            raw_file: "run".into(),
            mz: 412.2,
            rt: 10.0,
            height: 1e6,
            status: FeatureStatus::Detected,
            eic: series(412.2, &SHAPE),
            apex_scan: Some(2),
            mobility: None,
            mobility_range: None,
            polarity: Polarity::Positive,
            ms2: None,
        }
    }

    fn window() -> IsolationWindow {
        IsolationWindow::from_mz(TupleRange::try_new(400.0, 425.0).unwrap())
    }

    fn ms2_scans() -> Vec<Scan> {
        RTS.iter()
            .enumerate()
            .map(|(i, rt)| {
                Scan::try_new(
                    i as u32,
                    *rt,
                    2,
                    vec![150.0, 250.0],
                    vec![SHAPE[i] as f64 * 0.01, 5e3],
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_proportional_fragment_is_accepted() {
        let scans = ms2_scans();
        let good: Vec<f32> = SHAPE.iter().map(|x| x * 0.01).collect();
        let data = WindowData {
            window: window(),
            scans: scans.iter().collect(),
            index: EicRangeIndex::build(vec![
                series(150.0, &good),
                series(250.0, &[5e3, 1e3, 9e3, 2e3, 8e3]),
            ]),
        };
        let params = params();
        let ctx = PairingContext {
            params: &params,
            mobility_mode: false,
        };
        let mut stats = CorrelationStats::default();
        let spectrum = pair(&feature(), &[&data], &ctx, &mut stats).unwrap();
        assert_eq!(spectrum.num_peaks(), 1);
        assert!((spectrum.mzs[0] - 150.0).abs() < 2e-3);
        assert!((spectrum.intensities[0] - 1e4).abs() < 1e-2);
        assert_eq!(spectrum.precursor_rt, 10.0);
        assert_eq!(stats.correlations_attempted, 2);
        assert_eq!(stats.correlations_accepted, 1);
    }

    #[test]
    fn test_window_with_few_scans_in_span_is_skipped() {
        let scans: Vec<Scan> = [9.0f32, 9.5, 10.0, 12.0]
            .iter()
            .enumerate()
            .map(|(i, rt)| Scan::try_new(i as u32, *rt, 2, vec![150.0], vec![1e4]).unwrap())
            .collect();
        let data = WindowData {
            window: window(),
            scans: scans.iter().collect(),
            index: EicRangeIndex::build(vec![series(150.0, &SHAPE)]),
        };
        let params = params();
        let ctx = PairingContext {
            params: &params,
            mobility_mode: false,
        };
        let mut stats = CorrelationStats::default();
        assert!(pair(&feature(), &[&data], &ctx, &mut stats).is_none());
        assert_eq!(stats.windows_too_few_scans, 1);
        assert_eq!(stats.correlations_attempted, 0);
        assert_eq!(stats.skipped_no_fragments, 1);
    }

    #[test]
    fn test_missing_apex_skips_row() {
        let params = params();
        let ctx = PairingContext {
            params: &params,
            mobility_mode: false,
        };
        let mut feat = feature();
        feat.apex_scan = Some(42);
        let mut stats = CorrelationStats::default();
        assert!(pair(&feat, &[], &ctx, &mut stats).is_none());
        assert_eq!(stats.skipped_missing_apex, 1);
    }

    /// Frames where fragment 150 only shows up at mobility 0.82/0.83.
    fn mobility_frames(fragment: &[f32]) -> Vec<Scan> {
        RTS.iter()
            .enumerate()
            .map(|(i, rt)| {
                Scan::try_new(i as u32, *rt, 2, vec![], vec![])
                    .unwrap()
                    .with_mobility_scans(vec![
                        MobilityScan::try_new(
                            0.82,
                            vec![150.0, 200.0],
                            vec![fragment[i] as f64, 50.0],
                        )
                        .unwrap(),
                        MobilityScan::try_new(0.83, vec![150.001], vec![fragment[i] as f64])
                            .unwrap(),
                        MobilityScan::try_new(0.95, vec![300.0, 350.0], vec![10.0, 10.0])
                            .unwrap(),
                    ])
            })
            .collect()
    }

    #[test]
    fn test_fragment_missing_at_feature_mobility_is_rejected() {
        let good: Vec<f32> = SHAPE.iter().map(|x| x * 0.01).collect();
        let mobility_window = IsolationWindow::new(
            Some(TupleRange::try_new(400.0, 425.0).unwrap()),
            Some(TupleRange::try_new(0.8, 1.0).unwrap()),
        );
        let frames = mobility_frames(&good);
        let data = WindowData {
            window: mobility_window,
            scans: frames.iter().collect(),
            index: EicRangeIndex::build(vec![series(150.0, &good)]),
        };
        let params = params();
        let ctx = PairingContext {
            params: &params,
            mobility_mode: true,
        };

        let mut feat = feature();
        feat.mobility = Some(0.95);
        feat.mobility_range = Some(TupleRange::try_new(0.94, 0.96).unwrap());
        let mut stats = CorrelationStats::default();
        assert!(pair(&feat, &[&data], &ctx, &mut stats).is_none());
        assert_eq!(stats.correlations_accepted, 0);
        assert_eq!(stats.mobility_rejected, 1);

        // Same fragment, feature at the mobility where it is observed
        feat.mobility = Some(0.825);
        feat.mobility_range = Some(TupleRange::try_new(0.81, 0.84).unwrap());
        let mut stats = CorrelationStats::default();
        let spectrum = pair(&feat, &[&data], &ctx, &mut stats).unwrap();
        assert_eq!(spectrum.num_peaks(), 1);
        assert_eq!(stats.mobility_rejected, 0);
    }

    #[test]
    fn test_feature_without_mobility_range_uses_bounded_window() {
        let good: Vec<f32> = SHAPE.iter().map(|x| x * 0.01).collect();
        let frames = mobility_frames(&good);
        let data = WindowData {
            window: IsolationWindow::new(
                Some(TupleRange::try_new(400.0, 425.0).unwrap()),
                Some(TupleRange::try_new(0.8, 1.0).unwrap()),
            ),
            scans: frames.iter().collect(),
            index: EicRangeIndex::build(vec![series(150.0, &good)]),
        };
        // Default tolerance leaves mobility unrestricted
        let params = params();
        assert_eq!(
            params.tolerance.mobility,
            diaquery::models::tolerance::MobilityTolerance::Unrestricted
        );
        let ctx = PairingContext {
            params: &params,
            mobility_mode: true,
        };

        let mut feat = feature();
        feat.mobility = Some(0.95);
        feat.mobility_range = None;
        let mut stats = CorrelationStats::default();
        assert!(pair(&feat, &[&data], &ctx, &mut stats).is_none());
        assert_eq!(stats.mobility_rejected, 1);

        feat.mobility = Some(0.825);
        let mut stats = CorrelationStats::default();
        let spectrum = pair(&feat, &[&data], &ctx, &mut stats).unwrap();
        assert!((spectrum.mzs[0] - 150.0).abs() < 2e-3);
        assert_eq!(stats.mobility_rejected, 0);
    }

    #[test]
    fn test_feature_mobility_is_clipped_to_window() {
        let good: Vec<f32> = SHAPE.iter().map(|x| x * 0.01).collect();
        let frames = mobility_frames(&good);
        let data = WindowData {
            window: IsolationWindow::new(
                Some(TupleRange::try_new(400.0, 425.0).unwrap()),
                Some(TupleRange::try_new(0.8, 0.9).unwrap()),
            ),
            scans: frames.iter().collect(),
            index: EicRangeIndex::build(vec![series(150.0, &good)]),
        };
        let params = params();
        let ctx = PairingContext {
            params: &params,
            mobility_mode: true,
        };
        let mut feat = feature();
        feat.mobility = Some(0.95);
        feat.mobility_range = Some(TupleRange::try_new(0.7, 1.2).unwrap());

        let range = feature_mobility_window(&feat, &data, &ctx).unwrap();
        assert_eq!(range.as_tuple(), (0.8, 0.9));

        feat.mobility_range = Some(TupleRange::try_new(0.92, 0.98).unwrap());
        assert!(feature_mobility_window(&feat, &data, &ctx).is_none());
        let mut stats = CorrelationStats::default();
        assert!(pair(&feat, &[&data], &ctx, &mut stats).is_none());
        assert_eq!(stats.windows_no_mobility_scans, 1);
    }
}
