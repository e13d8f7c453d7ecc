use tracing::{
    trace,
    warn,
};

use diaquery::utils::spectra_merging::{
    IntensityMergingType,
    merge_spectra,
};
use diaquery::{
    IsolationWindow,
    Scan,
    Tolerance,
};

use super::WindowScans;

/// Mobility sub-scans a merged peak has to be seen in to survive frame merging.
const MIN_MERGED_PEAKS: usize = 2;

/// Scan sequence holding only the signal of one isolation window.
///
/// Lives only as long as the chromatograms of the window are being built.
#[derive(Debug)]
pub enum WindowSurrogate<'a> {
    /// Plain MS2 scans, used as acquired.
    Borrowed(Vec<&'a Scan>),
    /// One flattened spectrum per mobility frame.
    Merged(Vec<Scan>),
}

impl WindowSurrogate<'_> {
    pub fn scans(&self) -> Vec<&Scan> {
        match self {
            WindowSurrogate::Borrowed(scans) => scans.clone(),
            WindowSurrogate::Merged(scans) => scans.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            WindowSurrogate::Borrowed(scans) => scans.len(),
            WindowSurrogate::Merged(scans) => scans.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the single-window scan sequence for `window_scans`.
///
/// Without `merge_mobility` the scans are reused directly. With it, every
/// frame is reduced to the mobility sub-scans inside the window's mobility
/// range, merged into a single centroided spectrum. Frames without a
/// mobility dimension are reported and skipped.
pub fn build_window_surrogate<'a>(
    file_name: &str,
    window_scans: &WindowScans<'a>,
    tolerance: &Tolerance,
    merge_mobility: bool,
) -> WindowSurrogate<'a> {
    if !merge_mobility {
        return WindowSurrogate::Borrowed(window_scans.scans.clone());
    }

    let mut merged = Vec::with_capacity(window_scans.scans.len());
    for frame in &window_scans.scans {
        match merge_frame(frame, &window_scans.window, tolerance) {
            Some(scan) => merged.push(scan),
            None => {
                warn!(
                    "Data file {} is an ion mobility file but scan #{} (rt {:.3}) has no mobility dimension",
                    file_name, frame.index, frame.rt
                );
            }
        }
    }
    trace!(
        "Merged {} frames for window {}",
        merged.len(),
        window_scans.window
    );
    WindowSurrogate::Merged(merged)
}

/// Flattens the mobility sub-scans of `frame` that fall in `window`.
pub fn merge_frame(frame: &Scan, window: &IsolationWindow, tolerance: &Tolerance) -> Option<Scan> {
    frame.mobility_scans.as_ref()?;
    let merged = merge_spectra(
        frame
            .mobility_scans_in(window.mobility_range)
            .map(|m| (m.mzs.as_slice(), m.intensities.as_slice())),
        tolerance,
        IntensityMergingType::Summed,
        MIN_MERGED_PEAKS,
    );
    Some(Scan {
        index: frame.index,
        rt: frame.rt,
        ms_level: frame.ms_level,
        polarity: frame.polarity,
        mzs: merged.mzs,
        intensities: merged.intensities,
        isolation_windows: vec![*window],
        mobility_scans: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diaquery::models::tolerance::MzTolerance;
    use diaquery::{
        MobilityScan,
        TupleRange,
    };

    fn tolerance() -> Tolerance {
        Tolerance::default().with_mz_tolerance(MzTolerance::Absolute((0.01, 0.01)))
    }

    fn window() -> IsolationWindow {
        IsolationWindow::new(
            Some(TupleRange::try_new(400.0, 425.0).unwrap()),
            Some(TupleRange::try_new(0.8, 0.9).unwrap()),
        )
    }

    fn frame(index: u32) -> Scan {
        Scan::try_new(index, index as f32, 2, vec![], vec![])
            .unwrap()
            .with_mobility_scans(vec![
                MobilityScan::try_new(0.82, vec![150.0, 250.0], vec![10.0, 5.0]).unwrap(),
                MobilityScan::try_new(0.85, vec![150.002], vec![30.0]).unwrap(),
                // outside the window's mobility range
                MobilityScan::try_new(0.95, vec![250.001, 350.0], vec![50.0, 50.0]).unwrap(),
            ])
            .with_isolation_window(window())
    }

    #[test]
    fn test_frame_merging_keeps_window_signal_only() {
        let merged = merge_frame(&frame(3), &window(), &tolerance()).unwrap();
        // 250 only appears once inside the window, 350 only outside
        assert_eq!(merged.mzs.len(), 1);
        assert!((merged.mzs[0] - 150.0015).abs() < 1e-9);
        assert_eq!(merged.intensities, vec![40.0]);
        assert_eq!(merged.index, 3);
        assert!(!merged.has_mobility());
    }

    #[test]
    fn test_frames_without_mobility_are_skipped() {
        let plain = Scan::try_new(1, 1.0, 2, vec![150.0], vec![10.0])
            .unwrap()
            .with_isolation_window(window());
        let frames = [frame(0), plain, frame(2)];
        let window_scans = WindowScans {
            window: window(),
            scans: frames.iter().collect(),
        };
        let surrogate = build_window_surrogate("test", &window_scans, &tolerance(), true);
        assert_eq!(surrogate.len(), 2);
        let indices: Vec<u32> = surrogate.scans().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_plain_data_is_borrowed() {
        let scans = [Scan::try_new(0, 1.0, 2, vec![150.0], vec![10.0]).unwrap()];
        let window_scans = WindowScans {
            window: window(),
            scans: scans.iter().collect(),
        };
        let surrogate = build_window_surrogate("test", &window_scans, &tolerance(), false);
        assert!(matches!(surrogate, WindowSurrogate::Borrowed(_)));
        assert_eq!(surrogate.scans()[0].mzs, vec![150.0]);
    }
}
