use diaquery::IonTimeSeries;

/// Contiguous part of a chromatogram around its apex.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakShape {
    pub rts: Vec<f32>,
    pub intensities: Vec<f32>,
}

impl PeakShape {
    pub fn len(&self) -> usize {
        self.rts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rts.is_empty()
    }

    /// First and last retention time of the shape.
    pub fn rt_bounds(&self) -> Option<(f32, f32)> {
        Some((*self.rts.first()?, *self.rts.last()?))
    }
}

/// Cuts the shape of `eic` around the point backed by `apex_scan`.
///
/// Walks outward from the apex one sample at a time. On each side the walk
/// stops at the first sample below `min_intensity`, which is still included,
/// or at the end of the data. The result therefore starts and ends either
/// below the floor or at the series' own first/last sample.
///
/// Returns `None` when the apex scan is not part of the chromatogram.
/// Rejecting shapes that are too short is left to the caller.
pub fn extract_shape(min_intensity: f64, eic: &IonTimeSeries, apex_scan: u32) -> Option<PeakShape> {
    let apex = eic.position_of_scan(apex_scan)?;
    let below = |i: usize| (eic.intensities[i] as f64) < min_intensity;

    let mut lower = apex;
    while lower > 0 && !below(lower) {
        lower -= 1;
    }
    let last = eic.len() - 1;
    let mut upper = apex;
    while upper < last && !below(upper) {
        upper += 1;
    }

    Some(PeakShape {
        rts: eic.rts[lower..=upper].to_vec(),
        intensities: eic.intensities[lower..=upper].to_vec(),
    })
}
