use diaquery::utils::binary_search_range_by_key;
use serde::Serialize;

/// Outcome of one MS1 vs MS2 shape correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub pearson_r: f64,
    pub num_points: usize,
    pub valid: bool,
}

impl CorrelationResult {
    fn invalid(num_points: usize) -> Self {
        Self {
            pearson_r: f64::NAN,
            num_points,
            valid: false,
        }
    }

    /// Whether a fragment with this correlation should be attributed to the feature.
    pub fn passes(&self, min_pearson: f64) -> bool {
        self.valid && self.pearson_r > 0.0 && self.pearson_r >= min_pearson
    }
}

/// Pearson correlation coefficient of two equally long series.
///
/// Returns `None` for fewer than two points, for a zero-variance series
/// and when the result is not finite.
///
/// # Example
///
/// ```
/// use diacorr::utils::correlation::pearson;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.5];
/// assert!(pearson(&a, &b).unwrap() > 0.99);
/// assert!(pearson(&a, &[5.0, 5.0, 5.0]).is_none());
/// ```
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    if r.is_finite() {
        Some(r.clamp(-1.0, 1.0))
    } else {
        None
    }
}

/// Linearly interpolates the series `(xs, ys)` at every position of `grid`.
///
/// `xs` must be ascending and every grid value must lie within `[xs[0], xs[n-1]]`.
fn interpolate_onto(xs: &[f64], ys: &[f64], grid: &[f64]) -> Vec<f64> {
    grid.iter()
        .map(|&x| {
            let right = xs.partition_point(|&v| v < x);
            if right < xs.len() && xs[right] == x {
                return ys[right];
            }
            if right == 0 || right >= xs.len() {
                // Outside of the series, the caller only passes overlapping grids.
                return f64::NAN;
            }
            let left = right - 1;
            let span = xs[right] - xs[left];
            ys[left] + (ys[right] - ys[left]) * (x - xs[left]) / span
        })
        .collect()
}

/// Correlates the MS2 trace against the MS1 shape.
///
/// The MS2 trace is first restricted to the retention time span of the MS1
/// shape. Both series are then interpolated onto the union of their retention
/// times within the overlap. Starting at the MS1 apex, points are collected
/// outwards on both sides while both intensities stay at or above
/// `noise_floor`. The result is valid when at least `min_points` points were
/// collected, with at least `min_edge_points` strictly on each side of the
/// apex, and the Pearson coefficient is defined.
pub fn correlate_shapes(
    ms1_rts: &[f32],
    ms1_intensities: &[f32],
    ms2_rts: &[f32],
    ms2_intensities: &[f32],
    min_points: usize,
    min_edge_points: usize,
    noise_floor: f64,
) -> CorrelationResult {
    if ms1_rts.len() != ms1_intensities.len() || ms2_rts.len() != ms2_intensities.len() {
        return CorrelationResult::invalid(0);
    }
    let (Some(&first), Some(&last)) = (ms1_rts.first(), ms1_rts.last()) else {
        return CorrelationResult::invalid(0);
    };
    let in_span = binary_search_range_by_key(ms2_rts, (first, last), |x| *x);
    let ms2_rts = &ms2_rts[in_span.clone()];
    let ms2_intensities = &ms2_intensities[in_span];
    if ms1_rts.len() < min_points || ms2_rts.len() < min_points {
        return CorrelationResult::invalid(0);
    }

    let x1: Vec<f64> = ms1_rts.iter().map(|&x| x as f64).collect();
    let y1: Vec<f64> = ms1_intensities.iter().map(|&x| x as f64).collect();
    let x2: Vec<f64> = ms2_rts.iter().map(|&x| x as f64).collect();
    let y2: Vec<f64> = ms2_intensities.iter().map(|&x| x as f64).collect();

    let overlap_start = x1[0].max(x2[0]);
    let overlap_end = x1[x1.len() - 1].min(x2[x2.len() - 1]);
    if !(overlap_start <= overlap_end) {
        return CorrelationResult::invalid(0);
    }
    let mut grid: Vec<f64> = x1
        .iter()
        .chain(x2.iter())
        .copied()
        .filter(|&x| overlap_start <= x && x <= overlap_end)
        .collect();
    grid.sort_unstable_by(|a, b| a.total_cmp(b));
    grid.dedup();

    let g1 = interpolate_onto(&x1, &y1, &grid);
    let g2 = interpolate_onto(&x2, &y2, &grid);

    let Some(apex) = g1
        .iter()
        .enumerate()
        .filter(|(_, y)| y.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &y)| match best {
            Some((_, b)) if b >= y => best,
            _ => Some((i, y)),
        })
        .map(|(i, _)| i)
    else {
        return CorrelationResult::invalid(0);
    };

    let usable = |i: usize| g1[i] >= noise_floor && g2[i] >= noise_floor;
    if !usable(apex) {
        return CorrelationResult::invalid(0);
    }
    let mut left = apex;
    while left > 0 && usable(left - 1) {
        left -= 1;
    }
    let mut right = apex;
    while right + 1 < grid.len() && usable(right + 1) {
        right += 1;
    }

    let num_points = right - left + 1;
    if num_points < min_points || apex - left < min_edge_points || right - apex < min_edge_points
    {
        return CorrelationResult::invalid(num_points);
    }

    match pearson(&g1[left..=right], &g2[left..=right]) {
        Some(r) => CorrelationResult {
            pearson_r: r,
            num_points,
            valid: true,
        },
        None => CorrelationResult::invalid(num_points),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS1_RTS: [f32; 5] = [9.8, 9.9, 10.0, 10.1, 10.2];
    const MS1_INTS: [f32; 5] = [2e5, 6e5, 1e6, 7e5, 1e5];

    #[test]
    fn test_proportional_shapes_correlate_perfectly() {
        let ms2: Vec<f32> = MS1_INTS.iter().map(|x| x * 0.01).collect();
        let res = correlate_shapes(&MS1_RTS, &MS1_INTS, &MS1_RTS, &ms2, 3, 2, 10.0);
        assert!(res.valid);
        assert_eq!(res.num_points, 5);
        assert!((res.pearson_r - 1.0).abs() < 1e-6, "{res:?}");
        assert!(res.passes(0.8));
    }

    #[test]
    fn test_correlation_is_idempotent() {
        let ms2_rts = [9.75f32, 9.85, 9.95, 10.05, 10.15, 10.25];
        let ms2 = [1e3f32, 3e3, 8e3, 9e3, 4e3, 1e3];
        let a = correlate_shapes(&MS1_RTS, &MS1_INTS, &ms2_rts, &ms2, 3, 2, 10.0);
        let b = correlate_shapes(&MS1_RTS, &MS1_INTS, &ms2_rts, &ms2, 3, 2, 10.0);
        assert_eq!(a.valid, b.valid);
        assert_eq!(a.num_points, b.num_points);
        assert_eq!(a.pearson_r.to_bits(), b.pearson_r.to_bits());
        assert!(a.valid);
        assert!(a.pearson_r > 0.8, "{a:?}");
    }

    #[test]
    fn test_flat_trace_is_invalid() {
        let flat = [500.0f32; 5];
        let res = correlate_shapes(&MS1_RTS, &MS1_INTS, &MS1_RTS, &flat, 3, 2, 10.0);
        assert!(!res.valid);
        assert!(!res.passes(-1.0));
    }

    #[test]
    fn test_too_few_edge_points() {
        // Only one point right of the apex is above the floor
        let ms2 = [200.0f32, 600.0, 1000.0, 700.0, 1.0];
        let res = correlate_shapes(&MS1_RTS, &MS1_INTS, &MS1_RTS, &ms2, 3, 2, 10.0);
        assert!(!res.valid);
        assert_eq!(res.num_points, 4);
    }

    #[test]
    fn test_ms2_outside_ms1_span_is_ignored() {
        let ms2_rts = [5.0f32, 6.0, 7.0];
        let ms2 = [1.0f32, 2.0, 3.0];
        let res = correlate_shapes(&MS1_RTS, &MS1_INTS, &ms2_rts, &ms2, 3, 2, 0.0);
        assert!(!res.valid);
        assert_eq!(res.num_points, 0);
    }

    #[test]
    fn test_anticorrelated_shapes_do_not_pass() {
        let ms2 = [9e3f32, 5e3, 1e3, 5e3, 9e3];
        let res = correlate_shapes(&MS1_RTS, &MS1_INTS, &MS1_RTS, &ms2, 3, 2, 10.0);
        assert!(res.valid);
        assert!(res.pearson_r < 0.0);
        assert!(!res.passes(-0.5));
    }

    #[test]
    fn test_interpolation_between_samples() {
        let ys = interpolate_onto(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0], &[0.5, 1.0, 1.5]);
        assert_eq!(ys, vec![5.0, 10.0, 20.0]);
    }
}
