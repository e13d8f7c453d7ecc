use std::ops::AddAssign;

// Streaming aggregator that takes a value and a weight and keeps a running
// weighted mean together with the observed extremes.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamingAggregatorError {
    NotEnoughData,
}

type Result<T> = std::result::Result<T, StreamingAggregatorError>;

/// Running weighted mean of a stream of numbers.
///
/// Used to compute intensity-weighted m/z centers without materializing
/// the contributing points.
///
/// # Example
///
/// ```
/// use diaquery::utils::streaming_calculators::RunningStatsCalculator;
///
/// let mut calc = RunningStatsCalculator::new();
/// calc.add(1.0, 10.0);
/// calc.add(3.0, 20.0);
/// assert!((calc.mean().unwrap() - 17.5).abs() < 1e-9);
/// assert_eq!(calc.max().unwrap(), 20.0);
/// ```
///
/// Values with zero (or negative) weight only update the extremes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStatsCalculator {
    weight: f64,
    mean_n: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl RunningStatsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new value to the running stats calculator.
    pub fn add(&mut self, weight: f64, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;

        if !(weight > 0.) {
            return;
        }
        self.weight += weight;
        let weight_ratio = weight / self.weight;
        let delta = value - self.mean_n;
        self.mean_n += delta * weight_ratio;

        // Rounding can push the mean a hair outside the observed values.
        self.mean_n = self.mean_n.min(self.max).max(self.min);
    }

    pub fn mean(&self) -> Result<f64> {
        if self.weight == 0. {
            return Err(StreamingAggregatorError::NotEnoughData);
        }
        Ok(self.mean_n)
    }

    pub fn min(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(StreamingAggregatorError::NotEnoughData);
        }
        Ok(self.min)
    }

    pub fn max(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(StreamingAggregatorError::NotEnoughData);
        }
        Ok(self.max)
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl AddAssign for RunningStatsCalculator {
    fn add_assign(&mut self, other: Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other;
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        if other.weight > 0. {
            self.weight += other.weight;
            let weight_ratio = other.weight / self.weight;
            self.mean_n += (other.mean_n - self.mean_n) * weight_ratio;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats_calculator() {
        let mut calc = RunningStatsCalculator::new();
        calc.add(10., 0.0);
        calc.add(2., 10.0);
        calc.add(2., 10.0);
        calc.add(2., 10.0);
        calc.add(2., 10.0);
        calc.add(2., 10.0);
        let mean = calc.mean().unwrap();
        assert!((mean - 5.0).abs() < 1e-9, "{calc:#?}");
    }

    #[test]
    fn test_empty_calculator_has_no_mean() {
        let calc = RunningStatsCalculator::new();
        assert_eq!(calc.mean(), Err(StreamingAggregatorError::NotEnoughData));
        assert_eq!(calc.max(), Err(StreamingAggregatorError::NotEnoughData));
    }

    #[test]
    fn test_zero_weight_only_updates_extremes() {
        let mut calc = RunningStatsCalculator::new();
        calc.add(0.0, 500.0);
        assert!(calc.mean().is_err());
        assert_eq!(calc.max().unwrap(), 500.0);
        calc.add(1.0, 400.0);
        assert_eq!(calc.mean().unwrap(), 400.0);
        assert_eq!(calc.min().unwrap(), 400.0);
    }

    // https://www.kaggle.com/datasets/carlmcbrideellis/data-anscombes-quartet?resource=download
    const ASCOMBES_3: [f64; 11] = [
        7.46, 6.77, 12.74, 7.11, 7.81, 8.84, 6.08, 5.39, 8.15, 6.42, 5.73,
    ];
    const ASCOMBES_4: [f64; 11] = [
        6.58, 5.76, 7.71, 8.84, 8.47, 7.04, 5.25, 12.5, 5.56, 7.91, 6.89,
    ];

    #[test]
    fn test_merged_calculators_match_single_stream() {
        let mut single = RunningStatsCalculator::new();
        let mut left = RunningStatsCalculator::new();
        let mut right = RunningStatsCalculator::new();
        for x in ASCOMBES_3 {
            single.add(1.0, x);
            left.add(1.0, x);
        }
        for x in ASCOMBES_4 {
            single.add(1.0, x);
            right.add(1.0, x);
        }
        left += right;
        assert!((left.mean().unwrap() - single.mean().unwrap()).abs() < 1e-9);
        assert!((single.mean().unwrap() - 7.5).abs() < 0.01);
        assert_eq!(left.count(), 22);
        assert_eq!(left.max().unwrap(), 12.74);
    }
}
