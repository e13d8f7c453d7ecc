//! Collects per-row pairing outcomes from parallel iterators.

use rayon::iter::{
    FromParallelIterator,
    IntoParallelIterator,
    ParallelIterator,
};

use super::stats::CorrelationStats;
use crate::features::PseudoSpectrum;

/// Result of pairing one row: its position in the feature list and, when
/// fragments were found, the synthesized spectrum.
pub type RowOutcome = (usize, Option<PseudoSpectrum>, CorrelationStats);

/// Fold/reduce target for row outcomes.
///
/// Spectra are kept with their row position so they can be attached in
/// feature list order regardless of which thread produced them.
#[derive(Debug, Default)]
pub(crate) struct RowAccumulator {
    pub(crate) spectra: Vec<(usize, PseudoSpectrum)>,
    pub(crate) stats: CorrelationStats,
}

impl RowAccumulator {
    pub(crate) fn reduce(mut self, other: Self) -> Self {
        self.spectra.extend(other.spectra);
        self.stats += other.stats;
        self
    }

    pub(crate) fn fold(mut self, item: RowOutcome) -> Self {
        let (position, spectrum, stats) = item;
        if let Some(spectrum) = spectrum {
            self.spectra.push((position, spectrum));
        }
        self.stats += stats;
        self
    }

    /// Spectra ordered by row position.
    pub(crate) fn into_sorted(mut self) -> (Vec<(usize, PseudoSpectrum)>, CorrelationStats) {
        self.spectra.sort_by_key(|(position, _)| *position);
        (self.spectra, self.stats)
    }
}

impl FromIterator<RowOutcome> for RowAccumulator {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = RowOutcome>,
    {
        iter.into_iter()
            .fold(RowAccumulator::default(), RowAccumulator::fold)
    }
}

impl FromParallelIterator<RowOutcome> for RowAccumulator {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = RowOutcome>,
    {
        par_iter
            .into_par_iter()
            .fold(RowAccumulator::default, RowAccumulator::fold)
            .reduce(RowAccumulator::default, RowAccumulator::reduce)
    }
}
