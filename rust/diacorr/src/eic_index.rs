use diaquery::IonTimeSeries;
use diaquery::utils::range_map::MzRangeMap;

/// Fragment chromatograms of one isolation window, queryable by m/z.
///
/// Chromatograms claim their m/z span in order of decreasing height. A
/// chromatogram only receives the parts of its span that no more intense
/// chromatogram claimed first, so lookups inside an overlap always resolve to
/// the dominant ion. Chromatograms left with nothing stay enumerable through
/// [`EicRangeIndex::eics`] but are never returned by [`EicRangeIndex::lookup`].
#[derive(Debug, Clone)]
pub struct EicRangeIndex {
    eics: Vec<IonTimeSeries>,
    ranges: MzRangeMap<usize>,
}

impl EicRangeIndex {
    pub fn build(eics: Vec<IonTimeSeries>) -> Self {
        let mut order: Vec<usize> = (0..eics.len()).collect();
        // Stable, so equally intense chromatograms keep their input order.
        order.sort_by(|&a, &b| eics[b].height().total_cmp(&eics[a].height()));

        let mut ranges = MzRangeMap::new();
        for idx in order {
            if let Some((lo, hi)) = eics[idx].mz_span() {
                ranges.insert_non_overlapping(lo, hi, idx);
            }
        }
        Self { eics, ranges }
    }

    /// The chromatogram owning `mz`, if any. O(log n).
    pub fn lookup(&self, mz: f64) -> Option<&IonTimeSeries> {
        self.lookup_position(mz).map(|idx| &self.eics[idx])
    }

    pub fn lookup_position(&self, mz: f64) -> Option<usize> {
        self.ranges.get(mz).copied()
    }

    pub fn eics(&self) -> &[IonTimeSeries] {
        &self.eics
    }

    pub fn get(&self, position: usize) -> Option<&IonTimeSeries> {
        self.eics.get(position)
    }

    pub fn is_empty(&self) -> bool {
        self.eics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.eics.len()
    }

    /// Number of disjoint m/z intervals currently claimed.
    pub fn num_ranges(&self) -> usize {
        self.ranges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eic(mzs: &[f64], intensity: f32) -> IonTimeSeries {
        let n = mzs.len();
        IonTimeSeries::try_new(
            mzs.to_vec(),
            (0..n).map(|i| i as f32).collect(),
            vec![intensity; n],
            (0..n as u32).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_prefers_more_intense_eic() {
        let weak = eic(&[200.000, 200.010], 10.0);
        let strong = eic(&[200.005, 200.020], 100.0);
        let index = EicRangeIndex::build(vec![weak, strong]);

        // overlap zone belongs to the strong trace
        assert_eq!(index.lookup_position(200.008), Some(1));
        assert_eq!(index.lookup_position(200.010), Some(1));
        // exclusive part of the weak trace
        assert_eq!(index.lookup_position(200.002), Some(0));
        assert_eq!(index.lookup_position(200.030), None);
    }

    #[test]
    fn test_fully_covered_eic_is_unreachable() {
        let strong = eic(&[300.0, 300.02], 100.0);
        let covered = eic(&[300.005, 300.01], 50.0);
        let index = EicRangeIndex::build(vec![strong, covered]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.num_ranges(), 1);
        for mz in [300.0, 300.005, 300.007, 300.01, 300.02] {
            assert_eq!(index.lookup_position(mz), Some(0));
        }
    }

    #[test]
    fn test_empty_index() {
        let index = EicRangeIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.lookup(100.0).is_none());
    }
}
