use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One disjoint m/z interval with explicit endpoint inclusivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MzInterval {
    pub lo: f64,
    pub hi: f64,
    pub lo_closed: bool,
    pub hi_closed: bool,
}

impl MzInterval {
    pub fn closed(lo: f64, hi: f64) -> Self {
        Self {
            lo,
            hi,
            lo_closed: true,
            hi_closed: true,
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        let above_lo = x > self.lo || (self.lo_closed && x == self.lo);
        let below_hi = x < self.hi || (self.hi_closed && x == self.hi);
        above_lo && below_hi
    }

    pub fn is_empty(&self) -> bool {
        match self.lo.partial_cmp(&self.hi) {
            Some(Ordering::Less) => false,
            Some(Ordering::Equal) => !(self.lo_closed && self.hi_closed),
            _ => true,
        }
    }

    fn intersects_closed(&self, lo: f64, hi: f64) -> bool {
        let left_ok = self.hi > lo || (self.hi_closed && self.hi == lo);
        let right_ok = self.lo < hi || (self.lo_closed && self.lo == hi);
        left_ok && right_ok
    }
}

/// Ordering key for intervals: lower bound, closed before open at the same value.
#[derive(Debug, Clone, Copy)]
struct LowerBoundKey {
    lo: f64,
    open: bool,
}

impl PartialEq for LowerBoundKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LowerBoundKey {}

impl PartialOrd for LowerBoundKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LowerBoundKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.lo
            .total_cmp(&other.lo)
            .then(self.open.cmp(&other.open))
    }
}

/// Map from pairwise disjoint m/z intervals to values.
///
/// Intervals are never overwritten. New ranges only claim whatever part of the
/// axis is still free, so whoever inserts first keeps priority over a region.
///
/// ```
/// use diaquery::utils::range_map::MzRangeMap;
///
/// let mut map = MzRangeMap::new();
/// map.insert_non_overlapping(100.0, 100.2, "dominant");
/// map.insert_non_overlapping(100.1, 100.3, "neighbour");
///
/// assert_eq!(map.get(100.15), Some(&"dominant"));
/// assert_eq!(map.get(100.25), Some(&"neighbour"));
/// assert_eq!(map.get(100.35), None);
/// ```
#[derive(Debug, Clone)]
pub struct MzRangeMap<V> {
    entries: BTreeMap<LowerBoundKey, (MzInterval, V)>,
}

impl<V> Default for MzRangeMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> MzRangeMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the interval containing `mz`, if any. O(log n).
    pub fn get(&self, mz: f64) -> Option<&V> {
        self.get_entry(mz).map(|(_, v)| v)
    }

    pub fn get_entry(&self, mz: f64) -> Option<(&MzInterval, &V)> {
        if mz.is_nan() {
            return None;
        }
        let key = LowerBoundKey { lo: mz, open: false };
        let (_, (interval, value)) = self.entries.range(..=key).next_back()?;
        if interval.contains(mz) {
            Some((interval, value))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MzInterval, &V)> {
        self.entries.values().map(|(i, v)| (i, v))
    }

    /// Portions of the closed range `[lo, hi]` not claimed by any interval, ascending.
    pub fn free_gaps(&self, lo: f64, hi: f64) -> Vec<MzInterval> {
        let mut gaps = Vec::new();
        if !(lo <= hi) {
            return gaps;
        }

        let start_key = self
            .entries
            .range(..=LowerBoundKey { lo, open: false })
            .next_back()
            .map(|(k, _)| *k)
            .unwrap_or(LowerBoundKey {
                lo: f64::NEG_INFINITY,
                open: false,
            });

        let mut cursor = (lo, true);
        for (interval, _) in self.entries.range(start_key..).map(|(_, e)| e) {
            if interval.lo > hi {
                break;
            }
            if !interval.intersects_closed(lo, hi) {
                continue;
            }
            let gap = MzInterval {
                lo: cursor.0,
                hi: interval.lo,
                lo_closed: cursor.1,
                hi_closed: !interval.lo_closed,
            };
            if !gap.is_empty() {
                gaps.push(gap);
            }
            cursor = (interval.hi, !interval.hi_closed);
        }

        let tail = MzInterval {
            lo: cursor.0,
            hi,
            lo_closed: cursor.1,
            hi_closed: true,
        };
        // The cursor may sit past `hi` when the last interval overhangs the range.
        if !tail.is_empty() {
            gaps.push(tail);
        }
        gaps
    }

    /// Free sub-interval of `[lo, hi]` that contains `mz`.
    pub fn free_gap_around(&self, mz: f64, lo: f64, hi: f64) -> Option<MzInterval> {
        self.free_gaps(lo, hi).into_iter().find(|g| g.contains(mz))
    }

    /// Inserts an interval that must not overlap any existing one.
    /// Returns false (and does nothing) when it would.
    pub fn insert_disjoint(&mut self, interval: MzInterval, value: V) -> bool {
        if interval.is_empty() || !self.is_free(&interval) {
            return false;
        }
        let key = LowerBoundKey {
            lo: interval.lo,
            open: !interval.lo_closed,
        };
        self.entries.insert(key, (interval, value));
        true
    }

    fn is_free(&self, interval: &MzInterval) -> bool {
        let start_key = self
            .entries
            .range(
                ..=LowerBoundKey {
                    lo: interval.lo,
                    open: false,
                },
            )
            .next_back()
            .map(|(k, _)| *k)
            .unwrap_or(LowerBoundKey {
                lo: f64::NEG_INFINITY,
                open: false,
            });
        for (existing, _) in self.entries.range(start_key..).map(|(_, e)| e) {
            if existing.lo > interval.hi {
                break;
            }
            if intervals_overlap(existing, interval) {
                return false;
            }
        }
        true
    }
}

impl<V: Clone> MzRangeMap<V> {
    /// Claims every still-free piece of `[lo, hi]` for `value`.
    /// Returns how many pieces were inserted (zero when fully covered).
    pub fn insert_non_overlapping(&mut self, lo: f64, hi: f64, value: V) -> usize {
        let gaps = self.free_gaps(lo, hi);
        let n = gaps.len();
        for gap in gaps {
            let key = LowerBoundKey {
                lo: gap.lo,
                open: !gap.lo_closed,
            };
            self.entries.insert(key, (gap, value.clone()));
        }
        n
    }
}

fn intervals_overlap(a: &MzInterval, b: &MzInterval) -> bool {
    let a_before_b = a.hi < b.lo || (a.hi == b.lo && !(a.hi_closed && b.lo_closed));
    let b_before_a = b.hi < a.lo || (b.hi == a.lo && !(b.hi_closed && a.lo_closed));
    !(a_before_b || b_before_a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_on_empty_map() {
        let map: MzRangeMap<usize> = MzRangeMap::new();
        assert_eq!(map.get(100.0), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_first_insert_keeps_priority() {
        let mut map = MzRangeMap::new();
        assert_eq!(map.insert_non_overlapping(10.0, 20.0, 0), 1);
        assert_eq!(map.insert_non_overlapping(15.0, 25.0, 1), 1);

        assert_eq!(map.get(10.0), Some(&0));
        assert_eq!(map.get(20.0), Some(&0));
        assert_eq!(map.get(20.0001), Some(&1));
        assert_eq!(map.get(25.0), Some(&1));
        assert_eq!(map.get(25.1), None);
        assert_eq!(map.get(9.9), None);
    }

    #[test]
    fn test_fully_covered_range_claims_nothing() {
        let mut map = MzRangeMap::new();
        map.insert_non_overlapping(10.0, 20.0, 0);
        assert_eq!(map.insert_non_overlapping(12.0, 18.0, 1), 0);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(15.0), Some(&0));
    }

    #[test]
    fn test_range_spanning_a_claim_is_split() {
        let mut map = MzRangeMap::new();
        map.insert_non_overlapping(14.0, 16.0, 0);
        assert_eq!(map.insert_non_overlapping(10.0, 20.0, 1), 2);

        assert_eq!(map.get(12.0), Some(&1));
        assert_eq!(map.get(14.0), Some(&0));
        assert_eq!(map.get(16.0), Some(&0));
        assert_eq!(map.get(17.0), Some(&1));
        assert_eq!(map.len(), 3);

        let intervals: Vec<_> = map.iter().map(|(i, _)| *i).collect();
        for w in intervals.windows(2) {
            assert!(!intervals_overlap(&w[0], &w[1]), "{:?}", w);
        }
    }

    #[test]
    fn test_free_gap_around_clips_to_neighbours() {
        let mut map = MzRangeMap::new();
        map.insert_non_overlapping(10.0, 11.0, 0);
        map.insert_non_overlapping(13.0, 14.0, 1);

        let gap = map.free_gap_around(12.0, 9.0, 15.0).unwrap();
        assert_eq!(gap.lo, 11.0);
        assert_eq!(gap.hi, 13.0);
        assert!(!gap.lo_closed);
        assert!(!gap.hi_closed);
        assert!(map.free_gap_around(10.5, 9.0, 15.0).is_none());
    }

    #[test]
    fn test_insert_disjoint_rejects_overlap() {
        let mut map = MzRangeMap::new();
        assert!(map.insert_disjoint(MzInterval::closed(1.0, 2.0), 'a'));
        assert!(!map.insert_disjoint(MzInterval::closed(1.5, 3.0), 'b'));
        assert!(map.insert_disjoint(
            MzInterval {
                lo: 2.0,
                hi: 3.0,
                lo_closed: false,
                hi_closed: true
            },
            'c'
        ));
        assert_eq!(map.get(2.0), Some(&'a'));
        assert_eq!(map.get(2.5), Some(&'c'));
    }
}
