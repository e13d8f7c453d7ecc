use std::fmt::Display;
use std::hash::{
    Hash,
    Hasher,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::utils::TupleRange;

/// Precursor isolation window of an MS2 acquisition.
///
/// Equality and hashing are structural over the exact bit patterns of both
/// ranges, so windows that differ only by floating point noise are distinct.
/// An absent range does not restrict that dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IsolationWindow {
    pub mz_range: Option<TupleRange<f64>>,
    pub mobility_range: Option<TupleRange<f32>>,
}

impl IsolationWindow {
    pub fn new(mz_range: Option<TupleRange<f64>>, mobility_range: Option<TupleRange<f32>>) -> Self {
        Self {
            mz_range,
            mobility_range,
        }
    }

    pub fn from_mz(mz_range: TupleRange<f64>) -> Self {
        Self::new(Some(mz_range), None)
    }

    pub fn contains_mz(&self, mz: f64) -> bool {
        self.mz_range.map_or(true, |r| r.contains(mz))
    }

    pub fn contains_mobility(&self, mobility: f32) -> bool {
        self.mobility_range.map_or(true, |r| r.contains(mobility))
    }

    /// Whether an ion at `mz` (and optionally `mobility`) would be co-isolated.
    pub fn contains_ion(&self, mz: f64, mobility: Option<f32>) -> bool {
        self.contains_mz(mz) && mobility.map_or(true, |m| self.contains_mobility(m))
    }

    fn bit_key(&self) -> (Option<(u64, u64)>, Option<(u32, u32)>) {
        (
            self.mz_range
                .map(|r| (r.start().to_bits(), r.end().to_bits())),
            self.mobility_range
                .map(|r| (r.start().to_bits(), r.end().to_bits())),
        )
    }
}

impl PartialEq for IsolationWindow {
    fn eq(&self, other: &Self) -> bool {
        self.bit_key() == other.bit_key()
    }
}

impl Eq for IsolationWindow {}

impl Hash for IsolationWindow {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bit_key().hash(state);
    }
}

impl PartialOrd for IsolationWindow {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by m/z start, then mobility start, falling back to the bit patterns.
impl Ord for IsolationWindow {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let mz_start = |w: &Self| w.mz_range.map(|r| r.start()).unwrap_or(f64::NEG_INFINITY);
        let mob_start = |w: &Self| {
            w.mobility_range
                .map(|r| r.start())
                .unwrap_or(f32::NEG_INFINITY)
        };
        mz_start(self)
            .total_cmp(&mz_start(other))
            .then(mob_start(self).total_cmp(&mob_start(other)))
            .then(self.bit_key().cmp(&other.bit_key()))
    }
}

impl Display for IsolationWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mz_range {
            Some(r) => write!(f, "m/z {:.4}-{:.4}", r.start(), r.end())?,
            None => write!(f, "m/z any")?,
        }
        if let Some(r) = self.mobility_range {
            write!(f, ", mobility {:.4}-{:.4}", r.start(), r.end())?;
        }
        Ok(())
    }
}
