use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::DataProcessingError;
use crate::models::isolation_window::IsolationWindow;
use crate::utils::TupleRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    #[default]
    Unknown,
}

/// One sub-spectrum of an ion mobility frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityScan {
    pub mobility: f32,
    pub mzs: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl MobilityScan {
    pub fn try_new(
        mobility: f32,
        mzs: Vec<f64>,
        intensities: Vec<f64>,
    ) -> Result<Self, DataProcessingError> {
        check_peak_arrays(&mzs, &intensities)?;
        Ok(Self {
            mobility,
            mzs,
            intensities,
        })
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mzs.iter().copied().zip(self.intensities.iter().copied())
    }
}

/// A single acquired spectrum.
///
/// For ion mobility data `mobility_scans` holds the frame's sub-spectra and the
/// flat `mzs`/`intensities` arrays may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub index: u32,
    /// Retention time in minutes.
    pub rt: f32,
    pub ms_level: u8,
    #[serde(default)]
    pub polarity: Polarity,
    pub mzs: Vec<f64>,
    pub intensities: Vec<f64>,
    #[serde(default)]
    pub isolation_windows: Vec<IsolationWindow>,
    #[serde(default)]
    pub mobility_scans: Option<Vec<MobilityScan>>,
}

impl Scan {
    pub fn try_new(
        index: u32,
        rt: f32,
        ms_level: u8,
        mzs: Vec<f64>,
        intensities: Vec<f64>,
    ) -> Result<Self, DataProcessingError> {
        check_peak_arrays(&mzs, &intensities)?;
        Ok(Self {
            index,
            rt,
            ms_level,
            polarity: Polarity::default(),
            mzs,
            intensities,
            isolation_windows: Vec::new(),
            mobility_scans: None,
        })
    }

    pub fn with_isolation_window(mut self, window: IsolationWindow) -> Self {
        self.isolation_windows.push(window);
        self
    }

    pub fn with_mobility_scans(self, mobility_scans: Vec<MobilityScan>) -> Self {
        Self {
            mobility_scans: Some(mobility_scans),
            ..self
        }
    }

    pub fn num_peaks(&self) -> usize {
        self.mzs.len()
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mzs.iter().copied().zip(self.intensities.iter().copied())
    }

    pub fn has_mobility(&self) -> bool {
        self.mobility_scans.is_some()
    }

    /// Mobility sub-scans whose mobility falls inside `range` (all when `None`).
    pub fn mobility_scans_in(
        &self,
        range: Option<TupleRange<f32>>,
    ) -> impl Iterator<Item = &MobilityScan> {
        self.mobility_scans
            .iter()
            .flatten()
            .filter(move |s| range.map_or(true, |r| r.contains(s.mobility)))
    }

    pub fn validate(&self) -> Result<(), DataProcessingError> {
        check_peak_arrays(&self.mzs, &self.intensities)?;
        for mob in self.mobility_scans.iter().flatten() {
            check_peak_arrays(&mob.mzs, &mob.intensities)?;
        }
        Ok(())
    }
}

fn check_peak_arrays(mzs: &[f64], intensities: &[f64]) -> Result<(), DataProcessingError> {
    if mzs.len() != intensities.len() {
        return Err(DataProcessingError::ExpectedVectorSameLength {
            expected: mzs.len(),
            other: intensities.len(),
            context: "scan peak arrays",
        });
    }
    if let Some((index, value)) = mzs
        .iter()
        .chain(intensities.iter())
        .enumerate()
        .find(|(_, v)| !v.is_finite())
    {
        return Err(DataProcessingError::ExpectedFiniteValue {
            index: index % mzs.len().max(1),
            value: *value,
        });
    }
    Ok(())
}

/// Filter applied to the scans of a raw file before processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSelection {
    pub ms_level: u8,
    #[serde(default)]
    pub rt_range: Option<TupleRange<f32>>,
}

impl Default for ScanSelection {
    fn default() -> Self {
        Self {
            ms_level: 2,
            rt_range: None,
        }
    }
}

impl ScanSelection {
    pub fn matches(&self, scan: &Scan) -> bool {
        scan.ms_level == self.ms_level && self.rt_range.map_or(true, |r| r.contains(scan.rt))
    }
}

/// An acquisition held in memory: scans in acquisition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataFile {
    pub name: String,
    pub scans: Vec<Scan>,
}

impl RawDataFile {
    pub fn new(name: impl Into<String>, scans: Vec<Scan>) -> Self {
        Self {
            name: name.into(),
            scans,
        }
    }

    /// Checks peak arrays and that retention times never decrease.
    pub fn validate(&self) -> Result<(), DataProcessingError> {
        let mut previous_rt = f32::NEG_INFINITY;
        for scan in &self.scans {
            scan.validate()?;
            if scan.rt < previous_rt {
                return Err(DataProcessingError::UnorderedRetentionTimes {
                    scan_index: scan.index,
                    rt: scan.rt,
                    previous_rt,
                });
            }
            previous_rt = scan.rt;
        }
        Ok(())
    }

    pub fn matching_scans<'a>(
        &'a self,
        selection: &'a ScanSelection,
    ) -> impl Iterator<Item = &'a Scan> + 'a {
        self.scans.iter().filter(move |s| selection.matches(s))
    }

    pub fn has_mobility(&self) -> bool {
        self.scans.iter().any(|s| s.has_mobility())
    }
}
