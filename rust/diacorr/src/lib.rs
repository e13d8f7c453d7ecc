//! Pseudo MS2 spectra for DIA data.
//!
//! MS2 scans are grouped by isolation window, fragment chromatograms are
//! built per window and every MS1 feature is correlated against the
//! fragments of the windows that could have isolated it.

pub mod eic_index;
pub mod errors;
pub mod features;
pub mod pairing;
pub mod params;
pub mod shape;
pub mod task;
pub mod utils;
pub mod windows;

pub use eic_index::EicRangeIndex;
pub use errors::{
    DiaCorrError,
    Result,
};
pub use features::{
    AppliedMethod,
    Feature,
    FeatureList,
    FeatureListRow,
    FeatureStatus,
    PseudoSpectrum,
    PseudoSpectrumType,
};
pub use params::{
    DiaCorrParameters,
    PairingAlgorithm,
};
pub use task::{
    CorrelationStats,
    DiaMs2CorrTask,
    TaskOutcome,
    TaskProgress,
    TaskStatus,
};
