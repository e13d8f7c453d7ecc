#![doc = include_str!("../README.md")]

// Re-export main structures
pub use crate::chromatogram::{
    ChromatogramBuilder,
    ChromatogramParams,
    ConsecutiveScanChromatogramBuilder,
};
pub use crate::models::{
    IonTimeSeries,
    IsolationWindow,
    MobilityScan,
    Polarity,
    RawDataFile,
    Scan,
    ScanSelection,
    Tolerance,
};
pub use crate::utils::{
    AtomicFraction,
    CancellationToken,
    OptionallyRestricted,
    TupleRange,
};

// Declare modules
pub mod chromatogram;
pub mod errors;
pub mod models;
pub mod utils;

// Re-export errors
pub use crate::errors::{
    DataProcessingError,
    DiaQueryError,
};
