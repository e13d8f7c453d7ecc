use std::fmt::Display;

use crate::utils::TupleRangeError;

#[derive(Debug)]
pub enum DiaQueryError {
    DataProcessingError(DataProcessingError),
    Canceled,
}

impl Display for DiaQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataProcessingError(e) => write!(f, "{}", e),
            Self::Canceled => write!(f, "Operation was canceled"),
        }
    }
}

impl std::error::Error for DiaQueryError {}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProcessingError {
    ExpectedVectorSameLength {
        expected: usize,
        other: usize,
        context: &'static str,
    },
    ExpectedNonEmptyData {
        context: &'static str,
    },
    UnorderedRetentionTimes {
        scan_index: u32,
        rt: f32,
        previous_rt: f32,
    },
    ExpectedFiniteValue {
        index: usize,
        value: f64,
    },
    InvalidRange(String),
}

impl Display for DataProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedVectorSameLength {
                expected,
                other,
                context,
            } => write!(
                f,
                "Expected arrays of the same length in {}, got {} and {}",
                context, expected, other
            ),
            Self::ExpectedNonEmptyData { context } => {
                write!(f, "Expected non-empty data in {}", context)
            }
            Self::UnorderedRetentionTimes {
                scan_index,
                rt,
                previous_rt,
            } => write!(
                f,
                "Retention time of scan #{} ({}) is smaller than the retention time of the previous scan ({})",
                scan_index, rt, previous_rt
            ),
            Self::ExpectedFiniteValue { index, value } => {
                write!(f, "Expected a finite value at index {}, got {}", index, value)
            }
            Self::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
        }
    }
}

impl From<DataProcessingError> for DiaQueryError {
    fn from(e: DataProcessingError) -> Self {
        DiaQueryError::DataProcessingError(e)
    }
}

impl<T: Copy + PartialOrd + std::fmt::Debug> From<TupleRangeError<T>> for DataProcessingError {
    fn from(e: TupleRangeError<T>) -> Self {
        DataProcessingError::InvalidRange(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiaQueryError>;
