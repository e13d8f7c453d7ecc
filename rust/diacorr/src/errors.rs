use diaquery::{
    DataProcessingError,
    DiaQueryError,
};

#[derive(Debug)]
pub enum DiaCorrError {
    /// The task cannot run with the given inputs or parameters.
    Configuration {
        msg: String,
    },
    DiaQuery(DiaQueryError),
}

impl DiaCorrError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration { msg: msg.into() }
    }
}

impl std::fmt::Display for DiaCorrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration { msg } => write!(f, "Configuration error: {}", msg),
            Self::DiaQuery(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DiaCorrError {}

pub type Result<T> = std::result::Result<T, DiaCorrError>;

impl From<DiaQueryError> for DiaCorrError {
    fn from(x: DiaQueryError) -> Self {
        Self::DiaQuery(x)
    }
}

impl From<DataProcessingError> for DiaCorrError {
    fn from(x: DataProcessingError) -> Self {
        Self::DiaQuery(DiaQueryError::DataProcessingError(x))
    }
}
