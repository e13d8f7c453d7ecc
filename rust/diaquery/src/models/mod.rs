pub mod ion_series;
pub mod isolation_window;
pub mod scan;
pub mod tolerance;

pub use ion_series::IonTimeSeries;
pub use isolation_window::IsolationWindow;
pub use scan::{
    MobilityScan,
    Polarity,
    RawDataFile,
    Scan,
    ScanSelection,
};
pub use tolerance::Tolerance;
