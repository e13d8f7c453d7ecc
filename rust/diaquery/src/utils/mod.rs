pub mod progress;
pub mod range_map;
pub mod spectra_merging;
pub mod streaming_calculators;
pub mod tuple_range;

pub use progress::{
    AtomicFraction,
    CancellationToken,
};
pub use tuple_range::{
    OptionallyRestricted,
    TupleRange,
    TupleRangeError,
    binary_search_range_by_key,
    closest_index_by_key,
};
