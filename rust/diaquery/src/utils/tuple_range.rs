use thiserror::Error;

/// Finds the index range of elements in a sorted slice whose keys fall within `[start, end]`.
///
/// The slice must be sorted by the key function (ascending). Works on partially
/// ordered keys (retention times, m/z values), NaN keys are never inside the range.
///
/// # Time Complexity
///
/// O(log n) where n is the length of the slice.
///
/// # Examples
///
/// ```
/// use diaquery::utils::binary_search_range_by_key;
///
/// let rts = vec![9.0f32, 9.5, 12.0, 12.5];
/// let range = binary_search_range_by_key(&rts, (9.8, 12.2), |x| *x);
/// assert_eq!(range, 2..3);
/// assert_eq!(&rts[range], &[12.0]);
///
/// let empty = binary_search_range_by_key(&rts, (20.0, 30.0), |x| *x);
/// assert!(rts[empty].is_empty());
/// ```
pub fn binary_search_range_by_key<T, K, F>(
    slice: &[T],
    key_range: (K, K),
    key_fn: F,
) -> std::ops::Range<usize>
where
    F: Fn(&T) -> K,
    K: PartialOrd,
{
    let start_idx = slice.partition_point(|x| key_fn(x) < key_range.0);
    let end_idx = start_idx + slice[start_idx..].partition_point(|x| key_fn(x) <= key_range.1);

    start_idx..end_idx
}

/// Finds the index of the element whose key is closest to `target`.
///
/// Returns `None` when the slice is empty or when the target falls outside
/// `[first, last]` of the (ascending) keys. Ties resolve to the earlier element.
///
/// ```
/// use diaquery::utils::closest_index_by_key;
///
/// let rts = vec![9.0f32, 9.5, 10.2, 12.0];
/// assert_eq!(closest_index_by_key(&rts, 10.0, |x| *x), Some(2));
/// assert_eq!(closest_index_by_key(&rts, 9.0, |x| *x), Some(0));
/// assert_eq!(closest_index_by_key(&rts, 8.9, |x| *x), None);
/// assert_eq!(closest_index_by_key(&rts, 12.1, |x| *x), None);
/// ```
pub fn closest_index_by_key<T, F>(slice: &[T], target: f32, key_fn: F) -> Option<usize>
where
    F: Fn(&T) -> f32,
{
    let first = key_fn(slice.first()?);
    let last = key_fn(slice.last()?);
    if !(first <= target && target <= last) {
        return None;
    }

    let right = slice.partition_point(|x| key_fn(x) < target);
    if right == 0 {
        return Some(0);
    }
    let left = right - 1;
    if right >= slice.len() {
        return Some(left);
    }
    let left_diff = (target - key_fn(&slice[left])).abs();
    let right_diff = (key_fn(&slice[right]) - target).abs();
    if right_diff < left_diff {
        Some(right)
    } else {
        Some(left)
    }
}

/// TupleRange represents a range defined by a tuple of two elements (T, T).
///
/// It represents a range as closed-closed [a, b], meaning both endpoints are inclusive.
/// Importantly, it ensures that the first element is always less than or equal to the second,
/// to enforce early exit in cases where a range would be propagated poinlessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TupleRange<T: Copy + PartialOrd>(T, T);

#[derive(Error, Debug)]
pub enum TupleRangeError<T: Copy + PartialOrd + std::fmt::Debug> {
    #[error(
        "Expected the first element to be less than or equal to the second, got ({0:?}, {1:?})"
    )]
    ExpectedOrderedRange(T, T),
}

impl<T: Copy + PartialOrd + std::fmt::Debug> TupleRange<T> {
    /// Creates a new `TupleRange` ensuring that the first element
    /// is less than or equal to the second.
    pub fn try_new(left: T, right: T) -> Result<Self, TupleRangeError<T>> {
        // NaN endpoints fail this comparison too
        if left <= right {
            Ok(Self(left, right))
        } else {
            Err(TupleRangeError::ExpectedOrderedRange(left, right))
        }
    }

    /// Builds the range covering both values, in whichever order they come.
    pub fn spanning(a: T, b: T) -> Self {
        if b < a {
            Self(b, a)
        } else {
            Self(a, b)
        }
    }

    pub fn as_tuple(&self) -> (T, T) {
        (self.0, self.1)
    }

    pub fn contains(&self, x: T) -> bool {
        self.0 <= x && x <= self.1
    }

    pub fn start(&self) -> T {
        self.0
    }

    pub fn end(&self) -> T {
        self.1
    }

    pub fn try_intercept(&self, other: Self) -> Option<Self> {
        let left = if self.start() < other.start() {
            other.start()
        } else {
            self.start()
        };
        let right = if self.end() < other.end() {
            self.end()
        } else {
            other.end()
        };
        if left > right {
            None
        } else {
            Some(Self(left, right))
        }
    }
}

/// A bound that may be absent, meaning "anything matches".
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OptionallyRestricted<T: Copy> {
    Restricted(T),
    Unrestricted,
}
