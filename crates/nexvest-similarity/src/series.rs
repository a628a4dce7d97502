//! Time series types with validation guarantees.

use std::ops::{Index, Range};

use crate::error::SimilarityError;

/// Minimum number of points in a [`TimeSeries`].
pub const MIN_SERIES_LEN: usize = 2;

/// Check that `(timestamps, values)` form a valid time series.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::SeriesLengthMismatch`] | `timestamps.len() != values.len()` |
/// | [`SimilarityError::TooShort`] | Fewer than [`MIN_SERIES_LEN`] points |
/// | [`SimilarityError::NonFiniteValue`] | Any value is NaN or infinite |
/// | [`SimilarityError::NonMonotonicTimestamp`] | Timestamps not strictly increasing |
pub fn validate(timestamps: &[i64], values: &[f64]) -> Result<(), SimilarityError> {
    if timestamps.len() != values.len() {
        return Err(SimilarityError::SeriesLengthMismatch {
            timestamps: timestamps.len(),
            values: values.len(),
        });
    }
    if values.len() < MIN_SERIES_LEN {
        return Err(SimilarityError::TooShort {
            len: values.len(),
            min: MIN_SERIES_LEN,
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(SimilarityError::NonFiniteValue { index });
    }
    if let Some(pos) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SimilarityError::NonMonotonicTimestamp {
            index: pos + 1,
            timestamp: timestamps[pos + 1],
            previous: timestamps[pos],
        });
    }
    Ok(())
}

/// Owned, validated time series of `(timestamp, value)` pairs.
///
/// Timestamps are seconds since the Unix epoch and strictly increasing.
/// Values are finite. A series always holds at least [`MIN_SERIES_LEN`] points.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<i64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a new time series, validating it with [`validate`].
    ///
    /// # Errors
    ///
    /// Any error returned by [`validate`].
    pub fn new(timestamps: Vec<i64>, values: Vec<f64>) -> Result<Self, SimilarityError> {
        validate(&timestamps, &values)?;
        Ok(Self { timestamps, values })
    }

    /// Create a series with positional timestamps `0, 1, 2, …`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimilarityError::TooShort`] | Fewer than [`MIN_SERIES_LEN`] values |
    /// | [`SimilarityError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn from_values(values: Vec<f64>) -> Result<Self, SimilarityError> {
        let timestamps = (0..values.len() as i64).collect();
        Self::new(timestamps, values)
    }

    /// Build a series from parts that are already known to be valid.
    pub(crate) fn from_parts_unchecked(timestamps: Vec<i64>, values: Vec<f64>) -> Self {
        debug_assert!(validate(&timestamps, &values).is_ok());
        Self { timestamps, values }
    }

    /// Borrow the values as a zero-copy view.
    #[must_use]
    pub fn as_view(&self) -> TimeSeriesView<'_> {
        TimeSeriesView::new_unchecked(&self.values)
    }

    /// Borrow a contiguous range of values as a view.
    ///
    /// Returns `None` when the range is empty or out of bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<TimeSeriesView<'_>> {
        if range.start >= range.end || range.end > self.values.len() {
            return None;
        }
        Some(TimeSeriesView::new_unchecked(&self.values[range]))
    }

    /// Return the timestamps.
    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Return the values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if the series has no points.
    ///
    /// Always `false` for a constructed series; provided to satisfy the
    /// `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume and return `(timestamps, values)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<i64>, Vec<f64>) {
        (self.timestamps, self.values)
    }
}

impl AsRef<[f64]> for TimeSeries {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = SimilarityError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

/// Borrowed, validated view over a sequence of values. Zero-copy reference.
///
/// Guaranteed non-empty with all finite values. Metrics and DTW operate on
/// views so that whole series and windows share one code path.
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesView<'a>(&'a [f64]);

impl<'a> TimeSeriesView<'a> {
    /// Create a new view, validating that the slice is non-empty and all values are finite.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimilarityError::TooShort`] | `slice` is empty |
    /// | [`SimilarityError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(slice: &'a [f64]) -> Result<Self, SimilarityError> {
        if slice.is_empty() {
            return Err(SimilarityError::TooShort { len: 0, min: 1 });
        }
        if let Some(index) = slice.iter().position(|v| !v.is_finite()) {
            return Err(SimilarityError::NonFiniteValue { index });
        }
        Ok(Self(slice))
    }

    /// Create a view without validation. The caller guarantees the slice is
    /// non-empty and finite.
    #[must_use]
    pub fn new_unchecked(slice: &'a [f64]) -> Self {
        debug_assert!(!slice.is_empty());
        Self(slice)
    }

    /// Return the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &'a [f64] {
        self.0
    }

    /// Return the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the view has no values.
    ///
    /// Always `false` for a view built through [`TimeSeriesView::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a sub-view over `range`, or `None` when it is empty or out of bounds.
    #[must_use]
    pub fn subview(&self, range: Range<usize>) -> Option<TimeSeriesView<'a>> {
        if range.start >= range.end || range.end > self.0.len() {
            return None;
        }
        Some(Self(&self.0[range]))
    }
}

impl Index<usize> for TimeSeriesView<'_> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl AsRef<[f64]> for TimeSeriesView<'_> {
    fn as_ref(&self) -> &[f64] {
        self.0
    }
}
