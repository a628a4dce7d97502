//! Error types for series validation, metric computation, and DTW.

use std::fmt;
use std::time::Duration;

/// Coarse classification of a failure.
///
/// Callers that need a policy decision (for example skipping a malformed
/// candidate but aborting on a timeout) match on the kind rather than on
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, empty, or non-finite input.
    InvalidSeries,
    /// An equal-length metric was given sequences of different lengths.
    LengthMismatch,
    /// Zero variance or zero norm makes the metric undefined.
    DegenerateSeries,
    /// Negative or inconsistent warping-window / window-length parameters.
    InvalidWindow,
    /// A configured cost ceiling would be exceeded.
    ComputationTooLarge,
    /// A wall-clock or step budget was exhausted.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidSeries => "invalid series",
            Self::LengthMismatch => "length mismatch",
            Self::DegenerateSeries => "degenerate series",
            Self::InvalidWindow => "invalid window",
            Self::ComputationTooLarge => "computation too large",
            Self::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// Errors from series validation, normalization, metrics, and DTW.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimilarityError {
    /// Returned when a sequence has fewer points than the operation needs.
    #[error("sequence has {len} points, at least {min} required")]
    TooShort {
        /// Number of points provided.
        len: usize,
        /// Minimum number of points required.
        min: usize,
    },

    /// Returned when timestamps and values have different lengths.
    #[error("series has {timestamps} timestamps but {values} values")]
    SeriesLengthMismatch {
        /// Number of timestamps.
        timestamps: usize,
        /// Number of values.
        values: usize,
    },

    /// Returned when a value is NaN, infinity, or negative infinity.
    #[error("non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when `timestamps[index] <= timestamps[index - 1]`.
    #[error("timestamp at index {index} ({timestamp}) does not follow {previous}")]
    NonMonotonicTimestamp {
        /// Position of the offending timestamp.
        index: usize,
        /// The offending timestamp.
        timestamp: i64,
        /// The timestamp immediately before it.
        previous: i64,
    },

    /// Returned when an equal-length metric is given sequences of different lengths.
    #[error("sequences must have equal length, got {left} and {right}")]
    LengthMismatch {
        /// Length of the first sequence.
        left: usize,
        /// Length of the second sequence.
        right: usize,
    },

    /// Returned when a sequence has zero variance.
    #[error("sequence of {len} points has zero variance")]
    ZeroVariance {
        /// Length of the constant sequence.
        len: usize,
    },

    /// Returned when a vector has zero Euclidean norm.
    #[error("vector of {len} points has zero norm")]
    ZeroNorm {
        /// Length of the zero vector.
        len: usize,
    },

    /// Returned when a percent return would divide by a zero prior value.
    #[error("zero value at index {index} makes the next percent return undefined")]
    ZeroPriorValue {
        /// Position of the zero value.
        index: usize,
    },

    /// Returned when a negative Sakoe-Chiba radius is requested.
    #[error("warping window must be non-negative, got {radius}")]
    NegativeWarpingWindow {
        /// The rejected radius.
        radius: i64,
    },

    /// Returned when the wall-clock budget runs out.
    #[error("computation exceeded its {budget:?} deadline")]
    DeadlineExceeded {
        /// The configured wall-clock budget.
        budget: Duration,
    },

    /// Returned when the step budget runs out.
    #[error("computation exhausted its budget of {budget} steps")]
    StepBudgetExhausted {
        /// The configured step budget.
        budget: u64,
    },
}

impl SimilarityError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TooShort { .. }
            | Self::SeriesLengthMismatch { .. }
            | Self::NonFiniteValue { .. }
            | Self::NonMonotonicTimestamp { .. } => ErrorKind::InvalidSeries,
            Self::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            Self::ZeroVariance { .. } | Self::ZeroNorm { .. } | Self::ZeroPriorValue { .. } => {
                ErrorKind::DegenerateSeries
            }
            Self::NegativeWarpingWindow { .. } => ErrorKind::InvalidWindow,
            Self::DeadlineExceeded { .. } | Self::StepBudgetExhausted { .. } => ErrorKind::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_every_variant_family() {
        assert_eq!(SimilarityError::TooShort { len: 1, min: 2 }.kind(), ErrorKind::InvalidSeries);
        assert_eq!(
            SimilarityError::LengthMismatch { left: 1, right: 2 }.kind(),
            ErrorKind::LengthMismatch
        );
        assert_eq!(SimilarityError::ZeroNorm { len: 3 }.kind(), ErrorKind::DegenerateSeries);
        assert_eq!(
            SimilarityError::NegativeWarpingWindow { radius: -1 }.kind(),
            ErrorKind::InvalidWindow
        );
        assert_eq!(
            SimilarityError::StepBudgetExhausted { budget: 10 }.kind(),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn display_mentions_offending_values() {
        let err = SimilarityError::NonMonotonicTimestamp { index: 3, timestamp: 5, previous: 7 };
        assert_eq!(err.to_string(), "timestamp at index 3 (5) does not follow 7");
    }
}
