use nexvest_similarity::{ErrorKind, ParseNormalizationError, SimilarityError};

/// Errors from pattern-search configuration and execution.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    /// Returned when the window step size is zero.
    #[error("step size must be at least 1, got {step_size}")]
    InvalidStepSize {
        /// The rejected step size.
        step_size: usize,
    },

    /// Returned when top-K is zero.
    #[error("top_k must be at least 1, got {top_k}")]
    InvalidTopK {
        /// The rejected top-K.
        top_k: usize,
    },

    /// Returned when the overlap suppression fraction is outside `[0, 1]`.
    #[error("overlap suppression fraction must be in [0, 1], got {fraction}")]
    InvalidOverlapFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// Returned when the DTW length tolerance is negative or non-finite.
    #[error("length tolerance must be finite and at least 0, got {tolerance}")]
    InvalidLengthTolerance {
        /// The rejected tolerance.
        tolerance: f64,
    },

    /// Returned when the DTW window-length step is zero.
    #[error("length step must be at least 1, got {length_step}")]
    InvalidLengthStep {
        /// The rejected length step.
        length_step: usize,
    },

    /// Returned when a computation ceiling is zero.
    #[error("{name} must be at least 1")]
    InvalidCeiling {
        /// Name of the offending ceiling.
        name: &'static str,
    },

    /// Returned when the threshold is NaN.
    #[error("threshold must be a number, got {threshold}")]
    InvalidThreshold {
        /// The rejected threshold.
        threshold: f64,
    },

    /// Returned when an options file names an unknown normalization.
    #[error(transparent)]
    UnknownNormalization(#[from] ParseNormalizationError),

    /// Returned when the planned search exceeds a configured ceiling.
    #[error("search needs {estimated} {unit}, ceiling is {limit}")]
    ComputationTooLarge {
        /// Estimated amount of work.
        estimated: u64,
        /// The configured ceiling.
        limit: u64,
        /// What is being counted (`window evaluations` or `cost units`).
        unit: &'static str,
    },

    /// Returned when the query series fails validation or normalization.
    #[error("query series is unusable: {0}")]
    Query(#[source] SimilarityError),

    /// Returned in strict mode when a candidate series fails validation.
    #[error("candidate \"{id}\" is unusable: {source}")]
    Candidate {
        /// Identifier of the failing candidate.
        id: String,
        /// Why the candidate was rejected.
        #[source]
        source: SimilarityError,
    },

    /// Wraps an error raised while scoring, such as an exhausted budget.
    #[error(transparent)]
    Similarity(#[from] SimilarityError),
}

impl MatchError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStepSize { .. }
            | Self::InvalidTopK { .. }
            | Self::InvalidOverlapFraction { .. }
            | Self::InvalidLengthTolerance { .. }
            | Self::InvalidLengthStep { .. }
            | Self::InvalidCeiling { .. }
            | Self::InvalidThreshold { .. }
            | Self::UnknownNormalization(_) => ErrorKind::InvalidWindow,
            Self::ComputationTooLarge { .. } => ErrorKind::ComputationTooLarge,
            Self::Query(source) | Self::Candidate { source, .. } | Self::Similarity(source) => {
                source.kind()
            }
        }
    }
}
