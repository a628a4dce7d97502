//! Score value types: raw DTW distances and metric-tagged similarity scores.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::metric::MetricKind;
use crate::path::WarpingPath;

/// A non-negative DTW distance value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DtwDistance(f64);

impl DtwDistance {
    /// Infinite DTW distance, returned when early abandoning.
    pub const INFINITY: Self = Self(f64::INFINITY);

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return true unless the computation was abandoned.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for DtwDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Which direction of a score is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Distances: 0 is a perfect match.
    LowerIsBetter,
    /// Similarities in `[-1, 1]`: 1 is a perfect match.
    HigherIsBetter,
}

impl Orientation {
    /// Compare two raw scores so that the better one orders first.
    #[must_use]
    pub fn best_first(self, a: f64, b: f64) -> Ordering {
        match self {
            Self::LowerIsBetter => a.total_cmp(&b),
            Self::HigherIsBetter => b.total_cmp(&a),
        }
    }

    /// Return true if `value` satisfies `threshold` in this orientation
    /// (`value <= threshold` for distances, `value >= threshold` for similarities).
    #[must_use]
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LowerIsBetter => value <= threshold,
            Self::HigherIsBetter => value >= threshold,
        }
    }
}

/// The result of scoring two sequences under one metric.
///
/// Euclidean and DTW values are non-negative distances. Pearson and cosine
/// values are raw similarities in `[-1, 1]`, never converted to distances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityScore {
    metric: MetricKind,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<WarpingPath>,
}

impl SimilarityScore {
    /// Create a score without a path.
    #[must_use]
    pub fn new(metric: MetricKind, value: f64) -> Self {
        Self { metric, value, path: None }
    }

    pub(crate) fn with_path(mut self, path: WarpingPath) -> Self {
        self.path = Some(path);
        self
    }

    /// Return the metric that produced this score.
    #[must_use]
    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Return the raw distance or similarity.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Return the DTW alignment path, when one was requested.
    #[must_use]
    pub fn path(&self) -> Option<&WarpingPath> {
        self.path.as_ref()
    }

    /// Return the orientation of this score's metric.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.metric.orientation()
    }

    /// Return true if this score satisfies `threshold` for its metric.
    #[must_use]
    pub fn passes(&self, threshold: f64) -> bool {
        self.orientation().passes(self.value, threshold)
    }

    /// Order two scores of the same metric best first.
    #[must_use]
    pub fn cmp_best_first(&self, other: &Self) -> Ordering {
        debug_assert_eq!(self.metric, other.metric);
        self.orientation().best_first(self.value, other.value)
    }
}

impl fmt::Display for SimilarityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:.6}", self.metric, self.value)
    }
}
