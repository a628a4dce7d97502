//! Fixed-length metrics (Euclidean, Pearson, cosine) and the metric selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::dtw::Dtw;
use crate::error::SimilarityError;
use crate::preprocess::{rescale_large, rescale_pair};
use crate::score::{Orientation, SimilarityScore};
use crate::series::TimeSeriesView;

/// The closed set of supported metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Euclidean distance. A true metric.
    Euclidean,
    /// Pearson correlation coefficient in `[-1, 1]`.
    Pearson,
    /// Cosine similarity in `[-1, 1]`.
    Cosine,
    /// Dynamic Time Warping distance. Not a true metric.
    Dtw,
}

impl MetricKind {
    /// Every metric, in declaration order.
    pub const ALL: [Self; 4] = [Self::Euclidean, Self::Pearson, Self::Cosine, Self::Dtw];

    /// Return whether lower or higher scores are better.
    #[must_use]
    pub fn orientation(self) -> Orientation {
        match self {
            Self::Euclidean | Self::Dtw => Orientation::LowerIsBetter,
            Self::Pearson | Self::Cosine => Orientation::HigherIsBetter,
        }
    }

    /// Return true for metrics that only accept sequences of equal length.
    #[must_use]
    pub fn requires_equal_length(self) -> bool {
        !matches!(self, Self::Dtw)
    }

    /// Return the canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Pearson => "pearson",
            Self::Cosine => "cosine",
            Self::Dtw => "dtw",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a metric name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric \"{0}\" (expected euclidean, pearson, cosine, or dtw)")]
pub struct ParseMetricError(pub String);

impl FromStr for MetricKind {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseMetricError(s.to_string()))
    }
}

/// A configured metric, ready to score pairs of sequences.
///
/// Dispatch is a plain `match`; only DTW carries configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// See [`euclidean`].
    Euclidean,
    /// See [`pearson`].
    Pearson,
    /// See [`cosine`].
    Cosine,
    /// See [`Dtw`].
    Dtw(Dtw),
}

impl Metric {
    /// Build a metric of `kind`; `dtw` is used only for [`MetricKind::Dtw`].
    #[must_use]
    pub fn new(kind: MetricKind, dtw: Dtw) -> Self {
        match kind {
            MetricKind::Euclidean => Self::Euclidean,
            MetricKind::Pearson => Self::Pearson,
            MetricKind::Cosine => Self::Cosine,
            MetricKind::Dtw => Self::Dtw(dtw),
        }
    }

    /// Return the kind of this metric.
    #[must_use]
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Euclidean => MetricKind::Euclidean,
            Self::Pearson => MetricKind::Pearson,
            Self::Cosine => MetricKind::Cosine,
            Self::Dtw(_) => MetricKind::Dtw,
        }
    }

    /// Score `a` against `b`.
    ///
    /// Fixed-length metrics charge `a.len()` steps to `budget`; DTW charges
    /// per DP row.
    ///
    /// # Errors
    ///
    /// Any error of the underlying metric function, or a timeout-kind error
    /// from `budget`.
    pub fn score(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        budget: &Budget,
    ) -> Result<SimilarityScore, SimilarityError> {
        let value = match self {
            Self::Euclidean => {
                budget.charge(a.len() as u64)?;
                euclidean(a, b)?
            }
            Self::Pearson => {
                budget.charge(a.len() as u64)?;
                pearson(a, b)?
            }
            Self::Cosine => {
                budget.charge(a.len() as u64)?;
                cosine(a, b)?
            }
            Self::Dtw(dtw) => dtw.distance(a, b, budget)?.value(),
        };
        Ok(SimilarityScore::new(self.kind(), value))
    }

    /// Score `a` against `b`, returning `None` when the score cannot pass
    /// `threshold`.
    ///
    /// DTW abandons the DP as soon as the distance is known to exceed the
    /// threshold; the other metrics are scored in full and then filtered.
    ///
    /// # Errors
    ///
    /// Same as [`score`][Metric::score].
    pub fn score_within(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        threshold: f64,
        budget: &Budget,
    ) -> Result<Option<SimilarityScore>, SimilarityError> {
        let score = match self {
            Self::Dtw(dtw) => {
                let distance = dtw.distance_with_cutoff(a, b, threshold, budget)?;
                if !distance.is_finite() {
                    return Ok(None);
                }
                SimilarityScore::new(MetricKind::Dtw, distance.value())
            }
            _ => self.score(a, b, budget)?,
        };
        Ok(score.passes(threshold).then_some(score))
    }
}

fn check_equal_length(a: &[f64], b: &[f64]) -> Result<(), SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::LengthMismatch { left: a.len(), right: b.len() });
    }
    Ok(())
}

/// Euclidean distance `sqrt(sum((a_i - b_i)^2))`.
///
/// Symmetric, zero iff the sequences are identical, and satisfies the
/// triangle inequality. Inputs above `1e100` in magnitude are rescaled
/// before squaring; the result is `inf` only when the true distance exceeds
/// `f64::MAX`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::LengthMismatch`] | `a.len() != b.len()` |
pub fn euclidean(a: TimeSeriesView<'_>, b: TimeSeriesView<'_>) -> Result<f64, SimilarityError> {
    let (a, b) = (a.as_slice(), b.as_slice());
    check_equal_length(a, b)?;
    let (a, b, scale) = rescale_pair(a, b);
    let sum_sq = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f64>();
    Ok(scale * sum_sq.sqrt())
}

/// Pearson correlation coefficient, computed with the two-pass formula.
///
/// Invariant under positive affine transforms of either input. The result is
/// clamped to `[-1, 1]` to absorb rounding.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::LengthMismatch`] | `a.len() != b.len()` |
/// | [`SimilarityError::TooShort`] | Fewer than 2 points |
/// | [`SimilarityError::ZeroVariance`] | Either input is constant |
pub fn pearson(a: TimeSeriesView<'_>, b: TimeSeriesView<'_>) -> Result<f64, SimilarityError> {
    let (a, b) = (a.as_slice(), b.as_slice());
    check_equal_length(a, b)?;
    let n = a.len();
    if n < 2 {
        return Err(SimilarityError::TooShort { len: n, min: 2 });
    }
    for side in [a, b] {
        if side.iter().all(|&x| x == side[0]) {
            return Err(SimilarityError::ZeroVariance { len: n });
        }
    }

    let (a, b) = (rescale_large(a), rescale_large(b));
    let nf = n as f64;
    let mean_a = a.iter().sum::<f64>() / nf;
    let mean_b = b.iter().sum::<f64>() / nf;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return Err(SimilarityError::ZeroVariance { len: n });
    }
    Ok((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine similarity `a·b / (|a| |b|)`.
///
/// Invariant under positive scaling of either input, but not under an
/// additive offset.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::LengthMismatch`] | `a.len() != b.len()` |
/// | [`SimilarityError::ZeroNorm`] | Either input is the zero vector |
pub fn cosine(a: TimeSeriesView<'_>, b: TimeSeriesView<'_>) -> Result<f64, SimilarityError> {
    let (a, b) = (a.as_slice(), b.as_slice());
    check_equal_length(a, b)?;
    let (a, b) = (rescale_large(a), rescale_large(b));
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SimilarityError::ZeroNorm { len: a.len() });
    }
    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}
