//! One-call entry points: normalize, score, and optionally align.

use std::time::Duration;

use tracing::{debug, instrument};

use crate::budget::Budget;
use crate::constraint::BandConstraint;
use crate::dtw::Dtw;
use crate::error::SimilarityError;
use crate::matrix::DistanceMatrix;
use crate::metric::{Metric, MetricKind};
use crate::preprocess::{Normalization, normalize};
use crate::score::SimilarityScore;
use crate::series::TimeSeries;

/// Parameters for [`compute_distance`] and [`compute_pairwise`].
///
/// Defaults: no normalization, unconstrained DTW, no path, no limits.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistanceParams {
    normalization: Normalization,
    constraint: BandConstraint,
    with_path: bool,
    max_duration: Option<Duration>,
    max_steps: Option<u64>,
}

impl DistanceParams {
    /// Create parameters with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the normalization applied to both inputs before scoring.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the DTW warping band. Ignored by the fixed-length metrics.
    #[must_use]
    pub fn with_constraint(mut self, constraint: BandConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Request the DTW alignment path alongside the distance.
    #[must_use]
    pub fn with_path(mut self, with_path: bool) -> Self {
        self.with_path = with_path;
        self
    }

    /// Set a wall-clock limit.
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Set a step limit (DP cells for DTW, points for the fixed metrics).
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Return the normalization mode.
    #[must_use]
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Return the DTW band constraint.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Return true if a DTW path is requested.
    #[must_use]
    pub fn wants_path(&self) -> bool {
        self.with_path
    }

    /// Build a fresh budget from the configured limits.
    #[must_use]
    pub fn budget(&self) -> Budget {
        Budget::new(self.max_duration, self.max_steps)
    }
}

/// Normalize `a` and `b`, then score them under `metric`.
///
/// With [`DistanceParams::with_path`] set and `metric == Dtw` the returned
/// score carries the warping path. Other metrics never produce a path.
///
/// # Errors
///
/// | Kind | Condition |
/// |---|---|
/// | `LengthMismatch` | Fixed-length metric on inputs of different lengths (after normalization) |
/// | `DegenerateSeries` | Constant input for z-score or Pearson, zero norm for cosine, zero price for returns |
/// | `InvalidSeries` | Too few points for percent returns |
/// | `Timeout` | The configured budget ran out |
#[instrument(skip(a, b, params), fields(n = a.len(), m = b.len()))]
pub fn compute_distance(
    a: &TimeSeries,
    b: &TimeSeries,
    metric: MetricKind,
    params: &DistanceParams,
) -> Result<SimilarityScore, SimilarityError> {
    let a = normalize(a, params.normalization)?;
    let b = normalize(b, params.normalization)?;
    let budget = params.budget();
    let dtw = Dtw::from_constraint(params.constraint);

    let score = if metric == MetricKind::Dtw && params.with_path {
        let (distance, path) = dtw.distance_and_path(a.as_view(), b.as_view(), &budget)?;
        SimilarityScore::new(metric, distance.value()).with_path(path)
    } else {
        Metric::new(metric, dtw).score(a.as_view(), b.as_view(), &budget)?
    };

    debug!(%score, steps = budget.steps_used(), "computed distance");
    Ok(score)
}

/// Score every pair of `series` under `metric` in parallel.
///
/// All pairs share one budget built from `params`. Paths are never computed.
///
/// # Errors
///
/// The first error raised by normalization or by any pair.
#[instrument(skip(series, params), fields(n = series.len()))]
pub fn compute_pairwise(
    series: &[TimeSeries],
    metric: MetricKind,
    params: &DistanceParams,
) -> Result<DistanceMatrix, SimilarityError> {
    let normalized = series
        .iter()
        .map(|s| normalize(s, params.normalization))
        .collect::<Result<Vec<_>, _>>()?;
    let budget = params.budget();
    let scorer = Metric::new(metric, Dtw::from_constraint(params.constraint));
    DistanceMatrix::try_build(normalized.len(), metric, |i, j| {
        scorer
            .score(normalized[i].as_view(), normalized[j].as_view(), &budget)
            .map(|s| s.value())
    })
}
