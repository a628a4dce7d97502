//! Time-series similarity: Euclidean, Pearson, cosine, and DTW.
//!
//! Pure math library with zero I/O. Provides validated series types,
//! z-score and percent-return normalization, the fixed-length metrics,
//! Dynamic Time Warping with an optional Sakoe-Chiba band and warping path
//! extraction, pairwise score matrices, and a cooperative computation budget.

mod api;
mod budget;
mod constraint;
mod dtw;
mod error;
mod matrix;
mod metric;
mod path;
mod preprocess;
mod score;
mod series;

pub use api::{DistanceParams, compute_distance, compute_pairwise};
pub use budget::Budget;
pub use constraint::BandConstraint;
pub use dtw::Dtw;
pub use error::{ErrorKind, SimilarityError};
pub use matrix::DistanceMatrix;
pub use metric::{Metric, MetricKind, ParseMetricError, cosine, euclidean, pearson};
pub use path::{WarpingPath, WarpingStep};
pub use preprocess::{
    Normalization, ParseNormalizationError, mean_and_std, normalize, pct_returns_values,
    z_normalize_values,
};
pub use score::{DtwDistance, Orientation, SimilarityScore};
pub use series::{MIN_SERIES_LEN, TimeSeries, TimeSeriesView, validate};
