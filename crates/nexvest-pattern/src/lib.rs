//! Windowed pattern search over financial time series.
//!
//! Slides a query template across candidate series, scores every window
//! with a metric from `nexvest-similarity`, keeps the windows that pass a
//! threshold, and ranks them with non-maximum suppression. Work is bounded
//! by a cost ceiling checked before scoring and by a cooperative budget
//! checked while scoring. Candidates are scanned in parallel with rayon.

mod config;
mod error;
mod matcher;
mod ranker;
mod result;
mod window;

pub use config::{MatchConfig, MatchOptions};
pub use error::MatchError;
pub use matcher::{NamedSeries, find_patterns};
pub use ranker::rank;
pub use result::{MatchReport, PatternMatch, SkippedCandidate};
pub use window::Window;
