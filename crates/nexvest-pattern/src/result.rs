//! Result types for pattern searches.

use nexvest_similarity::{ErrorKind, MetricKind, SimilarityError, SimilarityScore};
use serde::Serialize;

use crate::window::Window;

/// One ranked occurrence of the query inside a candidate series.
///
/// Produced only by [`find_patterns`](crate::find_patterns); fields are read
/// through getters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternMatch {
    query_id: String,
    candidate_id: String,
    window: Window,
    start_timestamp: i64,
    end_timestamp: i64,
    score: SimilarityScore,
    rank: usize,
}

impl PatternMatch {
    /// Create an unranked match. `rank` is assigned by the ranker.
    pub(crate) fn new(
        query_id: &str,
        candidate_id: &str,
        window: Window,
        timestamps: &[i64],
        score: SimilarityScore,
    ) -> Self {
        Self {
            query_id: query_id.to_string(),
            candidate_id: candidate_id.to_string(),
            window,
            start_timestamp: timestamps[window.start()],
            end_timestamp: timestamps[window.end() - 1],
            score,
            rank: 0,
        }
    }

    pub(crate) fn set_rank(&mut self, rank: usize) {
        self.rank = rank;
    }

    /// Return the query identifier.
    #[must_use]
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Return the candidate identifier.
    #[must_use]
    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    /// Return the matched window in candidate price indices.
    #[must_use]
    pub fn window(&self) -> Window {
        self.window
    }

    /// Return the timestamp of the first point of the window.
    #[must_use]
    pub fn start_timestamp(&self) -> i64 {
        self.start_timestamp
    }

    /// Return the timestamp of the last point of the window.
    #[must_use]
    pub fn end_timestamp(&self) -> i64 {
        self.end_timestamp
    }

    /// Return the score of the window against the query.
    #[must_use]
    pub fn score(&self) -> &SimilarityScore {
        &self.score
    }

    /// Return the 1-based rank, best first.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }
}

/// A candidate that was left out of the search because it failed validation
/// or could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCandidate {
    /// Identifier of the candidate.
    pub id: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable reason.
    pub reason: String,
    #[serde(skip)]
    error: Option<SimilarityError>,
}

impl SkippedCandidate {
    /// Record a candidate rejected by series validation.
    #[must_use]
    pub fn new(id: &str, error: SimilarityError) -> Self {
        Self {
            id: id.to_string(),
            kind: error.kind(),
            reason: error.to_string(),
            error: Some(error),
        }
    }

    /// Record a candidate whose data never became a series, such as an
    /// unreadable file. Classified as [`ErrorKind::InvalidSeries`].
    #[must_use]
    pub fn unreadable(id: &str, reason: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            kind: ErrorKind::InvalidSeries,
            reason: reason.into(),
            error: None,
        }
    }

    /// Return the validation error, if the candidate got that far.
    #[must_use]
    pub fn error(&self) -> Option<&SimilarityError> {
        self.error.as_ref()
    }
}

/// Outcome of [`find_patterns`](crate::find_patterns).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    /// Identifier of the query series.
    pub query_id: String,
    /// Metric used to score windows.
    pub metric: MetricKind,
    /// Threshold a window had to pass.
    pub threshold: f64,
    /// Ranked matches, at most `top_k`, best first.
    pub matches: Vec<PatternMatch>,
    /// Candidates skipped because they failed validation.
    pub skipped: Vec<SkippedCandidate>,
    /// Number of valid candidates scanned.
    pub candidates_scanned: usize,
    /// Number of windows scored.
    pub windows_evaluated: u64,
    /// Number of windows left unscored because the metric is undefined on them.
    pub degenerate_windows: u64,
    /// Number of windows that passed the threshold before suppression and top-K.
    pub windows_passed: u64,
}

impl MatchReport {
    /// Return the best match, if any window passed.
    #[must_use]
    pub fn best(&self) -> Option<&PatternMatch> {
        self.matches.first()
    }

    /// Return true if no window passed the threshold.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
