//! Windowed search for occurrences of a query pattern inside candidate series.

use std::borrow::Cow;

use nexvest_similarity::{
    Budget, Dtw, ErrorKind, Metric, MetricKind, Normalization, SimilarityError, SimilarityScore,
    TimeSeries, TimeSeriesView, mean_and_std, pct_returns_values, validate, z_normalize_values,
};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::ranker::rank;
use crate::result::{MatchReport, PatternMatch, SkippedCandidate};
use crate::window::Window;

/// A borrowed, not yet validated series with an identifier.
///
/// Inputs to [`find_patterns`] are re-validated there, so malformed
/// candidates can be skipped and reported instead of rejected up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamedSeries<'a> {
    id: &'a str,
    timestamps: &'a [i64],
    values: &'a [f64],
}

impl<'a> NamedSeries<'a> {
    /// Wrap raw parallel slices.
    #[must_use]
    pub fn new(id: &'a str, timestamps: &'a [i64], values: &'a [f64]) -> Self {
        Self { id, timestamps, values }
    }

    /// Borrow an already validated series.
    #[must_use]
    pub fn from_series(id: &'a str, series: &'a TimeSeries) -> Self {
        Self::new(id, series.timestamps(), series.values())
    }

    /// Return the identifier.
    #[must_use]
    pub fn id(&self) -> &'a str {
        self.id
    }

    /// Return the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A validated candidate in the space windows are taken in.
struct Prepared<'a> {
    id: &'a str,
    timestamps: &'a [i64],
    /// Prices, or returns under [`Normalization::PctReturn`].
    working: Cow<'a, [f64]>,
}

impl Prepared<'_> {
    fn price_len(&self) -> usize {
        self.timestamps.len()
    }
}

/// Per-candidate scan outcome.
#[derive(Default)]
struct Scan {
    matches: Vec<PatternMatch>,
    evaluated: u64,
    degenerate: u64,
}

/// Search `candidates` for windows resembling `query`.
///
/// For fixed-length metrics every window has the query's length; DTW also
/// tries lengths within `config.length_tolerance`. Offsets advance by
/// `config.step_size`. A window is kept when its score passes `threshold`
/// (distance `<=` threshold, similarity `>=` threshold). Kept windows are
/// ranked, overlapping windows of the same candidate are suppressed, and the
/// best `config.top_k` are returned.
///
/// Under z-score normalization each window is normalized on its own. Under
/// percent returns the whole query and candidates are converted and a
/// return-space window starting at `r` maps back to the price window
/// starting at `r`, one point longer. Windows on which the metric is
/// undefined are counted in [`MatchReport::degenerate_windows`] and never
/// given a default score.
///
/// Invalid candidates are skipped and listed in [`MatchReport::skipped`]
/// unless `config` is strict.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | Config variants | `config.validate()` fails or `threshold` is NaN |
/// | [`MatchError::Query`] | The query is invalid, or degenerate for the metric or normalization |
/// | [`MatchError::Candidate`] | Strict mode and a candidate is invalid |
/// | [`MatchError::ComputationTooLarge`] | The planned work exceeds a configured ceiling |
/// | [`MatchError::Similarity`] | The search budget ran out |
#[instrument(
    skip(query, candidates, config),
    fields(query = query.id, n_candidates = candidates.len())
)]
pub fn find_patterns(
    query: NamedSeries<'_>,
    candidates: &[NamedSeries<'_>],
    metric: MetricKind,
    threshold: f64,
    config: &MatchConfig,
) -> Result<MatchReport, MatchError> {
    config.validate()?;
    if threshold.is_nan() {
        return Err(MatchError::InvalidThreshold { threshold });
    }

    let query_values = prepare_query(query, metric, config.normalization)?;
    let query_len = query_values.len();

    let mut prepared = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();
    for candidate in candidates {
        match prepare_candidate(*candidate, config.normalization) {
            Ok(p) => prepared.push(p),
            Err(source) if config.strict => {
                return Err(MatchError::Candidate {
                    id: candidate.id.to_string(),
                    source,
                });
            }
            Err(source) => {
                warn!(candidate = candidate.id, error = %source, "skipping invalid candidate");
                skipped.push(SkippedCandidate::new(candidate.id, source));
            }
        }
    }

    let longest = prepared.iter().map(|p| p.working.len()).max().unwrap_or(0);
    let lengths = window_lengths(query_len, longest, metric, config);
    let (windows, cost) = estimate(&prepared, &lengths, query_len, metric, config);
    debug!(windows, cost, lengths = ?lengths, "search plan");
    if windows > config.max_window_evaluations {
        return Err(MatchError::ComputationTooLarge {
            estimated: windows,
            limit: config.max_window_evaluations,
            unit: "window evaluations",
        });
    }
    if cost > config.max_cost_units {
        return Err(MatchError::ComputationTooLarge {
            estimated: cost,
            limit: config.max_cost_units,
            unit: "cost units",
        });
    }

    let scorer = Metric::new(metric, Dtw::from_constraint(config.constraint));
    let budget = config.budget();
    let scans = prepared
        .par_iter()
        .map(|candidate| {
            scan_candidate(
                query.id,
                &query_values,
                candidate,
                &lengths,
                &scorer,
                threshold,
                config,
                &budget,
            )
        })
        .collect::<Result<Vec<Scan>, SimilarityError>>()?;

    let mut windows_evaluated = 0;
    let mut degenerate_windows = 0;
    let mut passed = Vec::new();
    for scan in scans {
        windows_evaluated += scan.evaluated;
        degenerate_windows += scan.degenerate;
        passed.extend(scan.matches);
    }
    let windows_passed = passed.len() as u64;
    let matches = rank(passed, config.overlap_suppression_fraction, config.top_k);

    info!(
        matches = matches.len(),
        windows_evaluated,
        degenerate_windows,
        windows_passed,
        skipped = skipped.len(),
        "pattern search complete"
    );

    Ok(MatchReport {
        query_id: query.id.to_string(),
        metric,
        threshold,
        matches,
        skipped,
        candidates_scanned: prepared.len(),
        windows_evaluated,
        degenerate_windows,
        windows_passed,
    })
}

/// Validate the query and bring it into the working space.
fn prepare_query<'a>(
    query: NamedSeries<'a>,
    metric: MetricKind,
    normalization: Normalization,
) -> Result<Cow<'a, [f64]>, MatchError> {
    validate(query.timestamps, query.values).map_err(MatchError::Query)?;
    let values: Cow<'a, [f64]> = match normalization {
        Normalization::None => Cow::Borrowed(query.values),
        Normalization::ZScore => {
            Cow::Owned(z_normalize_values(query.values).map_err(MatchError::Query)?)
        }
        Normalization::PctReturn => {
            if query.len() < 3 {
                return Err(MatchError::Query(SimilarityError::TooShort {
                    len: query.len(),
                    min: 3,
                }));
            }
            Cow::Owned(pct_returns_values(query.values).map_err(MatchError::Query)?)
        }
    };

    // A query on which the metric is undefined would make every window degenerate.
    match metric {
        MetricKind::Pearson => {
            mean_and_std(&values).map_err(MatchError::Query)?;
        }
        MetricKind::Cosine if values.iter().all(|&v| v == 0.0) => {
            return Err(MatchError::Query(SimilarityError::ZeroNorm { len: values.len() }));
        }
        _ => {}
    }
    Ok(values)
}

fn prepare_candidate(
    candidate: NamedSeries<'_>,
    normalization: Normalization,
) -> Result<Prepared<'_>, SimilarityError> {
    validate(candidate.timestamps, candidate.values)?;
    let working = match normalization {
        Normalization::PctReturn => Cow::Owned(pct_returns_values(candidate.values)?),
        Normalization::None | Normalization::ZScore => Cow::Borrowed(candidate.values),
    };
    Ok(Prepared {
        id: candidate.id,
        timestamps: candidate.timestamps,
        working,
    })
}

/// Window lengths to try, in working-space points. Lengths above `longest`
/// fit no candidate and are not generated.
fn window_lengths(query_len: usize, longest: usize, metric: MetricKind, config: &MatchConfig) -> Vec<usize> {
    if metric.requires_equal_length() {
        return vec![query_len];
    }
    let l = query_len as f64;
    let tol = config.length_tolerance;
    // Nudge before rounding so that e.g. 10 * 0.9 lands on 9, not 10.
    let lo = ((l * (1.0 - tol)) - 1e-9).ceil().max(1.0) as usize;
    let hi = ((l * (1.0 + tol)) + 1e-9).floor() as usize;
    (lo..=hi.min(longest).max(lo)).step_by(config.length_step).collect()
}

/// Number of offsets for a window of `len` points in a series of `n` points.
fn offsets(n: usize, len: usize, step: usize) -> u64 {
    if len > n { 0 } else { ((n - len) / step + 1) as u64 }
}

/// Estimate `(window evaluations, cost units)` for the whole search.
fn estimate(
    candidates: &[Prepared<'_>],
    lengths: &[usize],
    query_len: usize,
    metric: MetricKind,
    config: &MatchConfig,
) -> (u64, u64) {
    let unit_costs: Vec<u64> = lengths
        .iter()
        .map(|&len| match metric {
            MetricKind::Dtw => config.constraint.cell_count(query_len, len),
            _ => len as u64,
        })
        .collect();

    let mut windows: u64 = 0;
    let mut cost: u64 = 0;
    for candidate in candidates {
        let n = candidate.working.len();
        for (&len, &unit) in lengths.iter().zip(&unit_costs) {
            let count = offsets(n, len, config.step_size);
            windows = windows.saturating_add(count);
            cost = cost.saturating_add(count.saturating_mul(unit));
        }
    }
    (windows, cost)
}

#[allow(clippy::too_many_arguments)]
fn scan_candidate(
    query_id: &str,
    query: &[f64],
    candidate: &Prepared<'_>,
    lengths: &[usize],
    scorer: &Metric,
    threshold: f64,
    config: &MatchConfig,
    budget: &Budget,
) -> Result<Scan, SimilarityError> {
    let mut scan = Scan::default();
    let query_view = TimeSeriesView::new_unchecked(query);
    let working = candidate.working.as_ref();
    let shift = usize::from(config.normalization == Normalization::PctReturn);

    for &len in lengths {
        if len > working.len() {
            continue;
        }
        for start in (0..=working.len() - len).step_by(config.step_size) {
            scan.evaluated += 1;
            let slice = &working[start..start + len];

            let scored = match config.normalization {
                Normalization::ZScore => match z_normalize_values(slice) {
                    Ok(z) => score_window(scorer, query_view, &z, threshold, budget),
                    Err(e) => Err(e),
                },
                Normalization::None | Normalization::PctReturn => {
                    score_window(scorer, query_view, slice, threshold, budget)
                }
            };

            let score = match scored {
                Ok(Some(score)) => score,
                Ok(None) => continue,
                Err(e) if e.kind() == ErrorKind::DegenerateSeries => {
                    scan.degenerate += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(window) = Window::new(start, len + shift, candidate.price_len()) else {
                continue;
            };
            scan.matches.push(PatternMatch::new(
                query_id,
                candidate.id,
                window,
                candidate.timestamps,
                score,
            ));
        }
    }

    debug!(
        candidate = candidate.id,
        evaluated = scan.evaluated,
        degenerate = scan.degenerate,
        passed = scan.matches.len(),
        "candidate scanned"
    );
    Ok(scan)
}

fn score_window(
    scorer: &Metric,
    query: TimeSeriesView<'_>,
    window: &[f64],
    threshold: f64,
    budget: &Budget,
) -> Result<Option<SimilarityScore>, SimilarityError> {
    scorer.score_within(query, TimeSeriesView::new_unchecked(window), threshold, budget)
}
