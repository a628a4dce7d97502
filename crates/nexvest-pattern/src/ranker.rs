//! Ordering, non-maximum suppression, and top-K truncation of matches.

use std::cmp::Ordering;

use crate::result::PatternMatch;

/// Order two matches best first, breaking score ties by candidate id, then
/// window start, then window length.
fn best_first(a: &PatternMatch, b: &PatternMatch) -> Ordering {
    a.score()
        .cmp_best_first(b.score())
        .then_with(|| a.candidate_id().cmp(b.candidate_id()))
        .then_with(|| a.window().cmp(&b.window()))
}

/// Rank `matches`: sort best first, suppress overlaps, keep `top_k`.
///
/// A match is dropped when its window overlaps an already kept, better match
/// of the same candidate by more than `overlap_fraction` (intersection over
/// the shorter window). Surviving matches receive 1-based ranks.
#[must_use]
pub fn rank(mut matches: Vec<PatternMatch>, overlap_fraction: f64, top_k: usize) -> Vec<PatternMatch> {
    matches.sort_by(best_first);

    let mut kept: Vec<PatternMatch> = Vec::with_capacity(top_k.min(matches.len()));
    for candidate in matches {
        if kept.len() == top_k {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.candidate_id() == candidate.candidate_id()
                && k.window().overlap_fraction(&candidate.window()) > overlap_fraction
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    for (i, m) in kept.iter_mut().enumerate() {
        m.set_rank(i + 1);
    }
    kept
}
