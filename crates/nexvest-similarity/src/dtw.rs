//! DTW distance computation.

use tracing::instrument;

use crate::budget::Budget;
use crate::constraint::BandConstraint;
use crate::error::SimilarityError;
use crate::matrix::DistanceMatrix;
use crate::metric::MetricKind;
use crate::path::{WarpingPath, WarpingStep};
use crate::preprocess::rescale_pair;
use crate::score::DtwDistance;
use crate::series::{TimeSeries, TimeSeriesView};

/// Immutable DTW configuration. Thread-safe and copyable.
///
/// The local cost is the squared pointwise difference and the reported
/// distance is the square root of the accumulated cost, so with a zero
/// radius on equal-length inputs DTW equals Euclidean distance.
///
/// DTW is symmetric but is not a true metric: the triangle inequality can
/// fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dtw {
    constraint: BandConstraint,
}

impl Dtw {
    /// Create an unconstrained DTW calculator.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self {
            constraint: BandConstraint::Unconstrained,
        }
    }

    /// Create a DTW calculator with a Sakoe-Chiba band constraint.
    #[must_use]
    pub fn with_sakoe_chiba(radius: usize) -> Self {
        Self {
            constraint: BandConstraint::SakoeChibaRadius(radius),
        }
    }

    /// Create a DTW calculator from an existing [`BandConstraint`].
    #[must_use]
    pub fn from_constraint(constraint: BandConstraint) -> Self {
        Self { constraint }
    }

    /// Return the band constraint configuration.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Compute the DTW distance between two sequences.
    ///
    /// Uses a rolling two-row buffer rather than the full cost matrix. Runs in
    /// O(n * bw) time and O(bw) space, where `bw` is the widest band row.
    /// Inputs above `1e100` in magnitude are rescaled before squaring.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimilarityError::StepBudgetExhausted`] | `budget` ran out of DP cells |
    /// | [`SimilarityError::DeadlineExceeded`] | `budget` deadline passed |
    #[instrument(level = "trace", skip(self, a, b, budget), fields(n = a.len(), m = b.len()))]
    pub fn distance(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        budget: &Budget,
    ) -> Result<DtwDistance, SimilarityError> {
        let (a, b, scale) = rescale_pair(a.as_slice(), b.as_slice());
        let dist = self.dtw_distance_rolling(&a, &b, None, budget)?;
        Ok(DtwDistance::new(scale * dist))
    }

    /// Compute DTW distance with early abandoning.
    ///
    /// If the DTW distance would exceed `cutoff`, returns [`DtwDistance::INFINITY`]
    /// without completing the full computation. This is exact: a finite value
    /// always equals `self.distance(a, b)`.
    ///
    /// # Errors
    ///
    /// Same as [`distance`][Dtw::distance].
    #[instrument(level = "trace", skip(self, a, b, budget), fields(n = a.len(), m = b.len()))]
    pub fn distance_with_cutoff(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        cutoff: f64,
        budget: &Budget,
    ) -> Result<DtwDistance, SimilarityError> {
        let (a, b, scale) = rescale_pair(a.as_slice(), b.as_slice());
        let dist = self.dtw_distance_rolling(&a, &b, Some(cutoff / scale), budget)?;
        Ok(DtwDistance::new(scale * dist))
    }

    /// Compute the DTW distance and an optimal warping path.
    ///
    /// Allocates the full banded cost matrix and a direction array for
    /// traceback. Ties between predecessors are broken diagonal first, then
    /// up `(i-1, j)`, then left `(i, j-1)`.
    ///
    /// # Errors
    ///
    /// Same as [`distance`][Dtw::distance].
    #[instrument(level = "trace", skip(self, a, b, budget), fields(n = a.len(), m = b.len()))]
    pub fn distance_and_path(
        &self,
        a: TimeSeriesView<'_>,
        b: TimeSeriesView<'_>,
        budget: &Budget,
    ) -> Result<(DtwDistance, WarpingPath), SimilarityError> {
        let (a, b, scale) = rescale_pair(a.as_slice(), b.as_slice());
        let (dist, steps) = self.dtw_full_band(&a, &b, budget)?;
        Ok((DtwDistance::new(scale * dist), WarpingPath::new(steps)))
    }

    /// Compute pairwise DTW distances for a collection of series.
    ///
    /// Pairs are computed in parallel with rayon and share `budget`.
    ///
    /// # Errors
    ///
    /// The first budget error raised by any pair.
    #[instrument(skip(self, series, budget), fields(n = series.len()))]
    pub fn pairwise(
        &self,
        series: &[TimeSeries],
        budget: &Budget,
    ) -> Result<DistanceMatrix, SimilarityError> {
        let views: Vec<TimeSeriesView<'_>> = series.iter().map(TimeSeries::as_view).collect();
        DistanceMatrix::try_build(series.len(), MetricKind::Dtw, |i, j| {
            self.distance(views[i], views[j], budget).map(DtwDistance::value)
        })
    }

    /// Rolling DTW with optional early abandoning.
    ///
    /// Each row buffer has `bw + 2` slots. Index 0 is the left sentinel (INF)
    /// and active columns occupy indices `1..=bw`.
    ///
    /// For column `j` in row `i`:
    /// - current local index: `j - curr_start + 1`
    /// - above `C[i-1][j]`: `j - prev_start + 1` in `prev`
    /// - diagonal `C[i-1][j-1]`: `j - prev_start` in `prev`
    /// - left `C[i][j-1]`: `curr_local - 1`
    ///
    /// Out-of-band accesses read INF.
    ///
    /// Accumulated costs are squared; `cutoff` is compared against their
    /// square roots so a distance equal to `cutoff` is never abandoned.
    fn dtw_distance_rolling(
        &self,
        a: &[f64],
        b: &[f64],
        cutoff: Option<f64>,
        budget: &Budget,
    ) -> Result<f64, SimilarityError> {
        let n = a.len();
        let m = b.len();

        let bw = self.constraint.band_width(n, m);
        let buf_width = bw + 2;

        let mut prev = vec![f64::INFINITY; buf_width];
        let mut curr = vec![f64::INFINITY; buf_width];
        let mut prev_start: usize = 0;

        for i in 0..n {
            curr.fill(f64::INFINITY);

            let col_range = self.constraint.column_range(i, n, m);
            budget.charge(col_range.len() as u64)?;

            let curr_start = col_range.start;
            let mut row_min = f64::INFINITY;

            for j in col_range {
                let cost = (a[i] - b[j]).powi(2);
                let cj = j - curr_start + 1;

                if i == 0 && j == 0 {
                    curr[cj] = cost;
                    row_min = row_min.min(cost);
                    continue;
                }

                let left = if j > curr_start { curr[cj - 1] } else { f64::INFINITY };

                let above = if i > 0 {
                    let pj = j.wrapping_sub(prev_start).wrapping_add(1);
                    if pj < buf_width { prev[pj] } else { f64::INFINITY }
                } else {
                    f64::INFINITY
                };

                let diag = if i > 0 && j > 0 {
                    let pj = j.wrapping_sub(prev_start);
                    if pj < buf_width { prev[pj] } else { f64::INFINITY }
                } else {
                    f64::INFINITY
                };

                let val = cost + diag.min(above).min(left);
                curr[cj] = val;
                row_min = row_min.min(val);
            }

            // Every warping path crosses each row, so `row_min` bounds the
            // final cost from below. The last row is checked at its end cell.
            if let Some(c) = cutoff
                && i < n - 1
                && row_min.sqrt() > c
            {
                return Ok(f64::INFINITY);
            }

            prev_start = curr_start;
            std::mem::swap(&mut prev, &mut curr);
        }

        // After the final swap, `prev` holds the last completed row.
        let final_sq = prev[(m - 1) - prev_start + 1];

        if let Some(c) = cutoff
            && final_sq.sqrt() > c
        {
            return Ok(f64::INFINITY);
        }

        Ok(final_sq.sqrt())
    }

    /// Full banded cost matrix DTW, returning the distance and warping path.
    ///
    /// Direction bytes: 0 = diagonal, 1 = above, 2 = left. Cell `(i, j)` maps
    /// to flat index `i * bw + (j - row_start)`.
    fn dtw_full_band(
        &self,
        a: &[f64],
        b: &[f64],
        budget: &Budget,
    ) -> Result<(f64, Vec<WarpingStep>), SimilarityError> {
        let n = a.len();
        let m = b.len();
        let bw = self.constraint.band_width(n, m);

        let ranges: Vec<_> = (0..n).map(|i| self.constraint.column_range(i, n, m)).collect();
        let mut cost = vec![f64::INFINITY; n * bw];
        let mut dirs = vec![0u8; n * bw];

        for i in 0..n {
            let col_range = ranges[i].clone();
            budget.charge(col_range.len() as u64)?;
            let prev_range = if i > 0 { ranges[i - 1].clone() } else { 0..0 };

            for j in col_range.clone() {
                let c = (a[i] - b[j]).powi(2);
                let local_j = j - col_range.start;
                let idx = i * bw + local_j;

                if i == 0 && j == 0 {
                    cost[idx] = c;
                    continue;
                }

                let diag = if j > 0 && prev_range.contains(&(j - 1)) {
                    cost[(i - 1) * bw + (j - 1 - prev_range.start)]
                } else {
                    f64::INFINITY
                };

                let above = if prev_range.contains(&j) {
                    cost[(i - 1) * bw + (j - prev_range.start)]
                } else {
                    f64::INFINITY
                };

                let left = if j > col_range.start {
                    cost[idx - 1]
                } else {
                    f64::INFINITY
                };

                let (min_val, dir) = if diag <= above && diag <= left {
                    (diag, 0u8)
                } else if above <= left {
                    (above, 1u8)
                } else {
                    (left, 2u8)
                };

                cost[idx] = c + min_val;
                dirs[idx] = dir;
            }
        }

        // Traceback from (n-1, m-1) to (0, 0).
        let mut path = Vec::with_capacity(n + m - 1);
        let mut i = n - 1;
        let mut j = m - 1;

        loop {
            path.push(WarpingStep { a: i, b: j });
            if i == 0 && j == 0 {
                break;
            }
            if i == 0 {
                j -= 1;
                continue;
            }
            if j == 0 {
                i -= 1;
                continue;
            }
            match dirs[i * bw + (j - ranges[i].start)] {
                0 => {
                    i -= 1;
                    j -= 1;
                }
                1 => i -= 1,
                _ => j -= 1,
            }
        }

        path.reverse();

        let dist = cost[(n - 1) * bw + (m - 1 - ranges[n - 1].start)].sqrt();
        Ok((dist, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::euclidean;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::from_values(values.to_vec()).unwrap()
    }

    fn dist(dtw: Dtw, a: &[f64], b: &[f64]) -> f64 {
        dtw.distance(ts(a).as_view(), ts(b).as_view(), &Budget::unlimited())
            .unwrap()
            .value()
    }

    #[test]
    fn identical_series_distance_zero() {
        assert_eq!(dist(Dtw::unconstrained(), &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn repeated_values_warp_to_zero() {
        assert_eq!(dist(Dtw::unconstrained(), &[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 1.0, 1.0]), 0.0);
        assert_eq!(dist(Dtw::unconstrained(), &[1.0, 2.0, 3.0], &[1.0, 1.0, 2.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn hand_computed_2x2() {
        // C[0][0] = 1, C[0][1] = 1, C[1][0] = 1, C[1][1] = 1 + 1 = 2
        let d = dist(Dtw::unconstrained(), &[0.0, 1.0], &[1.0, 0.0]);
        assert!((d - 2.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn radius_zero_equals_euclidean() {
        let a = [0.3, 1.7, -2.0, 4.1, 0.0, 2.2];
        let b = [1.0, -0.5, 0.4, 3.3, 1.9, -1.1];
        let dtw = dist(Dtw::with_sakoe_chiba(0), &a, &b);
        let euc = euclidean(ts(&a).as_view(), ts(&b).as_view()).unwrap();
        assert!((dtw - euc).abs() < 1e-12, "{dtw} vs {euc}");
    }

    #[test]
    fn band_distance_geq_unconstrained() {
        let a = [0.0, 1.0, 0.0, 1.0, 0.0];
        let b = [1.0, 0.0, 1.0, 0.0, 1.0];
        let unconstrained = dist(Dtw::unconstrained(), &a, &b);
        let banded = dist(Dtw::with_sakoe_chiba(1), &a, &b);
        assert!(banded >= unconstrained - 1e-10);
    }

    #[test]
    fn symmetric() {
        let a = [1.0, 5.0, 2.0, 8.0, 3.0];
        let b = [2.0, 4.0, 7.0];
        for dtw in [Dtw::unconstrained(), Dtw::with_sakoe_chiba(1)] {
            assert!((dist(dtw, &a, &b) - dist(dtw, &b, &a)).abs() < 1e-12);
        }
    }

    #[test]
    fn not_a_true_metric() {
        // The short series b warps onto both a and c almost for free, so
        // d(a,c) > d(a,b) + d(b,c).
        let a = [0.0; 6];
        let b = [0.0, 1.0];
        let c = [1.0; 6];
        let dtw = Dtw::unconstrained();
        let ab = dist(dtw, &a, &b);
        let bc = dist(dtw, &b, &c);
        let ac = dist(dtw, &a, &c);
        assert!((ab - 1.0).abs() < 1e-12 && (bc - 1.0).abs() < 1e-12);
        assert!(ac > ab + bc, "d(a,c)={ac} d(a,b)={ab} d(b,c)={bc}");
    }

    #[test]
    fn unequal_lengths_with_zero_radius_is_feasible() {
        let d = dist(Dtw::with_sakoe_chiba(0), &[1.0, 2.0, 3.0], &[1.0, 1.5, 2.0, 2.5, 3.0]);
        assert!(d.is_finite());
    }

    #[test]
    fn warping_path_endpoints() {
        let a = ts(&[1.0, 2.0, 3.0, 4.0]);
        let b = ts(&[1.0, 3.0, 4.0]);
        let (_, path) = Dtw::unconstrained()
            .distance_and_path(a.as_view(), b.as_view(), &Budget::unlimited())
            .unwrap();
        let steps = path.steps();
        assert_eq!(steps.first().unwrap(), &WarpingStep { a: 0, b: 0 });
        assert_eq!(steps.last().unwrap(), &WarpingStep { a: 3, b: 2 });
    }

    #[test]
    fn tie_prefers_diagonal() {
        // All costs zero: every predecessor ties, the path must be the diagonal.
        let a = ts(&[2.0, 2.0, 2.0]);
        let (d, path) = Dtw::unconstrained()
            .distance_and_path(a.as_view(), a.as_view(), &Budget::unlimited())
            .unwrap();
        assert_eq!(d.value(), 0.0);
        assert_eq!(path.max_deviation(), 0);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn tie_prefers_up_over_left() {
        // b = -a makes the local cost symmetric, so at (2, 2) the up and left
        // predecessors tie at 25 while the diagonal costs 36.
        let a = ts(&[0.0, 3.0, 1.0]);
        let b = ts(&[0.0, -3.0, -1.0]);
        let (d, path) = Dtw::unconstrained()
            .distance_and_path(a.as_view(), b.as_view(), &Budget::unlimited())
            .unwrap();
        assert!((d.value() - 29.0_f64.sqrt()).abs() < 1e-12);
        let steps: Vec<(usize, usize)> = path.steps().iter().map(|s| (s.a, s.b)).collect();
        assert_eq!(steps, vec![(0, 0), (0, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn distance_matches_distance_and_path() {
        let a = ts(&[1.0, 3.0, 5.0, 2.0]);
        let b = ts(&[2.0, 4.0, 1.0]);
        for dtw in [Dtw::unconstrained(), Dtw::with_sakoe_chiba(0), Dtw::with_sakoe_chiba(1)] {
            let budget = Budget::unlimited();
            let d = dtw.distance(a.as_view(), b.as_view(), &budget).unwrap();
            let (dp, path) = dtw.distance_and_path(a.as_view(), b.as_view(), &budget).unwrap();
            assert!((d.value() - dp.value()).abs() < 1e-10);
            assert_eq!(path.steps().last().unwrap(), &WarpingStep { a: 3, b: 2 });
        }
    }

    #[test]
    fn warping_path_continuity() {
        let a = ts(&[1.0, 5.0, 2.0, 8.0, 3.0]);
        let b = ts(&[2.0, 4.0, 7.0]);
        let (_, path) = Dtw::unconstrained()
            .distance_and_path(a.as_view(), b.as_view(), &Budget::unlimited())
            .unwrap();
        for pair in path.steps().windows(2) {
            let da = pair[1].a - pair[0].a;
            let db = pair[1].b - pair[0].b;
            assert!(da <= 1 && db <= 1 && da + db >= 1, "bad step {pair:?}");
        }
    }

    #[test]
    fn single_element_views() {
        let a = [5.0];
        let b = [3.0];
        let d = Dtw::unconstrained()
            .distance(
                TimeSeriesView::new(&a).unwrap(),
                TimeSeriesView::new(&b).unwrap(),
                &Budget::unlimited(),
            )
            .unwrap();
        assert!((d.value() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn early_abandon_returns_inf() {
        let a = ts(&[0.0; 5]);
        let b = ts(&[10.0; 5]);
        let result = Dtw::unconstrained()
            .distance_with_cutoff(a.as_view(), b.as_view(), 1.0, &Budget::unlimited())
            .unwrap();
        assert!(!result.is_finite());
    }

    #[test]
    fn cutoff_matches_exact_distance() {
        let dtw = Dtw::unconstrained();
        let a = ts(&[0.0, 1.0]);
        let b = ts(&[1.0, 0.0]);
        let budget = Budget::unlimited();
        let d = dtw.distance(a.as_view(), b.as_view(), &budget).unwrap().value();

        let above = dtw.distance_with_cutoff(a.as_view(), b.as_view(), d + 0.001, &budget).unwrap();
        assert!((above.value() - d).abs() < 1e-10);

        let below = dtw.distance_with_cutoff(a.as_view(), b.as_view(), d - 0.001, &budget).unwrap();
        assert_eq!(below, DtwDistance::INFINITY);
    }

    #[test]
    fn cutoff_equal_to_distance_is_kept() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let budget = Budget::unlimited();
        for radius in [0, 2] {
            let dtw = Dtw::with_sakoe_chiba(radius);
            for _ in 0..500 {
                let a: Vec<f64> = (0..8).map(|_| rng.gen_range(-3.0..3.0)).collect();
                let b: Vec<f64> = (0..8).map(|_| rng.gen_range(-3.0..3.0)).collect();
                let (a, b) = (ts(&a), ts(&b));
                let d = dtw.distance(a.as_view(), b.as_view(), &budget).unwrap();
                let at = dtw.distance_with_cutoff(a.as_view(), b.as_view(), d.value(), &budget).unwrap();
                assert_eq!(at, d);
            }
        }
    }

    #[test]
    fn step_budget_is_checked_per_row() {
        // 4 x 4 unconstrained = 16 cells.
        let a = ts(&[1.0, 2.0, 3.0, 4.0]);
        let budget = Budget::new(None, Some(10));
        let err = Dtw::unconstrained().distance(a.as_view(), a.as_view(), &budget).unwrap_err();
        assert_eq!(err, SimilarityError::StepBudgetExhausted { budget: 10 });

        let budget = Budget::new(None, Some(16));
        assert!(Dtw::unconstrained().distance(a.as_view(), a.as_view(), &budget).is_ok());
        assert_eq!(budget.steps_used(), 16);
    }

    #[test]
    fn pairwise_matches_individual() {
        let series = vec![ts(&[1.0, 2.0, 3.0]), ts(&[4.0, 5.0, 6.0]), ts(&[1.0, 3.0, 2.0])];
        let dtw = Dtw::with_sakoe_chiba(1);
        let matrix = dtw.pairwise(&series, &Budget::unlimited()).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.metric(), MetricKind::Dtw);
        for (i, j, v) in matrix.iter() {
            let direct = dist(dtw, series[i].values(), series[j].values());
            assert!((v - direct).abs() < 1e-10);
            assert_eq!(matrix.get(j, i), v);
        }
    }

    #[test]
    fn pairwise_propagates_budget_error() {
        let series = vec![ts(&[1.0, 2.0, 3.0]), ts(&[4.0, 5.0, 6.0])];
        let budget = Budget::new(None, Some(2));
        assert!(Dtw::unconstrained().pairwise(&series, &budget).is_err());
    }
}
