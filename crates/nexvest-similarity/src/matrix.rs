//! Lower-triangular matrix of pairwise scores.

use rayon::prelude::*;

use crate::error::SimilarityError;
use crate::metric::MetricKind;
use crate::score::Orientation;

/// Symmetric score matrix stored as a lower-triangular flat vector.
///
/// For `n` series, stores `n*(n-1)/2` scores. Access is symmetric:
/// `get(i, j) == get(j, i)`. The diagonal is the self-score of the metric:
/// zero for distances, one for similarities.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    metric: MetricKind,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Create a new matrix from pre-computed lower-triangular data.
    ///
    /// `data` must contain exactly `n*(n-1)/2` elements, stored as
    /// `data[row*(row-1)/2 + col]` where `row > col`.
    pub(crate) fn from_raw(n: usize, metric: MetricKind, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), n * n.saturating_sub(1) / 2);
        Self { n, metric, data }
    }

    /// Score every unique pair `(i, j)` with `i > j` in parallel.
    ///
    /// The first error encountered aborts the whole computation.
    pub(crate) fn try_build<F>(n: usize, metric: MetricKind, score: F) -> Result<Self, SimilarityError>
    where
        F: Fn(usize, usize) -> Result<f64, SimilarityError> + Sync,
    {
        let total_pairs = n * n.saturating_sub(1) / 2;
        let data = (0..total_pairs)
            .into_par_iter()
            .map(|flat_idx| {
                // flat_idx = i*(i-1)/2 + j  =>  i = floor((1 + sqrt(1 + 8*flat_idx)) / 2)
                let mut i = ((1.0 + (1.0 + 8.0 * flat_idx as f64).sqrt()) / 2.0).floor() as usize;
                // Guard against rounding at perfect squares.
                while i * (i - 1) / 2 > flat_idx {
                    i -= 1;
                }
                while (i + 1) * i / 2 <= flat_idx {
                    i += 1;
                }
                let j = flat_idx - i * (i - 1) / 2;
                score(i, j)
            })
            .collect::<Result<Vec<f64>, SimilarityError>>()?;
        Ok(Self::from_raw(n, metric, data))
    }

    /// Return the number of series in the matrix.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Return true if the matrix is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Return the metric the scores were computed with.
    #[must_use]
    pub fn metric(&self) -> MetricKind {
        self.metric
    }

    /// Return the score between series `i` and series `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n` or `j >= n`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n, "row index {i} out of bounds for matrix of size {}", self.n);
        assert!(j < self.n, "column index {j} out of bounds for matrix of size {}", self.n);
        if i == j {
            return match self.metric.orientation() {
                Orientation::LowerIsBetter => 0.0,
                Orientation::HigherIsBetter => 1.0,
            };
        }
        let (row, col) = if i > j { (i, j) } else { (j, i) };
        self.data[row * (row - 1) / 2 + col]
    }

    /// Iterate over all unique pairs `(i, j, score)` where `i > j`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (1..self.n).flat_map(move |i| (0..i).map(move |j| (i, j, self.data[i * (i - 1) / 2 + j])))
    }

    /// Return all scores from series `i` to every series, including itself.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.n).map(|j| self.get(i, j)).collect()
    }
}
