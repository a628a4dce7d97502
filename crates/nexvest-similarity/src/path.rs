//! Warping path types for DTW alignment.

use serde::Serialize;

/// A single step in a DTW warping path, mapping index `a` in the first series
/// to index `b` in the second series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarpingStep {
    /// Index in the first sequence.
    pub a: usize,
    /// Index in the second sequence.
    pub b: usize,
}

/// An ordered sequence of warping steps from `(0, 0)` to `(n-1, m-1)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    pub(crate) fn new(steps: Vec<WarpingStep>) -> Self {
        Self(steps)
    }

    /// Return the warping steps as a slice.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest `|a - b|` over the path: how far the alignment strays from
    /// pointwise matching.
    #[must_use]
    pub fn max_deviation(&self) -> usize {
        self.0.iter().map(|s| s.a.abs_diff(s.b)).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_deviation_of_diagonal_is_zero() {
        let path = WarpingPath::new((0..4).map(|i| WarpingStep { a: i, b: i }).collect());
        assert_eq!(path.max_deviation(), 0);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn serializes_as_array_of_pairs() {
        let path = WarpingPath::new(vec![WarpingStep { a: 0, b: 0 }, WarpingStep { a: 1, b: 0 }]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"[{"a":0,"b":0},{"a":1,"b":0}]"#);
    }
}
