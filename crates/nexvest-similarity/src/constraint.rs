//! Band constraint types for DTW computation.

use std::ops::Range;

use crate::error::SimilarityError;

/// Constraint on the DTW warping window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BandConstraint {
    /// No constraint; the full cost matrix is computed.
    #[default]
    Unconstrained,

    /// Sakoe-Chiba band: with 1-based DP indices, cell `(i, j)` is valid only
    /// if `|i - j*n/m| <= radius`.
    ///
    /// For sequences of different lengths the band is additionally widened to
    /// contain the diagonal corridor from `(1, 1)` to `(n, m)`, so at least
    /// one warping path always exists. With equal lengths and radius 0 the
    /// band is exactly the main diagonal.
    SakoeChibaRadius(usize),
}

impl BandConstraint {
    /// Build a constraint from an optional signed radius, where `None` means
    /// unconstrained.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimilarityError::NegativeWarpingWindow`] | `radius < 0` |
    pub fn from_radius(radius: Option<i64>) -> Result<Self, SimilarityError> {
        match radius {
            None => Ok(Self::Unconstrained),
            Some(r) if r < 0 => Err(SimilarityError::NegativeWarpingWindow { radius: r }),
            Some(r) => Ok(Self::SakoeChibaRadius(usize::try_from(r).unwrap_or(usize::MAX))),
        }
    }

    /// Return the Sakoe-Chiba radius, or `None` when unconstrained.
    #[must_use]
    pub fn radius(&self) -> Option<usize> {
        match self {
            Self::Unconstrained => None,
            Self::SakoeChibaRadius(r) => Some(*r),
        }
    }

    /// Return the valid 0-based column range for 0-based `row` of an
    /// `n x m` cost matrix.
    ///
    /// Ranges are non-empty and their start and end never decrease from one
    /// row to the next.
    #[must_use]
    pub fn column_range(&self, row: usize, n: usize, m: usize) -> Range<usize> {
        match self {
            Self::Unconstrained => 0..m,
            Self::SakoeChibaRadius(r) => {
                let (n, m, r) = (n as u128, m as u128, *r as u128);
                let i = row as u128 + 1;

                // Band |i - j*n/m| <= r  <=>  (i-r)*m/n <= j <= (i+r)*m/n
                let band_lo = if i <= r { 1 } else { ((i - r) * m).div_ceil(n) };
                let band_hi = ((i + r) * m) / n;

                // Diagonal corridor: columns crossed by the straight line
                // from (0, 0) to (n, m) between rows i-1 and i.
                let diag_lo = ((i - 1) * m) / n + 1;
                let diag_hi = (i * m).div_ceil(n);

                let lo = band_lo.min(diag_lo).max(1);
                let hi = band_hi.max(diag_hi).min(m);
                (lo - 1) as usize..hi as usize
            }
        }
    }

    /// Return the maximum band width across all rows of an `n x m` matrix.
    #[must_use]
    pub fn band_width(&self, n: usize, m: usize) -> usize {
        match self {
            Self::Unconstrained => m,
            Self::SakoeChibaRadius(_) => (0..n)
                .map(|row| self.column_range(row, n, m).len())
                .max()
                .unwrap_or(0),
        }
    }

    /// Return the number of cells inside the band of an `n x m` matrix.
    ///
    /// This is the exact number of DP cells DTW evaluates, and the cost unit
    /// used for computation-size estimates.
    #[must_use]
    pub fn cell_count(&self, n: usize, m: usize) -> u64 {
        match self {
            Self::Unconstrained => n as u64 * m as u64,
            Self::SakoeChibaRadius(_) => (0..n)
                .map(|row| self.column_range(row, n, m).len() as u64)
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_full_range() {
        let c = BandConstraint::Unconstrained;
        assert_eq!(c.column_range(0, 10, 10), 0..10);
        assert_eq!(c.column_range(5, 10, 7), 0..7);
    }

    #[test]
    fn sakoe_chiba_middle_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(5, 10, 10), 3..8);
    }

    #[test]
    fn sakoe_chiba_first_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(0, 10, 10), 0..3);
    }

    #[test]
    fn sakoe_chiba_last_row() {
        let c = BandConstraint::SakoeChibaRadius(2);
        assert_eq!(c.column_range(9, 10, 10), 7..10);
    }

    #[test]
    fn sakoe_chiba_radius_exceeds_size() {
        let c = BandConstraint::SakoeChibaRadius(20);
        assert_eq!(c.column_range(3, 5, 5), 0..5);
    }

    #[test]
    fn radius_zero_equal_lengths_is_diagonal() {
        let c = BandConstraint::SakoeChibaRadius(0);
        for row in 0..6 {
            assert_eq!(c.column_range(row, 6, 6), row..row + 1);
        }
        assert_eq!(c.cell_count(6, 6), 6);
    }

    #[test]
    fn radius_zero_unequal_lengths_stays_connected() {
        // 3 x 5: the corridor must connect (0, 0) to (2, 4).
        let c = BandConstraint::SakoeChibaRadius(0);
        assert_eq!(c.column_range(0, 3, 5), 0..2);
        assert_eq!(c.column_range(1, 3, 5), 1..4);
        assert_eq!(c.column_range(2, 3, 5), 3..5);

        // 5 x 3: several rows share a column.
        assert_eq!(c.column_range(0, 5, 3), 0..1);
        assert_eq!(c.column_range(4, 5, 3), 2..3);
    }

    #[test]
    fn ranges_are_monotone_and_connected() {
        for &(n, m) in &[(7usize, 13usize), (13, 7), (20, 20), (1, 9), (9, 1)] {
            for r in 0..4 {
                let c = BandConstraint::SakoeChibaRadius(r);
                let mut prev = c.column_range(0, n, m);
                assert_eq!(prev.start, 0);
                for row in 1..n {
                    let cur = c.column_range(row, n, m);
                    assert!(!cur.is_empty());
                    assert!(cur.start >= prev.start && cur.end >= prev.end);
                    assert!(cur.start <= prev.end, "gap between rows {} and {row}", row - 1);
                    prev = cur;
                }
                assert_eq!(prev.end, m);
            }
        }
    }

    #[test]
    fn band_width_and_cells() {
        assert_eq!(BandConstraint::Unconstrained.band_width(10, 10), 10);
        assert_eq!(BandConstraint::SakoeChibaRadius(2).band_width(52, 52), 5);
        assert_eq!(BandConstraint::Unconstrained.cell_count(4, 6), 24);
    }

    #[test]
    fn from_radius_validation() {
        assert_eq!(BandConstraint::from_radius(None).unwrap(), BandConstraint::Unconstrained);
        assert_eq!(
            BandConstraint::from_radius(Some(3)).unwrap(),
            BandConstraint::SakoeChibaRadius(3)
        );
        assert_eq!(
            BandConstraint::from_radius(Some(-1)),
            Err(SimilarityError::NegativeWarpingWindow { radius: -1 })
        );
    }

    #[test]
    fn default_is_unconstrained() {
        assert_eq!(BandConstraint::default(), BandConstraint::Unconstrained);
    }
}
