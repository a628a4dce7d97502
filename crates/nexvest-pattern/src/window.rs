//! Contiguous windows into a candidate series.

use std::ops::Range;

use serde::Serialize;

/// A contiguous range `[start, start + len)` of a candidate series.
///
/// Construction checks `len >= 1` and `start + len <= series_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Window {
    start: usize,
    len: usize,
}

impl Window {
    /// Create a window, returning `None` unless it is non-empty and fits
    /// inside a series of `series_len` points.
    #[must_use]
    pub fn new(start: usize, len: usize, series_len: usize) -> Option<Self> {
        let end = start.checked_add(len)?;
        (len > 0 && end <= series_len).then_some(Self { start, len })
    }

    /// Return the first index.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Return the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; windows are non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the exclusive end index.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Return the index range covered.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    /// Fraction of the shorter window covered by the intersection of both.
    ///
    /// Returns a value in `[0, 1]`; 1 means one window contains the other.
    #[must_use]
    pub fn overlap_fraction(&self, other: &Self) -> f64 {
        let lo = self.start.max(other.start);
        let hi = self.end().min(other.end());
        let intersection = hi.saturating_sub(lo);
        intersection as f64 / self.len.min(other.len) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_checked() {
        assert!(Window::new(0, 5, 5).is_some());
        assert!(Window::new(1, 5, 5).is_none());
        assert!(Window::new(0, 0, 5).is_none());
        assert!(Window::new(usize::MAX, 2, usize::MAX).is_none());
    }

    #[test]
    fn overlap_fraction_cases() {
        let a = Window::new(0, 10, 100).unwrap();
        let b = Window::new(5, 10, 100).unwrap();
        let c = Window::new(20, 10, 100).unwrap();
        let inner = Window::new(2, 4, 100).unwrap();
        assert_eq!(a.overlap_fraction(&b), 0.5);
        assert_eq!(a.overlap_fraction(&c), 0.0);
        assert_eq!(a.overlap_fraction(&inner), 1.0);
        assert_eq!(inner.overlap_fraction(&a), 1.0);
        assert_eq!(a.overlap_fraction(&a), 1.0);
    }

    #[test]
    fn adjacent_windows_do_not_overlap() {
        let a = Window::new(0, 10, 20).unwrap();
        let b = Window::new(10, 10, 20).unwrap();
        assert_eq!(a.overlap_fraction(&b), 0.0);
        assert_eq!(a.range(), 0..10);
    }
}
