//! Cooperative wall-clock and step budgets for long-running computations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::SimilarityError;

/// A caller-owned computation budget.
///
/// DTW charges one step per accumulated-cost cell at every DP row boundary;
/// the pattern matcher charges one step per window element at every window
/// boundary. Either limit being exceeded fails the computation with a
/// timeout-kind [`SimilarityError`]. The counter is atomic so that one budget
/// can be shared by the rayon workers of a single search.
#[derive(Debug)]
pub struct Budget {
    started: Instant,
    max_duration: Option<Duration>,
    max_steps: Option<u64>,
    steps: AtomicU64,
}

impl Budget {
    /// A budget that never runs out.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    /// Create a budget with an optional wall-clock limit and an optional step limit.
    ///
    /// The clock starts when the budget is created.
    #[must_use]
    pub fn new(max_duration: Option<Duration>, max_steps: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            max_duration,
            max_steps,
            steps: AtomicU64::new(0),
        }
    }

    /// Return the number of steps charged so far.
    #[must_use]
    pub fn steps_used(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }

    /// Return true if neither limit is set.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.max_duration.is_none() && self.max_steps.is_none()
    }

    /// Charge `steps` units of work and check both limits.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimilarityError::StepBudgetExhausted`] | Total charged steps exceed the step limit |
    /// | [`SimilarityError::DeadlineExceeded`] | Elapsed time exceeds the wall-clock limit |
    #[inline]
    pub fn charge(&self, steps: u64) -> Result<(), SimilarityError> {
        if self.is_unlimited() {
            return Ok(());
        }
        if let Some(limit) = self.max_steps {
            let used = self.steps.fetch_add(steps, Ordering::Relaxed).saturating_add(steps);
            if used > limit {
                return Err(SimilarityError::StepBudgetExhausted { budget: limit });
            }
        }
        if let Some(limit) = self.max_duration
            && self.started.elapsed() > limit
        {
            return Err(SimilarityError::DeadlineExceeded { budget: limit });
        }
        Ok(())
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}
