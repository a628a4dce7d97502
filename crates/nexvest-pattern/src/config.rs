//! Search configuration: the validated [`MatchConfig`] and its serde-facing [`MatchOptions`].

use std::time::Duration;

use nexvest_similarity::{BandConstraint, Budget, Normalization};
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

const DEFAULT_OVERLAP: f64 = 0.5;
const DEFAULT_MAX_WINDOW_EVALUATIONS: u64 = 1_000_000;
const DEFAULT_MAX_COST_UNITS: u64 = 500_000_000;
const DEFAULT_TOP_K: usize = 10;
const DEFAULT_LENGTH_TOLERANCE: f64 = 0.1;

/// Configuration for [`find_patterns`](crate::find_patterns).
///
/// Construct via [`MatchConfig::new`], then chain `with_*` methods to override
/// defaults. The full configuration is checked once by [`validate`](Self::validate)
/// when a search starts.
///
/// # Defaults
///
/// | Parameter                      | Default            |
/// |--------------------------------|--------------------|
/// | `constraint`                   | `Unconstrained`    |
/// | `normalization`                | `None`             |
/// | `overlap_suppression_fraction` | 0.5                |
/// | `max_window_evaluations`       | 1 000 000          |
/// | `max_cost_units`               | 500 000 000        |
/// | `step_size`                    | 1                  |
/// | `top_k`                        | 10                 |
/// | `length_tolerance`             | 0.1                |
/// | `length_step`                  | 1                  |
/// | `strict`                       | false              |
/// | `max_duration` / `max_steps`   | unlimited          |
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub(crate) constraint: BandConstraint,
    pub(crate) normalization: Normalization,
    pub(crate) overlap_suppression_fraction: f64,
    pub(crate) max_window_evaluations: u64,
    pub(crate) max_cost_units: u64,
    pub(crate) step_size: usize,
    pub(crate) top_k: usize,
    pub(crate) length_tolerance: f64,
    pub(crate) length_step: usize,
    pub(crate) strict: bool,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) max_steps: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            constraint: BandConstraint::Unconstrained,
            normalization: Normalization::None,
            overlap_suppression_fraction: DEFAULT_OVERLAP,
            max_window_evaluations: DEFAULT_MAX_WINDOW_EVALUATIONS,
            max_cost_units: DEFAULT_MAX_COST_UNITS,
            step_size: 1,
            top_k: DEFAULT_TOP_K,
            length_tolerance: DEFAULT_LENGTH_TOLERANCE,
            length_step: 1,
            strict: false,
            max_duration: None,
            max_steps: None,
        }
    }
}

impl MatchConfig {
    /// Create a configuration with the given window step and result count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MatchError::InvalidStepSize`] | `step_size` is zero |
    /// | [`MatchError::InvalidTopK`] | `top_k` is zero |
    pub fn new(step_size: usize, top_k: usize) -> Result<Self, MatchError> {
        if step_size == 0 {
            return Err(MatchError::InvalidStepSize { step_size });
        }
        if top_k == 0 {
            return Err(MatchError::InvalidTopK { top_k });
        }
        Ok(Self {
            step_size,
            top_k,
            ..Self::default()
        })
    }

    /// Set the DTW warping band.
    #[must_use]
    pub fn with_constraint(mut self, constraint: BandConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Set the normalization applied to the query and candidate windows.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the overlap fraction above which a weaker match of the same
    /// candidate is suppressed.
    #[must_use]
    pub fn with_overlap_suppression_fraction(mut self, fraction: f64) -> Self {
        self.overlap_suppression_fraction = fraction;
        self
    }

    /// Set the ceiling on the number of windows a search may score.
    #[must_use]
    pub fn with_max_window_evaluations(mut self, max: u64) -> Self {
        self.max_window_evaluations = max;
        self
    }

    /// Set the ceiling on total metric cost (points for fixed metrics, DP
    /// cells for DTW).
    #[must_use]
    pub fn with_max_cost_units(mut self, max: u64) -> Self {
        self.max_cost_units = max;
        self
    }

    /// Set the offset step between consecutive windows.
    #[must_use]
    pub fn with_step_size(mut self, step_size: usize) -> Self {
        self.step_size = step_size;
        self
    }

    /// Set the maximum number of matches returned.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the relative window-length tolerance used by DTW searches.
    ///
    /// Windows span `max(1, ceil(L * (1 - tol)))` to `floor(L * (1 + tol))` points for a
    /// query of length `L`.
    #[must_use]
    pub fn with_length_tolerance(mut self, tolerance: f64) -> Self {
        self.length_tolerance = tolerance;
        self
    }

    /// Set the increment between DTW window lengths.
    #[must_use]
    pub fn with_length_step(mut self, length_step: usize) -> Self {
        self.length_step = length_step;
        self
    }

    /// Abort the whole search when any candidate is invalid, instead of
    /// skipping and reporting it.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set a wall-clock limit for the search.
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Set a step limit for the search.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Return the DTW warping band.
    #[must_use]
    pub fn constraint(&self) -> BandConstraint {
        self.constraint
    }

    /// Return the normalization mode.
    #[must_use]
    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    /// Return the overlap suppression fraction.
    #[must_use]
    pub fn overlap_suppression_fraction(&self) -> f64 {
        self.overlap_suppression_fraction
    }

    /// Return the window-evaluation ceiling.
    #[must_use]
    pub fn max_window_evaluations(&self) -> u64 {
        self.max_window_evaluations
    }

    /// Return the cost-unit ceiling.
    #[must_use]
    pub fn max_cost_units(&self) -> u64 {
        self.max_cost_units
    }

    /// Return the window step.
    #[must_use]
    pub fn step_size(&self) -> usize {
        self.step_size
    }

    /// Return the maximum number of matches.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return the DTW length tolerance.
    #[must_use]
    pub fn length_tolerance(&self) -> f64 {
        self.length_tolerance
    }

    /// Return the DTW length step.
    #[must_use]
    pub fn length_step(&self) -> usize {
        self.length_step
    }

    /// Return true if invalid candidates abort the search.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Build a fresh budget from the configured limits.
    #[must_use]
    pub fn budget(&self) -> Budget {
        Budget::new(self.max_duration, self.max_steps)
    }

    /// Check every parameter range.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`MatchError::InvalidStepSize`] | `step_size == 0` |
    /// | [`MatchError::InvalidTopK`] | `top_k == 0` |
    /// | [`MatchError::InvalidOverlapFraction`] | fraction outside `[0, 1]` or NaN |
    /// | [`MatchError::InvalidLengthTolerance`] | tolerance negative or non-finite |
    /// | [`MatchError::InvalidLengthStep`] | `length_step == 0` |
    /// | [`MatchError::InvalidCeiling`] | either ceiling is zero |
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.step_size == 0 {
            return Err(MatchError::InvalidStepSize { step_size: self.step_size });
        }
        if self.top_k == 0 {
            return Err(MatchError::InvalidTopK { top_k: self.top_k });
        }
        if !(0.0..=1.0).contains(&self.overlap_suppression_fraction) {
            return Err(MatchError::InvalidOverlapFraction {
                fraction: self.overlap_suppression_fraction,
            });
        }
        if !self.length_tolerance.is_finite() || self.length_tolerance < 0.0 {
            return Err(MatchError::InvalidLengthTolerance {
                tolerance: self.length_tolerance,
            });
        }
        if self.length_step == 0 {
            return Err(MatchError::InvalidLengthStep { length_step: self.length_step });
        }
        if self.max_window_evaluations == 0 {
            return Err(MatchError::InvalidCeiling { name: "max_window_evaluations" });
        }
        if self.max_cost_units == 0 {
            return Err(MatchError::InvalidCeiling { name: "max_cost_units" });
        }
        Ok(())
    }
}

/// Named search options as read from a JSON options file.
///
/// Every field is optional in the file; missing fields take the
/// [`MatchConfig`] defaults. Convert with `MatchConfig::try_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchOptions {
    /// Sakoe-Chiba radius; `null` means unconstrained.
    pub warping_window: Option<i64>,
    /// `"none"`, `"zscore"`, or `"pct_return"`.
    pub normalization: String,
    /// Overlap fraction in `[0, 1]`.
    pub overlap_suppression_fraction: f64,
    /// Window-evaluation ceiling.
    pub max_window_evaluations: u64,
    /// Window offset step, at least 1.
    pub step_size: usize,
    /// Maximum number of matches, at least 1.
    pub top_k: usize,
    /// DTW window-length tolerance, at least 0.
    pub length_tolerance: f64,
    /// DTW window-length increment.
    pub length_step: usize,
    /// Cost-unit ceiling.
    pub max_cost_units: u64,
    /// Abort on the first invalid candidate.
    pub strict: bool,
    /// Wall-clock limit in milliseconds.
    pub max_duration_ms: Option<u64>,
    /// Step limit.
    pub max_steps: Option<u64>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        let config = MatchConfig::default();
        Self {
            warping_window: None,
            normalization: config.normalization.to_string(),
            overlap_suppression_fraction: config.overlap_suppression_fraction,
            max_window_evaluations: config.max_window_evaluations,
            step_size: config.step_size,
            top_k: config.top_k,
            length_tolerance: config.length_tolerance,
            length_step: config.length_step,
            max_cost_units: config.max_cost_units,
            strict: config.strict,
            max_duration_ms: None,
            max_steps: None,
        }
    }
}

impl TryFrom<MatchOptions> for MatchConfig {
    type Error = MatchError;

    fn try_from(options: MatchOptions) -> Result<Self, Self::Error> {
        let constraint = BandConstraint::from_radius(options.warping_window)?;
        let normalization = options.normalization.parse::<Normalization>()?;
        let config = Self::new(options.step_size, options.top_k)?
            .with_constraint(constraint)
            .with_normalization(normalization)
            .with_overlap_suppression_fraction(options.overlap_suppression_fraction)
            .with_max_window_evaluations(options.max_window_evaluations)
            .with_max_cost_units(options.max_cost_units)
            .with_length_tolerance(options.length_tolerance)
            .with_length_step(options.length_step)
            .with_strict(options.strict)
            .with_max_duration(options.max_duration_ms.map(Duration::from_millis))
            .with_max_steps(options.max_steps);
        config.validate()?;
        Ok(config)
    }
}
