//! Series normalization: z-score and percent-return transforms.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::SimilarityError;
use crate::series::TimeSeries;

/// Normalization applied to a series before it is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Values are compared as-is.
    #[default]
    None,
    /// Subtract the mean and divide by the population standard deviation.
    #[serde(rename = "zscore")]
    ZScore,
    /// Replace prices with period-over-period fractional returns.
    PctReturn,
}

impl Normalization {
    /// Return the canonical lowercase name of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ZScore => "zscore",
            Self::PctReturn => "pct_return",
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a normalization name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown normalization \"{0}\" (expected none, zscore, or pct_return)")]
pub struct ParseNormalizationError(pub String);

impl FromStr for Normalization {
    type Err = ParseNormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "zscore" => Ok(Self::ZScore),
            "pct_return" => Ok(Self::PctReturn),
            other => Err(ParseNormalizationError(other.to_string())),
        }
    }
}

/// Normalize a series, returning a new series. The input is never modified.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::ZeroVariance`] | `ZScore` on a constant series |
/// | [`SimilarityError::TooShort`] | `PctReturn` on fewer than 3 points |
/// | [`SimilarityError::ZeroPriorValue`] | `PctReturn` with a zero value before the last point |
#[must_use = "returns a new normalized series; the original is unchanged"]
pub fn normalize(series: &TimeSeries, mode: Normalization) -> Result<TimeSeries, SimilarityError> {
    match mode {
        Normalization::None => Ok(series.clone()),
        Normalization::ZScore => {
            let values = z_normalize_values(series.values())?;
            Ok(TimeSeries::from_parts_unchecked(series.timestamps().to_vec(), values))
        }
        Normalization::PctReturn => {
            // The output drops one point and must still be a valid series.
            if series.len() < 3 {
                return Err(SimilarityError::TooShort { len: series.len(), min: 3 });
            }
            let values = pct_returns_values(series.values())?;
            Ok(TimeSeries::from_parts_unchecked(series.timestamps()[1..].to_vec(), values))
        }
    }
}

/// Z-normalize a slice to zero mean and unit variance.
///
/// Uses population standard deviation (divides by n, not n-1).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::TooShort`] | `data` is empty |
/// | [`SimilarityError::ZeroVariance`] | All values are identical |
pub fn z_normalize_values(data: &[f64]) -> Result<Vec<f64>, SimilarityError> {
    let data = rescale_large(data);
    let (mean, std) = mean_and_std(&data)?;
    Ok(data.iter().map(|&x| (x - mean) / std).collect())
}

/// Population mean and standard deviation of a non-constant slice.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::TooShort`] | `data` is empty |
/// | [`SimilarityError::ZeroVariance`] | All values are identical |
pub fn mean_and_std(data: &[f64]) -> Result<(f64, f64), SimilarityError> {
    let Some(&first) = data.first() else {
        return Err(SimilarityError::TooShort { len: 0, min: 1 });
    };
    // An exactly constant slice can still produce a tiny non-zero variance
    // through rounding of the mean, so test constancy directly.
    if data.iter().all(|&x| x == first) {
        return Err(SimilarityError::ZeroVariance { len: data.len() });
    }
    if let Some(scale) = overflow_scale(data) {
        let (mean, std) = mean_and_std(&rescale(data, scale))?;
        return Ok((mean * scale, std * scale));
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std == 0.0 {
        return Err(SimilarityError::ZeroVariance { len: data.len() });
    }
    Ok((mean, std))
}

/// Magnitude above which sums of squares could overflow.
const RESCALE_ABOVE: f64 = 1e100;

/// The largest absolute value in `data` when it exceeds [`RESCALE_ABOVE`].
pub(crate) fn overflow_scale(data: &[f64]) -> Option<f64> {
    let max = data.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    (max > RESCALE_ABOVE).then_some(max)
}

fn rescale(data: &[f64], scale: f64) -> Vec<f64> {
    data.iter().map(|&x| x / scale).collect()
}

/// `data` divided by its largest magnitude when squaring it could overflow.
///
/// For scale-invariant quantities (correlation, cosine, z-scores).
pub(crate) fn rescale_large(data: &[f64]) -> Cow<'_, [f64]> {
    match overflow_scale(data) {
        Some(scale) => Cow::Owned(rescale(data, scale)),
        None => Cow::Borrowed(data),
    }
}

/// Both slices divided by a shared scale when squaring either could
/// overflow. Returns the scale to multiply results back by (`1.0` when the
/// inputs were borrowed unchanged).
pub(crate) fn rescale_pair<'a>(a: &'a [f64], b: &'a [f64]) -> (Cow<'a, [f64]>, Cow<'a, [f64]>, f64) {
    let scale = match (overflow_scale(a), overflow_scale(b)) {
        (None, None) => return (Cow::Borrowed(a), Cow::Borrowed(b), 1.0),
        (x, y) => x.unwrap_or(0.0).max(y.unwrap_or(0.0)),
    };
    (Cow::Owned(rescale(a, scale)), Cow::Owned(rescale(b, scale)), scale)
}

/// Fractional returns `(v[i] - v[i-1]) / v[i-1]` for `i` in `1..n`.
///
/// Output length is `n - 1`; an input of one point yields an empty vector.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SimilarityError::ZeroPriorValue`] | Any `v[i-1] == 0` |
pub fn pct_returns_values(data: &[f64]) -> Result<Vec<f64>, SimilarityError> {
    data.windows(2)
        .enumerate()
        .map(|(index, w)| {
            if w[0] == 0.0 {
                Err(SimilarityError::ZeroPriorValue { index })
            } else {
                Ok((w[1] - w[0]) / w[0])
            }
        })
        .collect()
}
