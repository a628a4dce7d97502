//! Domain types for nexvest-io.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use nexvest_similarity::TimeSeries;

use crate::IoError;

/// Convert a calendar date to seconds since the Unix epoch at midnight UTC.
#[must_use]
pub fn date_to_timestamp(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

/// Convert seconds since the Unix epoch back to a UTC calendar date.
#[must_use]
pub fn timestamp_to_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// A ticker or exchange mnemonic, e.g. `ECOPETROL` or `SPY`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    /// Create a symbol from a non-empty string.
    pub(crate) fn new(symbol: String) -> Self {
        debug_assert!(!symbol.is_empty(), "symbol must not be empty");
        Self(symbol)
    }

    /// Return the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which price column of a daily record becomes the series value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceField {
    /// Opening price of the session.
    Open,
    /// Session high.
    High,
    /// Session low.
    Low,
    /// Closing price.
    #[default]
    Close,
    /// Close adjusted for splits and dividends (`adjClose` / `Adj Close`).
    AdjClose,
    /// Traded volume.
    Volume,
}

impl PriceField {
    /// Key of this field in a `*_historico.json` record.
    #[must_use]
    pub fn json_key(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::AdjClose => "adjClose",
            Self::Volume => "volume",
        }
    }

    /// Accepted CSV header names, lowercase.
    pub(crate) fn csv_headers(self) -> &'static [&'static str] {
        match self {
            Self::Open => &["open"],
            Self::High => &["high"],
            Self::Low => &["low"],
            Self::Close => &["close"],
            Self::AdjClose => &["adj close", "adjclose", "adj_close"],
            Self::Volume => &["volume"],
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_key())
    }
}

/// Error returned when parsing an unknown price field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown price field \"{0}\" (expected open, high, low, close, adj_close, or volume)")]
pub struct ParsePriceFieldError(pub String);

impl FromStr for PriceField {
    type Err = ParsePriceFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "close" => Ok(Self::Close),
            "adj_close" | "adjclose" | "adj-close" => Ok(Self::AdjClose),
            "volume" => Ok(Self::Volume),
            _ => Err(ParsePriceFieldError(s.to_string())),
        }
    }
}

/// Daily prices of one symbol, as a validated time series.
///
/// Produced by [`PriceReader`](crate::PriceReader). Timestamps are the record
/// dates at midnight UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    symbol: Symbol,
    series: TimeSeries,
}

impl PriceHistory {
    pub(crate) fn new(symbol: Symbol, series: TimeSeries) -> Self {
        Self { symbol, series }
    }

    /// Return the symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Return the price series.
    #[must_use]
    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Return the number of daily records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Always false: a history holds at least two records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Return the first and last dates covered.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let ts = self.series.timestamps();
        Some((timestamp_to_date(*ts.first()?)?, timestamp_to_date(*ts.last()?)?))
    }

    /// Return the records dated within `[from, to]`, both bounds inclusive
    /// and optional.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Series`] if fewer than two records remain.
    pub fn between(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, IoError> {
        let lo = from.map_or(i64::MIN, date_to_timestamp);
        let hi = to.map_or(i64::MAX, date_to_timestamp);
        let (timestamps, values): (Vec<i64>, Vec<f64>) = self
            .series
            .timestamps()
            .iter()
            .zip(self.series.values())
            .filter(|&(&t, _)| t >= lo && t <= hi)
            .map(|(&t, &v)| (t, v))
            .unzip();
        let series = TimeSeries::new(timestamps, values).map_err(|source| IoError::Series {
            symbol: self.symbol.to_string(),
            source,
        })?;
        Ok(Self::new(self.symbol.clone(), series))
    }

    /// The first `limit` records in date order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Series`] if `limit` is below two.
    pub fn first(&self, limit: usize) -> Result<Self, IoError> {
        let keep = limit.min(self.len());
        let series = TimeSeries::new(
            self.series.timestamps()[..keep].to_vec(),
            self.series.values()[..keep].to_vec(),
        )
        .map_err(|source| IoError::Series {
            symbol: self.symbol.to_string(),
            source,
        })?;
        Ok(Self::new(self.symbol.clone(), series))
    }

    /// The value recorded on exactly `date`, if any.
    #[must_use]
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        let ts = date_to_timestamp(date);
        self.series
            .timestamps()
            .binary_search(&ts)
            .ok()
            .map(|i| self.series.values()[i])
    }
}
