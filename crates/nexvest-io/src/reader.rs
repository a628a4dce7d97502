//! Daily price-history readers for `*_historico.json` and Yahoo-style CSV files.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nexvest_pattern::SkippedCandidate;
use nexvest_similarity::TimeSeries;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::{PriceField, PriceHistory, Symbol, date_to_timestamp};
use crate::IoError;

/// Reads one symbol's daily prices from a file.
///
/// Supported layouts:
/// - `.json`: an array of records `{"date": "YYYY-MM-DD", "open", "high",
///   "low", "close", "adjClose", "volume", ...}`. Extra keys are ignored.
/// - `.csv`: header `Date,Open,High,Low,Close,Adj Close,Volume`, matched
///   case-insensitively.
///
/// Records lacking a date or a value for the selected field (missing, JSON
/// `null`, empty, or the literal `null`) are dropped with a warning. The rest
/// are sorted by date. The symbol is the file stem with any `_historico`
/// suffix removed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::UnsupportedFormat`] | Extension is not `.json` or `.csv` |
/// | [`IoError::JsonParse`] | JSON is not an array |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | CSV header lacks the date or field column |
/// | [`IoError::InvalidDate`] | Date is not `YYYY-MM-DD` |
/// | [`IoError::NonFiniteValue`] | Value is NaN, Inf, or unparseable |
/// | [`IoError::DuplicateDate`] | Same date appears twice |
/// | [`IoError::EmptyDataset`] | No usable records |
/// | [`IoError::Series`] | Fewer than two usable records |
pub struct PriceReader {
    path: PathBuf,
    field: PriceField,
}

impl PriceReader {
    /// Create a reader for the given file, selecting the close price.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            field: PriceField::default(),
        }
    }

    /// Select which price column becomes the series value.
    #[must_use]
    pub fn with_field(mut self, field: PriceField) -> Self {
        self.field = field;
        self
    }

    /// Read and validate the file, returning a [`PriceHistory`].
    #[instrument(skip(self), fields(path = %self.path.display(), field = %self.field))]
    pub fn read(&self) -> Result<PriceHistory, IoError> {
        let extension = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        let mut records = match extension.as_deref() {
            Some("json") => self.read_json()?,
            Some("csv") => self.read_csv()?,
            _ => {
                return Err(IoError::UnsupportedFormat {
                    path: self.path.clone(),
                });
            }
        };

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        records.sort_by_key(|&(date, _)| date);
        if let Some(pair) = records.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(IoError::DuplicateDate {
                path: self.path.clone(),
                date: pair[0].0,
            });
        }

        let symbol = symbol_from_path(&self.path);
        let (timestamps, values): (Vec<i64>, Vec<f64>) = records
            .into_iter()
            .map(|(date, value)| (date_to_timestamp(date), value))
            .unzip();
        let series = TimeSeries::new(timestamps, values).map_err(|source| IoError::Series {
            symbol: symbol.to_string(),
            source,
        })?;

        info!(symbol = %symbol, n_records = series.len(), "price history loaded");
        Ok(PriceHistory::new(symbol, series))
    }

    fn read_json(&self) -> Result<Vec<(NaiveDate, f64)>, IoError> {
        let file = self.open()?;
        let raw: Vec<Value> =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| IoError::JsonParse {
                path: self.path.clone(),
                source: e,
            })?;

        let key = self.field.json_key();
        let mut records = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for (index, value) in raw.iter().enumerate() {
            let Some(object) = value.as_object() else {
                dropped += 1;
                continue;
            };
            let Some(date) = object.get("date").and_then(Value::as_str).filter(|d| !d.is_empty())
            else {
                dropped += 1;
                continue;
            };
            let date = self.parse_date(index, date)?;
            match object.get(key) {
                Some(Value::Number(n)) => {
                    let raw = n.to_string();
                    let price = n.as_f64().unwrap_or(f64::NAN);
                    records.push((date, self.finite(index, price, &raw)?));
                }
                Some(Value::String(s)) => match self.parse_value(index, s)? {
                    Some(price) => records.push((date, price)),
                    None => dropped += 1,
                },
                Some(Value::Null) | None => dropped += 1,
                Some(other) => {
                    return Err(IoError::NonFiniteValue {
                        path: self.path.clone(),
                        record: index,
                        raw: other.to_string(),
                    });
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, kept = records.len(), "dropped records without a date or {key}");
        }
        Ok(records)
    }

    fn read_csv(&self) -> Result<Vec<(NaiveDate, f64)>, IoError> {
        let file = self.open()?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let column = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
        };
        let date_col = column(&["date"]).ok_or_else(|| IoError::MissingColumn {
            path: self.path.clone(),
            column: "Date".to_string(),
        })?;
        let value_col = column(self.field.csv_headers()).ok_or_else(|| IoError::MissingColumn {
            path: self.path.clone(),
            column: self.field.to_string(),
        })?;
        debug!(date_col, value_col, "read CSV header");

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for (index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            let date = record.get(date_col).unwrap_or("");
            if date.is_empty() {
                dropped += 1;
                continue;
            }
            let date = self.parse_date(index, date)?;
            match self.parse_value(index, record.get(value_col).unwrap_or(""))? {
                Some(price) => records.push((date, price)),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, kept = records.len(), "dropped rows without a date or value");
        }
        Ok(records)
    }

    fn open(&self) -> Result<File, IoError> {
        File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    /// Parse the leading `YYYY-MM-DD` of a date, ignoring any time suffix.
    fn parse_date(&self, record: usize, raw: &str) -> Result<NaiveDate, IoError> {
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| IoError::InvalidDate {
            path: self.path.clone(),
            record,
            raw: raw.to_string(),
        })
    }

    /// `Ok(None)` for an absent value, an error for a present but invalid one.
    fn parse_value(&self, record: usize, raw: &str) -> Result<Option<f64>, IoError> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        let value = raw.parse::<f64>().map_err(|_| IoError::NonFiniteValue {
            path: self.path.clone(),
            record,
            raw: raw.to_string(),
        })?;
        self.finite(record, value, raw).map(Some)
    }

    fn finite(&self, record: usize, value: f64, raw: &str) -> Result<f64, IoError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                record,
                raw: raw.to_string(),
            })
        }
    }
}

/// Derive the symbol from a file name: `ECOPETROL_historico.json` gives
/// `ECOPETROL`, `SPY.csv` gives `SPY`.
fn symbol_from_path(path: &Path) -> Symbol {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.strip_suffix("_historico") {
        Some(prefix) if !prefix.is_empty() => Symbol::new(prefix.to_string()),
        _ => Symbol::new(stem),
    }
}

fn is_price_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with("_historico.json") || name.ends_with(".csv")
}

/// Every `*_historico.json` and `*.csv` file in `dir`, sorted by name.
fn price_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let read_dir_error = |e| IoError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.is_file() && is_price_file(&path) {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(IoError::EmptyDataset {
            path: dir.to_path_buf(),
        });
    }
    paths.sort();
    debug!(n_files = paths.len(), "price files found");
    Ok(paths)
}

/// Read every `*_historico.json` and `*.csv` file in `dir`, in file-name order.
///
/// # Errors
///
/// Returns [`IoError::ReadDir`] if the directory cannot be listed,
/// [`IoError::EmptyDataset`] if it holds no price files, and any error of
/// [`PriceReader::read`] for the first file that fails.
#[instrument(skip_all, fields(dir = %dir.display(), field = %field))]
pub fn read_dir(dir: &Path, field: PriceField) -> Result<Vec<PriceHistory>, IoError> {
    price_files(dir)?
        .iter()
        .map(|path| PriceReader::new(path).with_field(field).read())
        .collect()
}

/// A price file that could not be turned into a history.
#[derive(Debug)]
pub struct ReadFailure {
    /// Symbol derived from the file name.
    pub symbol: Symbol,
    /// Why the file was rejected.
    pub error: IoError,
}

impl ReadFailure {
    /// Search-report entry for this file.
    ///
    /// Series validation failures keep their classification; every other
    /// read error is reported as an invalid series.
    #[must_use]
    pub fn to_skipped(&self) -> SkippedCandidate {
        match &self.error {
            IoError::Series { source, .. } => SkippedCandidate::new(self.symbol.as_str(), source.clone()),
            other => SkippedCandidate::unreadable(self.symbol.as_str(), other.to_string()),
        }
    }
}

/// Histories read by [`read_many`], alongside the files that failed.
#[derive(Debug, Default)]
pub struct LoadedHistories {
    /// Histories that read cleanly, in file order.
    pub histories: Vec<PriceHistory>,
    /// Files that did not.
    pub failures: Vec<ReadFailure>,
}

/// Read price files and directories of them without stopping at a bad file.
///
/// Each file that fails to read is logged and collected in
/// [`LoadedHistories::failures`]; the caller decides whether that is fatal.
///
/// # Errors
///
/// Only directory-level failures abort: [`IoError::ReadDir`] and
/// [`IoError::EmptyDataset`].
#[instrument(skip_all, fields(n_paths = paths.len(), field = %field))]
pub fn read_many(paths: &[PathBuf], field: PriceField) -> Result<LoadedHistories, IoError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(price_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    let mut loaded = LoadedHistories::default();
    for path in &files {
        match PriceReader::new(path).with_field(field).read() {
            Ok(history) => loaded.histories.push(history),
            Err(error) => {
                warn!(path = %path.display(), %error, "unreadable price file");
                loaded.failures.push(ReadFailure {
                    symbol: symbol_from_path(path),
                    error,
                });
            }
        }
    }
    info!(
        n_histories = loaded.histories.len(),
        n_failures = loaded.failures.len(),
        "price files loaded"
    );
    Ok(loaded)
}
