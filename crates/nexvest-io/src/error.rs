//! I/O error types for nexvest-io.

use std::path::PathBuf;

use chrono::NaiveDate;
use nexvest_similarity::SimilarityError;

/// Errors from reading price histories and writing reports.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an input directory cannot be listed.
    #[error("cannot read directory {path}")]
    ReadDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the file extension is neither `.json` nor `.csv`.
    #[error("unsupported file format: {path} (expected .json or .csv)")]
    UnsupportedFormat {
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when a JSON price file is not an array of records.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a CSV header lacks a required column.
    #[error("missing column \"{column}\" in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },

    /// Returned when a date is not in `YYYY-MM-DD` form.
    #[error("invalid date in {path}: record {record}, raw value \"{raw}\"")]
    InvalidDate {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based record index (excluding header).
        record: usize,
        /// The raw string that failed to parse.
        raw: String,
    },

    /// Returned when the same date appears more than once.
    #[error("duplicate date {date} in {path}")]
    DuplicateDate {
        /// Path to the input file.
        path: PathBuf,
        /// The duplicated date.
        date: NaiveDate,
    },

    /// Returned when a price is NaN, Inf, or not a number.
    #[error("non-finite value in {path}: record {record}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the input file.
        path: PathBuf,
        /// Zero-based record index (excluding header).
        record: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when no usable records (or files) remain.
    #[error("empty dataset (no usable records) in {path}")]
    EmptyDataset {
        /// Path to the file or directory.
        path: PathBuf,
    },

    /// Returned when the loaded prices do not form a valid series.
    #[error("invalid price series for {symbol}")]
    Series {
        /// Symbol of the offending history.
        symbol: String,
        /// Underlying validation error.
        source: SimilarityError,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a report cannot be serialized.
    #[error("cannot serialize report for {path}")]
    Serialize {
        /// Destination of the report.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
