//! Price-history readers and JSON report writers for the nexvest pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{
    ExperimentName, ParsePriceFieldError, PriceField, PriceHistory, Symbol, date_to_timestamp,
    timestamp_to_date,
};
pub use error::IoError;
pub use reader::{LoadedHistories, PriceReader, ReadFailure, read_dir, read_many};
pub use writer::ReportWriter;
