//! JSON report writer for distance and pattern-search outputs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use nexvest_pattern::{MatchReport, SkippedCandidate};
use nexvest_similarity::{DistanceMatrix, MetricKind, SimilarityScore, WarpingPath};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::{ExperimentName, timestamp_to_date};
use crate::IoError;

/// Writes distance and search reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_matches.json`,
/// `{experiment}_distance.json`, and `{experiment}_matrix.json`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a search report to `{experiment}_matches.json` and return its path.
    ///
    /// Window bounds are written both as indices and as ISO dates.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(query = %report.query_id))]
    pub fn write_matches(&self, report: &MatchReport) -> Result<PathBuf, IoError> {
        let matches = report
            .matches
            .iter()
            .map(|m| MatchEntry {
                rank: m.rank(),
                candidate_id: m.candidate_id(),
                start_index: m.window().start(),
                len: m.window().len(),
                start_date: timestamp_to_date(m.start_timestamp()),
                end_date: timestamp_to_date(m.end_timestamp()),
                score: m.score().value(),
            })
            .collect();

        let artifact = MatchesArtifact {
            experiment: self.experiment.as_str(),
            query_id: &report.query_id,
            metric: report.metric,
            threshold: report.threshold,
            candidates_scanned: report.candidates_scanned,
            windows_evaluated: report.windows_evaluated,
            degenerate_windows: report.degenerate_windows,
            windows_passed: report.windows_passed,
            matches,
            skipped: &report.skipped,
        };

        let path = self.write_json("matches", &artifact)?;
        info!(path = %path.display(), n_matches = report.matches.len(), "matches written");
        Ok(path)
    }

    /// Write a single distance computation to `{experiment}_distance.json`
    /// and return its path.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(a = a, b = b))]
    pub fn write_distance(&self, a: &str, b: &str, score: &SimilarityScore) -> Result<PathBuf, IoError> {
        let artifact = DistanceArtifact {
            experiment: self.experiment.as_str(),
            a,
            b,
            metric: score.metric(),
            value: score.value(),
            path: score.path(),
        };

        let path = self.write_json("distance", &artifact)?;
        info!(path = %path.display(), "distance written");
        Ok(path)
    }

    /// Write a pairwise matrix to `{experiment}_matrix.json` and return its path.
    ///
    /// `ids[i]` labels row and column `i` of `matrix`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n = matrix.len()))]
    pub fn write_matrix(&self, ids: &[&str], matrix: &DistanceMatrix) -> Result<PathBuf, IoError> {
        debug_assert_eq!(ids.len(), matrix.len());
        let artifact = MatrixArtifact {
            experiment: self.experiment.as_str(),
            metric: matrix.metric(),
            ids,
            values: (0..matrix.len()).map(|i| matrix.row(i)).collect(),
        };

        let path = self.write_json("matrix", &artifact)?;
        info!(path = %path.display(), "matrix written");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, suffix: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct MatchesArtifact<'a> {
    experiment: &'a str,
    query_id: &'a str,
    metric: MetricKind,
    threshold: f64,
    candidates_scanned: usize,
    windows_evaluated: u64,
    degenerate_windows: u64,
    windows_passed: u64,
    matches: Vec<MatchEntry<'a>>,
    skipped: &'a [SkippedCandidate],
}

#[derive(Serialize)]
struct MatchEntry<'a> {
    rank: usize,
    candidate_id: &'a str,
    start_index: usize,
    len: usize,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    score: f64,
}

#[derive(Serialize)]
struct DistanceArtifact<'a> {
    experiment: &'a str,
    a: &'a str,
    b: &'a str,
    metric: MetricKind,
    value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a WarpingPath>,
}

#[derive(Serialize)]
struct MatrixArtifact<'a> {
    experiment: &'a str,
    metric: MetricKind,
    ids: &'a [&'a str],
    values: Vec<Vec<f64>>,
}
