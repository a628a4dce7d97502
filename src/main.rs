use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use nexvest_io::{
    ExperimentName, LoadedHistories, PriceField, PriceHistory, PriceReader, ReadFailure, ReportWriter,
    read_dir, read_many, timestamp_to_date,
};
use nexvest_pattern::{MatchConfig, MatchOptions, MatchReport, NamedSeries, find_patterns};
use nexvest_similarity::{
    BandConstraint, DistanceParams, MetricKind, Normalization, TimeSeries, compute_distance,
    compute_pairwise,
};

#[derive(Parser)]
#[command(name = "nexvest")]
#[command(about = "Time-series similarity and pattern search over historical prices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Where reports go. Nothing is written unless `--experiment` is given.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Compare two price histories with one metric
    Distance {
        /// First price file (.json or .csv)
        #[arg(long)]
        a: PathBuf,

        /// Second price file (.json or .csv)
        #[arg(long)]
        b: PathBuf,

        /// Price column to compare
        #[arg(long, default_value = "close")]
        field: PriceField,

        /// euclidean, pearson, cosine, or dtw
        #[arg(long, default_value = "dtw")]
        metric: MetricKind,

        /// none, zscore, or pct_return
        #[arg(long, default_value = "none")]
        normalization: Normalization,

        /// Sakoe-Chiba warping window radius (omit for unconstrained)
        #[arg(long, allow_negative_numbers = true)]
        warping_window: Option<i64>,

        /// Include the DTW warping path in the output
        #[arg(long, default_value_t = false)]
        path: bool,

        /// First date to keep from both histories (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to keep from both histories (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Wall-clock limit in milliseconds
        #[arg(long)]
        max_duration_ms: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compute all pairwise distances between price histories
    Matrix {
        /// Price files or directories of them
        #[arg(long, num_args = 1.., required = true)]
        series: Vec<PathBuf>,

        /// Price column to compare
        #[arg(long, default_value = "close")]
        field: PriceField,

        /// euclidean, pearson, cosine, or dtw
        #[arg(long, default_value = "dtw")]
        metric: MetricKind,

        /// none, zscore, or pct_return
        #[arg(long, default_value = "none")]
        normalization: Normalization,

        /// Sakoe-Chiba warping window radius (omit for unconstrained)
        #[arg(long, allow_negative_numbers = true)]
        warping_window: Option<i64>,

        /// First date to keep from every history (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to keep from every history (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Wall-clock limit in milliseconds
        #[arg(long)]
        max_duration_ms: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Find the windows of candidate histories that resemble a query
    Search {
        /// Price file holding the query pattern
        #[arg(long)]
        query: PathBuf,

        /// First date of the query pattern (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the query pattern (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Candidate price files or directories of them
        #[arg(long, num_args = 1.., required = true)]
        candidates: Vec<PathBuf>,

        /// Price column to compare
        #[arg(long, default_value = "close")]
        field: PriceField,

        /// euclidean, pearson, cosine, or dtw
        #[arg(long)]
        metric: MetricKind,

        /// Maximum distance, or minimum similarity, a window must reach
        #[arg(long, allow_negative_numbers = true)]
        threshold: f64,

        /// JSON file of search options; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Window offset step
        #[arg(long)]
        step: Option<usize>,

        /// Maximum number of matches
        #[arg(long)]
        top_k: Option<usize>,

        /// Overlap fraction above which a weaker match is suppressed
        #[arg(long)]
        overlap: Option<f64>,

        /// none, zscore, or pct_return
        #[arg(long)]
        normalization: Option<Normalization>,

        /// Sakoe-Chiba warping window radius
        #[arg(long, allow_negative_numbers = true)]
        warping_window: Option<i64>,

        /// Abort on the first invalid candidate instead of skipping it
        #[arg(long, default_value_t = false)]
        strict: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}

// --- stdout summaries ---

#[derive(Serialize)]
struct DistanceOutput {
    a: String,
    b: String,
    metric: MetricKind,
    value: f64,
    path_len: Option<usize>,
}

#[derive(Serialize)]
struct MatrixOutput {
    metric: MetricKind,
    n_series: usize,
    closest: Option<PairOutput>,
}

#[derive(Serialize)]
struct PairOutput {
    a: String,
    b: String,
    value: f64,
}

#[derive(Serialize)]
struct SearchOutput {
    query: String,
    metric: MetricKind,
    threshold: f64,
    candidates_scanned: usize,
    candidates_skipped: usize,
    windows_evaluated: u64,
    degenerate_windows: u64,
    matches: Vec<MatchOutput>,
}

#[derive(Serialize)]
struct MatchOutput {
    rank: usize,
    candidate: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    score: f64,
}

impl From<&MatchReport> for SearchOutput {
    fn from(report: &MatchReport) -> Self {
        Self {
            query: report.query_id.clone(),
            metric: report.metric,
            threshold: report.threshold,
            candidates_scanned: report.candidates_scanned,
            candidates_skipped: report.skipped.len(),
            windows_evaluated: report.windows_evaluated,
            degenerate_windows: report.degenerate_windows,
            matches: report
                .matches
                .iter()
                .map(|m| MatchOutput {
                    rank: m.rank(),
                    candidate: m.candidate_id().to_string(),
                    start_date: timestamp_to_date(m.start_timestamp()),
                    end_date: timestamp_to_date(m.end_timestamp()),
                    score: m.score().value(),
                })
                .collect(),
        }
    }
}

fn read_history(path: &Path, field: PriceField) -> Result<PriceHistory> {
    PriceReader::new(path)
        .with_field(field)
        .read()
        .with_context(|| format!("failed to read price file {}", path.display()))
}

fn read_histories(paths: &[PathBuf], field: PriceField) -> Result<Vec<PriceHistory>> {
    let mut histories = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = read_dir(path, field)
                .with_context(|| format!("failed to read price directory {}", path.display()))?;
            histories.extend(found);
        } else {
            histories.push(read_history(path, field)?);
        }
    }
    info!(n_histories = histories.len(), "price histories loaded");
    Ok(histories)
}

fn load_options(path: Option<&Path>) -> Result<MatchOptions> {
    let Some(path) = path else {
        return Ok(MatchOptions::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid options file {}", path.display()))
}

fn report_writer(output: &OutputArgs) -> Result<Option<ReportWriter>> {
    let Some(name) = &output.experiment else {
        return Ok(None);
    };
    let experiment = ExperimentName::new(name.clone())?;
    Ok(Some(ReportWriter::new(&output.output_dir, experiment)?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Distance {
            a,
            b,
            field,
            metric,
            normalization,
            warping_window,
            path,
            from,
            to,
            max_duration_ms,
            output,
        } => {
            let writer = report_writer(&output)?;
            let a = read_history(&a, field)?
                .between(from, to)
                .context("date range leaves too few records in --a")?;
            let b = read_history(&b, field)?
                .between(from, to)
                .context("date range leaves too few records in --b")?;

            if path && metric != MetricKind::Dtw {
                warn!(%metric, "--path only applies to dtw; ignored");
            }
            let params = DistanceParams::new()
                .with_normalization(normalization)
                .with_constraint(BandConstraint::from_radius(warping_window)?)
                .with_path(path)
                .with_max_duration(max_duration_ms.map(Duration::from_millis));

            let score = compute_distance(a.series(), b.series(), metric, &params)
                .with_context(|| format!("failed to compare {} and {}", a.symbol(), b.symbol()))?;
            info!(a = %a.symbol(), b = %b.symbol(), %score, "distance computed");

            if let Some(writer) = writer {
                writer.write_distance(a.symbol().as_str(), b.symbol().as_str(), &score)?;
            }

            let summary = DistanceOutput {
                a: a.symbol().to_string(),
                b: b.symbol().to_string(),
                metric,
                value: score.value(),
                path_len: score.path().map(|p| p.len()),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Matrix {
            series,
            field,
            metric,
            normalization,
            warping_window,
            from,
            to,
            max_duration_ms,
            output,
        } => {
            let writer = report_writer(&output)?;
            let histories = read_histories(&series, field)?
                .into_iter()
                .map(|h| {
                    let symbol = h.symbol().to_string();
                    h.between(from, to)
                        .with_context(|| format!("date range leaves too few records in {symbol}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let ids: Vec<&str> = histories.iter().map(|h| h.symbol().as_str()).collect();
            let series: Vec<TimeSeries> = histories.iter().map(|h| h.series().clone()).collect();

            let params = DistanceParams::new()
                .with_normalization(normalization)
                .with_constraint(BandConstraint::from_radius(warping_window)?)
                .with_max_duration(max_duration_ms.map(Duration::from_millis));
            let matrix = compute_pairwise(&series, metric, &params).context("pairwise comparison failed")?;

            if let Some(writer) = writer {
                writer.write_matrix(&ids, &matrix)?;
            }

            let closest = matrix
                .iter()
                .min_by(|x, y| metric.orientation().best_first(x.2, y.2))
                .map(|(i, j, value)| PairOutput {
                    a: ids[j].to_string(),
                    b: ids[i].to_string(),
                    value,
                });
            let summary = MatrixOutput {
                metric,
                n_series: matrix.len(),
                closest,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Search {
            query,
            from,
            to,
            candidates,
            field,
            metric,
            threshold,
            config,
            step,
            top_k,
            overlap,
            normalization,
            warping_window,
            strict,
            output,
        } => {
            let writer = report_writer(&output)?;

            let mut options = load_options(config.as_deref())?;
            if let Some(step) = step {
                options.step_size = step;
            }
            if let Some(top_k) = top_k {
                options.top_k = top_k;
            }
            if let Some(overlap) = overlap {
                options.overlap_suppression_fraction = overlap;
            }
            if let Some(normalization) = normalization {
                options.normalization = normalization.to_string();
            }
            if warping_window.is_some() {
                options.warping_window = warping_window;
            }
            options.strict |= strict;
            let match_config = MatchConfig::try_from(options).context("invalid search options")?;

            let query = read_history(&query, field)?
                .between(from, to)
                .context("date range leaves too few records in the query")?;
            let LoadedHistories { histories, failures } = read_many(&candidates, field)
                .context("failed to read candidate price files")?;
            if match_config.is_strict()
                && let Some(failure) = failures.first()
            {
                anyhow::bail!("invalid candidate {}: {}", failure.symbol, failure.error);
            }
            let named: Vec<NamedSeries<'_>> = histories
                .iter()
                .map(|h| NamedSeries::from_series(h.symbol().as_str(), h.series()))
                .collect();

            let mut report = find_patterns(
                NamedSeries::from_series(query.symbol().as_str(), query.series()),
                &named,
                metric,
                threshold,
                &match_config,
            )
            .context("pattern search failed")?;
            report.skipped.extend(failures.iter().map(ReadFailure::to_skipped));

            for skipped in &report.skipped {
                warn!(candidate = %skipped.id, kind = %skipped.kind, reason = %skipped.reason, "candidate skipped");
            }
            if let Some(writer) = writer {
                writer.write_matches(&report)?;
            }

            println!("{}", serde_json::to_string_pretty(&SearchOutput::from(&report))?);
        }
    }

    Ok(())
}
