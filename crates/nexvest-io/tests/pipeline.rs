//! End-to-end integration tests: price files -> search/distance -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use nexvest_io::{ExperimentName, LoadedHistories, PriceField, PriceReader, ReadFailure, ReportWriter, read_dir, read_many};
use nexvest_pattern::{MatchConfig, NamedSeries, find_patterns};
use nexvest_similarity::{DistanceParams, MetricKind, Normalization, compute_distance};
use tempfile::TempDir;

const DAYS: usize = 120;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

fn date(i: usize) -> NaiveDate {
    start().checked_add_days(Days::new(i as u64)).unwrap()
}

fn prices(phase: f64, level: f64) -> Vec<f64> {
    (0..DAYS)
        .map(|i| level + 5.0 * (i as f64 * 0.15 + phase).sin() + 0.01 * i as f64)
        .collect()
}

fn write_bvc_json(dir: &Path, symbol: &str, values: &[f64]) {
    let records: Vec<serde_json::Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::json!({
                "date": date(i).to_string(),
                "open": v - 1.0,
                "close": v,
                "volume": 1000 + i,
                "mnemonic": symbol,
            })
        })
        .collect();
    let path = dir.join(format!("{symbol}_historico.json"));
    fs::write(path, serde_json::to_string_pretty(&records).unwrap()).unwrap();
}

fn write_yahoo_csv(dir: &Path, ticker: &str, values: &[f64]) {
    let mut csv = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for (i, v) in values.iter().enumerate() {
        csv.push_str(&format!("{},{v},{v},{v},{v},{v},100\n", date(i)));
    }
    fs::write(dir.join(format!("{ticker}.csv")), csv).unwrap();
}

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_bvc_json(dir.path(), "ECOPETROL", &prices(0.0, 2400.0));
    write_bvc_json(dir.path(), "GEB", &prices(1.7, 2600.0));
    write_yahoo_csv(dir.path(), "SPY", &prices(3.1, 470.0));
    dir
}

#[test]
fn search_round_trip() {
    let data = corpus();
    let histories = read_dir(data.path(), PriceField::Close).unwrap();
    assert_eq!(histories.len(), 3);

    // Query: 30 days of ECOPETROL starting at day 40.
    let ecopetrol = histories.iter().find(|h| h.symbol().as_str() == "ECOPETROL").unwrap();
    let query = ecopetrol.between(Some(date(40)), Some(date(69))).unwrap();
    assert_eq!(query.len(), 30);

    let candidates: Vec<NamedSeries<'_>> = histories
        .iter()
        .map(|h| NamedSeries::from_series(h.symbol().as_str(), h.series()))
        .collect();
    let config = MatchConfig::new(1, 5)
        .unwrap()
        .with_normalization(Normalization::ZScore);
    let report = find_patterns(
        NamedSeries::from_series("query", query.series()),
        &candidates,
        MetricKind::Euclidean,
        0.5,
        &config,
    )
    .unwrap();

    let best = report.best().unwrap();
    assert_eq!(best.candidate_id(), "ECOPETROL");
    assert_eq!(best.window().start(), 40);
    assert!(best.score().value() < 1e-9);

    let out = TempDir::new().unwrap();
    let writer = ReportWriter::new(out.path(), ExperimentName::new("scan_rt".into()).unwrap()).unwrap();
    let path = writer.write_matches(&report).unwrap();
    assert_eq!(path, out.path().join("scan_rt_matches.json"));

    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "scan_rt");
    assert_eq!(content["query_id"], "query");
    assert_eq!(content["metric"], "euclidean");
    assert_eq!(content["candidates_scanned"], 3);
    let matches = content["matches"].as_array().unwrap();
    assert_eq!(matches.len(), report.matches.len());
    assert_eq!(matches[0]["rank"], 1);
    assert_eq!(matches[0]["candidate_id"], "ECOPETROL");
    assert_eq!(matches[0]["start_date"], date(40).to_string());
    assert_eq!(matches[0]["end_date"], date(69).to_string());
    assert!(content["skipped"].as_array().unwrap().is_empty());
}

#[test]
fn undefined_returns_candidate_reported_as_skipped() {
    let data = corpus();
    // A zero close makes the following percent return undefined.
    let mut qqq = prices(0.5, 400.0);
    qqq[5] = 0.0;
    write_yahoo_csv(data.path(), "QQQ", &qqq);
    let histories = read_dir(data.path(), PriceField::Close).unwrap();
    assert_eq!(histories.len(), 4);

    let query = histories[0].between(Some(date(10)), Some(date(39))).unwrap();
    let candidates: Vec<NamedSeries<'_>> = histories
        .iter()
        .map(|h| NamedSeries::from_series(h.symbol().as_str(), h.series()))
        .collect();
    let config = MatchConfig::new(2, 3)
        .unwrap()
        .with_normalization(Normalization::PctReturn);
    let report = find_patterns(
        NamedSeries::from_series("query", query.series()),
        &candidates,
        MetricKind::Pearson,
        0.9,
        &config,
    )
    .unwrap();

    let out = TempDir::new().unwrap();
    let writer = ReportWriter::new(out.path(), ExperimentName::new("skip_rt".into()).unwrap()).unwrap();
    let path = writer.write_matches(&report).unwrap();
    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    let skipped = content["skipped"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["id"], "QQQ");
    assert!(skipped[0]["reason"].as_str().unwrap().contains("zero value"));
    assert_eq!(content["candidates_scanned"], 3);
}

#[test]
fn unreadable_candidate_file_reported_as_skipped() {
    let data = corpus();
    let bad = serde_json::json!([{"date": "2023-01-02", "close": 10.0}]);
    fs::write(data.path().join("BAD_historico.json"), bad.to_string()).unwrap();
    fs::write(data.path().join("BROKEN.csv"), "Date,Close\n2023-01-02,oops\n").unwrap();
    assert!(read_dir(data.path(), PriceField::Close).is_err());

    let LoadedHistories { histories, failures } =
        read_many(&[data.path().to_path_buf()], PriceField::Close).unwrap();
    assert_eq!(histories.len(), 3);
    assert_eq!(failures.len(), 2);

    let ecopetrol = histories.iter().find(|h| h.symbol().as_str() == "ECOPETROL").unwrap();
    let query = ecopetrol.between(Some(date(40)), Some(date(69))).unwrap();
    let candidates: Vec<NamedSeries<'_>> = histories
        .iter()
        .map(|h| NamedSeries::from_series(h.symbol().as_str(), h.series()))
        .collect();
    let config = MatchConfig::new(1, 5).unwrap();
    let mut report = find_patterns(
        NamedSeries::from_series("query", query.series()),
        &candidates,
        MetricKind::Euclidean,
        0.001,
        &config,
    )
    .unwrap();
    report.skipped.extend(failures.iter().map(ReadFailure::to_skipped));

    assert_eq!(report.best().unwrap().candidate_id(), "ECOPETROL");
    assert_eq!(report.best().unwrap().window().start(), 40);

    let out = TempDir::new().unwrap();
    let writer = ReportWriter::new(out.path(), ExperimentName::new("bad_files".into()).unwrap()).unwrap();
    let path = writer.write_matches(&report).unwrap();
    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(content["candidates_scanned"], 3);
    let skipped = content["skipped"].as_array().unwrap();
    let ids: Vec<&str> = skipped.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["BAD", "BROKEN"]);
    assert_eq!(skipped[0]["kind"], "invalid_series");
    assert!(skipped[0]["reason"].as_str().unwrap().contains("at least 2"));
}

#[test]
fn distance_round_trip() {
    let data = corpus();
    let a = PriceReader::new(&data.path().join("ECOPETROL_historico.json")).read().unwrap();
    let b = PriceReader::new(&data.path().join("SPY.csv")).read().unwrap();

    let params = DistanceParams::new()
        .with_normalization(Normalization::ZScore)
        .with_path(true);
    let score = compute_distance(a.series(), b.series(), MetricKind::Dtw, &params).unwrap();

    let out = TempDir::new().unwrap();
    let writer = ReportWriter::new(out.path(), ExperimentName::new("dist_rt".into()).unwrap()).unwrap();
    let path = writer.write_distance("ECOPETROL", "SPY", &score).unwrap();

    let content: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["a"], "ECOPETROL");
    assert_eq!(content["b"], "SPY");
    assert_eq!(content["metric"], "dtw");
    assert!((content["value"].as_f64().unwrap() - score.value()).abs() < 1e-12);
    let steps = content["path"].as_array().unwrap();
    assert_eq!(steps.last().unwrap()["a"], DAYS - 1);
    assert_eq!(steps.last().unwrap()["b"], DAYS - 1);
}

#[test]
fn open_field_differs_from_close() {
    let data = corpus();
    let path = data.path().join("GEB_historico.json");
    let close = PriceReader::new(&path).read().unwrap();
    let open = PriceReader::new(&path).with_field(PriceField::Open).read().unwrap();
    for (o, c) in open.series().values().iter().zip(close.series().values()) {
        assert!((c - o - 1.0).abs() < 1e-9);
    }
}
