use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use trend_review_report::config::{
    BUBBLE_CHART_FILE, REPORT_FILE, SCATTER_CHART_FILE, TIME_SERIES_CHART_FILE,
};
use trend_review_report::dataset::MetricSource;
use trend_review_report::fonts::chart::{FontInventory, FontResolver};
use trend_review_report::fonts::chart::NoProvisioner;
use trend_review_report::pipeline::{analyze, run_with_resolver};
use trend_review_report::{ReportConfig, ReportError, StatsError};

struct FixedInventory(Vec<String>);

impl FontInventory for FixedInventory {
    fn families(&self) -> Vec<String> {
        self.0.clone()
    }
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn config_for(dir: &TempDir, reviews: &str, trend: &str) -> ReportConfig {
    let reviews = write(dir.path(), "reviews.csv", reviews);
    let trend = write(dir.path(), "trend.csv", trend);
    ReportConfig::new()
        .with_reviews_path(reviews)
        .with_trend_path(trend)
        .with_output_dir(dir.path().join("out"))
        .with_font_install(false)
}

const MULTI_WEEK_REVIEWS: &str = "\
at,score,content
2024-01-01 09:00:00,5,fast
2024-01-03 18:30:00,4,ok
2024-01-09 12:00:00,4,fine
2024-01-10 12:00:00,3,late
2024-01-16 08:00:00,2,cold
2024-01-17 21:00:00,3,slow
2024-01-23 11:00:00,1,missing items
2024-01-24 19:00:00,2,very late
";

const MULTI_WEEK_TREND: &str = "\
date,전체,모바일
2024-01-01,10,4
2024-01-08,20,5
2024-01-15,30,6
2024-01-22,45,7
2024-01-29,50,8
";

#[test]
fn single_week_scenario() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &dir,
        "at,score,content\n2024-01-01 10:00:00,5,good\n2024-01-02 11:00:00,3,meh\n",
        "date,전체\n2024-01-01,10\n2024-01-03,20\n",
    );

    let analysis = analyze(&config).expect("analysis succeeds");
    assert_eq!(analysis.joined.len(), 1);
    let week = analysis.joined[0];
    assert_eq!(week.avg_score, 4.0);
    assert_eq!(week.review_count, 2);
    assert_eq!(week.trend_mean, 15.0);
    assert_eq!(week.week_index, 202401);
    assert_eq!(
        analysis.stats.linear,
        Err(StatsError::InsufficientData { pairs: 1 })
    );
}

#[test]
fn anti_correlated_weeks() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &dir,
        "at,score\n2024-01-01,5\n2024-01-08,1\n",
        "date,전체\n2024-01-01,10\n2024-01-08,90\n",
    );

    let analysis = analyze(&config).expect("analysis succeeds");
    let linear = analysis.stats.linear.expect("pearson defined");
    let rank = analysis.stats.rank.expect("spearman defined");
    assert!((linear.coefficient + 1.0).abs() < 1e-12);
    assert!((rank.coefficient + 1.0).abs() < 1e-12);
    assert_eq!(linear.p_value, None);
}

#[test]
fn disjoint_weeks_are_not_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &dir,
        "at,score\n2024-01-01,5\n",
        "date,전체\n2024-03-04,10\n",
    );

    let analysis = analyze(&config).expect("empty join is not an error");
    assert!(analysis.joined.is_empty());
    assert!(!analysis.stats.is_complete());
    assert_eq!(
        analysis.stats.rank,
        Err(StatsError::InsufficientData { pairs: 0 })
    );
}

#[test]
fn falls_back_to_first_numeric_metric() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, MULTI_WEEK_REVIEWS, MULTI_WEEK_TREND)
        .with_preferred_metric("없는열");

    let analysis = analyze(&config).expect("analysis succeeds");
    assert_eq!(analysis.metric.column, "전체");
    assert_eq!(analysis.metric.source, MetricSource::FirstNumeric);
}

#[test]
fn analysis_is_stable_across_reruns() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, MULTI_WEEK_REVIEWS, MULTI_WEEK_TREND);

    let first = analyze(&config).expect("first run");
    let second = analyze(&config).expect("second run");
    assert_eq!(first, second);
    assert_eq!(first.review_total, 8);
    assert_eq!(first.joined.len(), 4);
    assert!(first
        .joined
        .windows(2)
        .all(|pair| pair[0].week_index < pair[1].week_index));

    let linear = first.stats.linear.expect("pearson defined");
    assert!(linear.coefficient < -0.9);
    assert_eq!(linear.pairs, 4);
}

#[test]
fn nan_trend_cell_drops_its_week() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &dir,
        "at,score\n2024-01-01,5\n2024-01-08,4\n2024-01-15,3\n2024-01-22,1\n",
        "date,전체\n2024-01-01,10\n2024-01-08,NaN\n2024-01-15,30\n2024-01-22,45\n",
    );

    let analysis = analyze(&config).expect("analysis succeeds");
    let trend: Vec<f64> = analysis.joined.iter().map(|row| row.trend_mean).collect();
    assert_eq!(trend, vec![10.0, 30.0, 45.0]);

    let linear = analysis.stats.linear.expect("pearson defined");
    assert!(linear.coefficient.is_finite());
    assert!(linear.coefficient < -0.9);
    let p = linear.p_value.expect("one degree of freedom");
    assert!(p > 0.0 && p < 1.0, "p = {p}");
    assert!(analysis.stats.rank.expect("spearman defined").coefficient.is_finite());
}

#[test]
fn blank_scores_are_counted_but_not_averaged() {
    let dir = TempDir::new().unwrap();
    let config = config_for(
        &dir,
        "at,score,content\n2024-01-01,5,good\n2024-01-02,,no rating\n2024-01-03,3,meh\n",
        "date,전체\n2024-01-01,10\n",
    );

    let analysis = analyze(&config).expect("blank score is not fatal");
    assert_eq!(analysis.review_total, 3);
    assert_eq!(analysis.joined[0].review_count, 3);
    assert_eq!(analysis.joined[0].avg_score, 4.0);
}

#[test]
fn missing_score_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, "at,rating\n2024-01-01,5\n", MULTI_WEEK_TREND);

    match analyze(&config) {
        Err(ReportError::MissingColumn { column, .. }) => assert_eq!(column, "score"),
        other => panic!("expected a missing column error, got {other:?}"),
    }
}

#[test]
fn full_run_writes_fixed_outputs() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, MULTI_WEEK_REVIEWS, MULTI_WEEK_TREND);
    let mut resolver = FontResolver::new(FixedInventory(Vec::new()), NoProvisioner);

    let first = run_with_resolver(&config, &mut resolver).expect("first run");
    assert!(first.chart_font.is_fallback());

    let out = dir.path().join("out");
    let expected = [
        out.join(TIME_SERIES_CHART_FILE),
        out.join(SCATTER_CHART_FILE),
        out.join(BUBBLE_CHART_FILE),
        out.join(REPORT_FILE),
    ];
    let expected_refs: Vec<&Path> = expected.iter().map(PathBuf::as_path).collect();
    assert_eq!(first.output_paths().to_vec(), expected_refs);
    for path in &expected {
        let size = fs::metadata(path).expect("output exists").len();
        assert!(size > 0, "{} is empty", path.display());
    }
    assert!(fs::read(&expected[3]).unwrap().starts_with(b"%PDF"));

    let second = run_with_resolver(&config, &mut resolver).expect("second run");
    assert_eq!(first.analysis.stats, second.analysis.stats);
    assert_eq!(first.output_paths(), second.output_paths());
}

#[test]
fn empty_join_still_renders() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir, "at,score\n2024-01-01,5\n", "date,전체\n2024-03-04,10\n");
    let mut resolver = FontResolver::new(FixedInventory(Vec::new()), NoProvisioner);

    let summary = run_with_resolver(&config, &mut resolver).expect("degenerate run succeeds");
    assert!(summary.analysis.joined.is_empty());
    assert!(summary.report.is_file());
}
