//! CSV loading for the review and trend sources.
//!
//! Reviews have a fixed schema and are decoded through `serde`. The trend file
//! carries an arbitrary set of metric columns, so it is read as raw records and
//! the metric column is picked at load time (see [`MetricSelection`]).

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};
use serde::Deserialize;

use crate::error::ReportError;

const REVIEW_TIMESTAMP_COLUMN: &str = "at";
const REVIEW_SCORE_COLUMN: &str = "score";
const TREND_DATE_COLUMN: &str = "date";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Cell contents read as a missing value rather than a number.
const MISSING_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "#N/A", "<NA>", "NaN", "-NaN", "nan", "-nan", "null", "NULL", "None",
];

/// A single user review.
#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    /// Calendar date the review was written.
    pub date: NaiveDate,
    /// Numeric rating, `None` when the cell was empty or a missing-value marker.
    pub score: Option<f64>,
    /// Free-text body, unused by the aggregation.
    pub content: Option<String>,
}

/// A single observation of the trend metric.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendPoint {
    /// Calendar date of the observation.
    pub date: NaiveDate,
    /// Metric value, `None` when the cell was empty.
    pub value: Option<f64>,
}

/// How the trend metric column was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricSource {
    /// The configured preferred column was present.
    Preferred,
    /// The preferred column was absent; the first numeric column was used.
    FirstNumeric,
}

/// The trend column used as the metric, reported alongside the results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricSelection {
    /// Header of the chosen column.
    pub column: String,
    /// Why the column was chosen.
    pub source: MetricSource,
}

/// Trend observations for the selected metric column.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendSeries {
    /// The metric decision.
    pub metric: MetricSelection,
    /// Observations in file order.
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    at: String,
    #[serde(default)]
    score: String,
    #[serde(default)]
    content: Option<String>,
}

/// Parses a timestamp or plain date cell and returns its calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local().date());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|parsed| parsed.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        })
}

/// `None` for missing cells (empty, a [`MISSING_TOKENS`] marker, or a non-finite
/// number such as `inf`), `Some(Err(()))` for text that is not a number.
fn parse_number(value: &str) -> Option<Result<f64, ()>> {
    let value = value.trim();
    if value.is_empty() || MISSING_TOKENS.contains(&value) {
        return None;
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => Some(Ok(number)),
        Ok(_) => None,
        Err(_) => Some(Err(())),
    }
}

fn require_column(
    headers: &csv::StringRecord,
    column: &str,
    path: &Path,
) -> Result<usize, ReportError> {
    headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| ReportError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_owned(),
        })
}

/// Loads the review CSV. The file must provide `at` and `score` columns.
pub fn load_reviews(path: &Path) -> Result<Vec<Review>, ReportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| ReportError::csv(path, err))?;

    let headers = reader
        .headers()
        .map_err(|err| ReportError::csv(path, err))?
        .clone();
    require_column(&headers, REVIEW_TIMESTAMP_COLUMN, path)?;
    require_column(&headers, REVIEW_SCORE_COLUMN, path)?;

    let mut reviews = Vec::new();
    for (index, row) in reader.deserialize::<ReviewRow>().enumerate() {
        let row = row.map_err(|err| ReportError::csv(path, err))?;
        let date = parse_date(&row.at).ok_or_else(|| ReportError::InvalidTimestamp {
            path: path.to_path_buf(),
            row: index + 1,
            value: row.at.clone(),
        })?;
        let score = match parse_number(&row.score) {
            Some(Ok(score)) => Some(score),
            Some(Err(())) => {
                return Err(ReportError::InvalidNumber {
                    path: path.to_path_buf(),
                    row: index + 1,
                    column: REVIEW_SCORE_COLUMN.to_owned(),
                    value: row.score,
                })
            }
            None => None,
        };
        reviews.push(Review {
            date,
            score,
            content: row.content,
        });
    }

    debug!("Loaded {} reviews from {}", reviews.len(), path.display());
    Ok(reviews)
}

/// Picks the metric column: `preferred` when present, else the first numeric column.
///
/// A column counts as numeric when at least one cell holds a finite number and
/// every other cell is empty or a missing-value marker. An all-missing column
/// is not numeric.
pub fn select_metric_column(
    headers: &csv::StringRecord,
    records: &[csv::StringRecord],
    date_index: usize,
    preferred: &str,
) -> Option<(usize, MetricSelection)> {
    if let Some(index) = headers
        .iter()
        .position(|header| header.trim() == preferred)
    {
        return Some((
            index,
            MetricSelection {
                column: preferred.to_owned(),
                source: MetricSource::Preferred,
            },
        ));
    }

    headers
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != date_index)
        .find(|(index, _)| {
            let mut seen_value = false;
            let all_numeric = records.iter().all(|record| {
                match parse_number(record.get(*index).unwrap_or("")) {
                    None => true,
                    Some(Ok(_)) => {
                        seen_value = true;
                        true
                    }
                    Some(Err(())) => false,
                }
            });
            all_numeric && seen_value
        })
        .map(|(index, header)| {
            (
                index,
                MetricSelection {
                    column: header.trim().to_owned(),
                    source: MetricSource::FirstNumeric,
                },
            )
        })
}

/// Loads the trend CSV and extracts the metric series.
///
/// Non-numeric cells in a preferred column are treated as missing values.
pub fn load_trend(path: &Path, preferred_metric: &str) -> Result<TrendSeries, ReportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|err| ReportError::csv(path, err))?;

    let headers = reader
        .headers()
        .map_err(|err| ReportError::csv(path, err))?
        .clone();
    let date_index = require_column(&headers, TREND_DATE_COLUMN, path)?;

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ReportError::csv(path, err))?;

    let (metric_index, metric) =
        select_metric_column(&headers, &records, date_index, preferred_metric).ok_or_else(
            || ReportError::NoNumericColumn {
                path: path.to_path_buf(),
            },
        )?;

    match metric.source {
        MetricSource::Preferred => info!("Using preferred trend metric column '{}'", metric.column),
        MetricSource::FirstNumeric => info!(
            "Preferred trend metric '{}' not found; using first numeric column '{}'",
            preferred_metric, metric.column
        ),
    }

    let mut points = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let raw_date = record.get(date_index).unwrap_or("");
        let date = parse_date(raw_date).ok_or_else(|| ReportError::InvalidTimestamp {
            path: path.to_path_buf(),
            row: index + 1,
            value: raw_date.to_owned(),
        })?;
        let value = parse_number(record.get(metric_index).unwrap_or("")).and_then(Result::ok);
        points.push(TrendPoint { date, value });
    }

    debug!(
        "Loaded {} trend observations from {}",
        points.len(),
        path.display()
    );
    Ok(TrendSeries { metric, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        for raw in [
            "2024-01-03",
            "2024-01-03 10:15:00",
            "2024-01-03T10:15:00",
            "2024-01-03 10:15:00.123",
            "2024-01-03T10:15:00+09:00",
            "2024/01/03",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn loads_reviews_and_ignores_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "reviews.csv",
            "userName,score,at,content\nkim,5,2024-01-03 09:00:00,great\nlee,3,2024-01-04 18:30:00,\n",
        );

        let reviews = load_reviews(&path).expect("load reviews");
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].score, Some(5.0));
        assert_eq!(reviews[0].content.as_deref(), Some("great"));
        assert_eq!(reviews[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
    }

    #[test]
    fn missing_score_column_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "reviews.csv", "at,content\n2024-01-03,hi\n");

        let err = load_reviews(&path).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column, .. } if column == "score"));
    }

    #[test]
    fn bad_review_timestamp_names_the_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "reviews.csv",
            "at,score\n2024-01-03,4\nnot a date,2\n",
        );

        let err = load_reviews(&path).unwrap_err();
        match err {
            ReportError::InvalidTimestamp { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn preferred_metric_column_wins() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "trend.csv",
            "date,mobile,전체\n2024-01-03,1,10\n2024-01-04,2,20\n",
        );

        let series = load_trend(&path, "전체").expect("load trend");
        assert_eq!(series.metric.column, "전체");
        assert_eq!(series.metric.source, MetricSource::Preferred);
        assert_eq!(series.points[1].value, Some(20.0));
    }

    #[test]
    fn falls_back_to_first_numeric_column() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "trend.csv",
            "date,region,pc,mobile\n2024-01-03,seoul,,7\n2024-01-04,busan,4.5,8\n",
        );

        let series = load_trend(&path, "전체").expect("load trend");
        assert_eq!(series.metric.column, "pc");
        assert_eq!(series.metric.source, MetricSource::FirstNumeric);
        assert_eq!(series.points[0].value, None);
        assert_eq!(series.points[1].value, Some(4.5));
    }

    #[test]
    fn trend_without_numeric_column_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "trend.csv", "date,region\n2024-01-03,seoul\n");

        let err = load_trend(&path, "전체").unwrap_err();
        assert!(matches!(err, ReportError::NoNumericColumn { .. }));
    }

    #[test]
    fn missing_markers_and_non_finite_cells_are_missing() {
        for raw in ["", " ", "NaN", "nan", "NA", "null", "None", "inf", "-infinity"] {
            assert_eq!(parse_number(raw), None, "{raw:?}");
        }
        assert_eq!(parse_number(" 2.5 "), Some(Ok(2.5)));
        assert_eq!(parse_number("high"), Some(Err(())));
    }

    #[test]
    fn nan_trend_cell_is_a_missing_value() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "trend.csv",
            "date,전체\n2024-01-01,10\n2024-01-08,NaN\n2024-01-15,inf\n",
        );

        let series = load_trend(&path, "전체").expect("load trend");
        let values: Vec<_> = series.points.iter().map(|point| point.value).collect();
        assert_eq!(values, vec![Some(10.0), None, None]);
    }

    #[test]
    fn blank_and_nan_scores_are_kept_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "reviews.csv",
            "at,score\n2024-01-03,4\n2024-01-03,\n2024-01-04,NaN\n",
        );

        let reviews = load_reviews(&path).expect("load reviews");
        let scores: Vec<_> = reviews.iter().map(|review| review.score).collect();
        assert_eq!(scores, vec![Some(4.0), None, None]);
    }

    #[test]
    fn non_numeric_score_names_the_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "reviews.csv", "at,score\n2024-01-03,4\n2024-01-04,great\n");

        match load_reviews(&path).unwrap_err() {
            ReportError::InvalidNumber { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "score");
                assert_eq!(value, "great");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_input_file_is_a_csv_error() {
        let dir = TempDir::new().unwrap();
        let err = load_reviews(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ReportError::Csv { .. }));
    }
}
