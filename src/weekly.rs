//! Weekly bucketing of reviews and trend observations, and the inner join of both.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};

use crate::dataset::{Review, TrendPoint};

/// ISO-8601 week key shared by both sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    /// ISO week-numbering year, which may differ from the calendar year near January 1st.
    pub year: i32,
    /// ISO week number in `1..=53`.
    pub week: u32,
}

impl WeekKey {
    /// Creates a key from its parts.
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// Returns the ISO week that contains `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Integer encoding `year * 100 + week` used for chart ordering and labels.
    pub fn index(&self) -> i64 {
        i64::from(self.year) * 100 + i64::from(self.week)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Mean rating and review count for one week.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeeklyReviews {
    pub key: WeekKey,
    pub avg_score: f64,
    pub review_count: usize,
}

/// Mean trend metric for one week.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeeklyTrend {
    pub key: WeekKey,
    pub trend_mean: f64,
}

/// A week present in both sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JoinedWeek {
    pub key: WeekKey,
    pub avg_score: f64,
    pub review_count: usize,
    pub trend_mean: f64,
    pub week_index: i64,
}

/// Groups reviews by ISO week. Output is sorted by key with one row per week.
///
/// `review_count` counts every review of the week; `avg_score` averages only
/// the reviews that carry a score. A week without any score produces no row.
pub fn aggregate_reviews(reviews: &[Review]) -> Vec<WeeklyReviews> {
    #[derive(Default)]
    struct Bucket {
        total: f64,
        scored: usize,
        count: usize,
    }

    let mut buckets: BTreeMap<WeekKey, Bucket> = BTreeMap::new();

    for review in reviews {
        let bucket = buckets.entry(WeekKey::from_date(review.date)).or_default();
        bucket.count += 1;
        if let Some(score) = review.score {
            bucket.total += score;
            bucket.scored += 1;
        }
    }

    buckets
        .into_iter()
        .filter(|(_, bucket)| bucket.scored > 0)
        .map(|(key, bucket)| WeeklyReviews {
            key,
            avg_score: bucket.total / bucket.scored as f64,
            review_count: bucket.count,
        })
        .collect()
}

/// Groups trend observations by ISO week, averaging the non-missing values.
///
/// Weeks whose observations are all missing produce no row.
pub fn aggregate_trend(points: &[TrendPoint]) -> Vec<WeeklyTrend> {
    let mut buckets: BTreeMap<WeekKey, (f64, usize)> = BTreeMap::new();

    for point in points {
        let Some(value) = point.value else {
            continue;
        };
        let entry = buckets
            .entry(WeekKey::from_date(point.date))
            .or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(key, (total, count))| WeeklyTrend {
            key,
            trend_mean: total / count as f64,
        })
        .collect()
}

/// Keeps only the weeks present in both aggregates, ordered by key.
pub fn inner_join(reviews: &[WeeklyReviews], trend: &[WeeklyTrend]) -> Vec<JoinedWeek> {
    let trend_by_key: BTreeMap<WeekKey, f64> = trend
        .iter()
        .map(|row| (row.key, row.trend_mean))
        .collect();

    let mut joined: Vec<JoinedWeek> = reviews
        .iter()
        .filter_map(|row| {
            trend_by_key.get(&row.key).map(|trend_mean| JoinedWeek {
                key: row.key,
                avg_score: row.avg_score,
                review_count: row.review_count,
                trend_mean: *trend_mean,
                week_index: row.key.index(),
            })
        })
        .collect();
    joined.sort_by_key(|row| row.key);
    joined
}
