//! Run configuration for the report pipeline.

use std::path::{Path, PathBuf};

/// Trend column used as the metric when present in the trend source.
pub const DEFAULT_PREFERRED_METRIC: &str = "전체";

/// Default location of the review dataset.
pub const DEFAULT_REVIEWS_PATH: &str = "data/baemin.csv";

/// Default location of the trend dataset.
pub const DEFAULT_TREND_PATH: &str = "data/bamin_trend_expanded.csv";

/// Default directory receiving the charts and the report.
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// File name of the weekly time-series chart.
pub const TIME_SERIES_CHART_FILE: &str = "01_weekly_trend_vs_rating.png";

/// File name of the trend/rating scatter chart.
pub const SCATTER_CHART_FILE: &str = "02_trend_vs_rating_scatter.png";

/// File name of the colour-mapped review count chart.
pub const BUBBLE_CHART_FILE: &str = "03_reviews_rating_trend.png";

/// File name of the PDF report.
pub const REPORT_FILE: &str = "trend_review_report.pdf";

const DEFAULT_FONT_PREFERENCES: &[&str] = &[
    "NanumGothic",
    "Malgun Gothic",
    "AppleGothic",
    "Noto Sans CJK KR",
    "NotoSansCJKkr",
];

const DEFAULT_LOCALE_HINTS: &[&str] = &["nanum", "noto", "gothic"];

/// Inputs, outputs and environment preferences for a single run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    reviews_path: PathBuf,
    trend_path: PathBuf,
    output_dir: PathBuf,
    preferred_metric: String,
    font_preferences: Vec<String>,
    locale_hints: Vec<String>,
    allow_font_install: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            reviews_path: PathBuf::from(DEFAULT_REVIEWS_PATH),
            trend_path: PathBuf::from(DEFAULT_TREND_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            preferred_metric: DEFAULT_PREFERRED_METRIC.to_owned(),
            font_preferences: DEFAULT_FONT_PREFERENCES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            locale_hints: DEFAULT_LOCALE_HINTS
                .iter()
                .map(|hint| hint.to_string())
                .collect(),
            allow_font_install: true,
        }
    }
}

impl ReportConfig {
    /// Creates a configuration with the default paths and font preferences.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path of the review CSV.
    pub fn reviews_path(&self) -> &Path {
        &self.reviews_path
    }

    /// Returns the path of the trend CSV.
    pub fn trend_path(&self) -> &Path {
        &self.trend_path
    }

    /// Returns the directory receiving all artifacts.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns the trend column preferred as the metric.
    pub fn preferred_metric(&self) -> &str {
        &self.preferred_metric
    }

    /// Returns the chart font families in order of preference.
    pub fn font_preferences(&self) -> &[String] {
        &self.font_preferences
    }

    /// Returns the lowercase substrings used for heuristic font matching.
    pub fn locale_hints(&self) -> &[String] {
        &self.locale_hints
    }

    /// Returns whether the run may try to install a font package.
    pub fn allow_font_install(&self) -> bool {
        self.allow_font_install
    }

    /// Sets the review CSV path and returns the updated configuration.
    pub fn with_reviews_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.reviews_path = path.into();
        self
    }

    /// Sets the trend CSV path and returns the updated configuration.
    pub fn with_trend_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trend_path = path.into();
        self
    }

    /// Sets the output directory and returns the updated configuration.
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Sets the preferred metric column and returns the updated configuration.
    pub fn with_preferred_metric(mut self, column: impl Into<String>) -> Self {
        self.preferred_metric = column.into();
        self
    }

    /// Replaces the chart font preference list.
    pub fn with_font_preferences<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.font_preferences = families.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the locale hints used for heuristic font matching.
    pub fn with_locale_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locale_hints = hints
            .into_iter()
            .map(|hint| hint.into().to_lowercase())
            .collect();
        self
    }

    /// Enables or disables the font package installation attempt.
    pub fn with_font_install(mut self, allow: bool) -> Self {
        self.allow_font_install = allow;
        self
    }

    /// Path of the weekly time-series chart.
    pub fn time_series_chart_path(&self) -> PathBuf {
        self.output_dir.join(TIME_SERIES_CHART_FILE)
    }

    /// Path of the trend/rating scatter chart.
    pub fn scatter_chart_path(&self) -> PathBuf {
        self.output_dir.join(SCATTER_CHART_FILE)
    }

    /// Path of the colour-mapped review count chart.
    pub fn bubble_chart_path(&self) -> PathBuf {
        self.output_dir.join(BUBBLE_CHART_FILE)
    }

    /// Path of the PDF report.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_live_in_output_dir() {
        let config = ReportConfig::new().with_output_dir("out");
        assert_eq!(
            config.time_series_chart_path(),
            Path::new("out").join(TIME_SERIES_CHART_FILE)
        );
        assert_eq!(config.report_path(), Path::new("out").join(REPORT_FILE));
    }

    #[test]
    fn locale_hints_are_lowercased() {
        let config = ReportConfig::new().with_locale_hints(["Nanum", "NOTO"]);
        assert_eq!(config.locale_hints(), ["nanum", "noto"]);
    }
}
