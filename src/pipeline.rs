//! End-to-end batch run: load, aggregate, join, correlate, chart and report.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::charts::{self, ChartPaths};
use crate::config::ReportConfig;
use crate::dataset::{self, MetricSelection};
use crate::error::ReportError;
use crate::fonts::chart::{
    AptProvisioner, ChartFont, FontInventory, FontProvisioner, FontResolver, FontconfigInventory,
    NoProvisioner, ProvisionOutcome,
};
use crate::report::{self, ReportInputs};
use crate::stats::{self, CorrelationSummary};
use crate::weekly::{self, JoinedWeek, WeeklyReviews, WeeklyTrend};

/// Data side of a run, before anything is written to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    /// Review rows read from the reviews file.
    pub review_total: usize,
    /// Trend column used as the metric.
    pub metric: MetricSelection,
    pub weekly_reviews: Vec<WeeklyReviews>,
    pub weekly_trend: Vec<WeeklyTrend>,
    /// Weeks present in both sources, ascending.
    pub joined: Vec<JoinedWeek>,
    pub stats: CorrelationSummary,
}

/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub analysis: Analysis,
    /// Font family handed to the chart renderer.
    pub chart_font: ChartFont,
    /// Provisioning attempt made while resolving the chart font, if any.
    pub provision: Option<ProvisionOutcome>,
    pub charts: ChartPaths,
    pub report: PathBuf,
}

impl RunSummary {
    /// The four output files in the order they are written.
    pub fn output_paths(&self) -> [&Path; 4] {
        [
            self.charts.time_series.as_path(),
            self.charts.scatter.as_path(),
            self.charts.bubble.as_path(),
            self.report.as_path(),
        ]
    }
}

/// Loads both sources and computes the weekly table and its correlations.
///
/// An empty join or an undefined correlation is not an error here; it is
/// logged and carried in [`Analysis::stats`].
pub fn analyze(config: &ReportConfig) -> Result<Analysis, ReportError> {
    let reviews = dataset::load_reviews(config.reviews_path())?;
    info!(
        "Loaded {} reviews from {}",
        reviews.len(),
        config.reviews_path().display()
    );

    let trend = dataset::load_trend(config.trend_path(), config.preferred_metric())?;
    info!(
        "Loaded {} trend observations from {}",
        trend.points.len(),
        config.trend_path().display()
    );

    let weekly_reviews = weekly::aggregate_reviews(&reviews);
    let weekly_trend = weekly::aggregate_trend(&trend.points);
    debug!(
        "Aggregated {} review weeks and {} trend weeks",
        weekly_reviews.len(),
        weekly_trend.len()
    );

    let joined = weekly::inner_join(&weekly_reviews, &weekly_trend);
    if joined.is_empty() {
        warn!("No ISO week is present in both sources; statistics are undefined");
    } else {
        info!("Joined {} weeks", joined.len());
    }

    let stats = stats::correlate(&joined);
    match (&stats.linear, &stats.rank) {
        (Ok(linear), Ok(rank)) => info!(
            "Pearson r = {:.3}, Spearman rho = {:.3} over {} weeks",
            linear.coefficient, rank.coefficient, linear.pairs
        ),
        (linear, rank) => {
            if let Err(err) = linear {
                warn!("Pearson correlation undefined: {}", err);
            }
            if let Err(err) = rank {
                warn!("Spearman correlation undefined: {}", err);
            }
        }
    }

    Ok(Analysis {
        review_total: reviews.len(),
        metric: trend.metric,
        weekly_reviews,
        weekly_trend,
        joined,
        stats,
    })
}

/// Runs the whole batch with the host font inventory.
///
/// Font provisioning through the package manager is only attempted when
/// [`ReportConfig::allow_font_install`] is set.
pub fn run(config: &ReportConfig) -> Result<RunSummary, ReportError> {
    if config.allow_font_install() {
        let mut resolver = FontResolver::new(FontconfigInventory, AptProvisioner::default());
        run_with_resolver(config, &mut resolver)
    } else {
        let mut resolver = FontResolver::new(FontconfigInventory, NoProvisioner);
        run_with_resolver(config, &mut resolver)
    }
}

/// Runs the whole batch, resolving the chart font through `resolver`.
pub fn run_with_resolver<I, P>(
    config: &ReportConfig,
    resolver: &mut FontResolver<I, P>,
) -> Result<RunSummary, ReportError>
where
    I: FontInventory,
    P: FontProvisioner,
{
    let analysis = analyze(config)?;

    let chart_font = resolver.resolve(config.font_preferences(), config.locale_hints());
    let provision = resolver.provision_outcome().cloned();

    fs::create_dir_all(config.output_dir())
        .map_err(|err| ReportError::io(config.output_dir(), err))?;

    let charts = charts::render_charts(
        config,
        &analysis.joined,
        &analysis.metric.column,
        &chart_font,
    )?;

    let report_path = config.report_path();
    report::write_report(
        &report_path,
        &ReportInputs {
            rows: &analysis.joined,
            stats: &analysis.stats,
            metric: &analysis.metric,
            review_total: analysis.review_total,
            charts: &charts,
        },
    )?;

    Ok(RunSummary {
        analysis,
        chart_font,
        provision,
        charts,
        report: report_path,
    })
}
