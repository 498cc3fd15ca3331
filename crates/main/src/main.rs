use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::info;
use trend_review_report::ReportConfig;

/// Builds the weekly trend vs review rating charts and PDF report.
///
/// Every option falls back to the fixed batch defaults, so running without
/// arguments reads `data/baemin.csv` and `data/bamin_trend_expanded.csv` and
/// writes into `data/`. The document font is searched under
/// `TREND_REPORT_FONTS_DIR`, then `assets/fonts`, then system font folders,
/// with a built-in DejaVu Sans face as the last resort.
#[derive(Parser)]
#[command(author, version, about = "Weekly trend vs review rating report")]
struct Cli {
    /// Reviews CSV with `at` and `score` columns.
    #[arg(long)]
    reviews: Option<PathBuf>,

    /// Trend CSV with a `date` column and numeric metric columns.
    #[arg(long)]
    trend: Option<PathBuf>,

    /// Directory receiving the charts and the PDF.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Trend column to prefer as the metric.
    #[arg(long)]
    metric: Option<String>,

    /// Never try to install a locale font package.
    #[arg(long)]
    skip_font_install: bool,
}

impl Cli {
    fn into_config(self) -> ReportConfig {
        let mut config = ReportConfig::new().with_font_install(!self.skip_font_install);
        if let Some(path) = self.reviews {
            config = config.with_reviews_path(path);
        }
        if let Some(path) = self.trend {
            config = config.with_trend_path(path);
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(metric) = self.metric {
            config = config.with_preferred_metric(metric);
        }
        config
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();

    match trend_review_report::run(&config) {
        Ok(summary) => {
            info!("Chart font: {}", summary.chart_font.family());
            for path in summary.output_paths() {
                println!("Saved: {}", path.display());
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            print_error_sources(&err);
            std::process::exit(1);
        }
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
