//! Weekly trend index versus review rating: aggregation, correlation, charts and a PDF report.
//!
//! [`pipeline::run`] performs a full batch run from a [`ReportConfig`]:
//! reviews and trend observations are bucketed into ISO weeks, inner-joined,
//! correlated (Pearson and Spearman with p-values), drawn as three PNG charts
//! and summarised in a three-page PDF.

pub mod builder;
pub mod charts;
pub mod config;
pub mod dataset;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod richtext;
pub mod stats;
pub mod weekly;

pub use builder::{PdfBuildError, PdfBuilder, RenderedPdf};
pub use config::ReportConfig;
pub use error::ReportError;
pub use pipeline::{analyze, run, Analysis, RunSummary};
pub use stats::{Correlation, CorrelationSummary, StatsError};
pub use weekly::{JoinedWeek, WeekKey};
