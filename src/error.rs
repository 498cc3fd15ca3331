//! Error types shared by the loading, charting and rendering stages.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::builder::PdfBuildError;

/// Fatal failures that abort a report run.
///
/// Degenerate statistics are deliberately absent here: they travel inside
/// [`crate::stats::CorrelationSummary`] and are rendered as placeholders.
#[derive(Debug)]
pub enum ReportError {
    /// A file could not be opened, created or written.
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A CSV file could not be read or a row could not be decoded.
    Csv {
        /// Path of the CSV file.
        path: PathBuf,
        /// Underlying CSV error.
        source: csv::Error,
    },
    /// A required column is missing from the CSV header.
    MissingColumn {
        /// Path of the CSV file.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },
    /// The trend source has no numeric column to serve as the metric.
    NoNumericColumn {
        /// Path of the trend CSV file.
        path: PathBuf,
    },
    /// A timestamp or date cell could not be parsed.
    InvalidTimestamp {
        /// Path of the CSV file.
        path: PathBuf,
        /// 1-based data row (header excluded).
        row: usize,
        /// Offending cell content.
        value: String,
    },
    /// A numeric cell holds text that is neither a number nor a missing-value marker.
    InvalidNumber {
        /// Path of the CSV file.
        path: PathBuf,
        /// 1-based data row (header excluded).
        row: usize,
        /// Column holding the cell.
        column: String,
        /// Offending cell content.
        value: String,
    },
    /// Drawing one of the charts failed.
    Chart {
        /// Output path of the chart.
        path: PathBuf,
        /// Backend error message.
        message: String,
    },
    /// Building or rendering the PDF document failed.
    Document(PdfBuildError),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn chart(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Chart {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<PdfBuildError> for ReportError {
    fn from(err: PdfBuildError) -> Self {
        Self::Document(err)
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, .. } => write!(f, "I/O failure on {}", path.display()),
            Self::Csv { path, .. } => write!(f, "Failed to read CSV file {}", path.display()),
            Self::MissingColumn { path, column } => write!(
                f,
                "Column '{}' is missing from {}",
                column,
                path.display()
            ),
            Self::NoNumericColumn { path } => write!(
                f,
                "No numeric column available as trend metric in {}",
                path.display()
            ),
            Self::InvalidTimestamp { path, row, value } => write!(
                f,
                "Unparseable timestamp '{}' in row {} of {}",
                value,
                row,
                path.display()
            ),
            Self::InvalidNumber {
                path,
                row,
                column,
                value,
            } => write!(
                f,
                "Non-numeric {} '{}' in row {} of {}",
                column,
                value,
                row,
                path.display()
            ),
            Self::Chart { path, message } => {
                write!(f, "Failed to draw chart {}: {}", path.display(), message)
            }
            Self::Document(_) => write!(f, "Failed to build report document"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Document(err) => Some(err),
            Self::MissingColumn { .. }
            | Self::NoNumericColumn { .. }
            | Self::InvalidTimestamp { .. }
            | Self::InvalidNumber { .. }
            | Self::Chart { .. } => None,
        }
    }
}
