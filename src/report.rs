//! Composition of the three-page report from the analysis results.
//!
//! [`compose`] only produces the content model, so the wording and the
//! statistics formatting can be checked without a font. [`write_report`]
//! renders that model through [`PdfBuilder`] and writes the file.

use std::fs;
use std::path::Path;

use genpdf::elements::Paragraph;
use genpdf::style::{Color, Style};
use genpdf::{Alignment, Element};
use log::info;

use crate::builder::PdfBuilder;
use crate::charts::ChartPaths;
use crate::dataset::{MetricSelection, MetricSource};
use crate::error::ReportError;
use crate::model::{
    Block, Cover, HorizontalAlignment, ImageBlock, RichParagraph, Section, TableBlock,
};
use crate::richtext::{parse_markup, Span};
use crate::stats::{self, Correlation, CorrelationSummary, StatsError};
use crate::weekly::JoinedWeek;

/// Document title, also used in the page footer.
pub const REPORT_TITLE: &str = "Weekly Trend Index vs Review Rating";

/// Significance level used by the interpretation sentence.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

const NOTE_SIZE: u8 = 9;
const NOTE_COLOR: Color = Color::Rgb(0x44, 0x44, 0x44);
const FOOTER_HEIGHT_MM: f64 = 8.0;
const FOOTER_FONT_SIZE: u8 = 8;

/// Everything the report needs to know about one run.
#[derive(Clone, Copy, Debug)]
pub struct ReportInputs<'a> {
    /// Joined weekly table.
    pub rows: &'a [JoinedWeek],
    /// Correlations between trend mean and average rating.
    pub stats: &'a CorrelationSummary,
    /// Trend column used as the metric.
    pub metric: &'a MetricSelection,
    /// Number of review rows loaded before aggregation.
    pub review_total: usize,
    /// Rendered chart files.
    pub charts: &'a ChartPaths,
}

/// Composed report content.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportContent {
    pub cover: Cover,
    pub sections: Vec<Section>,
}

/// Builds the cover page and the two following sections.
pub fn compose(inputs: &ReportInputs<'_>) -> ReportContent {
    ReportContent {
        cover: cover_page(inputs),
        sections: vec![findings_page(inputs), decision_page()],
    }
}

/// Renders the report and writes it to `path`.
pub fn write_report(path: &Path, inputs: &ReportInputs<'_>) -> Result<(), ReportError> {
    let content = compose(inputs);
    let mut builder = PdfBuilder::new()
        .with_cover(content.cover)
        .with_footer(crate::elements::mm_from_f64(FOOTER_HEIGHT_MM), footer);
    for section in content.sections {
        builder = builder.add_section(section);
    }

    let pdf = builder.render()?;
    fs::write(path, &pdf.bytes).map_err(|err| ReportError::io(path, err))?;
    info!("Report written to {} ({} bytes)", path.display(), pdf.bytes.len());
    Ok(())
}

fn footer(page: usize) -> impl Element {
    Paragraph::new(format!("{REPORT_TITLE} | page {page}"))
        .aligned(Alignment::Center)
        .styled(
            Style::new()
                .with_font_size(FOOTER_FONT_SIZE)
                .with_color(NOTE_COLOR),
        )
}

fn markup(text: &str) -> RichParagraph {
    match parse_markup(text) {
        Ok(spans) => RichParagraph::new(spans),
        Err(_) => RichParagraph::plain(text),
    }
}

fn note_span(text: impl Into<String>) -> Span {
    Span::new(text).sized(NOTE_SIZE).colored(NOTE_COLOR)
}

fn note(text: impl Into<String>) -> Block {
    Block::paragraph(vec![note_span(text)])
}

fn chart(path: &Path, number: usize, caption: &str, width_mm: f64) -> ImageBlock {
    ImageBlock::new(path)
        .with_alignment(HorizontalAlignment::Center)
        .with_width_mm(width_mm)
        .with_caption(RichParagraph::new(vec![
            note_span(format!("Figure {number}. ")).bold(),
            note_span(caption),
        ]))
}

fn cover_page(inputs: &ReportInputs<'_>) -> Cover {
    let metric = inputs.metric;
    let metric_origin = match metric.source {
        MetricSource::Preferred => "preferred column",
        MetricSource::FirstNumeric => "first numeric column",
    };

    let context = TableBlock::new(vec![1, 5])
        .with_labeled_row("Role", RichParagraph::plain("PM / data analysis (team project)"))
        .with_labeled_row(
            "Goal",
            RichParagraph::plain(
                "Check whether shifts in demand (trend) affect experience quality (rating) \
                 and derive improvement directions",
            ),
        )
        .with_labeled_row(
            "Key question",
            RichParagraph::plain(
                "Does the rating drop when the trend rises? If so, under which conditions \
                 does it get worse?",
            ),
        )
        .with_labeled_row(
            "Data used",
            RichParagraph::plain(format!(
                "{} reviews (score, at, content) / weekly trend index ('{}', {})",
                inputs.review_total, metric.column, metric_origin
            )),
        )
        .with_labeled_row(
            "Tools",
            RichParagraph::plain(
                "Rust (csv, chrono, plotters, genpdf) | Pearson/Spearman correlation | charts",
            ),
        );

    Cover::new(REPORT_TITLE)
        .with_subtitle(Some(format!(
            "Based on {} reviews over {} matched weeks | from data analysis to product decisions",
            inputs.review_total,
            inputs.rows.len()
        )))
        .with_blocks([
            Block::Table(context),
            Block::Spacer(6.0),
            Block::heading("Problem (Fact)"),
            Block::bullets([
                "Weeks with a surge in review volume repeatedly show a sharp drop in the average rating",
                "The same weeks sit in rising stretches of the trend index, suggesting a link \
                 between growing demand and experience quality",
            ]),
            Block::heading("Why it matters"),
            Block::bullets([
                "Review rating is the headline experience metric behind new-user trust, \
                 conversion and retention",
                "If rising demand turns into falling ratings, short-term growth erodes long-term \
                 customer value",
            ]),
        ])
}

fn findings_page(inputs: &ReportInputs<'_>) -> Section {
    let stats_table = TableBlock::new(vec![1, 4])
        .with_header(RichParagraph::plain("Key statistics"))
        .with_labeled_row(
            "Pearson r",
            RichParagraph::plain(format_correlation(&inputs.stats.linear)),
        )
        .with_labeled_row(
            "Spearman \u{03c1}",
            RichParagraph::plain(format_correlation(&inputs.stats.rank)),
        )
        .with_labeled_row(
            "Matched weeks",
            RichParagraph::plain(inputs.rows.len().to_string()),
        )
        .with_labeled_row("Interpretation", markup(&interpret(inputs.stats)));

    let charts = inputs.charts;
    let time_series = chart(
        &charts.time_series,
        1,
        &format!("Weekly average rating and trend index ('{}')", inputs.metric.column),
        160.0,
    );
    let scatter = chart(&charts.scatter, 2, "Trend index vs average rating", 80.0);
    let bubble = chart(
        &charts.bubble,
        3,
        "Review count vs rating, coloured by trend index",
        80.0,
    );

    Section::builder("Analysis & Findings")
        .start_on_new_page(true)
        .extend_blocks([
            Block::Paragraph(RichParagraph::plain(
                "Reviews and trend observations were joined on ISO year-week to test \
                 correlation and recurring patterns.",
            )),
            Block::Spacer(3.0),
            Block::Table(stats_table),
            Block::Spacer(3.0),
            Block::heading("1) Weekly trend: trend index vs average rating"),
            Block::Image(time_series),
            Block::Spacer(3.0),
            note(trend_observation(inputs.stats)),
            Block::Spacer(2.0),
            Block::heading("2) Relationships: scatter and three variables"),
            Block::ImageRow(vec![scatter, bubble]),
            Block::Spacer(3.0),
            note(volume_observation(inputs.rows)),
        ])
        .build()
}

fn decision_page() -> Section {
    Section::builder("Judgment & Decision")
        .start_on_new_page(true)
        .extend_blocks([
            Block::heading("Key insights"),
            Block::bullets([
                "A rising trend signals growing demand; operational or UX bottlenecks at those \
                 moments can pull experience quality down",
                "The root cause is less a missing feature than misaligned expectation management \
                 and information timing",
            ]),
            Block::heading("Decision"),
            Block::bullets([
                "Reorder the experience before adding features: surface expected delays, \
                 sold-out items and alternatives before checkout",
                "Relieve app performance and merchant throughput bottlenecks during demand spikes \
                 (caching, queues, circuit breakers, dispatch stability)",
            ]),
            Block::heading("Next steps"),
            Block::bullets([
                "Take the ten weeks with the largest rating drops and run topic and sentiment \
                 analysis on their review text to sharpen the cause hypotheses",
                "Compare weeks that held their rating against rising trend with weeks that did \
                 not, by operations, product, region and time of day",
                "A/B test expectation management: measure whether a more accurate and visible \
                 ETA before ordering protects the rating",
            ]),
            Block::heading("Skills demonstrated"),
            Block::bullets([
                "Problem structuring: Fact, Why, Goal, Metric, Hypothesis",
                "Outcome-driven thinking anchored on one north-star metric (weekly average rating)",
                "Hypothesis-driven decisions backed by correlation analysis and visualisation",
                "Trade-off judgment: structural experience fixes over short-term discounts",
            ]),
        ])
        .build()
}

/// Formats a p-value in scientific notation with a two-digit exponent (`1.04e-01`).
pub fn format_p_value(p: f64) -> String {
    let formatted = format!("{:.2e}", p);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/// `"0.800 (p=1.04e-01)"`, or the placeholder when the measure is undefined.
pub fn format_correlation(result: &Result<Correlation, StatsError>) -> String {
    match result {
        Ok(correlation) => {
            let p = correlation
                .p_value
                .map(format_p_value)
                .unwrap_or_else(|| "n/a".to_owned());
            format!("{:.3} (p={})", correlation.coefficient, p)
        }
        Err(err) => placeholder(err),
    }
}

fn placeholder(err: &StatsError) -> String {
    match err {
        StatsError::LengthMismatch { .. } | StatsError::NonFiniteInput { .. } => {
            format!("insufficient data: {err}")
        }
        StatsError::InsufficientData { .. } | StatsError::ConstantInput { .. } => err.to_string(),
    }
}

fn strength(coefficient: f64) -> Option<&'static str> {
    let magnitude = coefficient.abs();
    if magnitude < 0.1 {
        None
    } else if magnitude < 0.3 {
        Some("weak")
    } else if magnitude < 0.5 {
        Some("moderate")
    } else {
        Some("strong")
    }
}

/// Interpretation sentence (with `**bold**` markup) derived from the linear correlation.
pub fn interpret(summary: &CorrelationSummary) -> String {
    let correlation = match &summary.linear {
        Ok(correlation) => correlation,
        Err(err) => return placeholder(err),
    };

    let significance = match correlation.p_value {
        Some(p) if p < SIGNIFICANCE_LEVEL => {
            format!("statistically significant at {SIGNIFICANCE_LEVEL}")
        }
        Some(_) => format!("not statistically significant at {SIGNIFICANCE_LEVEL}"),
        None => "significance cannot be assessed from two weeks".to_owned(),
    };

    let Some(strength) = strength(correlation.coefficient) else {
        return format!(
            "**No meaningful** linear relationship between trend index and average rating ({significance})."
        );
    };

    if correlation.coefficient < 0.0 {
        format!(
            "**{} negative** correlation ({significance}): weeks with a higher trend index tend to have a lower average rating.",
            capitalize(strength)
        )
    } else {
        format!(
            "**{} positive** correlation ({significance}): weeks with a higher trend index tend to have a higher average rating.",
            capitalize(strength)
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn trend_observation(summary: &CorrelationSummary) -> String {
    match &summary.linear {
        Ok(correlation) if correlation.coefficient <= -0.1 => {
            "Observation: stretches of rising trend index repeatedly coincide with a falling \
             average rating."
                .to_owned()
        }
        Ok(correlation) if correlation.coefficient >= 0.1 => {
            "Observation: the average rating tends to move together with the trend index."
                .to_owned()
        }
        Ok(_) => "Observation: the two series move largely independently of each other.".to_owned(),
        Err(_) => "Observation: too few matched weeks to describe a pattern.".to_owned(),
    }
}

fn volume_observation(rows: &[JoinedWeek]) -> String {
    let counts: Vec<f64> = rows.iter().map(|row| row.review_count as f64).collect();
    let scores: Vec<f64> = rows.iter().map(|row| row.avg_score).collect();

    match stats::pearson(&counts, &scores) {
        Ok(correlation) if correlation.coefficient <= -0.1 => format!(
            "Observation: weeks with more reviews tend to rate lower (review count vs rating r = {:.3}).",
            correlation.coefficient
        ),
        Ok(correlation) => format!(
            "Observation: busier weeks do not rate lower (review count vs rating r = {:.3}).",
            correlation.coefficient
        ),
        Err(err) => format!("Observation: {}.", placeholder(&err)),
    }
}
