//! PNG charts drawn with `plotters` from the joined weekly table.

use std::error::Error;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use plotters::prelude::*;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::fonts::chart::{ChartFont, FALLBACK_CHART_FAMILY};
use crate::weekly::JoinedWeek;

const TIME_SERIES_SIZE: (u32, u32) = (1800, 900);
const SCATTER_SIZE: (u32, u32) = (1200, 900);
const BUBBLE_SIZE: (u32, u32) = (1500, 900);
const COLOR_BAR_WIDTH: u32 = 220;
const COLOR_BAR_STEPS: usize = 64;

const CAPTION_SIZE: u32 = 40;
const LABEL_SIZE: u32 = 22;
const DESC_SIZE: u32 = 26;

/// Anchor colours of the trend colour scale, from low to high.
const COLOR_SCALE: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

type DrawResult = Result<(), Box<dyn Error>>;

/// Paths of the three rendered charts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartPaths {
    pub time_series: PathBuf,
    pub scatter: PathBuf,
    pub bubble: PathBuf,
}

/// Renders all three charts into the configured output directory.
pub fn render_charts(
    config: &ReportConfig,
    rows: &[JoinedWeek],
    metric: &str,
    font: &ChartFont,
) -> Result<ChartPaths, ReportError> {
    let paths = ChartPaths {
        time_series: config.time_series_chart_path(),
        scatter: config.scatter_chart_path(),
        bubble: config.bubble_chart_path(),
    };

    render_time_series(&paths.time_series, rows, metric, font)?;
    render_scatter(&paths.scatter, rows, metric, font)?;
    render_bubble(&paths.bubble, rows, metric, font)?;

    info!(
        "Charts written to {}, {}, {}",
        paths.time_series.display(),
        paths.scatter.display(),
        paths.bubble.display()
    );
    Ok(paths)
}

/// Weekly average rating and trend mean as two lines over the week index.
pub fn render_time_series(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    font: &ChartFont,
) -> Result<(), ReportError> {
    draw_with_fallback(path, font, |family| draw_time_series(path, rows, metric, family))?;
    debug!("Time series chart drawn with {} weeks", rows.len());
    Ok(())
}

/// Scatter of trend mean against average rating.
pub fn render_scatter(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    font: &ChartFont,
) -> Result<(), ReportError> {
    draw_with_fallback(path, font, |family| draw_scatter(path, rows, metric, family))?;
    debug!("Scatter chart drawn with {} points", rows.len());
    Ok(())
}

/// Review count against average rating, coloured by trend mean, with a colour bar.
pub fn render_bubble(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    font: &ChartFont,
) -> Result<(), ReportError> {
    draw_with_fallback(path, font, |family| draw_bubble(path, rows, metric, family))?;
    debug!("Colour-mapped scatter drawn with {} points", rows.len());
    Ok(())
}

/// Families tried in order: the resolved one, the generic fallback, then no text at all.
fn attempt_families(font: &ChartFont) -> Vec<Option<&str>> {
    let mut families = vec![Some(font.family())];
    if font.family() != FALLBACK_CHART_FAMILY {
        families.push(Some(FALLBACK_CHART_FAMILY));
    }
    families.push(None);
    families
}

/// Runs `draw` once per entry of [`attempt_families`] until one succeeds.
fn draw_with_fallback<F>(path: &Path, font: &ChartFont, mut draw: F) -> Result<(), ReportError>
where
    F: FnMut(Option<&str>) -> DrawResult,
{
    let mut attempts = attempt_families(font).into_iter();
    let mut result = draw(attempts.next().flatten());
    for family in attempts {
        let Err(err) = &result else {
            break;
        };
        match family {
            Some(family) => warn!(
                "Drawing {} failed ({}); retrying with font family '{}'",
                path.display(),
                err,
                family
            ),
            None => warn!(
                "Drawing {} failed ({}); retrying without text",
                path.display(),
                err
            ),
        }
        result = draw(family);
    }
    result.map_err(|err| ReportError::chart(path, err))
}

fn draw_time_series(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    family: Option<&str>,
) -> DrawResult {
    let root = BitMapBackend::new(path, TIME_SERIES_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = padded_range(rows.iter().map(|row| row.week_index as f64));
    let y_range = padded_range(
        rows.iter()
            .flat_map(|row| [row.avg_score, row.trend_mean]),
    );

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20).x_label_area_size(60).y_label_area_size(80);
    if let Some(family) = family {
        builder.caption(
            "Weekly trend index vs average rating",
            (family, CAPTION_SIZE),
        );
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    let week_label = |x: &f64| format!("{:.0}", x);
    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&BLACK.mix(0.05))
        .x_label_formatter(&week_label);
    match family {
        Some(family) => {
            mesh.x_desc("ISO week (YYYYWW)")
                .y_desc("Value")
                .label_style((family, LABEL_SIZE))
                .axis_desc_style((family, DESC_SIZE));
        }
        None => {
            mesh.x_labels(0).y_labels(0);
        }
    }
    mesh.draw()?;

    if rows.is_empty() {
        root.present()?;
        return Ok(());
    }

    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (row.week_index as f64, row.avg_score)),
            BLUE.stroke_width(3),
        ))?
        .label("Weekly average rating")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    let trend_color = RED.mix(0.75);
    chart
        .draw_series(LineSeries::new(
            rows.iter().map(|row| (row.week_index as f64, row.trend_mean)),
            trend_color.stroke_width(3),
        ))?
        .label(format!("Weekly trend index ({metric})"))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &trend_color));

    if let Some(family) = family {
        chart
            .configure_series_labels()
            .label_font((family, LABEL_SIZE))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn draw_scatter(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    family: Option<&str>,
) -> DrawResult {
    let root = BitMapBackend::new(path, SCATTER_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = padded_range(rows.iter().map(|row| row.trend_mean));
    let y_range = padded_range(rows.iter().map(|row| row.avg_score));

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20).x_label_area_size(60).y_label_area_size(80);
    if let Some(family) = family {
        builder.caption("Trend index vs average rating", (family, CAPTION_SIZE));
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&BLACK.mix(0.05));
    match family {
        Some(family) => {
            mesh.x_desc(format!("Weekly trend index ({metric})"))
                .y_desc("Weekly average rating")
                .label_style((family, LABEL_SIZE))
                .axis_desc_style((family, DESC_SIZE));
        }
        None => {
            mesh.x_labels(0).y_labels(0);
        }
    }
    mesh.draw()?;

    chart.draw_series(
        rows.iter()
            .map(|row| Circle::new((row.trend_mean, row.avg_score), 7, BLUE.mix(0.5).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_bubble(
    path: &Path,
    rows: &[JoinedWeek],
    metric: &str,
    family: Option<&str>,
) -> DrawResult {
    let root = BitMapBackend::new(path, BUBBLE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot_area, bar_area) = root.split_horizontally((BUBBLE_SIZE.0 - COLOR_BAR_WIDTH) as i32);

    let x_range = padded_range(rows.iter().map(|row| row.review_count as f64));
    let y_range = padded_range(rows.iter().map(|row| row.avg_score));
    let trend_range = value_range(rows.iter().map(|row| row.trend_mean));

    let mut builder = ChartBuilder::on(&plot_area);
    builder.margin(20).x_label_area_size(60).y_label_area_size(80);
    if let Some(family) = family {
        builder.caption(
            "Review count, rating and trend index",
            (family, CAPTION_SIZE),
        );
    }
    let mut chart = builder.build_cartesian_2d(x_range, y_range)?;

    let count_label = |x: &f64| format!("{:.0}", x);
    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(&BLACK.mix(0.05))
        .x_label_formatter(&count_label);
    match family {
        Some(family) => {
            mesh.x_desc("Weekly review count")
                .y_desc("Weekly average rating")
                .label_style((family, LABEL_SIZE))
                .axis_desc_style((family, DESC_SIZE));
        }
        None => {
            mesh.x_labels(0).y_labels(0);
        }
    }
    mesh.draw()?;

    chart.draw_series(rows.iter().map(|row| {
        let color = scale_color(normalize(row.trend_mean, &trend_range));
        Circle::new(
            (row.review_count as f64, row.avg_score),
            8,
            color.mix(0.65).filled(),
        )
    }))?;

    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(80)
        .margin_bottom(80)
        .margin_right(20)
        .y_label_area_size(120)
        .build_cartesian_2d(0f64..1f64, trend_range.clone())?;

    let mut bar_mesh = bar.configure_mesh();
    bar_mesh.disable_mesh().disable_x_axis();
    match family {
        Some(family) => {
            bar_mesh
                .y_desc(format!("Trend index ({metric})"))
                .label_style((family, LABEL_SIZE))
                .axis_desc_style((family, DESC_SIZE));
        }
        None => {
            bar_mesh.y_labels(0);
        }
    }
    bar_mesh.draw()?;

    let step = (trend_range.end - trend_range.start) / COLOR_BAR_STEPS as f64;
    bar.draw_series((0..COLOR_BAR_STEPS).map(|i| {
        let low = trend_range.start + step * i as f64;
        let color = scale_color((i as f64 + 0.5) / COLOR_BAR_STEPS as f64);
        Rectangle::new([(0.0, low), (1.0, low + step)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// Min..max of the values; `0..1` when empty and widened by one when flat.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });

    if min > max {
        0.0..1.0
    } else if (max - min).abs() < f64::EPSILON {
        (min - 1.0)..(max + 1.0)
    } else {
        min..max
    }
}

/// [`value_range`] with 5% headroom on both ends so markers stay inside the plot.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let range = value_range(values);
    let pad = (range.end - range.start) * 0.05;
    (range.start - pad)..(range.end + pad)
}

fn normalize(value: f64, range: &Range<f64>) -> f64 {
    let span = range.end - range.start;
    if span <= 0.0 {
        return 0.5;
    }
    ((value - range.start) / span).clamp(0.0, 1.0)
}

/// Colour at `position` (0..=1) along [`COLOR_SCALE`].
fn scale_color(position: f64) -> RGBColor {
    let position = position.clamp(0.0, 1.0);
    let segments = COLOR_SCALE.len() - 1;
    let scaled = position * segments as f64;
    let index = (scaled.floor() as usize).min(segments - 1);
    let t = scaled - index as f64;

    let (r0, g0, b0) = COLOR_SCALE[index];
    let (r1, g1, b1) = COLOR_SCALE[index + 1];
    let lerp = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}
