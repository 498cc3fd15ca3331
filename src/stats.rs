//! Linear and rank correlation with two-sided significance.
//!
//! p-values come from the Student t distribution with `n - 2` degrees of
//! freedom, evaluated through the regularized incomplete beta function:
//! `p = I(1 - r^2; (n - 2) / 2, 1 / 2)`.

use std::fmt;

use crate::weekly::JoinedWeek;

const BETA_MAX_ITERATIONS: usize = 300;
const BETA_EPSILON: f64 = 1e-14;
const BETA_FPMIN: f64 = 1e-300;

/// Which input sequence a statistics error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Series {
    First,
    Second,
}

/// Reasons a correlation is undefined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatsError {
    /// The two sequences have different lengths.
    LengthMismatch { first: usize, second: usize },
    /// Fewer than two paired observations.
    InsufficientData { pairs: usize },
    /// One of the sequences has zero variance.
    ConstantInput { series: Series },
    /// One of the sequences holds a NaN or infinite value.
    NonFiniteInput { series: Series },
}

impl Series {
    fn ordinal(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { first, second } => write!(
                f,
                "sequences differ in length ({} vs {})",
                first, second
            ),
            Self::InsufficientData { pairs } => write!(
                f,
                "insufficient data: {} paired observation(s), at least 2 required",
                pairs
            ),
            Self::ConstantInput { series } => write!(
                f,
                "insufficient data: the {} series is constant",
                series.ordinal()
            ),
            Self::NonFiniteInput { series } => write!(
                f,
                "the {} series contains a non-finite value",
                series.ordinal()
            ),
        }
    }
}

impl std::error::Error for StatsError {}

/// A correlation coefficient and its two-sided p-value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correlation {
    /// Coefficient in `[-1, 1]`.
    pub coefficient: f64,
    /// Two-sided p-value, `None` when no degrees of freedom remain (two pairs).
    pub p_value: Option<f64>,
    /// Number of paired observations.
    pub pairs: usize,
}

/// Both correlation measures computed over the joined weekly table.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationSummary {
    /// Pearson correlation between weekly trend mean and average rating.
    pub linear: Result<Correlation, StatsError>,
    /// Spearman correlation between the same two series.
    pub rank: Result<Correlation, StatsError>,
}

impl CorrelationSummary {
    /// Returns `true` when both measures are defined.
    pub fn is_complete(&self) -> bool {
        self.linear.is_ok() && self.rank.is_ok()
    }
}

fn validate(x: &[f64], y: &[f64]) -> Result<(), StatsError> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            first: x.len(),
            second: y.len(),
        });
    }
    if x.iter().any(|value| !value.is_finite()) {
        return Err(StatsError::NonFiniteInput {
            series: Series::First,
        });
    }
    if y.iter().any(|value| !value.is_finite()) {
        return Err(StatsError::NonFiniteInput {
            series: Series::Second,
        });
    }
    if x.len() < 2 {
        return Err(StatsError::InsufficientData { pairs: x.len() });
    }
    if is_constant(x) {
        return Err(StatsError::ConstantInput {
            series: Series::First,
        });
    }
    if is_constant(y) {
        return Err(StatsError::ConstantInput {
            series: Series::Second,
        });
    }
    Ok(())
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn coefficient(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

fn with_significance(r: f64, pairs: usize) -> Correlation {
    let dof = pairs - 2;
    let p_value = if dof == 0 {
        None
    } else {
        let x = (1.0 - r * r).max(0.0);
        Some(regularized_incomplete_beta(dof as f64 / 2.0, 0.5, x).clamp(0.0, 1.0))
    };
    Correlation {
        coefficient: r,
        p_value,
        pairs,
    }
}

/// Pearson product-moment correlation of two equal-length sequences.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, StatsError> {
    validate(x, y)?;
    Ok(with_significance(coefficient(x, y), x.len()))
}

/// Spearman rank correlation; tied values receive their average rank.
pub fn spearman(x: &[f64], y: &[f64]) -> Result<Correlation, StatsError> {
    validate(x, y)?;
    let rx = average_ranks(x);
    let ry = average_ranks(y);
    Ok(with_significance(coefficient(&rx, &ry), x.len()))
}

/// Computes both measures with trend mean as the first series and rating second.
pub fn correlate(rows: &[JoinedWeek]) -> CorrelationSummary {
    let trend: Vec<f64> = rows.iter().map(|row| row.trend_mean).collect();
    let score: Vec<f64> = rows.iter().map(|row| row.avg_score).collect();
    CorrelationSummary {
        linear: pearson(&trend, &score),
        rank: spearman(&trend, &score),
    }
}

/// 1-based ranks with ties replaced by the mean of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share the average of ranks start+1..=end
        let rank = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = rank;
        }
        start = end;
    }
    ranks
}

fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 6] = [
        76.180_091_729_471_46,
        -86.505_320_329_416_77,
        24.014_098_240_830_91,
        -1.231_739_572_450_155,
        0.120_865_097_386_617_9e-2,
        -0.539_523_938_495_3e-5,
    ];

    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000_000_000_190_015;
    for coefficient in COEFFICIENTS {
        y += 1.0;
        series += coefficient / y;
    }
    -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

/// Regularized incomplete beta function `I_x(a, b)` for `x` in `[0, 1]`.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < BETA_FPMIN {
        d = BETA_FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=BETA_MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < BETA_FPMIN {
            d = BETA_FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < BETA_FPMIN {
            c = BETA_FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < BETA_FPMIN {
            d = BETA_FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < BETA_FPMIN {
            c = BETA_FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < BETA_EPSILON {
            break;
        }
    }
    h
}
