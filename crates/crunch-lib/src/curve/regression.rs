//! Least-squares curve fitting
//!
//! Linear fits use the closed-form normal equations. Exponential fits
//! log-linearize `y = A * r^x` into `ln y = ln A + x * ln r` and reuse the
//! linear fit.

use super::equation::{Equation, FittedCurve};
use crate::error::{Result, ScorerError};

const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Fit `y = m * x + b` by ordinary least squares
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<FittedCurve> {
    if x.len() != y.len() {
        return Err(ScorerError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.is_empty() {
        return Err(ScorerError::InsufficientData(
            "linear regression needs at least one sample".to_string(),
        ));
    }

    let n = x.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        sum_x += xi;
        sum_y += yi;
        sum_xy += xi * yi;
        sum_xx += xi * xi;
    }

    // Relative to n * sum(x^2) so the check is scale-free
    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() <= DEGENERATE_TOLERANCE * n * sum_xx {
        return Err(ScorerError::DivisionByZero(
            "all x values are equal".to_string(),
        ));
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    FittedCurve::new(
        Equation::Linear { slope, intercept },
        x.to_vec(),
        y.to_vec(),
    )
}

/// Fit `y = A * r^x` through a linear fit of `ln y`
pub fn exponential_regression(x: &[f64], y: &[f64]) -> Result<FittedCurve> {
    if let Some(bad) = y.iter().find(|v| !(**v > 0.0)) {
        return Err(ScorerError::InvalidDomain(format!(
            "exponential regression needs positive y values, got {}",
            bad
        )));
    }

    let ln_y: Vec<f64> = y.iter().map(|v| v.ln()).collect();
    let log_fit = linear_regression(x, &ln_y)?;
    let Equation::Linear { slope, intercept } = *log_fit.equation() else {
        unreachable!("linear_regression always yields a linear equation");
    };

    FittedCurve::new(
        Equation::Exponential {
            scale: intercept.exp(),
            rate: slope.exp(),
        },
        x.to_vec(),
        y.to_vec(),
    )
}

/// Definite integral of `a * log_b(c * x)` between `c1` and `c2`
///
/// The antiderivative is `a * x * (ln(c * x) - 1) / ln(b)`.
pub fn logarithmic_integral(equation: &Equation, c1: f64, c2: f64) -> Result<f64> {
    let Equation::Logarithmic {
        coefficient,
        base,
        inner,
    } = *equation
    else {
        return Err(ScorerError::InvalidArgument(
            "logarithmic integral needs a logarithmic equation".to_string(),
        ));
    };

    if !(c1 > 0.0 && c2 > 0.0) {
        return Err(ScorerError::InvalidDomain(format!(
            "integration bounds must be positive, got [{}, {}]",
            c1, c2
        )));
    }
    if !(inner * c1 > 0.0 && inner * c2 > 0.0) {
        return Err(ScorerError::InvalidDomain(format!(
            "log argument must be positive on [{}, {}] with inner factor {}",
            c1, c2, inner
        )));
    }
    if !(base > 0.0) || base == 1.0 {
        return Err(ScorerError::InvalidDomain(format!(
            "logarithm base must be positive and not 1, got {}",
            base
        )));
    }

    let ln_base = base.ln();
    let antiderivative = |x: f64| coefficient * x * ((inner * x).ln() - 1.0) / ln_base;

    Ok(antiderivative(c2) - antiderivative(c1))
}

/// `[0, 1, ..., n - 1]` as regression inputs
pub fn generate_ascending_inputs(n: i64) -> Result<Vec<f64>> {
    if n <= 0 {
        return Err(ScorerError::InvalidArgument(format!(
            "cannot generate {} ascending inputs",
            n
        )));
    }
    Ok((0..n).map(|i| i as f64).collect())
}
