//! Equations and fitted curves

use crate::error::{Result, ScorerError};

/// A closed set of one-variable equations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Equation {
    /// `y = slope * x + intercept`
    Linear { slope: f64, intercept: f64 },
    /// `y = scale * rate^x`
    Exponential { scale: f64, rate: f64 },
    /// `y = coefficient * log_base(inner * x)`
    Logarithmic {
        coefficient: f64,
        base: f64,
        inner: f64,
    },
}

impl Equation {
    pub fn value(&self, x: f64) -> f64 {
        match *self {
            Equation::Linear { slope, intercept } => slope * x + intercept,
            Equation::Exponential { scale, rate } => scale * rate.powf(x),
            Equation::Logarithmic {
                coefficient,
                base,
                inner,
            } => coefficient * (inner * x).log(base),
        }
    }
}

/// An equation together with the samples it was fitted to
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    equation: Equation,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl FittedCurve {
    pub fn new(equation: Equation, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ScorerError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        if x.is_empty() {
            return Err(ScorerError::InsufficientData(
                "a fitted curve needs at least one sample".to_string(),
            ));
        }
        Ok(Self { equation, x, y })
    }

    pub fn equation(&self) -> &Equation {
        &self.equation
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Absolute difference between each sample and the curve
    pub fn residuals(&self) -> Vec<f64> {
        self.x
            .iter()
            .zip(&self.y)
            .map(|(x, y)| (self.equation.value(*x) - y).abs())
            .collect()
    }

    pub fn mean_absolute_error(&self) -> f64 {
        let residuals = self.residuals();
        residuals.iter().sum::<f64>() / residuals.len() as f64
    }

    /// Pearson correlation coefficient of the samples
    pub fn correlation_coefficient(&self) -> Result<f64> {
        let n = self.x.len() as f64;
        let sum_x: f64 = self.x.iter().sum();
        let sum_y: f64 = self.y.iter().sum();
        let sum_xy: f64 = self.x.iter().zip(&self.y).map(|(x, y)| x * y).sum();
        let sum_xx: f64 = self.x.iter().map(|x| x * x).sum();
        let sum_yy: f64 = self.y.iter().map(|y| y * y).sum();

        let var_x = n * sum_xx - sum_x * sum_x;
        let var_y = n * sum_yy - sum_y * sum_y;
        let denominator = (var_x * var_y).sqrt();
        if !denominator.is_finite() || denominator <= f64::EPSILON {
            return Err(ScorerError::DivisionByZero(
                "correlation is undefined for constant samples".to_string(),
            ));
        }

        Ok((n * sum_xy - sum_x * sum_y) / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equation_values() {
        let linear = Equation::Linear {
            slope: 2.0,
            intercept: 1.0,
        };
        assert_eq!(linear.value(3.0), 7.0);

        let exp = Equation::Exponential {
            scale: 3.0,
            rate: 2.0,
        };
        assert_eq!(exp.value(4.0), 48.0);

        let log = Equation::Logarithmic {
            coefficient: 2.0,
            base: 10.0,
            inner: 10.0,
        };
        assert!((log.value(10.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let eq = Equation::Linear {
            slope: 1.0,
            intercept: 0.0,
        };
        let err = FittedCurve::new(eq, vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, ScorerError::DimensionMismatch { .. }));
        assert!(FittedCurve::new(eq, vec![], vec![]).is_err());
    }

    #[test]
    fn test_residuals_and_error() {
        let eq = Equation::Linear {
            slope: 1.0,
            intercept: 0.0,
        };
        let curve = FittedCurve::new(eq, vec![0.0, 1.0, 2.0], vec![1.0, 1.0, 1.0]).unwrap();
        assert_eq!(curve.residuals(), vec![1.0, 0.0, 1.0]);
        assert!((curve.mean_absolute_error() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_correlation_coefficient() {
        let eq = Equation::Linear {
            slope: 2.0,
            intercept: 0.0,
        };
        let rising = FittedCurve::new(eq, vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 6.0]).unwrap();
        assert!((rising.correlation_coefficient().unwrap() - 1.0).abs() < 1e-12);

        let falling = FittedCurve::new(eq, vec![1.0, 2.0, 3.0], vec![6.0, 4.0, 2.0]).unwrap();
        assert!((falling.correlation_coefficient().unwrap() + 1.0).abs() < 1e-12);

        let flat = FittedCurve::new(eq, vec![1.0, 2.0, 3.0], vec![5.0, 5.0, 5.0]).unwrap();
        assert!(flat.correlation_coefficient().is_err());
    }
}
