//! Curve fitting
//!
//! This module provides:
//! - Closed equation set (linear, exponential, logarithmic)
//! - Ordinary least squares and log-linearized exponential regression
//! - Closed-form definite integral of a logarithmic curve

mod equation;
mod regression;

pub use equation::{Equation, FittedCurve};
pub use regression::{
    exponential_regression, generate_ascending_inputs, linear_regression, logarithmic_integral,
};
