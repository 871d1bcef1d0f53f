//! Logistic regression training, diagnostics and evaluation
//!
//! Models learn from `[crunch, genre, review]` feature vectors labeled by
//! whether the studio is known to crunch.

mod diagnostics;
mod evaluator;
mod logistic;

pub use diagnostics::{compute_loss, compute_vif, LossReport, VifReport};
pub use evaluator::{
    cross_validate, ConfidenceLabel, ConfusionMatrix, CrossValidationReport, EvaluationReport,
    Evaluator, Prediction,
};
pub use logistic::{LogisticModel, LogisticTrainer, TrainedModel};

use crate::error::{Result, ScorerError};
use nalgebra::{DMatrix, DVector};

/// Solve the symmetric system `a * x = b`
///
/// Cholesky first; LU when the matrix is not numerically positive definite.
pub(crate) fn solve_symmetric(a: DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if let Some(cholesky) = a.clone().cholesky() {
        return Ok(cholesky.solve(b));
    }
    a.lu().solve(b).ok_or_else(|| {
        ScorerError::DivisionByZero("singular system in least-squares solve".to_string())
    })
}

/// Numerically stable `1 / (1 + e^-z)`
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow
pub(crate) fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}
