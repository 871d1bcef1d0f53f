//! Logistic regression fitted by iteratively reweighted least squares

use super::{sigmoid, softplus, solve_symmetric};
use crate::config::TrainerConfig;
use crate::error::{Result, ScorerError};
use crate::models::TrainingRecord;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Step halvings tried before the fit is declared stalled
const MAX_STEP_HALVINGS: usize = 30;

/// Floor on IRLS weights so the Hessian stays invertible near separation
const MIN_IRLS_WEIGHT: f64 = 1e-10;

/// Trained weights; `weights[0]` is the intercept when there is one more
/// weight than features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f64>,
}

impl LogisticModel {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// `exp(w)` for every weight
    pub fn odds_ratios(&self) -> Vec<f64> {
        self.weights.iter().map(|w| w.exp()).collect()
    }

    /// Linear predictor for one feature vector
    pub fn linear_predictor(&self, features: &[f64]) -> Result<f64> {
        if self.weights.len() == features.len() + 1 {
            let dot: f64 = self.weights[1..]
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum();
            Ok(self.weights[0] + dot)
        } else if self.weights.len() == features.len() {
            Ok(self.weights.iter().zip(features).map(|(w, x)| w * x).sum())
        } else {
            Err(ScorerError::DimensionMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            })
        }
    }

    /// Probability that the studio crunches
    pub fn probability(&self, features: &[f64]) -> Result<f64> {
        Ok(sigmoid(self.linear_predictor(features)?))
    }
}

/// Result of a successful fit
#[derive(Debug, Clone, Serialize)]
pub struct TrainedModel {
    pub model: LogisticModel,
    pub iterations: usize,
    pub deviance: f64,
    pub records: usize,
}

/// Fits [`LogisticModel`]s
#[derive(Debug, Clone)]
pub struct LogisticTrainer {
    config: TrainerConfig,
}

impl LogisticTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Fit a model to labeled records
    pub fn learn(&self, records: &[TrainingRecord]) -> Result<TrainedModel> {
        let feature_count = validate(records)?;

        let mut shuffled: Vec<&TrainingRecord> = records.iter().collect();
        let mut rng = match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        shuffled.shuffle(&mut rng);

        let offset = usize::from(self.config.fit_intercept);
        let columns = feature_count + offset;
        let x = DMatrix::from_fn(shuffled.len(), columns, |i, j| {
            if j < offset {
                1.0
            } else {
                shuffled[i].features[j - offset]
            }
        });
        let y = DVector::from_iterator(shuffled.len(), shuffled.iter().map(|r| r.target()));

        let (weights, iterations, deviance) = self.irls(&x, &y, offset)?;

        info!(
            records = records.len(),
            features = feature_count,
            iterations,
            deviance,
            "Logistic regression converged"
        );

        Ok(TrainedModel {
            model: LogisticModel::new(weights.iter().copied().collect()),
            iterations,
            deviance,
            records: records.len(),
        })
    }

    fn irls(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        offset: usize,
    ) -> Result<(DVector<f64>, usize, f64)> {
        let lambda = self.config.regularization;
        let columns = x.ncols();
        let mut w = DVector::zeros(columns);
        let mut dev = penalized_deviance(x, y, &w, lambda, offset);

        for iteration in 1..=self.config.max_iterations {
            let eta = x * &w;
            let p = eta.map(sigmoid);

            let mut gradient = x.transpose() * (y - &p);
            let mut hessian = DMatrix::zeros(columns, columns);
            for (i, row) in x.row_iter().enumerate() {
                let weight = (p[i] * (1.0 - p[i])).max(MIN_IRLS_WEIGHT);
                hessian += row.transpose() * row * weight;
            }
            for j in offset..columns {
                gradient[j] -= lambda * w[j];
                hessian[(j, j)] += lambda;
            }

            let step = solve_symmetric(hessian, &gradient)?;
            let deviance_at = |c: &DVector<f64>| penalized_deviance(x, y, c, lambda, offset);

            let Some((candidate, candidate_dev, halvings)) =
                damped_step(&w, &step, dev, &deviance_at)
            else {
                // Already at the optimum when the full step barely moves the deviance
                let full_dev = deviance_at(&(&w + &step));
                if (full_dev - dev).abs() / (dev.abs() + 0.1) < self.config.tolerance {
                    return Ok((w, iteration, dev));
                }
                warn!(iteration, deviance = dev, "IRLS step search stalled");
                return Err(ScorerError::ConvergenceFailure {
                    iterations: iteration,
                });
            };

            let change = (candidate_dev - dev).abs() / (candidate_dev.abs() + 0.1);
            debug!(iteration, deviance = candidate_dev, change, halvings, "IRLS step");

            w = candidate;
            dev = candidate_dev;
            if change < self.config.tolerance {
                return Ok((w, iteration, dev));
            }
        }

        Err(ScorerError::ConvergenceFailure {
            iterations: self.config.max_iterations,
        })
    }
}

impl Default for LogisticTrainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

/// Check shape and class balance; returns the feature count
fn validate(records: &[TrainingRecord]) -> Result<usize> {
    let first = records
        .first()
        .ok_or_else(|| ScorerError::InsufficientData("no training records".to_string()))?;
    let feature_count = first.features.len();
    if feature_count == 0 {
        return Err(ScorerError::InsufficientData(
            "training records carry no features".to_string(),
        ));
    }
    if let Some(bad) = records.iter().find(|r| r.features.len() != feature_count) {
        return Err(ScorerError::DimensionMismatch {
            expected: feature_count,
            actual: bad.features.len(),
        });
    }

    let positives = records.iter().filter(|r| r.label).count();
    if positives == 0 || positives == records.len() {
        return Err(ScorerError::InsufficientData(
            "training needs both crunch and non-crunch studios".to_string(),
        ));
    }

    Ok(feature_count)
}

/// Halve `step` until the deviance no longer rises above `dev`
///
/// Returns the accepted weights, their deviance and the halvings used, or
/// `None` when every tried fraction of the step increases the deviance.
fn damped_step<F>(
    w: &DVector<f64>,
    step: &DVector<f64>,
    dev: f64,
    deviance: F,
) -> Option<(DVector<f64>, f64, usize)>
where
    F: Fn(&DVector<f64>) -> f64,
{
    let mut scale = 1.0;
    for halvings in 0..=MAX_STEP_HALVINGS {
        let candidate = w + step * scale;
        let candidate_dev = deviance(&candidate);
        if candidate_dev <= dev {
            return Some((candidate, candidate_dev, halvings));
        }
        scale *= 0.5;
    }
    None
}

/// `-2 * log-likelihood` plus the L2 penalty on non-intercept weights
fn penalized_deviance(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
    lambda: f64,
    offset: usize,
) -> f64 {
    let eta = x * w;
    let nll: f64 = eta
        .iter()
        .zip(y.iter())
        .map(|(z, label)| label * softplus(-z) + (1.0 - label) * softplus(*z))
        .sum();
    let penalty: f64 = w.iter().skip(offset).map(|v| v * v).sum();
    2.0 * nll + lambda * penalty
}
