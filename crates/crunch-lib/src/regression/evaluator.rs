//! Model evaluation: classification, confidence and confusion-matrix metrics

use super::diagnostics::compute_loss;
use super::{LogisticModel, LogisticTrainer};
use crate::config::EvaluationConfig;
use crate::error::{Result, ScorerError};
use crate::models::TrainingRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// How far a probability sits from the decision boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    Low,
    High,
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLabel::Low => write!(f, "LOW"),
            ConfidenceLabel::High => write!(f, "HIGH"),
        }
    }
}

/// A single classified feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub probability: f64,
    pub crunches: bool,
    pub confidence: ConfidenceLabel,
}

/// Classification counts against true labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.true_positives + self.true_negatives) as f64 / total as f64
    }

    /// `FP / (FP + TN)`; zero when there are no negatives
    pub fn false_positive_rate(&self) -> f64 {
        let negatives = self.false_positives + self.true_negatives;
        if negatives == 0 {
            return 0.0;
        }
        self.false_positives as f64 / negatives as f64
    }
}

/// Outcome of evaluating a model on labeled studios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rmse_loss: f64,
    pub r2_loss: f64,
    pub false_positive_rate: f64,
    pub accuracy: f64,
    /// Accuracy over HIGH-confidence predictions only; zero when there are none
    pub high_confidence_accuracy: f64,
    pub high_confidence_count: usize,
    pub confusion: ConfusionMatrix,
}

/// Per-fold results of k-fold cross validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub folds: Vec<EvaluationReport>,
    pub mean_accuracy: f64,
    pub mean_false_positive_rate: f64,
    pub mean_rmse_loss: f64,
}

/// Scores studios with a trained model
#[derive(Debug, Clone)]
pub struct Evaluator {
    threshold: f64,
    high_confidence_margin: f64,
}

impl Evaluator {
    pub fn new(config: &EvaluationConfig) -> Self {
        Self {
            threshold: config.threshold,
            high_confidence_margin: config.high_confidence_margin,
        }
    }

    pub fn classify(&self, probability: f64) -> bool {
        probability >= self.threshold
    }

    pub fn confidence_label(&self, probability: f64) -> ConfidenceLabel {
        if (probability - 0.5).abs() > self.high_confidence_margin {
            ConfidenceLabel::High
        } else {
            ConfidenceLabel::Low
        }
    }

    pub fn predict(&self, model: &LogisticModel, features: &[f64]) -> Result<Prediction> {
        let probability = model.probability(features)?;
        Ok(Prediction {
            probability,
            crunches: self.classify(probability),
            confidence: self.confidence_label(probability),
        })
    }

    /// Evaluate `model` on known crunch (`positives`) and non-crunch
    /// (`negatives`) feature vectors
    pub fn evaluate(
        &self,
        model: &LogisticModel,
        positives: &[Vec<f64>],
        negatives: &[Vec<f64>],
    ) -> Result<EvaluationReport> {
        let records: Vec<TrainingRecord> = positives
            .iter()
            .map(|f| TrainingRecord::new("", f.clone(), true))
            .chain(negatives.iter().map(|f| TrainingRecord::new("", f.clone(), false)))
            .collect();
        self.evaluate_records(model, &records)
    }

    pub fn evaluate_records(
        &self,
        model: &LogisticModel,
        records: &[TrainingRecord],
    ) -> Result<EvaluationReport> {
        if records.is_empty() {
            return Err(ScorerError::InsufficientData(
                "no labeled studios to evaluate".to_string(),
            ));
        }

        let loss = compute_loss(model, records)?;
        let mut confusion = ConfusionMatrix::default();
        let mut high_total = 0usize;
        let mut high_correct = 0usize;

        for record in records {
            let prediction = self.predict(model, &record.features)?;
            confusion.record(prediction.crunches, record.label);
            if prediction.confidence == ConfidenceLabel::High {
                high_total += 1;
                if prediction.crunches == record.label {
                    high_correct += 1;
                }
            }
        }

        let high_confidence_accuracy = if high_total == 0 {
            0.0
        } else {
            high_correct as f64 / high_total as f64
        };

        let report = EvaluationReport {
            rmse_loss: loss.rmse,
            r2_loss: loss.r2,
            false_positive_rate: confusion.false_positive_rate(),
            accuracy: confusion.accuracy(),
            high_confidence_accuracy,
            high_confidence_count: high_total,
            confusion,
        };
        debug!(
            records = records.len(),
            accuracy = report.accuracy,
            false_positive_rate = report.false_positive_rate,
            "Evaluated model"
        );
        Ok(report)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(&EvaluationConfig::default())
    }
}

/// K-fold cross validation
///
/// Records are dealt round-robin, crunch studios first, so each class is
/// spread evenly over the folds and every fold holds out at least one record.
/// Each fold is evaluated on a model trained on the remaining folds.
pub fn cross_validate(
    trainer: &LogisticTrainer,
    evaluator: &Evaluator,
    records: &[TrainingRecord],
    folds: usize,
) -> Result<CrossValidationReport> {
    if folds < 2 {
        return Err(ScorerError::InvalidArgument(format!(
            "cross validation needs at least 2 folds, got {}",
            folds
        )));
    }
    if records.len() < folds {
        return Err(ScorerError::InsufficientData(format!(
            "{} records cannot fill {} folds",
            records.len(),
            folds
        )));
    }

    // Positives first, then negatives, dealt from one counter so no fold is
    // left empty
    let mut assignment = vec![0usize; records.len()];
    let positives = records.iter().enumerate().filter(|(_, r)| r.label);
    let negatives = records.iter().enumerate().filter(|(_, r)| !r.label);
    for (dealt, (i, _)) in positives.chain(negatives).enumerate() {
        assignment[i] = dealt % folds;
    }

    let mut reports = Vec::with_capacity(folds);
    for fold in 0..folds {
        let (held_out, training): (Vec<_>, Vec<_>) = records
            .iter()
            .zip(&assignment)
            .partition(|(_, assigned)| **assigned == fold);
        let held_out: Vec<TrainingRecord> = held_out.into_iter().map(|(r, _)| r.clone()).collect();
        let training: Vec<TrainingRecord> = training.into_iter().map(|(r, _)| r.clone()).collect();

        let trained = trainer.learn(&training)?;
        let report = evaluator.evaluate_records(&trained.model, &held_out)?;
        debug!(fold, held_out = held_out.len(), accuracy = report.accuracy, "Cross-validation fold");
        reports.push(report);
    }

    let mean = |f: fn(&EvaluationReport) -> f64| reports.iter().map(f).sum::<f64>() / folds as f64;
    let report = CrossValidationReport {
        mean_accuracy: mean(|r| r.accuracy),
        mean_false_positive_rate: mean(|r| r.false_positive_rate),
        mean_rmse_loss: mean(|r| r.rmse_loss),
        folds: reports,
    };
    info!(folds, mean_accuracy = report.mean_accuracy, "Cross validation complete");
    Ok(report)
}
