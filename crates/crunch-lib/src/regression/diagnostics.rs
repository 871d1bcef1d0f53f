//! Fit quality and multicollinearity diagnostics

use super::solve_symmetric;
use super::LogisticModel;
use crate::error::{Result, ScorerError};
use crate::models::TrainingRecord;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// R² this close to 1 is treated as perfect collinearity
const PERFECT_FIT: f64 = 1.0 - 1e-12;

/// Loss of a model's probabilities against 0/1 labels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossReport {
    pub rmse: f64,
    /// Adjusted for the number of features when there are enough records
    pub r2: f64,
}

/// Compute RMSE and adjusted R² of `model` on `records`
pub fn compute_loss(model: &LogisticModel, records: &[TrainingRecord]) -> Result<LossReport> {
    if records.is_empty() {
        return Err(ScorerError::InsufficientData(
            "no records to compute loss on".to_string(),
        ));
    }

    let n = records.len() as f64;
    let mut squared_error = 0.0;
    for record in records {
        let p = model.probability(&record.features)?;
        squared_error += (p - record.target()).powi(2);
    }

    let mean_label = records.iter().map(TrainingRecord::target).sum::<f64>() / n;
    let total: f64 = records
        .iter()
        .map(|r| (r.target() - mean_label).powi(2))
        .sum();

    let r2 = if total == 0.0 {
        0.0
    } else {
        let plain = 1.0 - squared_error / total;
        let p = records[0].features.len() as f64;
        if n > p + 1.0 {
            1.0 - (1.0 - plain) * (n - 1.0) / (n - p - 1.0)
        } else {
            plain
        }
    };

    Ok(LossReport {
        rmse: (squared_error / n).sqrt(),
        r2,
    })
}

/// Variance inflation factor of every feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VifReport {
    pub values: Vec<f64>,
    pub threshold: f64,
}

impl VifReport {
    /// Columns whose VIF exceeds the threshold
    pub fn flagged(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > self.threshold)
            .map(|(i, v)| (i, *v))
            .collect()
    }

    pub fn has_multicollinearity(&self) -> bool {
        self.values.iter().any(|v| *v > self.threshold)
    }
}

/// Regress each column on all the others and report `1 / (1 - R²)`
///
/// High values are logged, never treated as errors.
pub fn compute_vif(columns: &[Vec<f64>], threshold: f64) -> Result<VifReport> {
    let rows = columns.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
        return Err(ScorerError::DimensionMismatch {
            expected: rows,
            actual: bad.len(),
        });
    }
    if rows < columns.len() + 1 {
        return Err(ScorerError::InsufficientData(format!(
            "{} rows cannot support VIF over {} columns",
            rows,
            columns.len()
        )));
    }

    let values: Vec<f64> = (0..columns.len())
        .map(|target| column_vif(columns, target))
        .collect();

    let report = VifReport { values, threshold };
    for (column, vif) in report.flagged() {
        warn!(column, vif, threshold, "High variance inflation factor");
    }
    Ok(report)
}

fn column_vif(columns: &[Vec<f64>], target: usize) -> f64 {
    let y = DVector::from_column_slice(&columns[target]);
    let rows = y.len();
    let others: Vec<&Vec<f64>> = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target)
        .map(|(_, c)| c)
        .collect();

    let mean = y.mean();
    let total: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if total == 0.0 {
        // A constant column is collinear with the intercept
        return f64::INFINITY;
    }
    if others.is_empty() {
        return 1.0;
    }

    let x = DMatrix::from_fn(rows, others.len() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            others[j - 1][i]
        }
    });
    let xt = x.transpose();
    let beta = match solve_symmetric(&xt * &x, &(&xt * &y)) {
        Ok(beta) => beta,
        Err(_) => return f64::INFINITY,
    };

    let residual = &y - &x * beta;
    let r2 = 1.0 - residual.norm_squared() / total;
    if r2 >= PERFECT_FIT {
        f64::INFINITY
    } else {
        1.0 / (1.0 - r2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthogonal_columns_have_unit_vif() {
        let columns = vec![
            vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
            vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0],
        ];
        let report = compute_vif(&columns, 5.0).unwrap();
        for vif in &report.values {
            assert!((vif - 1.0).abs() < 1e-9, "vif {}", vif);
        }
        assert!(report.flagged().is_empty());
    }

    #[test]
    fn test_collinear_columns_flagged() {
        let a = vec![0.1, 0.4, 0.2, 0.9, 0.5, 0.7];
        let b: Vec<f64> = a.iter().map(|v| 2.0 * v + 0.01).collect();
        let c = vec![0.3, 0.1, 0.8, 0.2, 0.6, 0.4];
        let report = compute_vif(&[a, b, c], 5.0).unwrap();

        let flagged: Vec<usize> = report.flagged().iter().map(|(i, _)| *i).collect();
        assert!(flagged.contains(&0));
        assert!(flagged.contains(&1));
        assert!(report.has_multicollinearity());
    }

    #[test]
    fn test_vif_input_validation() {
        assert!(matches!(
            compute_vif(&[vec![1.0, 2.0, 3.0], vec![1.0]], 5.0),
            Err(ScorerError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            compute_vif(&[vec![1.0, 2.0], vec![2.0, 1.0]], 5.0),
            Err(ScorerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_loss_of_zero_model() {
        let model = LogisticModel::new(vec![0.0, 0.0]);
        let records = vec![
            TrainingRecord::new("a", vec![0.2], false),
            TrainingRecord::new("b", vec![0.8], true),
        ];
        let loss = compute_loss(&model, &records).unwrap();
        assert!((loss.rmse - 0.5).abs() < 1e-12);
        // n == p + 1, so plain R²: 1 - 0.5 / 0.5
        assert!(loss.r2.abs() < 1e-12);
    }

    #[test]
    fn test_adjusted_r2() {
        let model = LogisticModel::new(vec![-4.0, 8.0]);
        let records = vec![
            TrainingRecord::new("a", vec![0.1], false),
            TrainingRecord::new("b", vec![0.2], false),
            TrainingRecord::new("c", vec![0.8], true),
            TrainingRecord::new("d", vec![0.9], true),
        ];
        let loss = compute_loss(&model, &records).unwrap();

        let sse: f64 = records
            .iter()
            .map(|r| (model.probability(&r.features).unwrap() - r.target()).powi(2))
            .sum();
        let plain = 1.0 - sse / 1.0;
        let expected = 1.0 - (1.0 - plain) * 3.0 / 2.0;
        assert!((loss.r2 - expected).abs() < 1e-12);
        assert!(loss.r2 < plain);
    }

    #[test]
    fn test_zero_label_variance() {
        let model = LogisticModel::new(vec![0.0, 1.0]);
        let records = vec![
            TrainingRecord::new("a", vec![0.1], true),
            TrainingRecord::new("b", vec![0.9], true),
        ];
        assert_eq!(compute_loss(&model, &records).unwrap().r2, 0.0);
    }
}
