//! Scorer configuration
//!
//! A single [`ScorerConfig`] value is built once by the caller and passed to
//! every scorer, trainer and store. Every field has a default so partial
//! configuration files deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Width of the integration window used by the cadence score
pub const DEFAULT_CADENCE_WINDOW: u32 = 20;

/// Employee count assumed when no source knows the studio size
pub const DEFAULT_EMPLOYEE_COUNT: u32 = 100;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Root directory holding `data/`, `models/`, `sets/` and the cache file
    pub data_dir: PathBuf,
    /// Studios that always bypass the cache and are rescored
    pub debug_studios: Vec<String>,
    /// Rescore every studio, ignoring cached values
    pub force_refresh: bool,
    pub cadence: CadenceConfig,
    pub scoring: ScoringConfig,
    pub trainer: TrainerConfig,
    pub evaluation: EvaluationConfig,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("model-data"),
            debug_studios: Vec::new(),
            force_refresh: false,
            cadence: CadenceConfig::default(),
            scoring: ScoringConfig::default(),
            trainer: TrainerConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl ScorerConfig {
    /// Whether cached values must be ignored for this studio
    pub fn bypasses_cache(&self, studio: &str) -> bool {
        self.force_refresh
            || self
                .debug_studios
                .iter()
                .any(|s| s.eq_ignore_ascii_case(studio))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("cache.csv")
    }

    pub fn training_dir(&self) -> PathBuf {
        self.data_dir.join("data")
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn set_dir(&self) -> PathBuf {
        self.data_dir.join("sets")
    }

    /// `<data_dir>/data/<name>.txt`
    pub fn training_path(&self, name: &str) -> PathBuf {
        self.training_dir().join(format!("{}.txt", name))
    }

    /// `<data_dir>/sets/<name>.txt`
    pub fn set_path(&self, name: &str) -> PathBuf {
        self.set_dir().join(format!("{}.txt", name))
    }
}

/// Release-cadence score settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Integration window `L`; the curve is integrated over `[1, L + 1]`
    pub window: u32,
    /// Years per release that leaves the integral ratio unweighted
    pub reference_years_per_release: f64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_CADENCE_WINDOW,
            reference_years_per_release: 1.0,
        }
    }
}

/// Feature scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub default_employee_count: u32,
    /// Sort reports by crunch score, highest first
    pub sort_by_crunch: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            default_employee_count: DEFAULT_EMPLOYEE_COUNT,
            sort_by_crunch: true,
        }
    }
}

/// Logistic regression trainer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// L2 penalty applied to non-intercept weights
    pub regularization: f64,
    pub fit_intercept: bool,
    /// Seed for the pre-training shuffle; entropy-seeded when absent
    pub shuffle_seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 100,
            regularization: 1e-10,
            fit_intercept: true,
            shuffle_seed: None,
        }
    }
}

/// Model evaluation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Probability at or above which a studio is classified as crunching
    pub threshold: f64,
    /// Distance from 0.5 beyond which a prediction is high confidence
    pub high_confidence_margin: f64,
    /// VIF above which a feature is reported as collinear
    pub vif_threshold: f64,
    /// Fold count for cross validation
    pub folds: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            high_confidence_margin: 0.3,
            vif_threshold: 5.0,
            folds: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{ "trainer": { "max_iterations": 250 }, "debug_studios": ["Rockstar"] }"#;
        let config: ScorerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.trainer.max_iterations, 250);
        assert_eq!(config.trainer.tolerance, 1e-4);
        assert_eq!(config.cadence.window, DEFAULT_CADENCE_WINDOW);
        assert_eq!(config.scoring.default_employee_count, 100);
    }

    #[test]
    fn test_debug_studios_bypass_cache() {
        let config = ScorerConfig {
            debug_studios: vec!["Rockstar".to_string()],
            ..Default::default()
        };
        assert!(config.bypasses_cache("rockstar"));
        assert!(!config.bypasses_cache("Bioware"));

        let forced = ScorerConfig {
            force_refresh: true,
            ..Default::default()
        };
        assert!(forced.bypasses_cache("Bioware"));
    }
}
