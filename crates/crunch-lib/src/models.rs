//! Core data models for the crunch scorer

use serde::{Deserialize, Serialize};

/// Release years outside this range are placeholders for unreleased games
pub const MIN_RELEASE_YEAR: i32 = 1000;
pub const MAX_RELEASE_YEAR: i32 = 9999;

/// Raw facts about a studio as returned by a studio directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioFacts {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_years: Vec<i32>,
}

/// A single employee review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Overall rating, 1 to 5
    pub rating: f64,
    /// Free-text negative aspects
    #[serde(default)]
    pub cons: String,
}

/// The four feature scores of a studio, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudioScores {
    pub crunch: f64,
    pub genre: f64,
    pub review: f64,
    pub cons: f64,
}

impl StudioScores {
    /// Classifier input: crunch, genre and review scores, in that order
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector(vec![self.crunch, self.genre, self.review])
    }
}

/// Ordered classifier features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A fully scored studio; immutable once built by the studio scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioRecord {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub employee_count: u32,
    pub release_years: Vec<i32>,
    pub scores: StudioScores,
}

impl StudioRecord {
    pub fn features(&self) -> FeatureVector {
        self.scores.feature_vector()
    }
}

/// Keep four-digit years only, in ascending order
pub fn valid_release_years(years: &[i32]) -> Vec<i32> {
    let mut valid: Vec<i32> = years
        .iter()
        .copied()
        .filter(|y| (MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(y))
        .collect();
    valid.sort_unstable();
    valid
}

/// A labeled feature vector used to train the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub key: String,
    pub features: Vec<f64>,
    /// `true` when the studio is known to crunch
    pub label: bool,
}

impl TrainingRecord {
    pub fn new(key: impl Into<String>, features: Vec<f64>, label: bool) -> Self {
        Self {
            key: key.into(),
            features,
            label,
        }
    }

    pub fn target(&self) -> f64 {
        if self.label {
            1.0
        } else {
            0.0
        }
    }
}
