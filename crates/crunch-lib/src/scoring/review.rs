//! Review-sentiment and cons-keyword scores
//!
//! Both scores come from one pass over one fetched review set; fetching
//! reviews is slow, so callers must never request them twice per studio.

use crate::error::{Result, ScorerError};
use crate::models::Review;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Phrases in a review's cons that point at crunch
pub const CONS_KEYWORDS: &[&str] = &["overtime", "work life balance", "work-life balance", "crunch"];

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Review-derived scores for a studio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Mean rating divided by 5
    pub review_score: f64,
    /// Fraction of reviews whose cons mention a crunch keyword
    pub cons_score: f64,
    pub reviews_used: usize,
}

impl ReviewSummary {
    pub fn from_reviews(reviews: &[Review]) -> Result<Self> {
        let mut rating_sum = 0.0;
        let mut used = 0usize;
        let mut flagged = 0usize;
        let mut skipped = 0usize;

        for review in reviews {
            if !(MIN_RATING..=MAX_RATING).contains(&review.rating) {
                skipped += 1;
                continue;
            }
            rating_sum += review.rating;
            used += 1;
            if mentions_crunch(&review.cons) {
                flagged += 1;
            }
        }

        if skipped > 0 {
            warn!(skipped, "Ignored reviews with ratings outside 1-5");
        }
        if used == 0 {
            return Err(ScorerError::InsufficientData(
                "no usable employee reviews".to_string(),
            ));
        }

        Ok(Self {
            review_score: rating_sum / used as f64 / MAX_RATING,
            cons_score: flagged as f64 / used as f64,
            reviews_used: used,
        })
    }
}

fn mentions_crunch(cons: &str) -> bool {
    let cons = cons.to_lowercase();
    CONS_KEYWORDS.iter().any(|k| cons.contains(k))
}
