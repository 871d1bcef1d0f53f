//! Eager studio scoring
//!
//! All four scores are computed once when the record is built; the resulting
//! [`StudioRecord`] is never mutated afterwards.

use super::cadence::{CadenceScorer, IntegralCadenceScorer};
use super::genre::{GenreScorer, WeightedGenreScorer};
use super::review::ReviewSummary;
use crate::config::ScorerConfig;
use crate::error::{Result, ScorerError};
use crate::models::{valid_release_years, Review, StudioRecord, StudioScores};
use crate::store::CacheRecord;

/// Everything needed to score one studio
#[derive(Debug, Clone, Default)]
pub struct StudioInput {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
    /// `None` when no source knows the size; the configured default is used
    pub employee_count: Option<u32>,
    pub release_years: Vec<i32>,
    /// Genre codes of each game
    pub games: Vec<Vec<u32>>,
    pub reviews: Vec<Review>,
}

/// Builds immutable studio records from raw inputs
pub struct StudioScorer {
    cadence: Box<dyn CadenceScorer>,
    genre: Box<dyn GenreScorer>,
    default_employee_count: u32,
}

impl StudioScorer {
    pub fn new(config: &ScorerConfig) -> Self {
        Self {
            cadence: Box::new(IntegralCadenceScorer::new(&config.cadence)),
            genre: Box::new(WeightedGenreScorer),
            default_employee_count: config.scoring.default_employee_count,
        }
    }

    /// Swap the cadence formula
    pub fn with_cadence(mut self, cadence: Box<dyn CadenceScorer>) -> Self {
        self.cadence = cadence;
        self
    }

    /// Swap the genre formula
    pub fn with_genre(mut self, genre: Box<dyn GenreScorer>) -> Self {
        self.genre = genre;
        self
    }

    pub fn cadence_score(&self, release_years: &[i32], employee_count: u32) -> Result<f64> {
        self.cadence.score(release_years, employee_count)
    }

    /// Score a freshly resolved studio
    pub fn score(&self, input: StudioInput) -> Result<StudioRecord> {
        if input.id.is_empty() {
            return Err(ScorerError::InvalidArgument(format!(
                "studio {} has no resolved id",
                input.name
            )));
        }

        let employee_count = self.employee_count(input.employee_count);
        let release_years = valid_release_years(&input.release_years);

        let crunch = self.cadence.score(&release_years, employee_count)?;
        let genre = self.genre.score(&input.games)?;
        let reviews = ReviewSummary::from_reviews(&input.reviews)?;

        Ok(StudioRecord {
            id: input.id,
            name: input.name,
            aliases: input.aliases,
            employee_count,
            release_years,
            scores: StudioScores {
                crunch,
                genre,
                review: reviews.review_score,
                cons: reviews.cons_score,
            },
        })
    }

    /// Rebuild a record from cached scores; only the cheap cadence score is
    /// recomputed
    pub fn from_cached(&self, cached: &CacheRecord, aliases: Vec<String>) -> Result<StudioRecord> {
        let employee_count = self.employee_count(Some(cached.employee_count));
        let release_years = valid_release_years(&cached.release_years);
        let crunch = self.cadence.score(&release_years, employee_count)?;

        Ok(StudioRecord {
            id: cached.id.clone(),
            name: cached.alias.clone(),
            aliases,
            employee_count,
            release_years,
            scores: StudioScores {
                crunch,
                genre: cached.genre_score,
                review: cached.review_score,
                cons: cached.cons_score,
            },
        })
    }

    fn employee_count(&self, count: Option<u32>) -> u32 {
        match count {
            Some(n) if n > 0 => n,
            _ => self.default_employee_count,
        }
    }
}
