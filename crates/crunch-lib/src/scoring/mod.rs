//! Feature scorers
//!
//! Derives the per-studio features fed to the classifier:
//! - Release-cadence ("crunch-overtime") score from release years and staff size
//! - Genre-risk score from the genre mix of the studio's games
//! - Review-sentiment and cons-keyword scores from employee reviews
//!
//! Cadence and genre formulas sit behind traits so alternative scoring
//! strategies can be swapped in without touching the pipeline.

mod cadence;
mod genre;
mod review;
mod studio;

pub use cadence::{CadenceScorer, IntegralCadenceScorer};
pub use genre::{genre_codes_with_fallback, GenreBucket, GenreScorer, WeightedGenreScorer};
pub use review::{ReviewSummary, CONS_KEYWORDS};
pub use studio::{StudioInput, StudioScorer};
