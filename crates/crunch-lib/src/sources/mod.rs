//! Collaborators that supply raw studio facts
//!
//! Scoring never talks to a concrete data source; it goes through these
//! traits so lookups can be backed by a fixture file, a scraper process or
//! a test double.

mod json;
mod process;

pub use json::{CatalogEntry, JsonCatalog};
pub use process::ProcessReviewSource;

use crate::models::{Review, StudioFacts};
use anyhow::Result;

/// Resolves a studio name to its id and release history
pub trait StudioDirectory {
    /// `None` when the name is unknown
    fn find_studio(&self, name: &str) -> Result<Option<StudioFacts>>;
}

/// Looks up head counts
pub trait EmployeeSource {
    /// `None` when the size is unknown
    fn employee_count(&self, name: &str) -> Result<Option<u32>>;
}

/// Genre codes of a studio's games
pub trait GameCatalog {
    /// One entry per game; empty when the studio is unknown
    fn genre_codes(&self, name: &str) -> Result<Vec<Vec<u32>>>;
}

/// Employee reviews of a studio
pub trait ReviewSource {
    fn reviews(&self, name: &str) -> Result<Vec<Review>>;
}
