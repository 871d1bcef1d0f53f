//! Offline catalog backed by a JSON file

use super::{EmployeeSource, GameCatalog, ReviewSource, StudioDirectory};
use crate::models::{Review, StudioFacts};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One studio in the catalog file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub employee_count: Option<u32>,
    #[serde(default)]
    pub release_years: Vec<i32>,
    /// Genre codes of each game
    #[serde(default)]
    pub games: Vec<Vec<u32>>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    studios: Vec<CatalogEntry>,
}

/// Studio catalog serving every collaborator trait from one JSON document
///
/// Names match case-insensitively against each entry's name and aliases.
#[derive(Debug, Clone, Default)]
pub struct JsonCatalog {
    studios: Vec<CatalogEntry>,
}

impl JsonCatalog {
    pub fn new(studios: Vec<CatalogEntry>) -> Self {
        Self { studios }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(json).context("Failed to parse studio catalog")?;
        Ok(Self::new(file.studios))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read studio catalog {:?}", path))?;
        let catalog = Self::from_json(&json)
            .with_context(|| format!("Invalid studio catalog {:?}", path))?;
        info!(path = %path.display(), studios = catalog.len(), "Loaded studio catalog");
        Ok(catalog)
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.studios.iter().find(|s| {
            s.name.eq_ignore_ascii_case(name) || s.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }

    pub fn len(&self) -> usize {
        self.studios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.studios.is_empty()
    }
}

impl StudioDirectory for JsonCatalog {
    fn find_studio(&self, name: &str) -> Result<Option<StudioFacts>> {
        Ok(self.entry(name).map(|e| StudioFacts {
            id: e.id.clone(),
            name: e.name.clone(),
            release_years: e.release_years.clone(),
        }))
    }
}

impl EmployeeSource for JsonCatalog {
    fn employee_count(&self, name: &str) -> Result<Option<u32>> {
        Ok(self.entry(name).and_then(|e| e.employee_count))
    }
}

impl GameCatalog for JsonCatalog {
    fn genre_codes(&self, name: &str) -> Result<Vec<Vec<u32>>> {
        Ok(self.entry(name).map(|e| e.games.clone()).unwrap_or_default())
    }
}

impl ReviewSource for JsonCatalog {
    fn reviews(&self, name: &str) -> Result<Vec<Review>> {
        Ok(self.entry(name).map(|e| e.reviews.clone()).unwrap_or_default())
    }
}
