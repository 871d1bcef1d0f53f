//! Local cache of expensive per-studio scores
//!
//! Line layout: `id,alias,employeeCount,{y|y|...},genreScore,reviewScore,consScore`.
//! The cadence score is cheap and always recomputed, so it is not stored.

use super::codec::{
    escape_field, frame_array, lines_preserving_malformed, parse_array, read_records,
    write_lines_atomic, LineRecord,
};
use crate::error::{Result, ScorerError};
use crate::models::StudioRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FIELD_COUNT: usize = 7;

/// One cached studio
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub id: String,
    /// Name the studio was looked up under
    pub alias: String,
    pub employee_count: u32,
    pub release_years: Vec<i32>,
    pub genre_score: f64,
    pub review_score: f64,
    pub cons_score: f64,
}

impl CacheRecord {
    pub fn from_studio(record: &StudioRecord, alias: &str) -> Self {
        Self {
            id: escape_field(&record.id),
            alias: escape_field(alias),
            employee_count: record.employee_count,
            release_years: record.release_years.clone(),
            genre_score: record.scores.genre,
            review_score: record.scores.review,
            cons_score: record.scores.cons,
        }
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str, line: usize) -> Result<T> {
    value.trim().parse().map_err(|_| ScorerError::MalformedRecord {
        line,
        reason: format!("unparsable {} {:?}", name, value),
    })
}

impl LineRecord for CacheRecord {
    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            escape_field(&self.id),
            escape_field(&self.alias),
            self.employee_count,
            frame_array(&self.release_years),
            self.genre_score,
            self.review_score,
            self.cons_score
        )
    }

    fn from_line(text: &str, line: usize) -> Result<Self> {
        let fields: Vec<&str> = text.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ScorerError::MalformedRecord {
                line,
                reason: format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
            });
        }
        if fields[0].trim().is_empty() {
            return Err(ScorerError::MalformedRecord {
                line,
                reason: "empty studio id".to_string(),
            });
        }

        Ok(Self {
            id: fields[0].trim().to_string(),
            alias: fields[1].trim().to_string(),
            employee_count: parse_field(fields[2], "employee count", line)?,
            release_years: parse_array(fields[3], line)?,
            genre_score: parse_field(fields[4], "genre score", line)?,
            review_score: parse_field(fields[5], "review score", line)?,
            cons_score: parse_field(fields[6], "cons score", line)?,
        })
    }
}

/// Cache file loaded into memory
#[derive(Debug)]
pub struct LocalCache {
    path: PathBuf,
    records: Vec<CacheRecord>,
    malformed: Vec<String>,
    dirty: bool,
}

impl LocalCache {
    /// Load the cache; a missing file gives an empty cache
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let loaded = read_records::<CacheRecord>(&path)?;
        info!(
            path = %path.display(),
            entries = loaded.records.len(),
            skipped = loaded.skipped(),
            "Loaded studio cache"
        );
        Ok(Self {
            path,
            records: loaded.records,
            malformed: loaded.malformed,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached entry for a lookup name
    pub fn lookup(&self, name: &str) -> Option<&CacheRecord> {
        let key = escape_field(name);
        self.records.iter().find(|r| r.alias == key)
    }

    /// Insert or replace the entry with the same id
    pub fn upsert(&mut self, record: CacheRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.dirty = true;
    }

    pub fn records(&self) -> &[CacheRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Malformed lines skipped while loading; they are written back on save
    pub fn skipped(&self) -> usize {
        self.malformed.len()
    }

    /// Rewrite the cache file if anything changed
    pub fn save(&mut self) -> anyhow::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        write_lines_atomic(
            &self.path,
            lines_preserving_malformed(&self.path, &self.records, &self.malformed),
        )?;
        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.records.len(), "Cache flushed to disk");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudioScores;
    use tempfile::TempDir;

    fn record(id: &str, alias: &str) -> CacheRecord {
        CacheRecord {
            id: id.to_string(),
            alias: alias.to_string(),
            employee_count: 250,
            release_years: vec![2001, 2004],
            genre_score: 0.4,
            review_score: 0.72,
            cons_score: 0.25,
        }
    }

    #[test]
    fn test_line_layout() {
        let line = record("3010-1", "Bioware").to_line();
        assert_eq!(line, "3010-1,Bioware,250,{2001|2004},0.4,0.72,0.25");
        assert_eq!(CacheRecord::from_line(&line, 1).unwrap(), record("3010-1", "Bioware"));
    }

    #[test]
    fn test_commas_in_names_are_escaped() {
        let studio = StudioRecord {
            id: "7".to_string(),
            name: "Foo, Inc.".to_string(),
            aliases: vec![],
            employee_count: 10,
            release_years: vec![],
            scores: StudioScores {
                crunch: 0.0,
                genre: 0.1,
                review: 0.2,
                cons: 0.3,
            },
        };
        let cached = CacheRecord::from_studio(&studio, "Foo, Inc.");
        assert_eq!(cached.alias, "Foo- Inc.");
        assert_eq!(cached.to_line().split(',').count(), FIELD_COUNT);
    }

    #[test]
    fn test_malformed_lines() {
        assert!(CacheRecord::from_line("1,a,2,{2001},0.1,0.2", 1).is_err());
        assert!(CacheRecord::from_line("1,a,many,{2001},0.1,0.2,0.3", 1).is_err());
        assert!(CacheRecord::from_line("1,a,2,2001,0.1,0.2,0.3", 1).is_err());
        assert!(CacheRecord::from_line(",a,2,{2001},0.1,0.2,0.3", 1).is_err());
    }

    #[test]
    fn test_malformed_line_skipped_next_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.csv");
        std::fs::write(
            &path,
            "1,Broken,12,{2001},0.1,0.2\n2,Good Studio,40,{2001|2002},0.4,0.6,0.5\n",
        )
        .unwrap();

        let cache = LocalCache::open(&path).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.skipped(), 1);
        let good = cache.lookup("Good Studio").unwrap();
        assert_eq!(good.id, "2");
        assert_eq!(good.release_years, vec![2001, 2002]);
        assert!(cache.lookup("Broken").is_none());
    }

    #[test]
    fn test_save_keeps_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.csv");
        std::fs::write(&path, "1,Broken,12,{2001},0.1,0.2\n").unwrap();

        let mut cache = LocalCache::open(&path).unwrap();
        cache.upsert(record("2", "Fresh"));
        cache.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("1,Broken,12,{2001},0.1,0.2"));
        let reloaded = LocalCache::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.skipped(), 1);
        assert!(reloaded.lookup("Fresh").is_some());
    }

    #[test]
    fn test_upsert_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.csv");

        let mut cache = LocalCache::open(&path).unwrap();
        assert!(cache.is_empty());
        cache.upsert(record("1", "First"));
        cache.upsert(record("2", "Second"));
        let mut updated = record("1", "First");
        updated.genre_score = 0.9;
        cache.upsert(updated);
        cache.save().unwrap();

        // Files stay headerless so every line is a record
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("1,First,250,"));

        let reloaded = LocalCache::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.lookup("First").unwrap().genre_score, 0.9);
        assert_eq!(reloaded.lookup("Second").unwrap().id, "2");
    }

    #[test]
    fn test_lookup_escapes_query() {
        let mut cache = LocalCache::open(TempDir::new().unwrap().path().join("c.csv")).unwrap();
        cache.upsert(record("9", "Foo- Inc."));
        assert!(cache.lookup("Foo, Inc.").is_some());
    }
}
