//! Labeled training records
//!
//! Line layout: `key:f1&f2&...&fn:label`. The key may itself contain `:`,
//! so the last two separators delimit the features and the label.

use super::codec::{
    escape_field, lines_preserving_malformed, read_records, write_lines_atomic, LineRecord,
    LoadedRecords,
};
use crate::error::{Result, ScorerError};
use crate::models::TrainingRecord;
use anyhow::Context;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

impl LineRecord for TrainingRecord {
    fn to_line(&self) -> String {
        let features: Vec<String> = self.features.iter().map(|f| f.to_string()).collect();
        format!(
            "{}:{}:{}",
            escape_field(&self.key),
            features.join("&"),
            if self.label { 1 } else { 0 }
        )
    }

    fn from_line(text: &str, line: usize) -> Result<Self> {
        let malformed = |reason: String| ScorerError::MalformedRecord { line, reason };

        let mut parts = text.trim().rsplitn(3, ':');
        let label = parts.next().unwrap_or_default();
        let features = parts
            .next()
            .ok_or_else(|| malformed("missing feature field".to_string()))?;
        let key = parts
            .next()
            .ok_or_else(|| malformed("missing key field".to_string()))?;

        let label = match label.trim() {
            "1" => true,
            "0" => false,
            other => return Err(malformed(format!("label must be 0 or 1, got {:?}", other))),
        };
        if features.trim().is_empty() {
            return Err(malformed("no features".to_string()));
        }
        let features = features
            .split('&')
            .map(|f| {
                f.trim()
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("unparsable feature {:?}", f)))
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(TrainingRecord::new(key, features, label))
    }
}

/// Outcome of merging new records into a training file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    /// New records whose key was already present
    pub kept_existing: usize,
    pub total: usize,
}

/// A loaded training file
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub records: Vec<TrainingRecord>,
    pub skipped: usize,
}

impl TrainingSet {
    /// Load a training file; unlike the cache, the file must exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Training data file {:?} does not exist", path);
        }
        let loaded = read_records::<TrainingRecord>(path)
            .with_context(|| format!("Failed to load training data from {:?}", path))?;
        info!(
            path = %path.display(),
            records = loaded.records.len(),
            skipped = loaded.skipped(),
            "Loaded training data"
        );
        let skipped = loaded.skipped();
        Ok(Self {
            records: loaded.records,
            skipped,
        })
    }

    /// Merge `incoming` into the file at `path`
    ///
    /// Existing keys keep their line; new keys are appended in order.
    /// Unreadable lines already in the file are kept at the end.
    pub fn merge_save(path: &Path, incoming: &[TrainingRecord]) -> anyhow::Result<MergeStats> {
        let LoadedRecords {
            records: mut existing,
            malformed,
        } = read_records::<TrainingRecord>(path)?;
        let mut keys: HashSet<String> = existing.iter().map(|r| r.key.clone()).collect();

        let mut added = 0;
        let mut kept_existing = 0;
        for record in incoming {
            let key = escape_field(&record.key);
            if keys.insert(key.clone()) {
                existing.push(TrainingRecord::new(key, record.features.clone(), record.label));
                added += 1;
            } else {
                kept_existing += 1;
            }
        }

        write_lines_atomic(path, lines_preserving_malformed(path, &existing, &malformed))?;
        info!(path = %path.display(), added, kept_existing, total = existing.len(), "Saved training data");

        Ok(MergeStats {
            added,
            kept_existing,
            total: existing.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into (positives, negatives) feature vectors
    pub fn split_by_label(&self) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        for record in &self.records {
            if record.label {
                positives.push(record.features.clone());
            } else {
                negatives.push(record.features.clone());
            }
        }
        (positives, negatives)
    }
}
