//! Model artifacts
//!
//! Layout: the weights framed as `{w1|...|wn}` on line one, one odds ratio
//! per following line, then optional `rmse_loss: v` and `r2_loss: v` lines.

use super::codec::{frame_array, parse_array, write_lines_atomic};
use crate::error::{Result, ScorerError};
use crate::regression::LogisticModel;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MODEL_PREFIX: &str = "Model-";
const MODEL_EXTENSION: &str = "txt";
const RMSE_LABEL: &str = "rmse_loss";
const R2_LABEL: &str = "r2_loss";

/// A persisted model plus the loss measured when it was trained
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub model: LogisticModel,
    pub rmse_loss: Option<f64>,
    pub r2_loss: Option<f64>,
}

impl ModelArtifact {
    pub fn new(model: LogisticModel) -> Self {
        Self {
            model,
            rmse_loss: None,
            r2_loss: None,
        }
    }

    pub fn with_loss(mut self, rmse: f64, r2: f64) -> Self {
        self.rmse_loss = Some(rmse);
        self.r2_loss = Some(r2);
        self
    }

    pub fn to_text(&self) -> String {
        let mut lines = vec![frame_array(self.model.weights())];
        lines.extend(self.model.odds_ratios().iter().map(|r| r.to_string()));
        if let Some(rmse) = self.rmse_loss {
            lines.push(format!("{}: {}", RMSE_LABEL, rmse));
        }
        if let Some(r2) = self.r2_loss {
            lines.push(format!("{}: {}", R2_LABEL, r2));
        }
        lines.join("\n")
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        let (_, first) = lines.next().ok_or_else(|| ScorerError::MalformedRecord {
            line: 1,
            reason: "empty model artifact".to_string(),
        })?;
        let weights: Vec<f64> = parse_array(first, 1)?;
        if weights.is_empty() {
            return Err(ScorerError::MalformedRecord {
                line: 1,
                reason: "model has no weights".to_string(),
            });
        }

        let mut artifact = ModelArtifact::new(LogisticModel::new(weights));
        let mut odds_ratios = 0usize;
        for (index, line) in lines {
            let line_no = index + 1;
            let malformed = |reason: String| ScorerError::MalformedRecord {
                line: line_no,
                reason,
            };

            if let Some((label, value)) = line.split_once(':') {
                let value: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| malformed(format!("unparsable {} value", label.trim())))?;
                match label.trim() {
                    RMSE_LABEL => artifact.rmse_loss = Some(value),
                    R2_LABEL => artifact.r2_loss = Some(value),
                    other => return Err(malformed(format!("unknown diagnostic {:?}", other))),
                }
            } else {
                line.trim()
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("unparsable odds ratio {:?}", line)))?;
                odds_ratios += 1;
            }
        }

        let expected = artifact.model.weights().len();
        if odds_ratios != expected {
            return Err(ScorerError::MalformedRecord {
                line: 1,
                reason: format!("{} weights but {} odds ratios", expected, odds_ratios),
            });
        }
        Ok(artifact)
    }
}

/// Directory of model artifacts
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, MODEL_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Names of every stored model, sorted
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read model directory {:?}", self.dir))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MODEL_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// First unused `Model-N`, counting from 1
    pub fn next_model_name(&self) -> String {
        (1..)
            .map(|n| format!("{}{}", MODEL_PREFIX, n))
            .find(|name| !self.exists(name))
            .unwrap_or_else(|| format!("{}0", MODEL_PREFIX))
    }

    pub fn save(&self, name: &str, artifact: &ModelArtifact) -> anyhow::Result<PathBuf> {
        let path = self.path(name);
        write_lines_atomic(&path, [artifact.to_text()])?;
        info!(model = %name, path = %path.display(), "Saved model");
        Ok(path)
    }

    /// Save under the next free `Model-N` name
    pub fn save_new(&self, artifact: &ModelArtifact) -> anyhow::Result<String> {
        let name = self.next_model_name();
        self.save(&name, artifact)?;
        Ok(name)
    }

    /// Load a model; a missing artifact is [`ScorerError::ModelNotFound`]
    pub fn load(&self, name: &str) -> anyhow::Result<ModelArtifact> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(ScorerError::ModelNotFound(name.to_string()).into());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read model {:?}", path))?;
        let artifact = ModelArtifact::from_text(&text)
            .with_context(|| format!("Failed to parse model {:?}", path))?;
        debug!(model = %name, weights = artifact.model.weights().len(), "Loaded model");
        Ok(artifact)
    }
}
