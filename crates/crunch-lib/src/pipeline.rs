//! Batch orchestration: scoring studios, saving training data, training and
//! applying models
//!
//! Studios are scored one at a time in input order. A failure while scoring
//! one studio is logged, counted and the studio is left out; the batch
//! carries on. Training and evaluation failures abort the operation.

use crate::config::ScorerConfig;
use crate::error::ScorerError;
use crate::models::{StudioRecord, TrainingRecord};
use crate::names::alias_candidates;
use crate::observability::{ScorerMetrics, StructuredLogger};
use crate::regression::{
    compute_loss, compute_vif, cross_validate, CrossValidationReport, EvaluationReport, Evaluator,
    LogisticTrainer, Prediction, TrainedModel, VifReport,
};
use crate::scoring::{genre_codes_with_fallback, StudioInput, StudioScorer};
use crate::sources::{EmployeeSource, GameCatalog, ReviewSource, StudioDirectory};
use crate::store::{CacheRecord, LocalCache, MergeStats, ModelArtifact, ModelStore, TrainingSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Separator between studio names on a set line
const SET_SEPARATOR: &str = ", ";

/// The four collaborators a pipeline pulls raw facts from
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub directory: &'a dyn StudioDirectory,
    pub employees: &'a dyn EmployeeSource,
    pub games: &'a dyn GameCatalog,
    pub reviews: &'a dyn ReviewSource,
}

impl<'a> Sources<'a> {
    /// Use one value for every collaborator
    pub fn uniform<S>(source: &'a S) -> Self
    where
        S: StudioDirectory + EmployeeSource + GameCatalog + ReviewSource,
    {
        Self {
            directory: source,
            employees: source,
            games: source,
            reviews: source,
        }
    }
}

/// A studio to score, optionally with its known crunch label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioTarget {
    pub name: String,
    pub label: Option<bool>,
}

impl StudioTarget {
    pub fn unlabeled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }
}

/// Two lines of studio names: known crunch studios, then known non-crunch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudioSet {
    pub name: String,
    pub crunch: Vec<String>,
    pub non_crunch: Vec<String>,
}

impl StudioSet {
    pub fn parse(name: &str, text: &str) -> Self {
        let mut lines = text.lines();
        let split = |line: Option<&str>| -> Vec<String> {
            line.map(|l| {
                l.split(SET_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
        };
        let crunch = split(lines.next());
        let non_crunch = split(lines.next());
        Self {
            name: name.to_string(),
            crunch,
            non_crunch,
        }
    }

    pub fn load(config: &ScorerConfig, name: &str) -> Result<Self> {
        let path = config.set_path(name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read studio set {:?}", path))?;
        let set = Self::parse(name, &text);
        if set.crunch.is_empty() && set.non_crunch.is_empty() {
            anyhow::bail!("Studio set {:?} names no studios", path);
        }
        Ok(set)
    }

    /// Crunch studios first, labeled
    pub fn targets(&self) -> Vec<StudioTarget> {
        self.crunch
            .iter()
            .map(|n| StudioTarget {
                name: n.clone(),
                label: Some(true),
            })
            .chain(self.non_crunch.iter().map(|n| StudioTarget {
                name: n.clone(),
                label: Some(false),
            }))
            .collect()
    }
}

/// One successfully scored studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredStudio {
    pub record: StudioRecord,
    pub label: Option<bool>,
    pub cached: bool,
}

/// A studio left out of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of scoring a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub scored: Vec<ScoredStudio>,
    pub failures: Vec<StudioFailure>,
}

impl BatchReport {
    /// Labeled studios as training records keyed by name
    pub fn training_records(&self) -> Vec<TrainingRecord> {
        self.scored
            .iter()
            .filter_map(|s| {
                s.label
                    .map(|label| TrainingRecord::new(s.record.name.clone(), s.record.features().0, label))
            })
            .collect()
    }
}

/// A model applied to one studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioPrediction {
    pub studio: String,
    pub prediction: Prediction,
}

/// Result of training and saving a model
#[derive(Debug, Clone, Serialize)]
pub struct LearnOutcome {
    pub model_name: String,
    pub trained: TrainedModel,
    pub odds_ratios: Vec<f64>,
    pub rmse_loss: f64,
    pub r2_loss: f64,
    pub vif: Option<VifReport>,
}

/// Runs scoring and model operations against a set of sources
pub struct Pipeline<'a> {
    config: ScorerConfig,
    scorer: StudioScorer,
    sources: Sources<'a>,
    metrics: ScorerMetrics,
    logger: StructuredLogger,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: ScorerConfig, sources: Sources<'a>) -> Self {
        Self {
            scorer: StudioScorer::new(&config),
            config,
            sources,
            metrics: ScorerMetrics::new(),
            logger: StructuredLogger::new("crunch"),
        }
    }

    /// Replace the scorer, e.g. to swap scoring strategies
    pub fn with_scorer(mut self, scorer: StudioScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Score every target, using and refreshing the local cache
    pub fn score_batch(&self, targets: &[StudioTarget]) -> Result<BatchReport> {
        let mut cache = LocalCache::open(self.config.cache_path())?;
        self.metrics.add_malformed_records(cache.skipped());

        let mut report = BatchReport::default();
        for target in targets {
            let started = Instant::now();
            match self.score_studio(&target.name, &mut cache) {
                Ok((record, cached)) => {
                    self.metrics.inc_studios_scored();
                    self.metrics
                        .observe_scoring_latency(started.elapsed().as_secs_f64());
                    self.logger.log_studio_scored(
                        &record.name,
                        record.scores.crunch,
                        record.scores.genre,
                        record.scores.review,
                        cached,
                    );
                    report.scored.push(ScoredStudio {
                        record,
                        label: target.label,
                        cached,
                    });
                }
                Err(e) => {
                    self.metrics.inc_studio_failures();
                    self.logger.log_studio_failed(&target.name, &format!("{:#}", e));
                    report.failures.push(StudioFailure {
                        name: target.name.clone(),
                        error: format!("{:#}", e),
                    });
                }
            }
        }

        cache.save()?;

        if self.config.scoring.sort_by_crunch {
            report
                .scored
                .sort_by(|a, b| b.record.scores.crunch.total_cmp(&a.record.scores.crunch));
        }

        info!(
            scored = report.scored.len(),
            failed = report.failures.len(),
            "Scored studio batch"
        );
        Ok(report)
    }

    /// Score one studio; the flag is `true` when the cache supplied the
    /// expensive scores
    pub fn score_studio(&self, name: &str, cache: &mut LocalCache) -> Result<(StudioRecord, bool)> {
        let aliases = alias_candidates(name);

        if !self.config.bypasses_cache(name) {
            if let Some(cached) = aliases.iter().find_map(|a| cache.lookup(a)) {
                debug!(studio = %name, id = %cached.id, "Cache hit");
                self.metrics.inc_cache_hits();
                let mut record = self.scorer.from_cached(cached, aliases.clone())?;
                record.name = name.to_string();
                return Ok((record, true));
            }
        }

        let input = self.gather(name, aliases)?;
        let record = self
            .scorer
            .score(input)
            .with_context(|| format!("Failed to score {}", name))?;
        cache.upsert(CacheRecord::from_studio(&record, name));
        Ok((record, false))
    }

    /// Pull raw facts for a studio from the sources
    fn gather(&self, name: &str, aliases: Vec<String>) -> Result<StudioInput> {
        let mut facts = None;
        for candidate in &aliases {
            if let Some(found) = self.sources.directory.find_studio(candidate)? {
                facts = Some(found);
                break;
            }
        }
        let facts = facts.ok_or_else(|| ScorerError::StudioNotFound {
            name: name.to_string(),
            tried: aliases.len(),
        })?;

        let mut employee_count = None;
        for candidate in std::iter::once(&facts.name).chain(&aliases) {
            if let Some(count) = self.sources.employees.employee_count(candidate)? {
                employee_count = Some(count);
                break;
            }
        }

        let (matched, games) = genre_codes_with_fallback(self.sources.games, &facts.name, &aliases)?;
        // Reviews are slow to fetch; one request per studio
        let reviews = self.sources.reviews.reviews(&matched)?;

        Ok(StudioInput {
            id: facts.id,
            name: name.to_string(),
            aliases,
            employee_count,
            release_years: facts.release_years,
            games,
            reviews,
        })
    }

    /// Merge the labeled studios of a report into a training file
    pub fn save_training(&self, report: &BatchReport, data_file: &str) -> Result<MergeStats> {
        let records = report.training_records();
        if records.is_empty() {
            anyhow::bail!("No labeled studios were scored; nothing to save");
        }
        TrainingSet::merge_save(&self.config.training_path(data_file), &records)
    }

    pub fn load_training(&self, data_file: &str) -> Result<TrainingSet> {
        let set = TrainingSet::load(&self.config.training_path(data_file))?;
        self.metrics.add_malformed_records(set.skipped);
        Ok(set)
    }

    /// Train on a training file and save the model as the next `Model-N`
    pub fn learn(&self, data_file: &str) -> Result<LearnOutcome> {
        let set = self.load_training(data_file)?;
        let trainer = LogisticTrainer::new(self.config.trainer.clone());
        let trained = trainer
            .learn(&set.records)
            .with_context(|| format!("Failed to train on {}", data_file))?;
        self.metrics.set_training_iterations(trained.iterations);

        let loss = compute_loss(&trained.model, &set.records)?;
        let vif = self.multicollinearity(&set.records);

        let artifact = ModelArtifact::new(trained.model.clone()).with_loss(loss.rmse, loss.r2);
        let store = ModelStore::new(self.config.model_dir());
        let model_name = store.save_new(&artifact)?;

        self.logger
            .log_model_trained(&model_name, trained.records, trained.iterations, trained.deviance);

        Ok(LearnOutcome {
            model_name,
            odds_ratios: trained.model.odds_ratios(),
            trained,
            rmse_loss: loss.rmse,
            r2_loss: loss.r2,
            vif,
        })
    }

    /// VIF over the training features; skipped when there are too few rows
    fn multicollinearity(&self, records: &[TrainingRecord]) -> Option<VifReport> {
        let width = records.first()?.features.len();
        let columns: Vec<Vec<f64>> = (0..width)
            .map(|j| records.iter().map(|r| r.features[j]).collect())
            .collect();

        match compute_vif(&columns, self.config.evaluation.vif_threshold) {
            Ok(report) => {
                for (column, vif) in report.flagged() {
                    self.logger.log_multicollinearity(column, vif);
                }
                Some(report)
            }
            Err(e) => {
                debug!(error = %e, "Skipping multicollinearity check");
                None
            }
        }
    }

    pub fn load_model(&self, model_name: &str) -> Result<ModelArtifact> {
        ModelStore::new(self.config.model_dir()).load(model_name)
    }

    /// Apply a stored model to every scored studio
    pub fn predict(&self, report: &BatchReport, model_name: &str) -> Result<Vec<StudioPrediction>> {
        let artifact = self.load_model(model_name)?;
        let evaluator = Evaluator::new(&self.config.evaluation);

        report
            .scored
            .iter()
            .map(|s| -> Result<StudioPrediction> {
                let prediction = evaluator
                    .predict(&artifact.model, s.record.features().as_slice())
                    .with_context(|| format!("Failed to apply {} to {}", model_name, s.record.name))?;
                Ok(StudioPrediction {
                    studio: s.record.name.clone(),
                    prediction,
                })
            })
            .collect()
    }

    /// Evaluate a stored model against labeled records
    pub fn evaluate(&self, model_name: &str, records: &[TrainingRecord]) -> Result<EvaluationReport> {
        let artifact = self.load_model(model_name)?;
        let (positives, negatives): (Vec<_>, Vec<_>) = records.iter().partition(|r| r.label);
        let positives: Vec<Vec<f64>> = positives.into_iter().map(|r| r.features.clone()).collect();
        let negatives: Vec<Vec<f64>> = negatives.into_iter().map(|r| r.features.clone()).collect();

        let report = Evaluator::new(&self.config.evaluation)
            .evaluate(&artifact.model, &positives, &negatives)
            .with_context(|| format!("Failed to evaluate {}", model_name))?;
        self.logger
            .log_model_evaluated(model_name, report.accuracy, report.false_positive_rate);
        Ok(report)
    }

    /// K-fold cross validation over a training file
    pub fn cross_validate(&self, data_file: &str) -> Result<CrossValidationReport> {
        let set = self.load_training(data_file)?;
        let report = cross_validate(
            &LogisticTrainer::new(self.config.trainer.clone()),
            &Evaluator::new(&self.config.evaluation),
            &set.records,
            self.config.evaluation.folds,
        )?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Review;
    use crate::sources::{CatalogEntry, JsonCatalog};
    use std::cell::Cell;
    use tempfile::TempDir;

    fn entry(id: &str, name: &str, years: Vec<i32>, genre: u32, rating: f64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            name: name.to_string(),
            aliases: vec![],
            employee_count: Some(1000),
            release_years: years,
            games: vec![vec![genre]],
            reviews: vec![Review {
                rating,
                cons: "crunch".to_string(),
            }],
        }
    }

    fn catalog() -> JsonCatalog {
        JsonCatalog::new(vec![
            entry("1", "Fast Studio", vec![1999, 2000, 2001, 2002, 2003], 5, 2.0),
            entry("2", "Slow", vec![1999, 2010], 13, 4.5),
        ])
    }

    fn config(dir: &TempDir) -> ScorerConfig {
        let mut config = ScorerConfig::default();
        config.data_dir = dir.path().to_path_buf();
        config.trainer.shuffle_seed = Some(5);
        config
    }

    /// Counts review fetches
    struct CountingReviews(Cell<usize>);

    impl ReviewSource for CountingReviews {
        fn reviews(&self, _name: &str) -> Result<Vec<Review>> {
            self.0.set(self.0.get() + 1);
            Ok(vec![Review {
                rating: 3.0,
                cons: String::new(),
            }])
        }
    }

    #[test]
    fn test_batch_isolates_failures_and_sorts() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let pipeline = Pipeline::new(config(&dir), Sources::uniform(&catalog));

        let targets = vec![
            StudioTarget::unlabeled("Slow"),
            StudioTarget::unlabeled("Missing"),
            StudioTarget::unlabeled("Fast"),
        ];
        let report = pipeline.score_batch(&targets).unwrap();

        // "Fast" resolves through the "Fast Studio" alias
        let names: Vec<&str> = report.scored.iter().map(|s| s.record.name.as_str()).collect();
        assert_eq!(names, vec!["Fast", "Slow"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "Missing");
        assert!(report.scored[0].record.scores.crunch > report.scored[1].record.scores.crunch);
    }

    #[test]
    fn test_input_order_kept_when_not_sorting() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let mut config = config(&dir);
        config.scoring.sort_by_crunch = false;
        let pipeline = Pipeline::new(config, Sources::uniform(&catalog));

        let report = pipeline
            .score_batch(&[StudioTarget::unlabeled("Slow"), StudioTarget::unlabeled("Fast Studio")])
            .unwrap();
        assert_eq!(report.scored[0].record.name, "Slow");
    }

    #[test]
    fn test_second_run_uses_cache() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let reviews = CountingReviews(Cell::new(0));
        let sources = Sources {
            reviews: &reviews,
            ..Sources::uniform(&catalog)
        };
        let targets = vec![StudioTarget::unlabeled("Slow")];

        let pipeline = Pipeline::new(config(&dir), sources);
        let first = pipeline.score_batch(&targets).unwrap();
        let second = pipeline.score_batch(&targets).unwrap();

        assert_eq!(reviews.0.get(), 1);
        assert!(!first.scored[0].cached);
        assert!(second.scored[0].cached);
        assert_eq!(first.scored[0].record.scores, second.scored[0].record.scores);
    }

    #[test]
    fn test_debug_studio_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let reviews = CountingReviews(Cell::new(0));
        let sources = Sources {
            reviews: &reviews,
            ..Sources::uniform(&catalog)
        };
        let mut config = config(&dir);
        config.debug_studios = vec!["slow".to_string()];

        let pipeline = Pipeline::new(config, sources);
        let targets = vec![StudioTarget::unlabeled("Slow")];
        pipeline.score_batch(&targets).unwrap();
        let second = pipeline.score_batch(&targets).unwrap();

        assert_eq!(reviews.0.get(), 2);
        assert!(!second.scored[0].cached);
    }

    #[test]
    fn test_studio_set_parsing() {
        let set = StudioSet::parse("demo", "A, B Studios, C\nD, E\n");
        assert_eq!(set.crunch, vec!["A", "B Studios", "C"]);
        assert_eq!(set.non_crunch, vec!["D", "E"]);
        let targets = set.targets();
        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0].label, Some(true));
        assert_eq!(targets[4].label, Some(false));

        let only_crunch = StudioSet::parse("solo", "A");
        assert!(only_crunch.non_crunch.is_empty());
    }

    #[test]
    fn test_save_learn_predict_evaluate() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let catalog = JsonCatalog::default();
        let pipeline = Pipeline::new(config.clone(), Sources::uniform(&catalog));

        std::fs::create_dir_all(config.training_dir()).unwrap();
        std::fs::write(
            config.training_path("data"),
            "n1:0.1&0.2&0.3:0\nn2:0.2&0.1&0.25:0\np1:0.8&0.9&0.7:1\np2:0.9&0.8&0.75:1\n",
        )
        .unwrap();

        let outcome = pipeline.learn("data").unwrap();
        assert_eq!(outcome.model_name, "Model-1");
        assert_eq!(outcome.odds_ratios.len(), 4);
        assert!(config.model_dir().join("Model-1.txt").exists());

        let records = pipeline.load_training("data").unwrap().records;
        let evaluation = pipeline.evaluate("Model-1", &records).unwrap();
        assert_eq!(evaluation.accuracy, 1.0);

        let report = BatchReport {
            scored: vec![ScoredStudio {
                record: StudioRecord {
                    id: "9".to_string(),
                    name: "Probe".to_string(),
                    aliases: vec![],
                    employee_count: 100,
                    release_years: vec![],
                    scores: crate::models::StudioScores {
                        crunch: 0.85,
                        genre: 0.85,
                        review: 0.7,
                        cons: 0.0,
                    },
                },
                label: None,
                cached: false,
            }],
            failures: vec![],
        };
        let predictions = pipeline.predict(&report, "Model-1").unwrap();
        assert!(predictions[0].prediction.crunches);
    }

    #[test]
    fn test_missing_model_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let catalog = JsonCatalog::default();
        let pipeline = Pipeline::new(config(&dir), Sources::uniform(&catalog));
        let err = pipeline.predict(&BatchReport::default(), "Model-404").unwrap_err();
        let scorer_err = err.downcast_ref::<ScorerError>().unwrap();
        assert!(scorer_err.is_recoverable());
    }

    #[test]
    fn test_training_records_only_from_labeled() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog();
        let pipeline = Pipeline::new(config(&dir), Sources::uniform(&catalog));
        let targets = vec![
            StudioTarget {
                name: "Fast Studio".to_string(),
                label: Some(true),
            },
            StudioTarget::unlabeled("Slow"),
        ];
        let report = pipeline.score_batch(&targets).unwrap();
        let stats = pipeline.save_training(&report, "data").unwrap();
        assert_eq!(stats.added, 1);

        let saved = pipeline.load_training("data").unwrap();
        assert_eq!(saved.records[0].key, "Fast Studio");
        assert_eq!(saved.records[0].features.len(), 3);
    }
}
