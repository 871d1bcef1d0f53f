//! Studio Crunch Scorer CLI
//!
//! Scores game studios for crunch risk, saves labeled training data, trains
//! logistic models and applies or evaluates them.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{model, score};
use crunch_lib::sources::{JsonCatalog, ProcessReviewSource};
use crunch_lib::{Pipeline, ScorerConfig, ScorerMetrics, Sources, StudioSet, StudioTarget};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Studio Crunch Scorer
#[derive(Parser)]
#[command(name = "crunch")]
#[command(author, version, about = "Score game studios for crunch risk", long_about = None)]
pub struct Cli {
    /// Root directory holding data/, models/, sets/ and the score cache
    #[arg(long, env = "CRUNCH_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Studio catalog (JSON); defaults to <data-dir>/catalog.json
    #[arg(long, env = "CRUNCH_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// External review scraper; studio name is passed as the last argument
    #[arg(long, env = "CRUNCH_REVIEW_COMMAND", global = true)]
    pub review_command: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Ignore cached scores for every studio
    #[arg(long, global = true)]
    pub force: bool,

    /// Ignore cached scores for this studio (repeatable)
    #[arg(long = "debug", value_name = "STUDIO", global = true)]
    pub debug_studios: Vec<String>,

    /// Print Prometheus metrics after the run
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which studios to score
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Studio name (repeatable)
    #[arg(long)]
    pub studio: Vec<String>,

    /// Studio set name under <data-dir>/sets/
    #[arg(long)]
    pub set: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score studios and print the ranked scores
    Print {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Score a studio set and merge it into a training file
    Save {
        /// Studio set name under <data-dir>/sets/
        #[arg(long)]
        set: String,

        /// Training file name under <data-dir>/data/
        #[arg(long, default_value = "data")]
        data_file: String,
    },

    /// Score studios and apply a trained model
    Predict {
        #[command(flatten)]
        target: TargetArgs,

        /// Model name under <data-dir>/models/
        #[arg(long)]
        model: String,
    },

    /// Train a new model from a training file
    Learn {
        /// Training file name under <data-dir>/data/
        #[arg(long, default_value = "data")]
        data_file: String,
    },

    /// Evaluate a model against labeled studios
    Evaluate {
        /// Model name under <data-dir>/models/
        #[arg(long, required_unless_present = "cross_validate")]
        model: Option<String>,

        /// Training file name under <data-dir>/data/
        #[arg(long, default_value = "data")]
        data_file: String,

        /// Score this studio set instead of reading the training file
        #[arg(long, conflicts_with = "cross_validate")]
        set: Option<String>,

        /// Run k-fold cross validation on the training file instead
        #[arg(long)]
        cross_validate: bool,
    },
}

impl TargetArgs {
    fn resolve(&self, config: &ScorerConfig) -> Result<Vec<StudioTarget>> {
        match &self.set {
            Some(name) => Ok(StudioSet::load(config, name)?.targets()),
            None => Ok(self.studio.iter().map(StudioTarget::unlabeled).collect()),
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    config.force_refresh |= cli.force;
    config.debug_studios.extend(cli.debug_studios.iter().cloned());
    debug!(data_dir = %config.data_dir.display(), "Configuration loaded");

    let needs_catalog = matches!(
        cli.command,
        Commands::Print { .. } | Commands::Save { .. } | Commands::Predict { .. }
    ) || matches!(cli.command, Commands::Evaluate { set: Some(_), .. });

    let catalog = if needs_catalog {
        let path = cli
            .catalog
            .clone()
            .unwrap_or_else(|| config.data_dir.join("catalog.json"));
        JsonCatalog::load(&path).context("A studio catalog is required to score studios")?
    } else {
        JsonCatalog::default()
    };
    let scraper = cli.review_command.as_ref().map(|program| {
        info!(program = %program.display(), "Fetching reviews with external scraper");
        ProcessReviewSource::new(program)
    });

    let mut sources = Sources::uniform(&catalog);
    if let Some(scraper) = &scraper {
        sources.reviews = scraper;
    }

    let pipeline = Pipeline::new(config.clone(), sources);

    match &cli.command {
        Commands::Print { target } => {
            let targets = target.resolve(&config)?;
            score::print_scores(&pipeline, &targets, cli.format)?;
        }
        Commands::Save { set, data_file } => {
            let set = StudioSet::load(&config, set)?;
            score::save_training(&pipeline, &set, data_file, cli.format)?;
        }
        Commands::Predict { target, model } => {
            let targets = target.resolve(&config)?;
            score::predict(&pipeline, &targets, model, cli.format)?;
        }
        Commands::Learn { data_file } => {
            model::learn(&pipeline, data_file, cli.format)?;
        }
        Commands::Evaluate {
            model: model_name,
            data_file,
            set,
            cross_validate,
        } => {
            if *cross_validate {
                model::cross_validate(&pipeline, data_file, cli.format)?;
            } else if let Some(model_name) = model_name {
                model::evaluate(&pipeline, model_name, data_file, set.as_deref(), cli.format)?;
            }
        }
    }

    if cli.metrics {
        print!("{}", ScorerMetrics::new().render());
    }

    Ok(())
}
