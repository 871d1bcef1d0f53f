//! Model commands: learn, evaluate and cross-validate

use anyhow::Result;
use colored::Colorize;
use crunch_lib::regression::EvaluationReport;
use crunch_lib::{Pipeline, StudioSet};
use tabled::Tabled;

use crate::output::{
    format_percent, format_score, print_info, print_json, print_rows, print_success,
    print_warning, OutputFormat,
};

/// Names of the classifier features, in weight order
const FEATURE_NAMES: [&str; 3] = ["crunch", "genre", "review"];

/// Row for the weight table
#[derive(Tabled)]
struct WeightRow {
    #[tabled(rename = "Term")]
    term: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Odds Ratio")]
    odds_ratio: String,
}

/// Row for the cross-validation table
#[derive(Tabled)]
struct FoldRow {
    #[tabled(rename = "Fold")]
    fold: usize,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "False Positive Rate")]
    false_positive_rate: String,
    #[tabled(rename = "RMSE")]
    rmse: String,
}

fn term_name(index: usize, weights: usize) -> String {
    let offset = weights.saturating_sub(FEATURE_NAMES.len());
    if index < offset {
        "intercept".to_string()
    } else {
        FEATURE_NAMES
            .get(index - offset)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("x{}", index - offset))
    }
}

/// Train a new model and save it as the next `Model-N`
pub fn learn(pipeline: &Pipeline<'_>, data_file: &str, format: OutputFormat) -> Result<()> {
    let outcome = pipeline.learn(data_file)?;

    if let OutputFormat::Json = format {
        print_json(&outcome);
        return Ok(());
    }

    let weights = outcome.trained.model.weights();
    let rows: Vec<WeightRow> = weights
        .iter()
        .zip(&outcome.odds_ratios)
        .enumerate()
        .map(|(i, (w, r))| WeightRow {
            term: term_name(i, weights.len()),
            weight: format_score(*w),
            odds_ratio: format_score(*r),
        })
        .collect();

    print_success(&format!(
        "Trained {} on {} studios in {} iterations",
        outcome.model_name.cyan(),
        outcome.trained.records,
        outcome.trained.iterations
    ));
    print_rows(&rows, &outcome, format);
    println!("rmse_loss: {}", format_score(outcome.rmse_loss));
    println!("r2_loss:   {}", format_score(outcome.r2_loss));

    if let Some(vif) = &outcome.vif {
        for (column, value) in vif.flagged() {
            print_warning(&format!(
                "{} is highly collinear with the other features (VIF {:.2})",
                term_name(column, FEATURE_NAMES.len()),
                value
            ));
        }
    }
    Ok(())
}

fn print_evaluation(model: &str, report: &EvaluationReport) {
    println!("{} {}", "Evaluation of".bold(), model.cyan().bold());
    println!("{}", "=".repeat(50));
    println!("Accuracy:                 {}", format_percent(report.accuracy));
    println!("False positive rate:      {}", format_percent(report.false_positive_rate));
    println!(
        "High-confidence accuracy: {} ({} predictions)",
        format_percent(report.high_confidence_accuracy),
        report.high_confidence_count
    );
    println!("rmse_loss:                {}", format_score(report.rmse_loss));
    println!("r2_loss:                  {}", format_score(report.r2_loss));
    println!();
    let c = &report.confusion;
    println!(
        "TP {}  FP {}  TN {}  FN {}",
        c.true_positives, c.false_positives, c.true_negatives, c.false_negatives
    );
}

/// Evaluate a stored model on a training file or a freshly scored set
pub fn evaluate(
    pipeline: &Pipeline<'_>,
    model: &str,
    data_file: &str,
    set: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let records = match set {
        Some(name) => {
            let set = StudioSet::load(pipeline.config(), name)?;
            let batch = pipeline.score_batch(&set.targets())?;
            for failure in &batch.failures {
                print_warning(&format!("{} skipped: {}", failure.name, failure.error));
            }
            batch.training_records()
        }
        None => pipeline.load_training(data_file)?.records,
    };

    let report = pipeline.evaluate(model, &records)?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => print_evaluation(model, &report),
    }
    Ok(())
}

/// K-fold cross validation over a training file
pub fn cross_validate(pipeline: &Pipeline<'_>, data_file: &str, format: OutputFormat) -> Result<()> {
    let report = pipeline.cross_validate(data_file)?;

    let rows: Vec<FoldRow> = report
        .folds
        .iter()
        .enumerate()
        .map(|(i, fold)| FoldRow {
            fold: i + 1,
            accuracy: format_percent(fold.accuracy),
            false_positive_rate: format_percent(fold.false_positive_rate),
            rmse: format_score(fold.rmse_loss),
        })
        .collect();

    print_rows(&rows, &report, format);
    if let OutputFormat::Table = format {
        print_info(&format!(
            "Mean accuracy {} over {} folds",
            format_percent(report.mean_accuracy),
            report.folds.len()
        ));
    }
    Ok(())
}
