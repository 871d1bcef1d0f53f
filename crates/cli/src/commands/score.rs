//! Studio scoring commands: print, save and predict

use anyhow::Result;
use colored::Colorize;
use crunch_lib::pipeline::BatchReport;
use crunch_lib::{Pipeline, StudioSet, StudioTarget};
use tabled::Tabled;

use crate::output::{
    color_confidence, color_score, format_label, format_score, print_json, print_rows,
    print_success, print_warning, OutputFormat,
};

/// Row for the studio score table
#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Studio")]
    studio: String,
    #[tabled(rename = "Crunch")]
    crunch: String,
    #[tabled(rename = "Genre")]
    genre: String,
    #[tabled(rename = "Review")]
    review: String,
    #[tabled(rename = "Cons")]
    cons: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Cached")]
    cached: String,
}

/// Row for the prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Studio")]
    studio: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Crunch")]
    crunch: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

fn score_rows(report: &BatchReport) -> Vec<ScoreRow> {
    report
        .scored
        .iter()
        .map(|s| ScoreRow {
            studio: s.record.name.clone(),
            crunch: color_score(s.record.scores.crunch),
            genre: format_score(s.record.scores.genre),
            review: format_score(s.record.scores.review),
            cons: format_score(s.record.scores.cons),
            label: format_label(s.label),
            cached: if s.cached { "yes" } else { "no" }.to_string(),
        })
        .collect()
}

fn report_failures(report: &BatchReport, format: OutputFormat) {
    if matches!(format, OutputFormat::Json) {
        return;
    }
    for failure in &report.failures {
        print_warning(&format!("{} skipped: {}", failure.name, failure.error));
    }
}

/// Score studios and print them ranked by crunch score
pub fn print_scores(pipeline: &Pipeline<'_>, targets: &[StudioTarget], format: OutputFormat) -> Result<()> {
    let report = pipeline.score_batch(targets)?;
    print_rows(&score_rows(&report), &report, format);
    report_failures(&report, format);
    Ok(())
}

/// Score a labeled studio set and merge it into a training file
pub fn save_training(
    pipeline: &Pipeline<'_>,
    set: &StudioSet,
    data_file: &str,
    format: OutputFormat,
) -> Result<()> {
    let report = pipeline.score_batch(&set.targets())?;
    let stats = pipeline.save_training(&report, data_file)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "data_file": data_file,
            "added": stats.added,
            "kept_existing": stats.kept_existing,
            "total": stats.total,
            "failures": report.failures,
        })),
        OutputFormat::Table => {
            report_failures(&report, format);
            print_success(&format!(
                "Saved {} new studios to {} ({} already present, {} total)",
                stats.added,
                data_file.cyan(),
                stats.kept_existing,
                stats.total
            ));
        }
    }
    Ok(())
}

/// Score studios and apply a stored model
pub fn predict(
    pipeline: &Pipeline<'_>,
    targets: &[StudioTarget],
    model: &str,
    format: OutputFormat,
) -> Result<()> {
    let report = pipeline.score_batch(targets)?;
    let predictions = pipeline.predict(&report, model)?;

    let rows: Vec<PredictionRow> = predictions
        .iter()
        .map(|p| PredictionRow {
            studio: p.studio.clone(),
            probability: color_score(p.prediction.probability),
            crunch: if p.prediction.crunches { "yes".red().to_string() } else { "no".green().to_string() },
            confidence: color_confidence(p.prediction.confidence),
        })
        .collect();

    print_rows(&rows, &predictions, format);
    report_failures(&report, format);
    Ok(())
}
