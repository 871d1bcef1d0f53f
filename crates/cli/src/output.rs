//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use crunch_lib::regression::ConfidenceLabel;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table, or `value` as JSON
pub fn print_rows<T: Tabled, S: Serialize + ?Sized>(rows: &[T], value: &S, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No results".yellow());
                return;
            }
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(value),
    }
}

pub fn print_json<S: Serialize + ?Sized>(value: &S) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize output: {}", e)),
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Scores and rates with three decimals
pub fn format_score(score: f64) -> String {
    format!("{:.3}", score)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Color a crunch score: red is likely crunch
pub fn color_score(score: f64) -> String {
    let formatted = format_score(score);
    if score >= 0.66 {
        formatted.red().to_string()
    } else if score >= 0.33 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

pub fn color_confidence(label: ConfidenceLabel) -> String {
    match label {
        ConfidenceLabel::High => label.to_string().green().to_string(),
        ConfidenceLabel::Low => label.to_string().yellow().to_string(),
    }
}

pub fn format_label(label: Option<bool>) -> String {
    match label {
        Some(true) => "crunch".to_string(),
        Some(false) => "no crunch".to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.12345), "0.123");
        assert_eq!(format_percent(0.25), "25.0%");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(Some(true)), "crunch");
        assert_eq!(format_label(Some(false)), "no crunch");
        assert_eq!(format_label(None), "-");
    }
}
