//! Reviews fetched by an external scraper process
//!
//! The scraper receives the studio name as its last argument and prints one
//! JSON review (`{"rating": 4, "cons": "..."}`) per line on stdout.

use super::ReviewSource;
use crate::models::Review;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProcessReviewSource {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessReviewSource {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the studio name
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Parse scraper output, skipping lines that are not reviews
pub(crate) fn parse_review_lines(output: &str) -> Vec<Review> {
    let mut reviews = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Review>(line) {
            Ok(review) => reviews.push(review),
            Err(e) => warn!(error = %e, "Ignoring unparsable scraper line"),
        }
    }
    reviews
}

impl ReviewSource for ProcessReviewSource {
    fn reviews(&self, name: &str) -> Result<Vec<Review>> {
        debug!(program = %self.program.display(), studio = %name, "Running review scraper");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(name)
            .output()
            .with_context(|| format!("Failed to run review scraper {:?}", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "Review scraper exited with {} for {}: {}",
                output.status,
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let reviews = parse_review_lines(&String::from_utf8_lossy(&output.stdout));
        debug!(studio = %name, reviews = reviews.len(), "Scraper finished");
        Ok(reviews)
    }
}
