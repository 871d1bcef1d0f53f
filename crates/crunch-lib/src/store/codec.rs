//! Shared line codec helpers
//!
//! Arrays are framed as `{a|b|c}`; an empty array is `{}`.

use crate::error::{Result, ScorerError};
use anyhow::Context;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// A record stored as one line of text
pub trait LineRecord: Sized {
    /// Encode the record without a trailing newline
    fn to_line(&self) -> String;

    /// Decode one line; `line` is 1-based and only used for error reporting
    fn from_line(text: &str, line: usize) -> Result<Self>;
}

/// Records read from a file, plus the raw lines that failed to parse
#[derive(Debug)]
pub struct LoadedRecords<R> {
    pub records: Vec<R>,
    /// Kept verbatim so a rewrite can put them back
    pub malformed: Vec<String>,
}

impl<R> LoadedRecords<R> {
    pub fn skipped(&self) -> usize {
        self.malformed.len()
    }
}

impl<R> Default for LoadedRecords<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

/// Frame values as `{a|b|c}`
pub fn frame_array<T: Display>(values: &[T]) -> String {
    let inner: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("{{{}}}", inner.join("|"))
}

/// Parse a `{a|b|c}` frame
pub fn parse_array<T: FromStr>(field: &str, line: usize) -> Result<Vec<T>> {
    let inner = field
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| ScorerError::MalformedRecord {
            line,
            reason: format!("expected {{...}} array, got {:?}", field),
        })?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split('|')
        .map(|part| {
            part.trim().parse::<T>().map_err(|_| ScorerError::MalformedRecord {
                line,
                reason: format!("unparsable array element {:?}", part),
            })
        })
        .collect()
}

/// Commas separate fields, so they never appear inside one
pub fn escape_field(value: &str) -> String {
    value.replace(',', "-")
}

/// Read every line of `path`, skipping blank and malformed ones
///
/// A missing file yields no records.
pub fn read_records<R: LineRecord>(path: &Path) -> anyhow::Result<LoadedRecords<R>> {
    if !path.exists() {
        debug!(path = %path.display(), "No record file yet");
        return Ok(LoadedRecords::default());
    }

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut loaded = LoadedRecords::default();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {:?}", path))?;
        if line.trim().is_empty() {
            continue;
        }
        match R::from_line(&line, index + 1) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed record");
                loaded.malformed.push(line);
            }
        }
    }

    Ok(loaded)
}

/// Encoded records followed by previously unreadable lines, which are
/// carried over untouched
pub fn lines_preserving_malformed<'a, R: LineRecord>(
    path: &'a Path,
    records: &'a [R],
    malformed: &'a [String],
) -> impl Iterator<Item = String> + 'a {
    if !malformed.is_empty() {
        warn!(
            path = %path.display(),
            lines = malformed.len(),
            "Keeping unreadable lines in rewritten file"
        );
    }
    records
        .iter()
        .map(R::to_line)
        .chain(malformed.iter().cloned())
}

/// Replace `path` with `lines`, writing through a temp file
pub fn write_lines_atomic<I, S>(path: &Path, lines: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file {:?}", temp_path))?;

    for line in lines {
        writeln!(file, "{}", line.as_ref()).context("Failed to write record")?;
    }
    file.sync_all().context("Failed to sync record file")?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}
