//! Excludes file → gtest filter translation
//!
//! A test selection step writes the tests that may be skipped to a file, one
//! per line, as `<module>!!!<suite>!!!<test>`. The test program turns that into
//! a negative gtest filter (`-Suite.Test:Suite.Other`) before running.

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{EXCLUDES_FILE_ENV, EXCLUDES_SEPARATOR, TEST_CASE_SEPARATOR};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExcludesError {
    #[error("missing {what} separator in excludes line {line:?}")]
    MissingSeparator { what: &'static str, line: String },
}

/// Path of the excludes file from `GTEST_EXCLUDES_FILE`, if set and non-empty.
#[must_use]
pub fn excludes_file_from_env() -> Option<PathBuf> {
    std::env::var_os(EXCLUDES_FILE_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Convert one excludes line into a gtest test identifier (`Suite.Test`).
///
/// # Errors
/// Returns [`ExcludesError::MissingSeparator`] if the module prefix or the
/// suite/test separator is absent.
pub fn parse_excluded_test(line: &str) -> Result<String, ExcludesError> {
    let (_module, rest) = line.split_once(EXCLUDES_SEPARATOR).ok_or_else(|| {
        ExcludesError::MissingSeparator { what: "module", line: line.to_string() }
    })?;
    let (suite, test) = rest.split_once(EXCLUDES_SEPARATOR).ok_or_else(|| {
        ExcludesError::MissingSeparator { what: "suite/test", line: line.to_string() }
    })?;
    Ok(format!("{suite}{TEST_CASE_SEPARATOR}{test}"))
}

/// Start of the combined filter, before any exclusions are appended.
fn filter_prefix(previous: &str) -> String {
    if previous.is_empty() {
        "-".to_string()
    } else if previous.contains('-') {
        // Already has a negative section, extend it
        format!("{previous}:")
    } else {
        format!("{previous}-")
    }
}

/// Build a gtest filter from excludes lines, merged with `previous`.
///
/// Malformed lines are logged and skipped; blank lines are ignored.
pub fn exclusion_filter<R: BufRead>(reader: R, previous: &str) -> String {
    let mut filter = filter_prefix(previous);
    let mut count = 0usize;

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Stopped reading excludes after {count} entries: {e}");
                break;
            }
        };
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match parse_excluded_test(line) {
            Ok(test_id) => {
                if count > 0 {
                    filter.push(':');
                }
                filter.push_str(&test_id);
                count += 1;
            }
            Err(e) => warn!("Skipping excludes entry: {e}"),
        }
    }

    info!("Found {count} excluded tests: {filter}");
    filter
}

/// Build a gtest filter from the excludes file at `path`.
///
/// If the file cannot be opened the filter holds only the merged `previous`
/// part, so the test run proceeds without additional exclusions.
pub fn exclusion_filter_from_file(path: &Path, previous: &str) -> String {
    info!("Starting to parse excluded tests from {}", path.display());
    match File::open(path) {
        Ok(file) => exclusion_filter(BufReader::new(file), previous),
        Err(e) => {
            warn!("Cannot open excludes file {}: {e}", path.display());
            filter_prefix(previous)
        }
    }
}
