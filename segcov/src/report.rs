//! Log directory analysis
//!
//! Joins the lookup table with the segment files next to it. Every lookup
//! entry should name exactly one segment file and every segment file should
//! be named by one entry; anything else points at an interrupted run or a
//! failed segment write.

use log::warn;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use segcov_common::LOOKUP_FILE_NAME;

use crate::coverage::{read_lookup, read_segment};
use crate::domain::ReportError;

/// One dump as seen on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpReport {
    pub key: String,
    pub identifier: String,
    pub segment_exists: bool,
    /// `None` when the segment file is missing or unreadable
    pub functions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogDirReport {
    pub log_dir: PathBuf,
    pub dumps: Vec<DumpReport>,
    /// Segment files no lookup entry refers to
    pub orphan_segments: Vec<String>,
}

impl LogDirReport {
    #[must_use]
    pub fn missing_segments(&self) -> usize {
        self.dumps.iter().filter(|d| d.functions.is_none()).count()
    }

    /// Lookup table and segment files agree one-to-one
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.missing_segments() == 0 && self.orphan_segments.is_empty()
    }

    /// Tab-separated listing followed by a summary line
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for dump in &self.dumps {
            let functions =
                dump.functions.map_or_else(|| "missing".to_string(), |n| n.to_string());
            let _ = writeln!(out, "{}\t{}\t{functions}", dump.key, dump.identifier);
        }
        for orphan in &self.orphan_segments {
            let _ = writeln!(out, "orphan segment: {orphan}");
        }
        let _ = writeln!(
            out,
            "{} dumps, {} missing segments, {} orphan segments",
            self.dumps.len(),
            self.missing_segments(),
            self.orphan_segments.len()
        );
        out
    }
}

/// Analyze the segment dumps in `log_dir`
///
/// # Errors
/// Fails if the lookup file is missing or malformed, or the directory cannot
/// be listed
pub fn analyze_log_dir(log_dir: &Path) -> Result<LogDirReport, ReportError> {
    let entries = read_lookup(&log_dir.join(LOOKUP_FILE_NAME))?;

    let mut referenced = HashSet::new();
    let dumps = entries
        .into_iter()
        .map(|entry| {
            let file_name = entry.segment_file_name();
            let path = log_dir.join(&file_name);
            let segment_exists = path.is_file();
            let functions = match read_segment(&path) {
                Ok(segment) => Some(segment.functions.len()),
                Err(e) => {
                    if segment_exists {
                        warn!("Cannot read segment {}: {e}", path.display());
                    }
                    None
                }
            };
            referenced.insert(file_name);
            DumpReport { key: entry.key, identifier: entry.identifier, segment_exists, functions }
        })
        .collect();

    let mut orphan_segments = Vec::new();
    for dir_entry in fs::read_dir(log_dir)? {
        let name = dir_entry?.file_name().to_string_lossy().into_owned();
        if name.ends_with(".log") && name != LOOKUP_FILE_NAME && !referenced.contains(&name) {
            orphan_segments.push(name);
        }
    }
    orphan_segments.sort();

    Ok(LogDirReport { log_dir: log_dir.to_path_buf(), dumps, orphan_segments })
}
