//! Dump lookup table
//!
//! Append-only, one line per dump: `<processSuffix><dumpNumber>;<identifier>`.
//! Every line is flushed as soon as it is written so a crash between dumps
//! leaves a consistent table behind.

use log::warn;
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use segcov_common::LOOKUP_FIELD_DELIMITER;

use crate::domain::{DumpKey, ReportError};

/// Writer side of the lookup table
#[derive(Debug)]
pub struct LookupWriter {
    file: File,
}

impl LookupWriter {
    /// Open the lookup file, appending when several processes share it
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or opened
    pub fn open(path: &Path, append: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        if append {
            options.append(true).create(true);
        } else {
            options.write(true).create(true).truncate(true);
        }
        Ok(Self { file: options.open(path)? })
    }

    /// Append and flush one entry
    ///
    /// The line goes out in a single write so appends from cooperating
    /// processes stay line-atomic where the file system allows it.
    ///
    /// # Errors
    /// Propagates write and flush errors
    pub fn append(&mut self, key: &DumpKey, identifier: &str) -> io::Result<()> {
        let identifier = single_line(key, identifier);
        let line = format!("{key}{LOOKUP_FIELD_DELIMITER}{identifier}\n");
        self.file.write_all(line.as_bytes())?;
        self.file.flush()
    }

    /// Flush pending data and sync it to disk
    ///
    /// # Errors
    /// Propagates the sync error
    pub fn close(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// Identifiers never carry line breaks; one that does would split its entry
fn single_line<'a>(key: &DumpKey, identifier: &'a str) -> Cow<'a, str> {
    if identifier.contains(['\n', '\r']) {
        warn!("Line break in identifier of dump {key}, replaced with spaces");
        Cow::Owned(identifier.replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(identifier)
    }
}

/// One parsed lookup line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    /// Dump key including the process suffix (`7`, `pid42_7`)
    pub key: String,
    pub identifier: String,
}

impl LookupEntry {
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (key, identifier) = line.split_once(LOOKUP_FIELD_DELIMITER)?;
        if key.is_empty() || !key.ends_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        Some(Self { key: key.to_string(), identifier: identifier.to_string() })
    }

    /// Name of the segment file this entry refers to
    #[must_use]
    pub fn segment_file_name(&self) -> String {
        format!("{}.log", self.key)
    }
}

/// Read every entry of a lookup file
///
/// # Errors
/// Fails if the file cannot be read or a non-empty line is malformed
pub fn read_lookup(path: &Path) -> Result<Vec<LookupEntry>, ReportError> {
    let file = File::open(path)
        .map_err(|source| ReportError::LookupReadFailed { path: path.to_path_buf(), source })?;

    let mut entries = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let entry = LookupEntry::parse(&line)
            .ok_or(ReportError::MalformedLookupEntry { line_no: idx + 1, line })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DumpNumber, Pid, ProcessSuffix};

    fn key(suffix: ProcessSuffix, n: u64) -> DumpKey {
        DumpKey { suffix, number: DumpNumber(n) }
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump-lookup.log");

        let mut writer = LookupWriter::open(&path, false).unwrap();
        writer.append(&key(ProcessSuffix::none(), 1), "GLOBAL_TEST_SETUP").unwrap();
        writer.append(&key(ProcessSuffix::none(), 2), "Suite.Test___PASSED").unwrap();

        // Visible before close
        let entries = read_lookup(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].key, "2");
        assert_eq!(entries[1].identifier, "Suite.Test___PASSED");
        assert_eq!(entries[1].segment_file_name(), "2.log");
    }

    #[test]
    fn test_truncate_vs_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump-lookup.log");

        LookupWriter::open(&path, false).unwrap().append(&key(ProcessSuffix::none(), 1), "a").unwrap();
        LookupWriter::open(&path, false).unwrap().append(&key(ProcessSuffix::none(), 1), "b").unwrap();
        assert_eq!(read_lookup(&path).unwrap().len(), 1);

        let child = ProcessSuffix::for_pid(Pid(99));
        LookupWriter::open(&path, true).unwrap().append(&key(child, 1), "c").unwrap();
        let entries = read_lookup(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].key, "pid99_1");
    }

    #[test]
    fn test_identifier_may_contain_delimiter() {
        let entry = LookupEntry::parse("3;weird;name").unwrap();
        assert_eq!(entry.key, "3");
        assert_eq!(entry.identifier, "weird;name");
    }

    #[test]
    fn test_line_breaks_in_identifier_stay_on_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump-lookup.log");

        let mut writer = LookupWriter::open(&path, false).unwrap();
        writer.append(&key(ProcessSuffix::none(), 1), "Suite.Test\nsecond\r\nthird").unwrap();
        writer.append(&key(ProcessSuffix::none(), 2), "next").unwrap();

        let entries = read_lookup(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].identifier, "Suite.Test second  third");
        assert_eq!(entries[1].key, "2");
    }

    #[test]
    fn test_malformed_lines() {
        assert!(LookupEntry::parse("no delimiter").is_none());
        assert!(LookupEntry::parse(";missing key").is_none());
        assert!(LookupEntry::parse("pid1_;x").is_none());
    }

    #[test]
    fn test_read_lookup_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump-lookup.log");
        std::fs::write(&path, "1;ok\n\ngarbage\n").unwrap();

        let err = read_lookup(&path).unwrap_err();
        assert!(matches!(err, ReportError::MalformedLookupEntry { line_no: 3, .. }));
    }
}
