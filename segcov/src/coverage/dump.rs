//! # Dump Protocol
//!
//! One marker call becomes one segment file and one lookup line:
//!
//! 1. Increment the dump counter and drain the accumulator (one atomic step)
//! 2. Create `<log_dir>/<suffix><N>.log`
//! 3. Write the main executable header
//! 4. Write one line per touched function the registry knows about
//! 5. Append `<suffix><N>;<identifier>` to the lookup file and flush it
//!
//! The accumulator lock is held from step 1 until step 5 finishes, so dumps
//! never interleave with each other or with entry recording.
//!
//! A segment file that cannot be created is skipped (the lookup line is still
//! written); the target program is never interrupted by a failed dump.

use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use segcov_common::LOOKUP_FILE_NAME;

use super::lookup::LookupWriter;
use super::segment::{write_segment, SegmentHeader, SegmentLine};
use super::CoverageAccumulator;
use crate::domain::{DumpKey, ProcessSuffix, SessionError};
use crate::registry::FunctionRegistry;

/// Writes segment files and lookup entries into a log directory
#[derive(Debug)]
pub struct DumpHandler {
    log_dir: PathBuf,
    suffix: ProcessSuffix,
    lookup: Mutex<LookupWriter>,
}

/// Create `path` if needed; an existing directory is fine
fn ensure_directory(path: &Path) -> Result<(), SessionError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SessionError::LogDirNotDirectory(path.to_path_buf())),
        Err(_) => fs::create_dir_all(path).map_err(|source| SessionError::LogDirCreateFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

impl DumpHandler {
    /// Prepare the log directory and open the lookup file
    ///
    /// With `append` set, entries from earlier processes are kept (child
    /// processes sharing one log directory).
    ///
    /// # Errors
    /// Fails if the directory cannot be created or the lookup file cannot be
    /// opened. Both are fatal: without them no dump can be recorded.
    pub fn open(log_dir: &Path, suffix: ProcessSuffix, append: bool) -> Result<Self, SessionError> {
        ensure_directory(log_dir)?;

        let lookup_path = log_dir.join(LOOKUP_FILE_NAME);
        let lookup = LookupWriter::open(&lookup_path, append)
            .map_err(|source| SessionError::LookupOpenFailed { path: lookup_path, source })?;

        Ok(Self { log_dir: log_dir.to_path_buf(), suffix, lookup: Mutex::new(lookup) })
    }

    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    #[must_use]
    pub fn segment_path(&self, key: &DumpKey) -> PathBuf {
        self.log_dir.join(key.segment_file_name())
    }

    /// Run the dump protocol for one marker call labelled `identifier`
    pub fn dump(
        &self,
        accumulator: &CoverageAccumulator,
        registry: &FunctionRegistry,
        header: &SegmentHeader,
        identifier: &str,
    ) -> DumpKey {
        let segment = accumulator.begin_dump();
        let key = DumpKey { suffix: self.suffix.clone(), number: segment.number };
        let path = self.segment_path(&key);

        let records = registry.resolve_all(segment.addresses.iter().copied());
        let dropped = segment.addresses.len() - records.len();
        let lines = records.iter().map(|record| SegmentLine::from(record.as_ref()));

        match File::create(&path) {
            Ok(file) => {
                if let Err(e) = write_segment(BufWriter::new(file), header, lines) {
                    warn!("Incomplete segment file {}: {e}", path.display());
                }
            }
            Err(e) => warn!("Skipping segment file {}: {e}", path.display()),
        }

        if let Err(e) = self.lock_lookup().append(&key, identifier) {
            warn!("Failed to append lookup entry {key}: {e}");
        }

        debug!(
            "Dump {key} ({identifier}): {} functions, {dropped} without metadata",
            records.len()
        );

        // Accumulator lock is released here, after both writes
        drop(segment);
        key
    }

    /// Flush and sync the lookup file
    ///
    /// # Errors
    /// Propagates the sync error
    pub fn close(&self) -> io::Result<()> {
        self.lock_lookup().close()
    }

    fn lock_lookup(&self) -> std::sync::MutexGuard<'_, LookupWriter> {
        self.lookup.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{read_lookup, read_segment};
    use crate::domain::{Address, DumpNumber, Pid};
    use crate::registry::FunctionRecord;

    fn registry_with(addrs: &[u64]) -> FunctionRegistry {
        let registry = FunctionRegistry::new();
        for &addr in addrs {
            registry.register(FunctionRecord {
                address: Address(addr),
                image_name: "app".to_string(),
                image_path: "/opt/app".to_string(),
                image_low: Address(0x1000),
                symbol: format!("fn_{addr:x}"),
                size: 16,
                source_file: None,
                source_line: 0,
            });
        }
        registry
    }

    fn header() -> SegmentHeader {
        SegmentHeader { name: "app".to_string(), path: "/opt/app".to_string() }
    }

    #[test]
    fn test_dump_writes_segment_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DumpHandler::open(dir.path(), ProcessSuffix::none(), false).unwrap();
        let registry = registry_with(&[0x1100, 0x1200]);
        let acc = CoverageAccumulator::new();

        acc.record_entry(Address(0x1100));
        acc.record_entry(Address(0x1100));
        acc.record_entry(Address(0x1200));
        let key = handler.dump(&acc, &registry, &header(), "S.T___PASSED");

        assert_eq!(key.number, DumpNumber(1));
        assert_eq!(acc.pending(), 0);

        let segment = read_segment(&handler.segment_path(&key)).unwrap();
        assert_eq!(segment.header, header());
        let mut offsets: Vec<u64> = segment.functions.iter().map(|f| f.offset).collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0x100, 0x200]);

        let entries = read_lookup(&dir.path().join(LOOKUP_FILE_NAME)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "1");
        assert_eq!(entries[0].identifier, "S.T___PASSED");
    }

    #[test]
    fn test_unresolved_addresses_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DumpHandler::open(dir.path(), ProcessSuffix::none(), false).unwrap();
        let registry = registry_with(&[0x1100]);
        let acc = CoverageAccumulator::new();

        acc.record_entry(Address(0x1100));
        acc.record_entry(Address(0xdead));
        let key = handler.dump(&acc, &registry, &header(), "x");

        let segment = read_segment(&handler.segment_path(&key)).unwrap();
        assert_eq!(segment.functions.len(), 1);
        assert_eq!(segment.functions[0].symbol, "fn_1100");
    }

    #[test]
    fn test_empty_segment_still_produces_files() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DumpHandler::open(dir.path(), ProcessSuffix::none(), false).unwrap();
        let acc = CoverageAccumulator::new();
        let key = handler.dump(&acc, &FunctionRegistry::new(), &header(), "GLOBAL_TEST_SETUP");

        let segment = read_segment(&handler.segment_path(&key)).unwrap();
        assert!(segment.functions.is_empty());
        assert_eq!(read_lookup(&dir.path().join(LOOKUP_FILE_NAME)).unwrap().len(), 1);
    }

    #[test]
    fn test_process_suffix_in_names() {
        let dir = tempfile::tempdir().unwrap();
        let suffix = ProcessSuffix::for_pid(Pid(321));
        let handler = DumpHandler::open(dir.path(), suffix, true).unwrap();
        let acc = CoverageAccumulator::new();
        let key = handler.dump(&acc, &FunctionRegistry::new(), &header(), "id");

        assert!(dir.path().join("pid321_1.log").exists());
        assert_eq!(read_lookup(&dir.path().join(LOOKUP_FILE_NAME)).unwrap()[0].key, key.to_string());
    }

    #[test]
    fn test_open_creates_nested_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        DumpHandler::open(&nested, ProcessSuffix::none(), false).unwrap();
        assert!(nested.join(LOOKUP_FILE_NAME).exists());
    }

    #[test]
    fn test_open_rejects_file_as_log_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = DumpHandler::open(file.path(), ProcessSuffix::none(), false).unwrap_err();
        assert!(matches!(err, SessionError::LogDirNotDirectory(_)));
    }

    #[test]
    fn test_segment_write_failure_keeps_lookup_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let handler = DumpHandler::open(dir.path(), ProcessSuffix::none(), false).unwrap();
        // A directory squatting on the segment file name makes creation fail
        fs::create_dir(dir.path().join("1.log")).unwrap();

        let acc = CoverageAccumulator::new();
        let registry = FunctionRegistry::new();
        let first = handler.dump(&acc, &registry, &header(), "a");
        let second = handler.dump(&acc, &registry, &header(), "b");

        assert_eq!(first.number, DumpNumber(1));
        assert_eq!(second.number, DumpNumber(2));
        assert!(dir.path().join("2.log").is_file());
        assert_eq!(read_lookup(&dir.path().join(LOOKUP_FILE_NAME)).unwrap().len(), 2);
    }
}
