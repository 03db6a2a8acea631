//! Standard-mode trace file
//!
//! Without segment dumps the tool writes one human-readable log of the calls
//! it observed:
//!
//! ```text
//! # IMAGE LOADED: /opt/app [0x400000 - 0x401fff]
//! 1 | app | main | 0x401000 | 0x401040 | +0x1000-0x1040 | main.cpp:3
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;

use crate::domain::Address;
use crate::registry::{FunctionRecord, ImageInfo};

use crate::coverage::UNKNOWN_SOURCE;

const RULE: &str = "# ========================================";

pub struct TraceLog<W: Write> {
    out: W,
    all_calls: bool,
    seen: HashSet<Address>,
    calls: u64,
}

impl TraceLog<LineWriter<File>> {
    /// Create the trace file and write its header
    ///
    /// # Errors
    /// Fails if the file cannot be created or written
    pub fn create(path: &Path, all_calls: bool) -> io::Result<Self> {
        Self::new(LineWriter::new(File::create(path)?), all_calls)
    }
}

impl<W: Write> TraceLog<W> {
    /// # Errors
    /// Fails if the header cannot be written
    pub fn new(mut out: W, all_calls: bool) -> io::Result<Self> {
        writeln!(out, "# Function Trace Output")?;
        writeln!(
            out,
            "# Format: call# | image | symbol | start_addr | end_addr | offset_range | source:line"
        )?;
        writeln!(out, "{RULE}")?;
        Ok(Self { out, all_calls, seen: HashSet::new(), calls: 0 })
    }

    /// # Errors
    /// Propagates write errors
    pub fn image_loaded(&mut self, image: &ImageInfo) -> io::Result<()> {
        writeln!(
            self.out,
            "# IMAGE LOADED: {} [{} - {}]",
            image.path, image.range.start, image.range.end
        )
    }

    /// Count one call and log it unless the function was already logged
    ///
    /// # Errors
    /// Propagates write errors
    pub fn record_call(&mut self, addr: Address, record: Option<&FunctionRecord>) -> io::Result<()> {
        self.calls += 1;
        if !self.seen.insert(addr) && !self.all_calls {
            return Ok(());
        }
        let Some(record) = record else {
            return Ok(());
        };

        let offset_start = record.offset();
        let offset_end = offset_start + u64::from(record.size);
        writeln!(
            self.out,
            "{} | {} | {} | {} | {} | +0x{offset_start:x}-0x{offset_end:x} | {}:{}",
            self.calls,
            record.image_name,
            record.symbol,
            record.address,
            record.end(),
            record.source_file.as_deref().filter(|f| !f.is_empty()).unwrap_or(UNKNOWN_SOURCE),
            record.source_line
        )
    }

    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }

    #[must_use]
    pub fn unique_functions(&self) -> usize {
        self.seen.len()
    }

    /// Write the summary footer and flush
    ///
    /// # Errors
    /// Propagates write errors
    pub fn finish(&mut self) -> io::Result<()> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "# Total function calls: {}", self.calls)?;
        writeln!(self.out, "# Unique functions seen: {}", self.seen.len())?;
        writeln!(self.out, "{RULE}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRange;

    fn record() -> FunctionRecord {
        FunctionRecord {
            address: Address(0x40_1000),
            image_name: "app".to_string(),
            image_path: "/opt/app".to_string(),
            image_low: Address(0x40_0000),
            symbol: "main".to_string(),
            size: 0x40,
            source_file: Some("main.cpp".to_string()),
            source_line: 3,
        }
    }

    fn output(log: TraceLog<Vec<u8>>) -> String {
        String::from_utf8(log.into_inner()).unwrap()
    }

    #[test]
    fn test_header_and_image_line() {
        let mut log = TraceLog::new(Vec::new(), false).unwrap();
        let image = ImageInfo {
            path: "/opt/app".to_string(),
            range: MemoryRange { start: Address(0x40_0000), end: Address(0x40_1fff) },
            is_main_executable: true,
        };
        log.image_loaded(&image).unwrap();

        let text = output(log);
        assert!(text.starts_with("# Function Trace Output\n"));
        assert!(text.contains("# IMAGE LOADED: /opt/app [0x400000 - 0x401fff]\n"));
    }

    #[test]
    fn test_call_line_format() {
        let mut log = TraceLog::new(Vec::new(), false).unwrap();
        let rec = record();
        log.record_call(rec.address, Some(&rec)).unwrap();

        let text = output(log);
        assert!(text.contains("1 | app | main | 0x401000 | 0x401040 | +0x1000-0x1040 | main.cpp:3\n"));
    }

    #[test]
    fn test_unique_mode_logs_each_function_once() {
        let mut log = TraceLog::new(Vec::new(), false).unwrap();
        let rec = record();
        for _ in 0..3 {
            log.record_call(rec.address, Some(&rec)).unwrap();
        }
        log.finish().unwrap();
        assert_eq!(log.calls(), 3);
        assert_eq!(log.unique_functions(), 1);

        let text = output(log);
        assert_eq!(text.matches("| main |").count(), 1);
        assert!(text.contains("# Total function calls: 3\n"));
        assert!(text.contains("# Unique functions seen: 1\n"));
    }

    #[test]
    fn test_all_calls_mode_logs_every_call() {
        let mut log = TraceLog::new(Vec::new(), true).unwrap();
        let rec = record();
        log.record_call(rec.address, Some(&rec)).unwrap();
        log.record_call(rec.address, Some(&rec)).unwrap();

        let text = output(log);
        assert!(text.contains("\n1 | app"));
        assert!(text.contains("\n2 | app"));
    }

    #[test]
    fn test_unknown_function_is_counted_not_logged() {
        let mut log = TraceLog::new(Vec::new(), false).unwrap();
        log.record_call(Address(0x9), None).unwrap();
        assert_eq!(log.calls(), 1);
        assert_eq!(output(log).lines().count(), 3);
    }
}
