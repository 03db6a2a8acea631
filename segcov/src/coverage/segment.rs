//! Segment file records
//!
//! Format (tab separated, one function per line, order unspecified):
//!
//! ```text
//! unittests<TAB>/build/unittests
//! <TAB>+0x1a40<TAB>/src/math.cpp<TAB>add<TAB>12
//! <TAB>+0x2000<TAB>??<TAB>helper<TAB>0
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use segcov_common::SEGMENT_FIELD_DELIMITER as TAB;

use crate::registry::{FunctionRecord, ImageInfo};

/// Placeholder written when a function has no source file information
pub const UNKNOWN_SOURCE: &str = "??";

/// First line of a segment file: the main executable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentHeader {
    pub name: String,
    pub path: String,
}

impl SegmentHeader {
    #[must_use]
    pub fn for_image(image: &ImageInfo) -> Self {
        Self { name: image.base_name().to_string(), path: image.path.clone() }
    }
}

impl fmt::Display for SegmentHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{TAB}{}", self.name, self.path)
    }
}

/// One touched function in a segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLine {
    /// Offset from the owning image's load address
    pub offset: u64,
    pub source_file: Option<String>,
    pub symbol: String,
    pub source_line: u32,
}

impl From<&FunctionRecord> for SegmentLine {
    fn from(record: &FunctionRecord) -> Self {
        Self {
            offset: record.offset(),
            source_file: record.source_file.clone().filter(|f| !f.is_empty()),
            symbol: record.symbol.clone(),
            source_line: record.source_line,
        }
    }
}

impl SegmentLine {
    /// Parse a function line as written by [`fmt::Display`]
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.strip_prefix(TAB)?.splitn(4, TAB);
        let offset = fields.next()?.strip_prefix("+0x")?;
        let offset = u64::from_str_radix(offset, 16).ok()?;
        let source_file = match fields.next()? {
            UNKNOWN_SOURCE => None,
            file => Some(file.to_string()),
        };
        let symbol = fields.next()?.to_string();
        let source_line = fields.next()?.parse().ok()?;
        Some(Self { offset, source_file, symbol, source_line })
    }
}

impl fmt::Display for SegmentLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{TAB}+0x{:x}{TAB}{}{TAB}{}{TAB}{}",
            self.offset,
            self.source_file.as_deref().unwrap_or(UNKNOWN_SOURCE),
            self.symbol,
            self.source_line
        )
    }
}

/// Write a complete segment (header plus one line per function)
///
/// # Errors
/// Propagates write errors from `out`
pub fn write_segment<W, I>(mut out: W, header: &SegmentHeader, lines: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = SegmentLine>,
{
    writeln!(out, "{header}")?;
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// A segment file read back from disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFile {
    pub header: SegmentHeader,
    pub functions: Vec<SegmentLine>,
}

/// Read a segment file; lines that do not parse are skipped
///
/// # Errors
/// Returns an error if the file cannot be opened or read
pub fn read_segment(path: &Path) -> io::Result<SegmentFile> {
    let reader = BufReader::new(File::open(path)?);
    let mut segment = SegmentFile::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if idx == 0 {
            let (name, path) = line.split_once(TAB).unwrap_or((line.as_str(), ""));
            segment.header = SegmentHeader { name: name.to_string(), path: path.to_string() };
        } else if let Some(function) = SegmentLine::parse(&line) {
            segment.functions.push(function);
        }
    }

    Ok(segment)
}
