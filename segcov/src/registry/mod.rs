//! # Function Registry
//!
//! Static metadata for every function the instrumentation engine discovered
//! in an image of interest, keyed by the function's runtime entry address.
//!
//! ## Address Translation
//!
//! The engine reports **runtime addresses**. Images are position independent,
//! so the same function lands at a different address on every run. Segment
//! files therefore store the offset from the owning image's load address:
//!
//! ```text
//! Image loaded at:  0x55f3a2b4c000 - 0x55f3a2b5f000
//! Function entry:   0x55f3a2b4c780
//! Segment offset:   0x55f3a2b4c780 - 0x55f3a2b4c000 = +0x780
//! ```
//!
//! ## Lifecycle
//!
//! Records are inserted once per routine while an image is instrumented and
//! are never removed. A later registration for the same address replaces the
//! earlier one (images are not expected to be reloaded).
//!
//! Lookups happen only at dump time, never on the function-entry hot path.

pub mod filter;

pub use filter::{parse_exclusions, ImageFilter, DEFAULT_EXCLUSIONS};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::Address;

/// Memory range of a loaded image in the process's address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    pub start: Address,
    pub end: Address,
}

impl MemoryRange {
    /// Check if an address falls within this memory range
    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }
}

/// A loaded executable or shared library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Full path as reported by the loader
    pub path: String,
    pub range: MemoryRange,
    pub is_main_executable: bool,
}

impl ImageInfo {
    /// File name part of the image path
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }
}

/// Extract just the file name from a path, accepting `/` and `\` separators
#[must_use]
pub fn base_name(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or(path, |pos| &path[pos + 1..])
}

/// Metadata of one function, immutable once registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub address: Address,
    pub image_name: String,
    pub image_path: String,
    pub image_low: Address,
    pub symbol: String,
    pub size: u32,
    /// `None` when the image carries no line information for this function
    pub source_file: Option<String>,
    pub source_line: u32,
}

impl FunctionRecord {
    /// Offset of the entry point from the owning image's load address
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.address.offset_from(self.image_low).unwrap_or(self.address.0)
    }

    /// One-past-the-end address of the function body
    #[must_use]
    pub fn end(&self) -> Address {
        Address(self.address.0 + u64::from(self.size))
    }
}

/// Thread-safe map from runtime address to [`FunctionRecord`]
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    records: RwLock<HashMap<Address, Arc<FunctionRecord>>>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `record.address`
    pub fn register(&self, record: FunctionRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.address, Arc::new(record));
    }

    #[must_use]
    pub fn lookup(&self, addr: Address) -> Option<Arc<FunctionRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).get(&addr).cloned()
    }

    /// Resolve many addresses under a single read lock.
    ///
    /// Unknown addresses are dropped.
    pub fn resolve_all<I>(&self, addrs: I) -> Vec<Arc<FunctionRecord>>
    where
        I: IntoIterator<Item = Address>,
    {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        addrs.into_iter().filter_map(|addr| records.get(&addr).cloned()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
