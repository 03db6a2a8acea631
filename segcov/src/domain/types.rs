//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep runtime addresses, dump numbers and process
//! identifiers from being mixed up in function signatures.

use std::fmt;

/// Runtime address of a function entry point
///
/// This is the address the instrumentation engine reports, NOT the offset
/// inside the owning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl Address {
    /// Offset of this address from a module base, if it lies at or above it
    #[must_use]
    pub fn offset_from(self, base: Address) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Process ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// PID of the current process
    #[must_use]
    pub fn current() -> Self {
        Pid(std::process::id())
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Sequence number of a dump within one process (1-based, gapless)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DumpNumber(pub u64);

impl DumpNumber {
    #[must_use]
    pub fn next(self) -> Self {
        DumpNumber(self.0 + 1)
    }
}

impl fmt::Display for DumpNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-process prefix for segment file names and lookup keys
///
/// Empty for a single process; `pid<PID>_` when child processes are followed,
/// so every process writing into the same log directory gets its own keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProcessSuffix(String);

impl ProcessSuffix {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_pid(pid: Pid) -> Self {
        ProcessSuffix(format!("pid{}_", pid.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join key between a segment file and its lookup entry (`pid42_7`, `7`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DumpKey {
    pub suffix: ProcessSuffix,
    pub number: DumpNumber,
}

impl DumpKey {
    /// File name of the segment written for this dump
    #[must_use]
    pub fn segment_file_name(&self) -> String {
        format!("{self}.log")
    }
}

impl fmt::Display for DumpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.suffix, self.number)
    }
}
