//! # Shared Protocol Pieces (Test Program ↔ Tool)
//!
//! Everything in this crate is linked into the *observed* test program. The
//! tool side (`segcov`) depends on it only for the protocol constants, so both
//! ends agree on symbol names, separators and file names.
//!
//! ## Dump Protocol
//!
//! ```text
//! test framework callbacks
//!         │
//!         ▼
//! LifecycleSequencer ──identifier──▶ pin_rts_dump_coverage(id)
//!                                          │  (intercepted by the
//!                                          │   instrumentation engine)
//!                                          ▼
//!                                   segcov dump handler
//! ```
//!
//! ## Key Items
//!
//! - [`pin_rts_dump_coverage`] - The marker function the engine intercepts
//! - [`LifecycleSequencer`] - Turns test callbacks into dump identifiers
//! - [`exclusion_filter_from_file`] - Builds a gtest filter from an excludes file

pub mod excludes;
pub mod listener;
pub mod marker;

pub use excludes::{
    excludes_file_from_env, exclusion_filter, exclusion_filter_from_file, parse_excluded_test,
    ExcludesError,
};
pub use listener::{LifecycleSequencer, SequencerConfig, TestOutcome};
pub use marker::{pin_rts_dump_coverage, DumpSink, MarkerSink};

// ============================================================================
// Protocol Constants
// ============================================================================

/// Symbol name of the marker function looked up in every loaded image.
pub const MARKER_SYMBOL: &str = "pin_rts_dump_coverage";

/// Identifier of the first dump (coverage before the first suite) and of the
/// last dump (trailing teardown coverage).
pub const GLOBAL_TEST_SETUP: &str = "GLOBAL_TEST_SETUP";

/// Joins a suite or test identifier with its dump suffix (`setup`, `PASSED`, ...).
pub const DUMP_SUFFIX_SEPARATOR: &str = "___";

/// Joins a suite identifier with a test name.
pub const TEST_CASE_SEPARATOR: &str = ".";

/// Separator between module, suite and test in an excludes file line.
pub const EXCLUDES_SEPARATOR: &str = "!!!";

/// Environment variable naming the excludes file.
pub const EXCLUDES_FILE_ENV: &str = "GTEST_EXCLUDES_FILE";

/// Name of the append-only lookup table inside the log directory.
pub const LOOKUP_FILE_NAME: &str = "dump-lookup.log";

/// Field delimiter used in segment files.
pub const SEGMENT_FIELD_DELIMITER: char = '\t';

/// Field delimiter between dump key and identifier in the lookup file.
pub const LOOKUP_FIELD_DELIMITER: char = ';';
