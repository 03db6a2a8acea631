//! Tool options
//!
//! Plain data filled in by the CLI (or by an embedding host). Defaults match
//! the behaviour expected when the tool runs with no flags at all.

use std::path::PathBuf;

use crate::domain::{Pid, ProcessSuffix};
use crate::registry::{parse_exclusions, ImageFilter, DEFAULT_EXCLUSIONS};

pub const DEFAULT_OUTPUT: &str = "functrace.out";
pub const DEFAULT_LOG_DIR: &str = "trace_logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceOptions {
    /// Standard-mode trace file
    pub output: PathBuf,
    /// Standard mode: log every call instead of each function once
    pub all_calls: bool,
    /// Register functions of shared libraries, not only the main executable
    pub include_libs: bool,
    /// Only register images whose name contains this substring
    pub image_filter: Option<String>,
    /// Comma-separated image name substrings to exclude
    pub exclude: String,
    /// Ignore `exclude` entirely
    pub no_exclude: bool,
    /// Per-test segment dumps instead of a single trace file
    pub runtime_dump: bool,
    /// Directory receiving segment files and the lookup table
    pub log_dir: PathBuf,
    /// Follow fork/exec children into the same log directory
    pub follow_child: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            all_calls: false,
            include_libs: true,
            image_filter: None,
            exclude: DEFAULT_EXCLUSIONS.to_string(),
            no_exclude: false,
            runtime_dump: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            follow_child: false,
        }
    }
}

impl TraceOptions {
    #[must_use]
    pub fn image_filter(&self) -> ImageFilter {
        ImageFilter {
            include_libs: self.include_libs,
            exclusions: parse_exclusions(&self.exclude),
            exclusions_disabled: self.no_exclude,
            name_filter: self.image_filter.clone().filter(|f| !f.is_empty()),
        }
    }

    /// Suffix for this process's dump keys; only needed when several
    /// processes share the log directory
    #[must_use]
    pub fn process_suffix(&self, pid: Pid) -> ProcessSuffix {
        if self.follow_child {
            ProcessSuffix::for_pid(pid)
        } else {
            ProcessSuffix::none()
        }
    }
}
