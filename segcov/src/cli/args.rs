//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::registry::DEFAULT_EXCLUSIONS;
use crate::session::{TraceOptions, DEFAULT_LOG_DIR, DEFAULT_OUTPUT};

#[derive(Parser, Debug)]
#[command(
    name = "segcov",
    version,
    about = "Per-test segmented function coverage",
    after_help = "\
EXAMPLES:
    segcov replay events.jsonl --runtime-dump     Write one segment per test
    segcov filter --previous 'Math*'              Merge exclusions into a gtest filter
    segcov report trace_logs --json               Summarize a log directory"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Drive a tracing session from a JSON-lines host event stream
    Replay(ReplayArgs),

    /// Print the gtest filter for the tests listed in an excludes file
    Filter(FilterArgs),

    /// Check and summarize the segment dumps in a log directory
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct ReplayArgs {
    /// Event stream to read (stdin if omitted or "-")
    #[arg(value_name = "EVENTS")]
    pub events: Option<PathBuf>,

    /// Standard-mode trace file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Log every call instead of each function once
    #[arg(long)]
    pub all_calls: bool,

    /// Only register functions of the main executable
    #[arg(long)]
    pub no_libs: bool,

    /// Only register images whose name contains this substring
    #[arg(long, value_name = "SUBSTRING")]
    pub image_filter: Option<String>,

    /// Comma-separated image name substrings to exclude
    #[arg(long, default_value = DEFAULT_EXCLUSIONS)]
    pub exclude: String,

    /// Disable image exclusions
    #[arg(long)]
    pub no_exclude: bool,

    /// Test mode: dump one segment file per marker call
    #[arg(long)]
    pub runtime_dump: bool,

    /// Directory for segment files and the lookup table
    #[arg(long, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Follow child processes into the same log directory
    #[arg(long)]
    pub follow_child: bool,

    /// Process ID used for dump key suffixes (defaults to this process)
    #[arg(long)]
    pub pid: Option<u32>,

    /// Suppress the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl ReplayArgs {
    #[must_use]
    pub fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            output: self.output.clone(),
            all_calls: self.all_calls,
            include_libs: !self.no_libs,
            image_filter: self.image_filter.clone(),
            exclude: self.exclude.clone(),
            no_exclude: self.no_exclude,
            runtime_dump: self.runtime_dump,
            log_dir: self.log_dir.clone(),
            follow_child: self.follow_child,
        }
    }
}

#[derive(Parser, Debug)]
pub struct FilterArgs {
    /// Excludes file (defaults to $GTEST_EXCLUDES_FILE)
    #[arg(long, value_name = "FILE")]
    pub excludes_file: Option<PathBuf>,

    /// Filter already given to the test program
    #[arg(long, default_value = "")]
    pub previous: String,
}

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Directory holding dump-lookup.log and the segment files
    #[arg(value_name = "LOG_DIR")]
    pub log_dir: PathBuf,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_replay_defaults_match_trace_options() {
        let Cmd::Replay(replay) = parse(&["segcov", "replay"]).command else {
            panic!("expected replay");
        };
        assert!(replay.events.is_none());
        assert_eq!(replay.trace_options(), TraceOptions::default());
    }

    #[test]
    fn test_replay_flags() {
        let args = parse(&[
            "segcov",
            "replay",
            "events.jsonl",
            "--runtime-dump",
            "--log-dir",
            "out",
            "--no-libs",
            "--follow-child",
            "--image-filter",
            "unit",
        ]);
        let Cmd::Replay(replay) = args.command else {
            panic!("expected replay");
        };
        let options = replay.trace_options();
        assert_eq!(replay.events, Some(PathBuf::from("events.jsonl")));
        assert!(options.runtime_dump);
        assert!(options.follow_child);
        assert!(!options.include_libs);
        assert_eq!(options.log_dir, PathBuf::from("out"));
        assert_eq!(options.image_filter.as_deref(), Some("unit"));
    }

    #[test]
    fn test_filter_and_report() {
        let Cmd::Filter(filter) = parse(&["segcov", "filter", "--previous", "A.*"]).command else {
            panic!("expected filter");
        };
        assert_eq!(filter.previous, "A.*");
        assert!(filter.excludes_file.is_none());

        let Cmd::Report(report) = parse(&["segcov", "report", "logs", "--json"]).command else {
            panic!("expected report");
        };
        assert!(report.json);
        assert_eq!(report.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_report_requires_log_dir() {
        let err = Args::try_parse_from(["segcov", "report"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
