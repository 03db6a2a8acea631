//! # segcov - Main Entry Point
//!
//! Three subcommands:
//! - **replay**: drive a session from a host event stream (file or stdin)
//! - **filter**: turn an excludes file into a gtest filter
//! - **report**: summarize the segment dumps of a log directory
//!
//! Usage errors are reported by clap, which exits with status 2.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use segcov::cli::{Args, Cmd, FilterArgs, ReplayArgs, ReportArgs};
use segcov::domain::Pid;
use segcov::host::{replay, ReplayStats};
use segcov::report::analyze_log_dir;
use segcov::session::Session;
use segcov_common::{excludes_file_from_env, exclusion_filter_from_file};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::Replay(replay_args) => run_replay(&replay_args),
        Cmd::Filter(filter_args) => run_filter(&filter_args),
        Cmd::Report(report_args) => run_report(&report_args),
    }
}

fn open_events(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open event stream {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn run_replay(args: &ReplayArgs) -> Result<()> {
    let options = args.trace_options();
    let pid = args.pid.map_or_else(Pid::current, Pid);
    let runtime_dump = options.runtime_dump;

    let reader = open_events(args.events.as_deref())?;
    let session = Session::start(options, pid).context("Failed to start tracing session")?;
    info!("Session started for {pid}");

    let stats = replay(&session, reader).context("Replay failed")?;

    if !args.quiet {
        print_summary(&session, &stats, runtime_dump);
    }
    Ok(())
}

fn print_summary(session: &Session, stats: &ReplayStats, runtime_dump: bool) {
    println!("Events processed:     {}", stats.events);
    println!("Images loaded:        {}", stats.images);
    println!(
        "Routines registered:  {} ({} skipped)",
        stats.routines_registered, stats.routines_skipped
    );
    println!("Function entries:     {}", stats.entries);
    if runtime_dump {
        println!("Segments dumped:      {}", stats.dumps);
        if let Some(log_dir) = session.log_dir() {
            println!("Log directory:        {}", log_dir.display());
        }
    } else {
        println!("Trace written to:     {}", session.options().output.display());
    }
    if stats.children_followed > 0 {
        println!("Children followed:    {}", stats.children_followed);
    }
    if stats.malformed_lines > 0 {
        println!("Malformed lines:      {}", stats.malformed_lines);
    }
}

fn run_filter(args: &FilterArgs) -> Result<()> {
    let Some(path) = args.excludes_file.clone().or_else(excludes_file_from_env) else {
        info!("No excludes file given, leaving the test filter untouched");
        return Ok(());
    };

    let filter = exclusion_filter_from_file(&path, &args.previous);
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{filter}").context("Failed to write filter")?;
    Ok(())
}

fn run_report(args: &ReportArgs) -> Result<()> {
    let report = analyze_log_dir(&args.log_dir)
        .with_context(|| format!("Failed to analyze {}", args.log_dir.display()))?;

    if !report.is_consistent() {
        warn!(
            "{} missing and {} orphan segment files in {}",
            report.missing_segments(),
            report.orphan_segments.len(),
            args.log_dir.display()
        );
    }

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &report).context("Failed to write report")?;
        writeln!(stdout)?;
    } else {
        write!(stdout, "{}", report.render_text()).context("Failed to write report")?;
    }
    Ok(())
}
