//! # segcov - Per-Test Segmented Function Coverage
//!
//! segcov records which functions of a test program ran during each test.
//! An instrumentation engine reports loaded images, discovered routines and
//! function entries; the test program itself marks segment boundaries by
//! calling `pin_rts_dump_coverage(id)` from its test listener. Every marker
//! call closes one segment: the functions touched since the previous call are
//! written to a numbered segment file and the number is mapped to the test
//! identifier in a lookup table.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Instrumented Test Program                    │
//! │   test listener (segcov-common) → pin_rts_dump_coverage(id)     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ image / routine / entry / marker callbacks
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Instrumentation Engine                        │
//! │        (native callbacks, or JSON lines via `host`)             │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     segcov (This Crate)                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Registry   │◀──│   Session    │──▶│   Coverage   │         │
//! │  │  (filtered)  │   │              │   │ accumulator  │         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │                            │ standard mode    │ marker          │
//! │                            ▼                  ▼                 │
//! │                    ┌──────────────┐   ┌──────────────┐          │
//! │                    │ functrace.out│   │ N.log +      │          │
//! │                    │              │   │ dump-lookup  │          │
//! │                    └──────────────┘   └──────┬───────┘          │
//! │                                              ▼                  │
//! │                                       ┌──────────────┐          │
//! │                                       │    Report    │          │
//! │                                       └──────────────┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`session`]: owns all per-process state and receives engine callbacks
//!   - `options`: tool knobs (`TraceOptions`)
//!   - `trace_log`: standard (non-test) trace file
//!
//! - [`registry`]: address → function metadata, plus the image filter
//!
//! - [`coverage`]: segment accumulation and the dump protocol
//!   - `accumulator`: touched set and dump counter under one lock
//!   - `segment` / `lookup`: on-disk formats
//!   - `dump`: writes one segment file and one lookup line per marker
//!
//! - [`host`]: JSON-lines adapter so any engine or a recorded stream can
//!   drive a session
//!
//! - [`report`]: offline consistency check of a log directory
//!
//! - [`cli`]: command-line arguments
//!
//! - [`domain`]: core types (Address, Pid, `DumpKey`) and error enums
//!
//! ## Typical Usage
//!
//! ```bash
//! # Replay a recorded engine stream in test mode
//! segcov replay events.jsonl --runtime-dump --log-dir trace_logs
//!
//! # Build the gtest filter for the tests selected for skipping
//! GTEST_EXCLUDES_FILE=excluded.txt segcov filter --previous 'Math*'
//!
//! # Inspect the dumps
//! segcov report trace_logs --json
//! ```

pub mod cli;
pub mod coverage;
pub mod domain;
pub mod host;
pub mod registry;
pub mod report;
pub mod session;
