//! # Tracing Session
//!
//! One [`Session`] per monitored process owns every piece of mutable state:
//! the function registry, the coverage accumulator with its dump counter, the
//! open lookup file (segment mode) or trace file (standard mode).
//!
//! The instrumentation engine drives it through the `on_*` callbacks, which
//! all take `&self` and may be called from any thread of the target.
//!
//! ## Modes
//!
//! - **Segments** (`runtime_dump`): function entries accumulate until the
//!   marker call, then go out as one numbered segment file.
//! - **Standard**: a single trace file listing every function observed.

pub mod options;
pub mod trace_log;

pub use options::{TraceOptions, DEFAULT_LOG_DIR, DEFAULT_OUTPUT};
pub use trace_log::TraceLog;

use log::{info, warn};
use std::fs::File;
use std::io::LineWriter;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use segcov_common::MARKER_SYMBOL;

use crate::coverage::{CoverageAccumulator, DumpHandler, SegmentHeader};
use crate::domain::{Address, DumpKey, DumpNumber, Pid, SessionError};
use crate::registry::{FunctionRecord, FunctionRegistry, ImageFilter, ImageInfo};

/// A routine discovered by the engine while instrumenting an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineInfo {
    pub address: Address,
    pub symbol: String,
    pub size: u32,
    pub source_file: Option<String>,
    pub source_line: u32,
}

/// Which analysis calls the engine should insert for a routine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutineHooks {
    /// Call [`Session::on_function_entry`] before the routine runs
    pub entry: bool,
    /// Call [`Session::on_marker`] with the routine's first argument
    pub marker: bool,
}

enum Mode {
    Segments { accumulator: CoverageAccumulator, dumps: DumpHandler },
    Standard(Mutex<TraceLog<LineWriter<File>>>),
}

pub struct Session {
    options: TraceOptions,
    filter: ImageFilter,
    registry: FunctionRegistry,
    images: RwLock<Vec<ImageInfo>>,
    main_image: RwLock<SegmentHeader>,
    calls: AtomicU64,
    mode: Mode,
}

impl Session {
    /// Set up output files before the target starts running
    ///
    /// # Errors
    /// Fails if the log directory, lookup file or trace file cannot be
    /// created. The caller must abort before instrumentation begins.
    pub fn start(options: TraceOptions, pid: Pid) -> Result<Self, SessionError> {
        let mode = if options.runtime_dump {
            let suffix = options.process_suffix(pid);
            let dumps = DumpHandler::open(&options.log_dir, suffix, options.follow_child)?;
            info!("Segment dumps enabled: {}", options.log_dir.display());
            Mode::Segments { accumulator: CoverageAccumulator::new(), dumps }
        } else {
            let log = TraceLog::create(&options.output, options.all_calls).map_err(|source| {
                SessionError::TraceOpenFailed { path: options.output.clone(), source }
            })?;
            info!("Tracing to {}", options.output.display());
            Mode::Standard(Mutex::new(log))
        };

        Ok(Self {
            filter: options.image_filter(),
            options,
            registry: FunctionRegistry::new(),
            images: RwLock::new(Vec::new()),
            main_image: RwLock::new(SegmentHeader::default()),
            calls: AtomicU64::new(0),
            mode,
        })
    }

    #[must_use]
    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Whether the session writes per-segment dumps
    #[must_use]
    pub fn is_segmented(&self) -> bool {
        matches!(self.mode, Mode::Segments { .. })
    }

    /// Total function entries observed
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Number of the latest dump (0 before the first, always 0 in standard mode)
    #[must_use]
    pub fn last_dump(&self) -> DumpNumber {
        match &self.mode {
            Mode::Segments { accumulator, .. } => accumulator.last_dump(),
            Mode::Standard(_) => DumpNumber(0),
        }
    }

    /// Log directory of a segmented session
    #[must_use]
    pub fn log_dir(&self) -> Option<PathBuf> {
        match &self.mode {
            Mode::Segments { dumps, .. } => Some(dumps.log_dir().to_path_buf()),
            Mode::Standard(_) => None,
        }
    }

    /// An image (executable or shared library) was loaded
    pub fn on_image_load(&self, image: ImageInfo) {
        if image.is_main_executable {
            *self.main_image.write().unwrap_or_else(PoisonError::into_inner) =
                SegmentHeader::for_image(&image);
        }
        if let Mode::Standard(log) = &self.mode {
            if let Err(e) = log.lock().unwrap_or_else(PoisonError::into_inner).image_loaded(&image) {
                warn!("Failed to write trace: {e}");
            }
        }
        self.images.write().unwrap_or_else(PoisonError::into_inner).push(image);
    }

    /// A routine was found while instrumenting; returns the hooks to insert
    pub fn on_routine(&self, routine: RoutineInfo) -> RoutineHooks {
        let marker = self.is_segmented() && routine.symbol == MARKER_SYMBOL;

        let image = {
            let images = self.images.read().unwrap_or_else(PoisonError::into_inner);
            images.iter().rev().find(|img| img.range.contains(routine.address)).cloned()
        };
        let Some(image) = image else {
            return RoutineHooks { entry: false, marker };
        };
        if !self.filter.admits(&image) {
            return RoutineHooks { entry: false, marker };
        }

        self.registry.register(FunctionRecord {
            address: routine.address,
            image_name: image.base_name().to_string(),
            image_path: image.path.clone(),
            image_low: image.range.start,
            symbol: routine.symbol,
            size: routine.size,
            source_file: routine.source_file.filter(|f| !f.is_empty()),
            source_line: routine.source_line,
        });
        RoutineHooks { entry: true, marker }
    }

    /// Hot path: a registered function is about to execute
    pub fn on_function_entry(&self, addr: Address) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.mode {
            Mode::Segments { accumulator, .. } => accumulator.record_entry(addr),
            Mode::Standard(log) => {
                let record = self.registry.lookup(addr);
                let mut log = log.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = log.record_call(addr, record.as_deref()) {
                    warn!("Failed to write trace: {e}");
                }
            }
        }
    }

    /// The marker function was called with `identifier`
    ///
    /// Returns the key of the dump written, or `None` in standard mode.
    pub fn on_marker(&self, identifier: &str) -> Option<DumpKey> {
        let Mode::Segments { accumulator, dumps } = &self.mode else {
            return None;
        };
        let header = self.main_image.read().unwrap_or_else(PoisonError::into_inner).clone();
        Some(dumps.dump(accumulator, &self.registry, &header, identifier))
    }

    /// Decide whether to inject into a child process
    pub fn follow_child(&self, child: Pid) -> bool {
        if self.options.follow_child {
            info!("Following child process {child}");
        }
        self.options.follow_child
    }

    /// The target exited: close the lookup file or finish the trace
    ///
    /// # Errors
    /// Propagates flush errors of the output files
    pub fn finish(&self, exit_code: i32) -> Result<(), SessionError> {
        info!("Target exited with code {exit_code} after {} calls", self.calls());
        match &self.mode {
            Mode::Segments { dumps, accumulator } => {
                let pending = accumulator.pending();
                if pending > 0 {
                    info!("{pending} functions ran after the last dump and are not recorded");
                }
                dumps.close()?;
            }
            Mode::Standard(log) => log.lock().unwrap_or_else(PoisonError::into_inner).finish()?,
        }
        Ok(())
    }
}
