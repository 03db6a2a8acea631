//! # Event Processing
//!
//! Consumes host events and routes them to the session.
//!
//! ## Event Routing
//!
//! - `image_load` → [`Session::on_image_load`]
//! - `routine`    → [`Session::on_routine`] (filtering + registration)
//! - `entry`      → [`Session::on_function_entry`]
//! - `marker`     → [`Session::on_marker`] (one dump per event)
//! - `fork`       → [`Session::follow_child`]
//! - `fini`       → [`Session::finish`]
//!
//! A reader thread parses lines and hands them over through a bounded
//! channel, so a slow dump never stalls the producer's pipe for long.

use crossbeam_channel::{bounded, Receiver};
use log::{info, warn};
use serde::Serialize;
use std::io::{self, BufRead};
use std::thread::JoinHandle;

use super::HostEvent;
use crate::domain::{Address, Pid, ReplayError, SessionError};
use crate::session::Session;

const CHANNEL_CAPACITY: usize = 1000;

/// Counters collected while processing a stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub events: usize,
    pub images: usize,
    pub routines_registered: usize,
    pub routines_skipped: usize,
    pub markers_hooked: usize,
    pub entries: usize,
    pub dumps: usize,
    pub children_followed: usize,
    pub malformed_lines: usize,
}

/// Line handed over by the reader thread
pub enum StreamItem {
    Event(HostEvent),
    Malformed { line_no: usize, error: String },
}

/// Encapsulates event routing and its counters
pub struct EventProcessor<'a> {
    session: &'a Session,
    pub stats: ReplayStats,
    finished: bool,
}

impl<'a> EventProcessor<'a> {
    #[must_use]
    pub fn new(session: &'a Session) -> Self {
        Self { session, stats: ReplayStats::default(), finished: false }
    }

    /// Whether a `fini` event has been processed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process a single event
    ///
    /// # Errors
    /// Only `fini` can fail, when the output files cannot be flushed
    pub fn process_event(&mut self, event: HostEvent) -> Result<(), SessionError> {
        self.stats.events += 1;

        match event {
            HostEvent::ImageLoad { .. } => {
                if let Some(image) = event.image_info() {
                    self.stats.images += 1;
                    self.session.on_image_load(image);
                }
            }
            HostEvent::Routine { .. } => {
                if let Some(routine) = event.routine_info() {
                    let hooks = self.session.on_routine(routine);
                    if hooks.entry {
                        self.stats.routines_registered += 1;
                    } else {
                        self.stats.routines_skipped += 1;
                    }
                    if hooks.marker {
                        self.stats.markers_hooked += 1;
                    }
                }
            }
            HostEvent::Entry { address } => {
                self.stats.entries += 1;
                self.session.on_function_entry(Address(address));
            }
            HostEvent::Marker { id } => {
                if self.session.on_marker(&id).is_some() {
                    self.stats.dumps += 1;
                }
            }
            HostEvent::Fork { pid } => {
                if self.session.follow_child(Pid(pid)) {
                    self.stats.children_followed += 1;
                }
            }
            HostEvent::Fini { code } => {
                if self.finished {
                    warn!("Ignoring repeated fini event");
                } else {
                    self.finished = true;
                    self.session.finish(code)?;
                }
            }
        }
        Ok(())
    }

    /// Count a line the reader could not parse
    pub fn record_malformed(&mut self, line_no: usize, error: &str) {
        self.stats.malformed_lines += 1;
        warn!("Skipping malformed host event at line {line_no}: {error}");
    }
}

/// Parse `reader` line by line on a separate thread
///
/// The returned handle yields the read error that ended the stream, if any.
pub fn spawn_reader<R>(mut reader: R) -> (Receiver<StreamItem>, JoinHandle<io::Result<()>>)
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = bounded(CHANNEL_CAPACITY);

    let handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        let mut line_no = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            // Invalid UTF-8 is a bad line, not a broken stream
            let item = match std::str::from_utf8(&buf) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match HostEvent::parse(line) {
                    Ok(event) => StreamItem::Event(event),
                    Err(e) => StreamItem::Malformed { line_no, error: e.to_string() },
                },
                Err(e) => StreamItem::Malformed { line_no, error: e.to_string() },
            };
            if tx.send(item).is_err() {
                // Processor went away
                break;
            }
        }
        Ok(())
    });

    (rx, handle)
}

/// Drive `session` with every event in `reader`
///
/// A stream that ends without `fini` is finished with exit code 0.
///
/// # Errors
/// Fails if the stream cannot be read or the session cannot flush its output
pub fn replay<R>(session: &Session, reader: R) -> Result<ReplayStats, ReplayError>
where
    R: BufRead + Send + 'static,
{
    let (rx, handle) = spawn_reader(reader);
    let mut processor = EventProcessor::new(session);

    for item in &rx {
        match item {
            StreamItem::Event(event) => processor.process_event(event)?,
            StreamItem::Malformed { line_no, error } => processor.record_malformed(line_no, &error),
        }
    }

    match handle.join() {
        Ok(result) => result?,
        Err(_) => return Err(ReplayError::ReadFailed("reader thread panicked".to_string())),
    }

    if !processor.is_finished() {
        info!("Event stream ended without fini, finishing session");
        session.finish(0)?;
    }

    Ok(processor.stats)
}
