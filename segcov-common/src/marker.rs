//! Marker function and dump sinks
//!
//! The instrumentation engine finds [`pin_rts_dump_coverage`] by name in the
//! loaded image and reads its first argument before the body runs. The body
//! itself does nothing observable.

use log::warn;
use std::ffi::{c_char, CString};

/// Signal the instrumentation engine to dump coverage for the current segment.
///
/// `dump_id` is a NUL-terminated identifier such as `MathTests.Add___PASSED`.
/// The engine intercepts the call and:
/// 1. Writes the accumulated function coverage to a numbered segment file
/// 2. Appends the dump number → identifier mapping to the lookup file
/// 3. Resets coverage tracking for the next segment
///
/// The pointer is never dereferenced here.
// SAFETY: the symbol must be unmangled so the engine can look it up by name
#[allow(unsafe_code)]
#[no_mangle]
#[inline(never)]
pub extern "C" fn pin_rts_dump_coverage(dump_id: *const c_char) {
    // Keep the argument live so the call is not folded away
    std::hint::black_box(dump_id);
}

/// Receiver of dump identifiers produced by the lifecycle sequencer.
pub trait DumpSink {
    /// Trigger one dump labelled with `identifier`.
    fn dump(&mut self, identifier: &str);
}

/// Any closure taking an identifier is a sink (handy for in-process wiring).
impl<F: FnMut(&str)> DumpSink for F {
    fn dump(&mut self, identifier: &str) {
        self(identifier);
    }
}

/// Production sink: calls the marker function for the engine to intercept.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerSink;

impl DumpSink for MarkerSink {
    fn dump(&mut self, identifier: &str) {
        match CString::new(identifier) {
            Ok(id) => pin_rts_dump_coverage(id.as_ptr()),
            Err(e) => {
                warn!("Dropping dump {identifier:?}: identifier contains NUL at byte {}", e.nul_position());
            }
        }
    }
}
