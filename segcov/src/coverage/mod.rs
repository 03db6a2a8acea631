//! # Segment Coverage
//!
//! Attribution of executed functions to dump segments.
//!
//! ```text
//! function entry (any thread)          marker call (one thread)
//!          │                                     │
//!          ▼                                     ▼
//! ┌──────────────────┐   begin_dump()   ┌──────────────────┐
//! │ CoverageAccum.   │◀─────────────────│   DumpHandler    │
//! │ (touched set +   │  lock held until │                  │
//! │  dump counter)   │  files written   │ N.log + lookup   │
//! └──────────────────┘                  └──────────────────┘
//! ```
//!
//! - **`accumulator`**: touched-address set and dump counter behind one lock
//! - **`segment`**: segment file records and their text format
//! - **`lookup`**: append-only dump-number → identifier table
//! - **`dump`**: the dump protocol tying the three together

pub mod accumulator;
pub mod dump;
pub mod lookup;
pub mod segment;

pub use accumulator::{CoverageAccumulator, SegmentDump};
pub use dump::DumpHandler;
pub use lookup::{read_lookup, LookupEntry, LookupWriter};
pub use segment::{read_segment, SegmentFile, SegmentHeader, SegmentLine, UNKNOWN_SOURCE};
