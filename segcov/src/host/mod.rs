//! Host instrumentation engine adapter
//!
//! The binary-instrumentation engine is not part of this crate. It reports
//! what it sees as a stream of [`HostEvent`]s, one JSON object per line, and
//! [`EventProcessor`] turns those into [`Session`](crate::session::Session)
//! callbacks. A recorded stream can be replayed offline the same way.
//!
//! ```text
//! {"event":"image_load","path":"/build/unittests","low":4096,"high":36864,"main":true}
//! {"event":"routine","address":4352,"symbol":"add","size":16,"file":"math.cpp","line":3}
//! {"event":"entry","address":4352}
//! {"event":"marker","id":"MathTests.Add___PASSED"}
//! {"event":"fini","code":0}
//! ```

pub mod event_processor;
pub mod events;

pub use event_processor::{replay, spawn_reader, EventProcessor, ReplayStats};
pub use events::HostEvent;
