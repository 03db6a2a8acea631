//! Host event wire format

use serde::{Deserialize, Serialize};

use crate::domain::Address;
use crate::registry::{ImageInfo, MemoryRange};
use crate::session::RoutineInfo;

/// One callback from the instrumentation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// An image was mapped at `[low, high)`
    ImageLoad {
        path: String,
        low: u64,
        high: u64,
        #[serde(default)]
        main: bool,
    },
    /// A routine was found while instrumenting an image
    Routine {
        address: u64,
        symbol: String,
        #[serde(default)]
        size: u32,
        #[serde(default)]
        file: Option<String>,
        #[serde(default)]
        line: u32,
    },
    /// An instrumented routine is about to run
    Entry { address: u64 },
    /// The dump marker was called
    Marker { id: String },
    /// The target is about to start a child process
    Fork { pid: u32 },
    /// The target exited
    Fini {
        #[serde(default)]
        code: i32,
    },
}

impl HostEvent {
    /// Parse one line of the event stream
    ///
    /// # Errors
    /// Returns the JSON error for malformed lines
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Image description carried by an `image_load` event
    #[must_use]
    pub fn image_info(&self) -> Option<ImageInfo> {
        match self {
            HostEvent::ImageLoad { path, low, high, main } => Some(ImageInfo {
                path: path.clone(),
                range: MemoryRange { start: Address(*low), end: Address(*high) },
                is_main_executable: *main,
            }),
            _ => None,
        }
    }

    /// Routine description carried by a `routine` event
    #[must_use]
    pub fn routine_info(&self) -> Option<RoutineInfo> {
        match self {
            HostEvent::Routine { address, symbol, size, file, line } => Some(RoutineInfo {
                address: Address(*address),
                symbol: symbol.clone(),
                size: *size,
                source_file: file.clone(),
                source_line: *line,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_load() {
        let event =
            HostEvent::parse(r#"{"event":"image_load","path":"/bin/app","low":4096,"high":8192,"main":true}"#)
                .unwrap();
        let image = event.image_info().unwrap();
        assert!(image.is_main_executable);
        assert_eq!(image.range.start, Address(4096));
        assert_eq!(image.base_name(), "app");
    }

    #[test]
    fn test_parse_routine_defaults() {
        let event = HostEvent::parse(r#"{"event":"routine","address":4352,"symbol":"f"}"#).unwrap();
        let routine = event.routine_info().unwrap();
        assert_eq!(routine.size, 0);
        assert_eq!(routine.source_file, None);
        assert_eq!(routine.source_line, 0);
        assert!(event.image_info().is_none());
    }

    #[test]
    fn test_parse_marker_and_fini() {
        assert_eq!(
            HostEvent::parse(r#"{"event":"marker","id":"S.T___PASSED"}"#).unwrap(),
            HostEvent::Marker { id: "S.T___PASSED".to_string() }
        );
        assert_eq!(HostEvent::parse(r#"{"event":"fini"}"#).unwrap(), HostEvent::Fini { code: 0 });
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        assert!(HostEvent::parse(r#"{"event":"bogus"}"#).is_err());
        assert!(HostEvent::parse("not json").is_err());
    }

    #[test]
    fn test_serialize_uses_event_tag() {
        let json = serde_json::to_string(&HostEvent::Entry { address: 16 }).unwrap();
        assert_eq!(json, r#"{"event":"entry","address":16}"#);
    }
}
