//! Test lifecycle sequencing
//!
//! Converts the six test-framework callbacks into dump identifiers so every
//! segment is attributed to global setup, a suite fixture, a single test, or
//! a whole suite:
//!
//! ```text
//! program_start                      (no dump)
//!   suite_start("MathTests")         GLOBAL_TEST_SETUP        (first suite only)
//!     test_start("Add")              MathTests___setup        (first test only)
//!     test_end(Passed)               MathTests.Add___PASSED
//!   suite_end(Passed)                MathTests___PASSED
//! program_end                        GLOBAL_TEST_SETUP
//! ```

use log::debug;
use std::fmt;

use crate::marker::DumpSink;
use crate::{DUMP_SUFFIX_SEPARATOR, GLOBAL_TEST_SETUP, TEST_CASE_SEPARATOR};

/// Outcome of a test or suite as reported by the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestOutcome {
    Passed,
    Failed,
}

impl TestOutcome {
    #[must_use]
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequencer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Dump after every test of a parameterized suite. When disabled, tests of
    /// a parameterized suite accrue into the suite-level dump.
    pub per_parameterized_test_dumps: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self { per_parameterized_test_dumps: true }
    }
}

/// State machine driven by test-framework callbacks.
///
/// Callbacks must arrive in structural nesting order (program → suites →
/// tests). Each dump is emitted synchronously through the sink.
pub struct LifecycleSequencer<S: DumpSink> {
    config: SequencerConfig,
    sink: S,
    current_suite: String,
    current_test: String,
    suite_is_parameterized: bool,
    tests_seen_in_suite: usize,
    suites_seen_in_program: usize,
}

impl<S: DumpSink> LifecycleSequencer<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, SequencerConfig::default())
    }

    #[must_use]
    pub fn with_config(sink: S, config: SequencerConfig) -> Self {
        Self {
            config,
            sink,
            current_suite: String::new(),
            current_test: String::new(),
            suite_is_parameterized: false,
            tests_seen_in_suite: 0,
            suites_seen_in_program: 0,
        }
    }

    /// Coverage before the first suite is captured by the first suite's
    /// global-setup dump, so nothing happens here.
    pub fn program_start(&mut self) {}

    pub fn suite_start(&mut self, suite: &str) {
        self.current_suite.clear();
        self.current_suite.push_str(suite);
        // Parameterized instantiations are named `Prefix/Suite`
        if suite.contains('/') {
            self.suite_is_parameterized = true;
        }
        self.suites_seen_in_program += 1;
        if self.suites_seen_in_program == 1 {
            self.emit(GLOBAL_TEST_SETUP.to_string());
        }
    }

    pub fn test_start(&mut self, test: &str) {
        self.current_test = format!("{}{TEST_CASE_SEPARATOR}{test}", self.current_suite);
        self.tests_seen_in_suite += 1;
        if self.tests_seen_in_suite == 1 {
            self.emit(format!("{}{DUMP_SUFFIX_SEPARATOR}setup", self.current_suite));
        }
    }

    pub fn test_end(&mut self, outcome: TestOutcome) {
        if self.config.per_parameterized_test_dumps || !self.suite_is_parameterized {
            self.emit(format!("{}{DUMP_SUFFIX_SEPARATOR}{outcome}", self.current_test));
        }
    }

    pub fn suite_end(&mut self, outcome: TestOutcome) {
        self.emit(format!("{}{DUMP_SUFFIX_SEPARATOR}{outcome}", self.current_suite));
        self.tests_seen_in_suite = 0;
        self.suite_is_parameterized = false;
    }

    pub fn program_end(&mut self) {
        self.suites_seen_in_program = 0;
        self.emit(GLOBAL_TEST_SETUP.to_string());
    }

    /// Whether the suite currently running was detected as parameterized.
    #[must_use]
    pub fn suite_is_parameterized(&self) -> bool {
        self.suite_is_parameterized
    }

    /// Full identifier (`Suite.Test`) of the most recently started test.
    #[must_use]
    pub fn current_test(&self) -> &str {
        &self.current_test
    }

    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, identifier: String) {
        debug!("Dumping coverage with ID: {identifier}");
        self.sink.dump(&identifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl DumpSink for Recorder {
        fn dump(&mut self, identifier: &str) {
            self.0.push(identifier.to_string());
        }
    }

    fn run_suite(seq: &mut LifecycleSequencer<Recorder>, suite: &str, tests: &[&str]) {
        seq.suite_start(suite);
        for test in tests {
            seq.test_start(test);
            seq.test_end(TestOutcome::Passed);
        }
        seq.suite_end(TestOutcome::Passed);
    }

    #[test]
    fn test_single_suite_sequence() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        seq.program_start();
        run_suite(&mut seq, "MathTests", &["Add", "Sub"]);

        assert_eq!(
            seq.into_sink().0,
            vec![
                "GLOBAL_TEST_SETUP",
                "MathTests___setup",
                "MathTests.Add___PASSED",
                "MathTests.Sub___PASSED",
                "MathTests___PASSED",
            ]
        );
    }

    #[test]
    fn test_global_setup_only_for_first_suite() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        seq.program_start();
        run_suite(&mut seq, "A", &["x"]);
        run_suite(&mut seq, "B", &["y"]);
        seq.program_end();

        let dumps = seq.into_sink().0;
        assert_eq!(
            dumps,
            vec![
                "GLOBAL_TEST_SETUP",
                "A___setup",
                "A.x___PASSED",
                "A___PASSED",
                "B___setup",
                "B.y___PASSED",
                "B___PASSED",
                "GLOBAL_TEST_SETUP",
            ]
        );
    }

    #[test]
    fn test_program_end_resets_suite_counter() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        run_suite(&mut seq, "A", &[]);
        seq.program_end();
        run_suite(&mut seq, "B", &[]);

        let dumps = seq.into_sink().0;
        assert_eq!(dumps.iter().filter(|d| *d == GLOBAL_TEST_SETUP).count(), 3);
        assert_eq!(dumps[3], GLOBAL_TEST_SETUP);
    }

    #[test]
    fn test_failed_outcomes_are_encoded() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        seq.suite_start("IO");
        seq.test_start("Read");
        seq.test_end(TestOutcome::from_passed(false));
        seq.suite_end(TestOutcome::Failed);

        let dumps = seq.into_sink().0;
        assert_eq!(dumps[2], "IO.Read___FAILED");
        assert_eq!(dumps[3], "IO___FAILED");
    }

    #[test]
    fn test_parameterized_suite_without_per_test_dumps() {
        let config = SequencerConfig { per_parameterized_test_dumps: false };
        let mut seq = LifecycleSequencer::with_config(Recorder::default(), config);
        seq.suite_start("MathTests/0");
        assert!(seq.suite_is_parameterized());
        seq.test_start("Add");
        seq.test_end(TestOutcome::Passed);
        seq.test_start("Sub");
        seq.test_end(TestOutcome::Failed);
        seq.suite_end(TestOutcome::Failed);
        assert!(!seq.suite_is_parameterized());

        assert_eq!(
            seq.into_sink().0,
            vec!["GLOBAL_TEST_SETUP", "MathTests/0___setup", "MathTests/0___FAILED"]
        );
    }

    #[test]
    fn test_parameterized_suite_with_per_test_dumps() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        run_suite(&mut seq, "Inst/MathTests", &["Add/0", "Add/1"]);

        let dumps = seq.into_sink().0;
        assert!(dumps.contains(&"Inst/MathTests.Add/0___PASSED".to_string()));
        assert!(dumps.contains(&"Inst/MathTests.Add/1___PASSED".to_string()));
    }

    #[test]
    fn test_parameterized_flag_does_not_leak_into_next_suite() {
        let config = SequencerConfig { per_parameterized_test_dumps: false };
        let mut seq = LifecycleSequencer::with_config(Recorder::default(), config);
        run_suite(&mut seq, "P/0", &["t"]);
        run_suite(&mut seq, "Plain", &["t"]);

        let dumps = seq.into_sink().0;
        assert!(!dumps.contains(&"P/0.t___PASSED".to_string()));
        assert!(dumps.contains(&"Plain.t___PASSED".to_string()));
    }

    #[test]
    fn test_current_test_identifier() {
        let mut seq = LifecycleSequencer::new(Recorder::default());
        seq.suite_start("S");
        seq.test_start("T");
        assert_eq!(seq.current_test(), "S.T");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TestOutcome::Passed.to_string(), "PASSED");
        assert_eq!(TestOutcome::from_passed(false).as_str(), "FAILED");
    }
}
