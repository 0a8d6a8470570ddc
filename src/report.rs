//! Reporter surface and status glue.
//!
//! The engine does not talk to any concrete test framework. Block
//! outcomes are translated into the abstract [`Reporter`] interface by
//! a [`StatusReporter`], which also tracks the currently running spec
//! so global errors can be attributed to it.

use crate::block::BlockOutcome;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// One recorded expectation of a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Whether the expectation held.
    pub passed: bool,
    /// Human-readable description of the failure.
    pub message: String,
}

/// Final result of one spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOutcome {
    /// Framework-assigned spec id.
    pub id: String,
    /// Spec name.
    pub name: String,
    /// True when every expectation held.
    pub passed: bool,
    /// Recorded expectations; the engine only records failed ones.
    pub expectations: Vec<Expectation>,
    /// True when the spec was skipped.
    pub disabled: bool,
}

/// Abstract test-run reporter implemented by the surrounding runner.
pub trait Reporter {
    /// A suite was entered during registration.
    fn suite_enter(&self, name: &str);
    /// A suite was left during registration.
    fn suite_leave(&self, name: &str);
    /// A suite began executing.
    fn suite_started(&self, name: &str);
    /// A suite finished executing.
    fn suite_finished(&self, name: &str);
    /// A spec began executing.
    fn test_started(&self, id: &str, name: &str);
    /// A spec finished executing.
    fn test_finished(&self, outcome: &SpecOutcome);
}

struct CurrentSpec {
    id: String,
    name: String,
    extra_failures: Vec<String>,
}

/// Translates block outcomes to the [`Reporter`] interface and owns
/// the "current spec" used for global-error attribution.
pub struct StatusReporter {
    reporter: Rc<dyn Reporter>,
    suites: RefCell<Vec<String>>,
    current: RefCell<Option<CurrentSpec>>,
}

impl StatusReporter {
    /// Creates the glue over a concrete reporter.
    #[must_use]
    pub fn new(reporter: Rc<dyn Reporter>) -> Self {
        Self {
            reporter,
            suites: RefCell::new(Vec::new()),
            current: RefCell::new(None),
        }
    }

    /// Enters a suite; suites nest.
    pub fn suite_enter(&self, name: impl Into<String>) {
        let name = name.into();
        self.reporter.suite_enter(&name);
        self.reporter.suite_started(&name);
        self.suites.borrow_mut().push(name);
    }

    /// Leaves the innermost suite.
    pub fn suite_leave(&self) {
        if let Some(name) = self.suites.borrow_mut().pop() {
            self.reporter.suite_finished(&name);
            self.reporter.suite_leave(&name);
        }
    }

    /// The current suite nesting path.
    #[must_use]
    pub fn suite_path(&self) -> Vec<String> {
        self.suites.borrow().clone()
    }

    /// Marks a spec as started and current.
    pub fn spec_started(&self, id: impl Into<String>, name: impl Into<String>) {
        let id = id.into();
        let name = name.into();
        self.reporter.test_started(&id, &name);
        *self.current.borrow_mut() = Some(CurrentSpec {
            id,
            name,
            extra_failures: Vec::new(),
        });
    }

    /// Reports a disabled spec without running it.
    pub fn spec_disabled(&self, id: impl Into<String>, name: impl Into<String>) {
        let outcome = SpecOutcome {
            id: id.into(),
            name: name.into(),
            passed: false,
            expectations: Vec::new(),
            disabled: true,
        };
        self.reporter.test_finished(&outcome);
    }

    /// Finishes the current spec from a block outcome, folding in any
    /// globally captured errors.
    pub fn spec_finished(&self, outcome: &BlockOutcome) {
        let Some(current) = self.current.borrow_mut().take() else {
            return;
        };
        let mut expectations: Vec<Expectation> = outcome
            .failures
            .iter()
            .map(|message| Expectation {
                passed: false,
                message: message.clone(),
            })
            .collect();
        expectations.extend(current.extra_failures.into_iter().map(|message| {
            Expectation {
                passed: false,
                message,
            }
        }));

        let spec = SpecOutcome {
            id: current.id,
            name: current.name,
            passed: expectations.is_empty(),
            expectations,
            disabled: false,
        };
        debug!(id = %spec.id, passed = spec.passed, "spec finished");
        self.reporter.test_finished(&spec);
    }

    /// Attributes an out-of-band error (e.g. a window error event) to
    /// the running spec as a failed expectation.
    ///
    /// Errors raised while no spec is running are the caller's
    /// problem: [`EngineError::NoCurrentSpec`] is returned.
    pub fn capture_global_error(&self, message: impl Into<String>) -> Result<()> {
        let mut current = self.current.borrow_mut();
        match current.as_mut() {
            Some(current) => {
                current.extra_failures.push(message.into());
                Ok(())
            }
            None => Err(EngineError::NoCurrentSpec),
        }
    }

    /// True while a spec is running.
    #[must_use]
    pub fn spec_running(&self) -> bool {
        self.current.borrow().is_some()
    }
}

impl std::fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusReporter")
            .field("suites", &self.suites.borrow())
            .field("spec_running", &self.spec_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingReporter {
        events: RefCell<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn suite_enter(&self, name: &str) {
            self.events.borrow_mut().push(format!("enter {name}"));
        }
        fn suite_leave(&self, name: &str) {
            self.events.borrow_mut().push(format!("leave {name}"));
        }
        fn suite_started(&self, name: &str) {
            self.events.borrow_mut().push(format!("suite+ {name}"));
        }
        fn suite_finished(&self, name: &str) {
            self.events.borrow_mut().push(format!("suite- {name}"));
        }
        fn test_started(&self, id: &str, _name: &str) {
            self.events.borrow_mut().push(format!("test+ {id}"));
        }
        fn test_finished(&self, outcome: &SpecOutcome) {
            self.events
                .borrow_mut()
                .push(format!("test- {} passed={}", outcome.id, outcome.passed));
        }
    }

    #[test]
    fn suite_nesting_round_trip() {
        let reporter = Rc::new(RecordingReporter::default());
        let status = StatusReporter::new(Rc::clone(&reporter) as Rc<dyn Reporter>);
        status.suite_enter("outer");
        status.suite_enter("inner");
        assert_eq!(status.suite_path(), vec!["outer", "inner"]);
        status.suite_leave();
        status.suite_leave();
        assert_eq!(
            *reporter.events.borrow(),
            vec![
                "enter outer",
                "suite+ outer",
                "enter inner",
                "suite+ inner",
                "suite- inner",
                "leave inner",
                "suite- outer",
                "leave outer"
            ]
        );
    }

    #[test]
    fn global_error_requires_running_spec() {
        let reporter = Rc::new(RecordingReporter::default());
        let status = StatusReporter::new(reporter as Rc<dyn Reporter>);
        assert_eq!(
            status.capture_global_error("boom"),
            Err(EngineError::NoCurrentSpec)
        );

        status.spec_started("s1", "first");
        assert!(status.capture_global_error("boom").is_ok());

        status.spec_finished(&BlockOutcome {
            passed: true,
            failures: Vec::new(),
        });
        assert!(!status.spec_running());
    }

    #[test]
    fn spec_outcome_folds_block_and_global_failures() {
        let reporter = Rc::new(RecordingReporter::default());
        let status = StatusReporter::new(Rc::clone(&reporter) as Rc<dyn Reporter>);
        status.spec_started("s1", "first");
        status.capture_global_error("window error").expect("running");
        status.spec_finished(&BlockOutcome {
            passed: false,
            failures: vec!["timeout".into()],
        });
        assert_eq!(
            reporter.events.borrow().last().map(String::as_str),
            Some("test- s1 passed=false")
        );
    }
}
