//! Error taxonomy for the player engine.
//!
//! Readiness failures are recoverable by polling and only surface as a
//! single [`EngineError::Timeout`] once the deadline passes. Callback
//! panics are captured (when enabled in config) and carried as
//! [`EngineError::Callback`]. A failed playable always empties the
//! remaining queue and fires `error` then `end` on the player.

use crate::types::Time;
use core::fmt;
use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Structured detail behind a readiness timeout.
///
/// Carries the `waitingFor` / `waitingState` diagnostic tags stamped by
/// the failing readiness check, plus the originating locator description
/// recovered by walking shared-target chains, and the event type the
/// playable would have dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutDetails {
    /// What the playable was waiting on ("target", "relatedTarget",
    /// "animations", or a user-supplied wait label).
    pub waiting_for: String,
    /// Human identifier of the awaited element, when one can be named:
    /// the locator expression, or the node's id or tag.
    pub selector: Option<String>,
    /// The condition that never held ("available", "visible", ...).
    pub waiting_state: String,
    /// DOM event type of the playable, when it had one.
    pub event_type: Option<String>,
    /// Configured deadline in milliseconds.
    pub timeout_ms: u64,
    /// Instant of the first not-ready observation.
    pub wait_started: Time,
}

impl fmt::Display for TimeoutDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timeout waiting for {}", self.waiting_for)?;
        if let Some(selector) = &self.selector {
            write!(f, " ({selector})")?;
        }
        write!(f, " to be {}", self.waiting_state)?;
        if let Some(event_type) = &self.event_type {
            write!(f, " for {event_type}")?;
        }
        Ok(())
    }
}

/// An error surfaced by the player, a block, or a watchdog.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A playable's readiness deadline passed.
    #[error("{0}")]
    Timeout(TimeoutDetails),

    /// A user callback panicked or reported failure through `fail`.
    #[error("callback failed: {message}")]
    Callback {
        /// Captured panic payload or the `fail` message.
        message: String,
    },

    /// An asynchronous block's watchdog expired before `done` was
    /// called.
    #[error("asynchronous block failed to complete within {timeout_ms}ms{}", watchdog_suffix(.explicit))]
    WatchDogExpired {
        /// The deadline that passed, in milliseconds.
        timeout_ms: u64,
        /// True when the timeout was supplied by the user rather than
        /// defaulted.
        explicit: bool,
    },

    /// An integer back-reference pointed before the start of the queue
    /// at enqueue time.
    #[error("back-reference {offset} exceeds the {queue_len} playable(s) queued")]
    BackReference {
        /// Requested distance, in playables.
        offset: usize,
        /// Queue length at enqueue time.
        queue_len: usize,
    },

    /// A global error was reported while no spec was running.
    #[error("no spec is currently running")]
    NoCurrentSpec,
}

fn watchdog_suffix(explicit: &bool) -> &'static str {
    if *explicit {
        ""
    } else {
        "; no explicit timeout was passed, did you forget to call done()?"
    }
}

impl EngineError {
    /// Creates a callback failure from a captured panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Callback { message }
    }

    /// Returns true if this error is a readiness timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_full_form() {
        let details = TimeoutDetails {
            waiting_for: "target".into(),
            selector: Some("#missing".into()),
            waiting_state: "available".into(),
            event_type: Some("click".into()),
            timeout_ms: 200,
            wait_started: Time::from_millis(10),
        };
        assert_eq!(
            details.to_string(),
            "Timeout waiting for target (#missing) to be available for click"
        );
    }

    #[test]
    fn timeout_message_omits_absent_parts() {
        let details = TimeoutDetails {
            waiting_for: "store loaded".into(),
            selector: None,
            waiting_state: "true".into(),
            event_type: None,
            timeout_ms: 500,
            wait_started: Time::ZERO,
        };
        assert_eq!(
            details.to_string(),
            "Timeout waiting for store loaded to be true"
        );
    }

    #[test]
    fn watchdog_messages_distinguish_explicit() {
        let explicit = EngineError::WatchDogExpired {
            timeout_ms: 100,
            explicit: true,
        };
        let default = EngineError::WatchDogExpired {
            timeout_ms: 100,
            explicit: false,
        };
        assert!(!explicit.to_string().contains("done()"));
        assert!(default.to_string().contains("did you forget to call done()?"));
    }

    #[test]
    fn panic_payload_conversion() {
        let err = EngineError::from_panic(&"boom");
        assert_eq!(
            err,
            EngineError::Callback {
                message: "boom".into()
            }
        );
        let err = EngineError::from_panic(&String::from("dynamic"));
        assert_eq!(
            err,
            EngineError::Callback {
                message: "dynamic".into()
            }
        );
    }
}
