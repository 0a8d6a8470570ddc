//! Player configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for a [`Player`](crate::player::Player).
///
/// All durations are milliseconds. A `default_timeout_ms` of `0`
/// disables timeouts entirely; per-playable timeouts override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Delay inserted before the first readiness check of an injected
    /// event (non-events default to zero).
    pub event_delay_ms: u64,
    /// Interval between readiness re-polls of a not-ready playable.
    pub poll_interval_ms: u64,
    /// Default per-playable readiness deadline. `0` disables.
    pub default_timeout_ms: u64,
    /// Debounce applied after an event-strategy state fires before the
    /// predicate is re-checked and the wait completes.
    pub state_debounce_ms: u64,
    /// Grace period before visual indicators are hidden after a
    /// failure.
    pub indicator_grace_ms: u64,
    /// Capture panics from user callbacks and convert them to errors.
    /// When false, panics propagate to the host.
    pub capture_panics: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            event_delay_ms: 100,
            poll_interval_ms: 10,
            default_timeout_ms: 5000,
            state_debounce_ms: 10,
            indicator_grace_ms: 250,
            capture_panics: true,
        }
    }
}

impl PlayerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inter-event delay.
    #[must_use]
    pub fn with_event_delay_ms(mut self, ms: u64) -> Self {
        self.event_delay_ms = ms;
        self
    }

    /// Sets the readiness poll interval.
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Sets the default readiness deadline. `0` disables timeouts.
    #[must_use]
    pub fn with_default_timeout_ms(mut self, ms: u64) -> Self {
        self.default_timeout_ms = ms;
        self
    }

    /// Sets the event-strategy state debounce.
    #[must_use]
    pub fn with_state_debounce_ms(mut self, ms: u64) -> Self {
        self.state_debounce_ms = ms;
        self
    }

    /// Enables or disables panic capture in user callbacks.
    #[must_use]
    pub fn with_capture_panics(mut self, capture: bool) -> Self {
        self.capture_panics = capture;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.event_delay_ms, 100);
        assert_eq!(config.poll_interval_ms, 10);
        assert_eq!(config.default_timeout_ms, 5000);
        assert!(config.capture_panics);
    }

    #[test]
    fn builder_chains() {
        let config = PlayerConfig::new()
            .with_event_delay_ms(0)
            .with_poll_interval_ms(1)
            .with_default_timeout_ms(0)
            .with_capture_panics(false);
        assert_eq!(config.event_delay_ms, 0);
        assert_eq!(config.default_timeout_ms, 0);
        assert!(!config.capture_panics);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"event_delay_ms": 5}"#).expect("parse");
        assert_eq!(config.event_delay_ms, 5);
        assert_eq!(config.poll_interval_ms, PlayerConfig::default().poll_interval_ms);
    }
}
