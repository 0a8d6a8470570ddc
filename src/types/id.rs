//! Identifier and time types for the player engine.
//!
//! `PlayableId` is a per-player monotonic sequence number used for
//! relative back-references and diagnostics. `Time` is a millisecond
//! wall-clock (or virtual-clock) instant with saturating arithmetic.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A unique, monotonically increasing identifier for a queued playable.
///
/// Ids are assigned at enqueue time by the owning player and never
/// reused within a player's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayableId(u64);

impl PlayableId {
    /// The id assigned to playables that have not been enqueued yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates an id from a raw sequence number (internal use).
    #[inline]
    #[must_use]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw sequence number.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true if this id has been assigned by a player.
    #[inline]
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for PlayableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayableId({})", self.0)
    }
}

impl fmt::Display for PlayableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A millisecond instant on the host scheduler's clock.
///
/// The zero point is the clock's creation; all arithmetic saturates so
/// deadline math never wraps.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Time(u64);

impl Time {
    /// The clock origin.
    pub const ZERO: Self = Self(0);

    /// Creates a time from milliseconds since the clock origin.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Returns the instant as milliseconds since the clock origin.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns this instant advanced by `ms` milliseconds.
    #[inline]
    #[must_use]
    pub const fn saturating_add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Returns the milliseconds elapsed since `earlier`, or zero if
    /// `earlier` is in the future.
    #[inline]
    #[must_use]
    pub const fn saturating_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ms)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playable_id_assignment() {
        assert!(!PlayableId::UNASSIGNED.is_assigned());
        assert!(PlayableId::from_raw(1).is_assigned());
        assert_eq!(PlayableId::from_raw(7).to_string(), "P7");
    }

    #[test]
    fn time_ordering_and_arithmetic() {
        let a = Time::from_millis(100);
        let b = Time::from_millis(250);
        assert!(a < b);
        assert_eq!(b.saturating_since(a), 150);
        assert_eq!(a.saturating_since(b), 0);
        assert_eq!(a.saturating_add_millis(50), Time::from_millis(150));
    }

    #[test]
    fn time_saturates_at_bounds() {
        let max = Time::from_millis(u64::MAX);
        assert_eq!(max.saturating_add_millis(1), max);
    }
}
