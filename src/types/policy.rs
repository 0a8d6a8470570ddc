//! Readiness policies and directional tokens.
//!
//! Every playable carries an availability, visibility, and animation
//! policy. The default composite readiness check (`Playable::is_ready`)
//! evaluates them in a fixed order; each variant's `as_str` form is the
//! `waitingState` tag used in timeout diagnostics.

use core::fmt;

/// Whether the resolved target must be attached to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Availability {
    /// The element must resolve and be attached (default).
    #[default]
    Attached,
    /// The element must be absent or detached.
    Detached,
    /// Attachment is not checked.
    Ignore,
}

impl Availability {
    /// The `waitingState` tag reported when this policy is unsatisfied.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attached => "available",
            Self::Detached => "removed",
            Self::Ignore => "ignored",
        }
    }
}

/// Whether the resolved target must be visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// The element must be visible (default).
    #[default]
    Visible,
    /// The element must be hidden.
    Hidden,
    /// Visibility is not checked.
    Ignore,
}

impl Visibility {
    /// The `waitingState` tag reported when this policy is unsatisfied.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Ignore => "ignored",
        }
    }
}

/// Whether readiness waits for host animations to go idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AnimationPolicy {
    /// Block readiness while any animation is active (default).
    #[default]
    WaitForIdle,
    /// Animations are not checked.
    Ignore,
}

/// Search direction for relational locator resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Search descendants of the root (default).
    #[default]
    Down,
    /// Search ancestors of the root.
    Up,
    /// Search direct children of the root.
    Child,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
            Self::Child => write!(f, "child"),
        }
    }
}

/// Which of a playable's two element slots a readiness check is
/// examining.
///
/// The target and related-target run the identical resolve/availability/
/// visibility pipeline; the slot selects the locator and the cache, and
/// names the failing side in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    /// The primary target.
    Target,
    /// The related target (e.g. a drag destination).
    Related,
}

impl TargetSlot {
    /// The `waitingFor` tag for this slot.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Related => "relatedTarget",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policies() {
        assert_eq!(Availability::default(), Availability::Attached);
        assert_eq!(Visibility::default(), Visibility::Visible);
        assert_eq!(AnimationPolicy::default(), AnimationPolicy::WaitForIdle);
        assert_eq!(Direction::default(), Direction::Down);
    }

    #[test]
    fn waiting_state_tags() {
        assert_eq!(Availability::Attached.as_str(), "available");
        assert_eq!(Availability::Detached.as_str(), "removed");
        assert_eq!(Visibility::Visible.as_str(), "visible");
        assert_eq!(Visibility::Hidden.as_str(), "hidden");
        assert_eq!(TargetSlot::Target.as_str(), "target");
        assert_eq!(TargetSlot::Related.as_str(), "relatedTarget");
    }
}
