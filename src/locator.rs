//! Symbolic target resolution.
//!
//! A [`Locator`] converts a symbolic target into a concrete element at
//! the moment of use. String expressions go through the backend's
//! pluggable `find`; functions are re-invoked on every readiness tick;
//! shared locators bind to an upstream playable's resolved-target
//! cache so a chain of playables observes one element; relative
//! locators scope a fresh query to a parent playable's element.
//!
//! Integer back-references never appear here: the player resolves them
//! into [`Locator::Shared`] at enqueue time (see
//! [`Player::play`](crate::player::Player::play)), so they survive
//! queue head removals.

use crate::host::{Host, NodeId};
use crate::playable::PlayableHandle;
use crate::types::Direction;
use core::fmt;
use std::rc::Rc;

/// A symbolic target, resolved anew on each readiness tick.
#[derive(Clone)]
pub enum Locator {
    /// A query expression in the host system's dialect.
    Selector(String),
    /// A concrete DOM node; wrapped unchanged.
    Node(NodeId),
    /// A resolver function. Returning `None` (even after a previous
    /// success) leaves the playable not-ready.
    Func {
        /// Human description used in timeout diagnostics.
        describe: String,
        /// The resolver, invoked each tick.
        resolve: Rc<dyn Fn(&Host) -> Option<NodeId>>,
    },
    /// Shares the resolved target of an upstream playable.
    Shared(PlayableHandle),
    /// A query scoped to an upstream playable's element, searching in
    /// the given direction.
    Relative {
        /// The playable whose resolved element scopes the query.
        origin: PlayableHandle,
        /// Search direction from the origin element.
        direction: Direction,
        /// The scoped query expression.
        expression: String,
    },
}

impl Locator {
    /// Builds a resolver-function locator.
    #[must_use]
    pub fn func(
        describe: impl Into<String>,
        resolve: impl Fn(&Host) -> Option<NodeId> + 'static,
    ) -> Self {
        Self::Func {
            describe: describe.into(),
            resolve: Rc::new(resolve),
        }
    }

    /// Attempts to resolve to a concrete node right now.
    ///
    /// `Shared` locators do not resolve to a node themselves; the
    /// caller shares the upstream element wrapper instead (see
    /// [`Playable::resolve_slot`](crate::playable::Playable::resolve_slot)).
    #[must_use]
    pub fn resolve(&self, host: &Host) -> Option<NodeId> {
        match self {
            Self::Selector(expression) => {
                host.dom().find(expression, None, Direction::Down)
            }
            Self::Node(node) => Some(*node),
            Self::Func { resolve, .. } => resolve(host),
            Self::Shared(origin) => origin
                .borrow()
                .resolved_target()
                .map(|element| element.node()),
            Self::Relative {
                origin,
                direction,
                expression,
            } => {
                let root = origin.borrow().resolved_target()?;
                host.dom().find(expression, Some(root.node()), *direction)
            }
        }
    }

    /// Human identifier of the originating locator, for timeout
    /// messages.
    ///
    /// Walks shared-target chains back to the locator that first named
    /// the element.
    #[must_use]
    pub fn describe(&self, host: &Host) -> Option<String> {
        match self {
            Self::Selector(expression) => Some(expression.clone()),
            Self::Node(node) => Some(host.dom().describe(*node)),
            Self::Func { describe, .. } => Some(describe.clone()),
            Self::Shared(origin) => {
                let origin = origin.borrow();
                if let Some(described) = origin
                    .target_locator()
                    .and_then(|locator| locator.describe(host))
                {
                    return Some(described);
                }
                origin.resolved_target().map(|element| element.describe())
            }
            Self::Relative { expression, .. } => Some(expression.clone()),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(expression) => f.debug_tuple("Selector").field(expression).finish(),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::Func { describe, .. } => f.debug_tuple("Func").field(describe).finish(),
            Self::Shared(origin) => f
                .debug_tuple("Shared")
                .field(&origin.borrow().id())
                .finish(),
            Self::Relative {
                direction,
                expression,
                ..
            } => f
                .debug_struct("Relative")
                .field("direction", direction)
                .field("expression", expression)
                .finish(),
        }
    }
}

impl From<&str> for Locator {
    fn from(expression: &str) -> Self {
        Self::Selector(expression.to_string())
    }
}

impl From<String> for Locator {
    fn from(expression: String) -> Self {
        Self::Selector(expression)
    }
}

impl From<NodeId> for Locator {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// A target as written by the caller: a locator, or an integer
/// back-reference resolved by the player at enqueue time.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// A locator used as-is.
    Locator(Locator),
    /// The playable `n` positions earlier in the queue at enqueue
    /// time; shares its resolved target.
    Back(usize),
}

impl From<Locator> for TargetSpec {
    fn from(locator: Locator) -> Self {
        Self::Locator(locator)
    }
}

impl From<&str> for TargetSpec {
    fn from(expression: &str) -> Self {
        Self::Locator(Locator::from(expression))
    }
}

impl From<String> for TargetSpec {
    fn from(expression: String) -> Self {
        Self::Locator(Locator::from(expression))
    }
}

impl From<NodeId> for TargetSpec {
    fn from(node: NodeId) -> Self {
        Self::Locator(Locator::Node(node))
    }
}

impl TargetSpec {
    /// A back-reference `n` positions up the queue.
    #[must_use]
    pub const fn back(n: usize) -> Self {
        Self::Back(n)
    }
}
