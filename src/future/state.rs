//! Declarative states: descriptors, wait strategies, and the
//! per-class registry.
//!
//! A state is a named, parameterisable readiness condition registered
//! against a future class ("expanded", "valueLike", ...). Descriptors
//! carry a synchronous predicate over the resolved target plus an
//! optional wait strategy: an event-name list (or arming function)
//! that shortcuts the poll interval when the widget library announces
//! a change.
//!
//! Widget libraries rename events across major versions, so the
//! registry is built once at startup for the active
//! [`ToolkitVariant`]; the variant-specific event tables are resolved
//! during that single pass and never consulted again.

use crate::host::{Element, Host, Subscription};
use crate::playable::ReadyCx;
use crate::player::WeakPlayer;
use crate::types::{Availability, Visibility};
use core::fmt;
use serde_json::Value;
use std::collections::HashMap;
use std::rc::Rc;

/// Major variant of the underlying widget library.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ToolkitVariant {
    /// The long-lived classic toolkit.
    #[default]
    Classic,
    /// The modern toolkit with renamed lifecycle events.
    Modern,
}

/// The future classes states can be registered against.
///
/// Lookup walks the class chain towards [`FutureClass::Element`], so a
/// state registered on a class is visible to its derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FutureClass {
    /// Bare element future.
    Element,
    /// Component-backed future.
    Component,
    /// Form field future.
    Field,
    /// List-like collection future.
    List,
    /// Tabular (grid) collection future.
    Tabular,
    /// One item of a list.
    Item,
    /// One row of a grid.
    Row,
    /// One cell of a row.
    Cell,
}

impl FutureClass {
    /// The class this one derives from, if any.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Element => None,
            Self::Component => Some(Self::Element),
            Self::Field | Self::List | Self::Tabular => Some(Self::Component),
            Self::Item | Self::Row | Self::Cell => Some(Self::Element),
        }
    }
}

/// Arguments handed to a state predicate.
pub type StateArgs = Vec<Value>;

/// Context handed to a state predicate on each check.
pub struct StateProbeCx<'a> {
    /// The collaborator bundle.
    pub host: &'a Host,
    /// The future's resolved element; `None` while (or once) nothing
    /// resolves, which "gone" states treat as satisfied.
    pub element: Option<&'a Element>,
    /// The state's invocation arguments.
    pub args: &'a [Value],
}

/// How a not-yet-satisfied state waits for change.
#[derive(Clone)]
pub enum WaitStrategy {
    /// Re-check on the player's poll interval only.
    Poll,
    /// Subscribe to the named widget events and re-check (after a
    /// short debounce) when one fires.
    Events(Vec<String>),
    /// Arm a custom subscription; the callback requests a re-check.
    Arm(Rc<dyn Fn(&StateProbeCx<'_>, Rc<dyn Fn()>) -> Subscription>),
}

impl fmt::Debug for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poll => write!(f, "Poll"),
            Self::Events(events) => f.debug_tuple("Events").field(events).finish(),
            Self::Arm(_) => write!(f, "Arm(..)"),
        }
    }
}

/// A registered state.
#[derive(Clone)]
pub struct StateDescriptor {
    /// State name; also the `waitingState` diagnostic tag.
    pub name: &'static str,
    /// Availability override; defaults to the future's policy.
    pub availability: Option<Availability>,
    /// Visibility override; defaults to the future's policy.
    pub visibility: Option<Visibility>,
    /// The synchronous predicate.
    pub predicate: Rc<dyn Fn(&StateProbeCx<'_>) -> bool>,
    /// The wait strategy.
    pub wait: WaitStrategy,
}

impl StateDescriptor {
    /// A polled state from a predicate.
    #[must_use]
    pub fn polled(
        name: &'static str,
        predicate: impl Fn(&StateProbeCx<'_>) -> bool + 'static,
    ) -> Self {
        Self {
            name,
            availability: None,
            visibility: None,
            predicate: Rc::new(predicate),
            wait: WaitStrategy::Poll,
        }
    }

    /// Sets an event-subscription wait strategy.
    #[must_use]
    pub fn on_events(mut self, events: &[&str]) -> Self {
        self.wait = WaitStrategy::Events(events.iter().map(ToString::to_string).collect());
        self
    }

    /// Sets the availability override.
    #[must_use]
    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = Some(availability);
        self
    }

    /// Sets the visibility override.
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

impl fmt::Debug for StateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateDescriptor")
            .field("name", &self.name)
            .field("wait", &self.wait)
            .finish()
    }
}

/// Per-class state registry, built once for the active toolkit
/// variant.
pub struct StateRegistry {
    variant: ToolkitVariant,
    by_class: HashMap<FutureClass, HashMap<&'static str, StateDescriptor>>,
}

impl StateRegistry {
    /// Builds the built-in descriptor tables for `variant`.
    #[must_use]
    pub fn for_variant(variant: ToolkitVariant) -> Self {
        let mut registry = Self {
            variant,
            by_class: HashMap::new(),
        };
        registry.install_builtins();
        registry
    }

    /// The variant this registry was built for.
    #[must_use]
    pub fn variant(&self) -> ToolkitVariant {
        self.variant
    }

    /// Registers (or replaces) a state on a class.
    pub fn register(&mut self, class: FutureClass, descriptor: StateDescriptor) {
        self.by_class
            .entry(class)
            .or_default()
            .insert(descriptor.name, descriptor);
    }

    /// Looks a state up, walking the class chain.
    #[must_use]
    pub fn lookup(&self, class: FutureClass, name: &str) -> Option<&StateDescriptor> {
        let mut cursor = Some(class);
        while let Some(class) = cursor {
            if let Some(descriptor) = self.by_class.get(&class).and_then(|map| map.get(name)) {
                return Some(descriptor);
            }
            cursor = class.parent();
        }
        None
    }

    fn install_builtins(&mut self) {
        let variant = self.variant;

        self.register(
            FutureClass::Element,
            StateDescriptor::polled("visible", |cx| {
                cx.element.is_some_and(Element::is_visible)
            })
            .visibility(Visibility::Visible),
        );
        self.register(
            FutureClass::Element,
            StateDescriptor::polled("hidden", |cx| {
                cx.element.is_some_and(|element| !element.is_visible())
            })
            .visibility(Visibility::Hidden),
        );
        self.register(
            FutureClass::Element,
            StateDescriptor::polled("destroyed", |cx| match cx.element {
                None => true,
                Some(element) => {
                    !element.is_attached() || cx.host.widgets().is_destroyed(element)
                }
            })
            .availability(Availability::Detached)
            .visibility(Visibility::Ignore),
        );

        self.register(
            FutureClass::Component,
            StateDescriptor::polled("viewReady", |cx| {
                cx.element
                    .is_some_and(|element| cx.host.widgets().is_view_ready(element))
            })
            .on_events(match variant {
                ToolkitVariant::Classic => &["boxready"],
                ToolkitVariant::Modern => &["painted"],
            }),
        );
        self.register(
            FutureClass::Component,
            StateDescriptor::polled("expanded", |cx| {
                cx.element
                    .is_some_and(|element| cx.host.widgets().is_expanded(element))
            })
            .on_events(match variant {
                ToolkitVariant::Classic => &["expand"],
                ToolkitVariant::Modern => &["expanded"],
            }),
        );
        self.register(
            FutureClass::Component,
            StateDescriptor::polled("collapsed", |cx| {
                cx.element
                    .is_some_and(|element| !cx.host.widgets().is_expanded(element))
            })
            .on_events(match variant {
                ToolkitVariant::Classic => &["collapse"],
                ToolkitVariant::Modern => &["collapsed"],
            }),
        );
        self.register(
            FutureClass::Component,
            StateDescriptor::polled("selected", |cx| {
                cx.element
                    .is_some_and(|element| cx.host.widgets().is_selected(element))
            })
            .on_events(&["select"]),
        );

        self.register(
            FutureClass::Field,
            StateDescriptor::polled("checked", |cx| {
                let want = cx.args.first().and_then(Value::as_bool).unwrap_or(true);
                cx.element
                    .is_some_and(|element| cx.host.widgets().is_checked(element) == want)
            })
            .on_events(&["change"]),
        );
        self.register(
            FutureClass::Field,
            StateDescriptor::polled("valueLike", |cx| {
                let Some(element) = cx.element else {
                    return false;
                };
                let Some(value) = cx.host.widgets().value(element) else {
                    return false;
                };
                match cx.args.first() {
                    Some(Value::String(pattern)) => match value {
                        Value::String(text) => text.contains(pattern.as_str()),
                        other => other.to_string().contains(pattern.as_str()),
                    },
                    Some(expected) => &value == expected,
                    None => false,
                }
            })
            .on_events(&["change"]),
        );
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateRegistry")
            .field("variant", &self.variant)
            .field("classes", &self.by_class.len())
            .finish()
    }
}

/// Builds the readiness predicate for a state playable: descriptor
/// predicate over the shared resolved target, with lazy arming of the
/// wait strategy and a debounced re-check poke on widget events.
pub(crate) fn state_ready_fn(
    descriptor: &StateDescriptor,
    args: StateArgs,
    player: WeakPlayer,
    debounce_ms: u64,
) -> impl FnMut(&mut ReadyCx<'_>) -> bool + 'static {
    let name = descriptor.name;
    let predicate = Rc::clone(&descriptor.predicate);
    let wait = descriptor.wait.clone();
    let mut armed: Option<Subscription> = None;

    move |cx: &mut ReadyCx<'_>| {
        let satisfied = {
            let probe = StateProbeCx {
                host: cx.host(),
                element: cx.target(),
                args: &args,
            };
            predicate(&probe)
        };
        if satisfied {
            // drops the subscription, tearing the listener down
            armed = None;
            cx.clear_waiting();
            return true;
        }

        if armed.is_none() && !matches!(wait, WaitStrategy::Poll) {
            let recheck: Rc<dyn Fn()> = {
                let player = player.clone();
                Rc::new(move || {
                    let Some(player) = player.upgrade() else {
                        return;
                    };
                    let poke = player.clone();
                    player
                        .host()
                        .scheduler()
                        .defer(Box::new(move || poke.poke()), debounce_ms);
                })
            };
            armed = match &wait {
                WaitStrategy::Poll => None,
                WaitStrategy::Events(events) => cx.target().map(|element| {
                    cx.host()
                        .widgets()
                        .subscribe(element, events, Rc::clone(&recheck))
                }),
                WaitStrategy::Arm(arm) => {
                    let probe = StateProbeCx {
                        host: cx.host(),
                        element: cx.target(),
                        args: &args,
                    };
                    Some(arm(&probe, recheck))
                }
            };
        }

        cx.set_waiting("target", name);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_class_chain() {
        let registry = StateRegistry::for_variant(ToolkitVariant::Classic);
        // "visible" is registered on Element but reachable from Cell
        assert!(registry.lookup(FutureClass::Cell, "visible").is_some());
        // "expanded" is on Component, invisible to bare elements
        assert!(registry.lookup(FutureClass::Element, "expanded").is_none());
        assert!(registry.lookup(FutureClass::Field, "expanded").is_some());
    }

    #[test]
    fn variant_selects_event_tables() {
        let classic = StateRegistry::for_variant(ToolkitVariant::Classic);
        let modern = StateRegistry::for_variant(ToolkitVariant::Modern);

        let events = |registry: &StateRegistry| {
            match &registry
                .lookup(FutureClass::Component, "expanded")
                .expect("registered")
                .wait
            {
                WaitStrategy::Events(events) => events.clone(),
                other => panic!("expected events strategy, got {other:?}"),
            }
        };
        assert_eq!(events(&classic), vec!["expand"]);
        assert_eq!(events(&modern), vec!["expanded"]);
    }

    #[test]
    fn user_registration_overrides_builtin() {
        let mut registry = StateRegistry::for_variant(ToolkitVariant::Classic);
        registry.register(
            FutureClass::Element,
            StateDescriptor::polled("visible", |_| true),
        );
        let descriptor = registry
            .lookup(FutureClass::Element, "visible")
            .expect("registered");
        assert!(matches!(descriptor.wait, WaitStrategy::Poll));
    }
}
