//! The unit of scheduled work.
//!
//! A [`Playable`] is one queued item: an injectable DOM event, an
//! opaque callback, a pure delay, or a polled predicate. It carries
//! its own readiness policy, per-item timeout, diagnostic tags, and a
//! cached resolved element per target slot.
//!
//! Construction goes through [`PlayableBuilder`]; ids and
//! back-reference binding happen when the player enqueues the built
//! item.

use crate::host::{Element, Host};
use crate::locator::{Locator, TargetSpec};
use crate::types::{
    AnimationPolicy, Availability, PlayState, PlayableId, TargetSlot, Time, Visibility,
};
use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a queued playable.
pub type PlayableHandle = Rc<RefCell<Playable>>;

/// The four playable kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayableKind {
    /// Dispatches a DOM event through the injector.
    InjectedEvent,
    /// Invokes a user callback.
    Callback,
    /// Sleeps for its delay, then completes.
    WaitDelay,
    /// Polls a readiness predicate, dispatching nothing.
    WaitPredicate,
}

/// Modifier flags copied onto expanded sub-events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Meta/command key held.
    pub meta: bool,
    /// Shift key held.
    pub shift: bool,
    /// Control key held.
    pub ctrl: bool,
    /// Alt/option key held.
    pub alt: bool,
}

impl Modifiers {
    /// Returns true if no modifier is held.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.meta || self.shift || self.ctrl || self.alt)
    }
}

/// Type-specific payload of an injected event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSpec {
    /// DOM event type ("click", "pointerdown", ...) or a composite
    /// gesture name ("tap", "type") expanded at play time.
    pub event_type: String,
    /// Pointer x, relative to the target.
    pub x: Option<i32>,
    /// Pointer y, relative to the target.
    pub y: Option<i32>,
    /// Mouse button number.
    pub button: Option<u8>,
    /// Click detail counter.
    pub detail: Option<u32>,
    /// Key name for key events.
    pub key: Option<String>,
    /// Text typed by a "type" composite.
    pub text: Option<String>,
    /// Caret position applied before typing.
    pub caret: Option<usize>,
    /// Held modifier keys.
    pub modifiers: Modifiers,
}

impl EventSpec {
    /// Creates an event payload of the given type.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    /// Returns true for events that begin a gesture.
    #[must_use]
    pub fn is_gesture_start(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            "pointerdown" | "mousedown" | "touchstart"
        )
    }

    /// Returns true for events that end a gesture.
    #[must_use]
    pub fn is_gesture_end(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            "pointerup" | "mouseup" | "touchend"
        )
    }

    /// Copies modifier flags, button, and detail from `source` onto
    /// this event unless already present.
    pub fn inherit_modifiers(&mut self, source: &EventSpec) {
        if self.modifiers.is_empty() {
            self.modifiers = source.modifiers;
        }
        if self.button.is_none() {
            self.button = source.button;
        }
        if self.detail.is_none() {
            self.detail = source.detail;
        }
    }
}

/// Diagnostic tags describing what a not-ready playable is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiting {
    /// What is awaited ("target", "relatedTarget", "animations", or a
    /// user label).
    pub what: String,
    /// The condition that does not hold yet ("available", "visible",
    /// "expanded", ...).
    pub state: String,
}

/// Context handed to custom readiness predicates.
///
/// By contract a predicate calls [`set_waiting`](Self::set_waiting) on
/// failure and [`clear_waiting`](Self::clear_waiting) on success; the
/// bookkeeping drives diagnostics, not correctness.
pub struct ReadyCx<'a> {
    host: &'a Host,
    target: Option<Element>,
    waiting: &'a mut Option<Waiting>,
}

impl ReadyCx<'_> {
    /// The collaborator bundle.
    #[must_use]
    pub fn host(&self) -> &Host {
        self.host
    }

    /// The playable's resolved target, when one exists.
    #[must_use]
    pub fn target(&self) -> Option<&Element> {
        self.target.as_ref()
    }

    /// Stamps the diagnostic tags for a failed check.
    pub fn set_waiting(&mut self, what: impl Into<String>, state: impl Into<String>) {
        *self.waiting = Some(Waiting {
            what: what.into(),
            state: state.into(),
        });
    }

    /// Clears the diagnostic tags after a successful check.
    pub fn clear_waiting(&mut self) {
        *self.waiting = None;
    }
}

/// A readiness predicate.
pub type ReadyFn = Box<dyn FnMut(&mut ReadyCx<'_>) -> bool>;

/// How a playable decides it is ready to play.
pub enum Readiness {
    /// The default composite: animations, then target, then
    /// relatedTarget.
    Composite,
    /// The composite plus an extra predicate over the resolved target
    /// (state methods).
    CompositeAnd(ReadyFn),
    /// A full replacement for the composite (wait predicates).
    Custom(ReadyFn),
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composite => write!(f, "Composite"),
            Self::CompositeAnd(_) => write!(f, "CompositeAnd(..)"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Context handed to callback playables.
pub struct CallbackCx {
    pub(crate) player: crate::player::Player,
    pub(crate) id: PlayableId,
    pub(crate) value: Option<Element>,
}

impl CallbackCx {
    /// The player running this callback; enqueues made through it
    /// splice in front of the remaining queue.
    #[must_use]
    pub fn player(&self) -> &crate::player::Player {
        &self.player
    }

    /// Id of the playable the callback belongs to.
    #[must_use]
    pub fn id(&self) -> PlayableId {
        self.id
    }

    /// The playable's resolved target, when one exists.
    #[must_use]
    pub fn value(&self) -> Option<&Element> {
        self.value.as_ref()
    }
}

/// A user callback attached to a playable.
pub enum Callback {
    /// Completes when the function returns.
    Sync(Box<dyn FnOnce(&CallbackCx)>),
    /// Completes when the function's `done` continuation fires; armed
    /// with a watchdog for the playable's timeout.
    Async(Box<dyn FnOnce(&CallbackCx, crate::block::Done)>),
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Sync(..)"),
            Self::Async(_) => write!(f, "Async(..)"),
        }
    }
}

/// One queued scheduling unit.
#[derive(Debug)]
pub struct Playable {
    id: PlayableId,
    state: PlayState,
    target: Option<Locator>,
    related_target: Option<Locator>,
    resolved_target: Option<Element>,
    resolved_related: Option<Element>,
    availability: Availability,
    visibility: Visibility,
    animation: AnimationPolicy,
    readiness: Readiness,
    callback: Option<Callback>,
    event: Option<EventSpec>,
    delay_ms: Option<u64>,
    timeout_ms: Option<u64>,
    waiting: Option<Waiting>,
    wait_started: Option<Time>,
}

impl Playable {
    /// Id assigned at enqueue; [`PlayableId::UNASSIGNED`] before.
    #[must_use]
    pub fn id(&self) -> PlayableId {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: PlayableId) {
        self.id = id;
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PlayState {
        self.state
    }

    pub(crate) fn set_state(&mut self, next: PlayState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal playable transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    /// The playable's kind, derived from its payload.
    #[must_use]
    pub fn kind(&self) -> PlayableKind {
        if self.event.is_some() {
            PlayableKind::InjectedEvent
        } else if self.callback.is_some() {
            PlayableKind::Callback
        } else if matches!(self.readiness, Readiness::Custom(_) | Readiness::CompositeAnd(_)) {
            PlayableKind::WaitPredicate
        } else {
            PlayableKind::WaitDelay
        }
    }

    /// The event payload, for injected events.
    #[must_use]
    pub fn event(&self) -> Option<&EventSpec> {
        self.event.as_ref()
    }

    /// The DOM event type, for injected events.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_ref().map(|event| event.event_type.as_str())
    }

    /// The target locator, when one was given.
    #[must_use]
    pub fn target_locator(&self) -> Option<&Locator> {
        self.target.as_ref()
    }

    /// The related-target locator, when one was given.
    #[must_use]
    pub fn related_target_locator(&self) -> Option<&Locator> {
        self.related_target.as_ref()
    }

    /// The cached resolved target.
    #[must_use]
    pub fn resolved_target(&self) -> Option<Element> {
        self.resolved_target.clone()
    }

    /// The cached resolved related target.
    #[must_use]
    pub fn resolved_related_target(&self) -> Option<Element> {
        self.resolved_related.clone()
    }

    /// Post-previous-playable delay before the first readiness check.
    #[must_use]
    pub fn delay_ms(&self) -> Option<u64> {
        self.delay_ms
    }

    /// Per-playable readiness deadline; `Some(0)` disables.
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    pub(crate) fn set_timeout_ms(&mut self, ms: u64) {
        self.timeout_ms = Some(ms);
    }

    /// Diagnostic tags of the most recent failed readiness check.
    #[must_use]
    pub fn waiting(&self) -> Option<&Waiting> {
        self.waiting.as_ref()
    }

    /// Instant of the first not-ready observation, once one happened.
    #[must_use]
    pub fn wait_started(&self) -> Option<Time> {
        self.wait_started
    }

    pub(crate) fn stamp_wait_started(&mut self, now: Time) {
        if self.wait_started.is_none() {
            self.wait_started = Some(now);
        }
    }

    pub(crate) fn reset_pending_bookkeeping(&mut self) {
        self.wait_started = None;
    }

    pub(crate) fn take_callback(&mut self) -> Option<Callback> {
        self.callback.take()
    }

    pub(crate) fn set_waiting(&mut self, what: &str, state: &str) {
        self.waiting = Some(Waiting {
            what: what.to_string(),
            state: state.to_string(),
        });
    }

    /// Resolves one target slot, updating the cached wrapper.
    ///
    /// A selector that yields a different node than last tick rebinds
    /// the cached wrapper in place; the swap is not a failure. Shared
    /// locators adopt the upstream playable's wrapper so both observe
    /// one element.
    pub(crate) fn resolve_slot(&mut self, host: &Host, slot: TargetSlot) -> Option<Element> {
        let locator = match slot {
            TargetSlot::Target => self.target.clone(),
            TargetSlot::Related => self.related_target.clone(),
        }?;

        if let Locator::Shared(origin) = &locator {
            let upstream = origin.borrow().resolved_target();
            let cache = self.cache_mut(slot);
            upstream.inspect(|element| *cache = Some(element.clone()))
        } else {
            let node = locator.resolve(host)?;
            let cache = self.cache_mut(slot);
            if let Some(element) = cache {
                if element.node() != node {
                    element.rebind(node);
                }
                Some(element.clone())
            } else {
                let element = Element::wrap(Rc::clone(host.dom()), node);
                *cache = Some(element.clone());
                Some(element)
            }
        }
    }

    fn cache_mut(&mut self, slot: TargetSlot) -> &mut Option<Element> {
        match slot {
            TargetSlot::Target => &mut self.resolved_target,
            TargetSlot::Related => &mut self.resolved_related,
        }
    }

    fn slot_locator(&self, slot: TargetSlot) -> Option<&Locator> {
        match slot {
            TargetSlot::Target => self.target.as_ref(),
            TargetSlot::Related => self.related_target.as_ref(),
        }
    }

    /// Runs the readiness check, stamping diagnostic tags on failure.
    pub(crate) fn is_ready(&mut self, host: &Host) -> bool {
        if let Readiness::Custom(_) = self.readiness {
            let target = self.resolved_target.clone();
            if let Readiness::Custom(ready) = &mut self.readiness {
                let mut cx = ReadyCx {
                    host,
                    target,
                    waiting: &mut self.waiting,
                };
                return ready(&mut cx);
            }
        }

        if self.animation == AnimationPolicy::WaitForIdle && host.animations().any_active() {
            self.set_waiting("animations", "idle");
            return false;
        }

        if !self.slot_ready(host, TargetSlot::Target) {
            return false;
        }
        if !self.slot_ready(host, TargetSlot::Related) {
            return false;
        }

        if let Readiness::CompositeAnd(_) = self.readiness {
            let target = self.resolved_target.clone();
            if let Readiness::CompositeAnd(predicate) = &mut self.readiness {
                let mut cx = ReadyCx {
                    host,
                    target,
                    waiting: &mut self.waiting,
                };
                if !predicate(&mut cx) {
                    return false;
                }
            }
        }

        self.waiting = None;
        true
    }

    fn slot_ready(&mut self, host: &Host, slot: TargetSlot) -> bool {
        if self.slot_locator(slot).is_none() {
            return true;
        }

        let Some(element) = self.resolve_slot(host, slot) else {
            // An element that never turns up counts as detached.
            if self.availability == Availability::Detached {
                return true;
            }
            self.set_waiting(slot.as_str(), Availability::Attached.as_str());
            return false;
        };

        match self.availability {
            Availability::Attached if !element.is_attached() => {
                self.set_waiting(slot.as_str(), Availability::Attached.as_str());
                return false;
            }
            Availability::Detached if element.is_attached() => {
                self.set_waiting(slot.as_str(), Availability::Detached.as_str());
                return false;
            }
            _ => {}
        }

        match self.visibility {
            Visibility::Visible if !element.is_visible() => {
                self.set_waiting(slot.as_str(), Visibility::Visible.as_str());
                false
            }
            Visibility::Hidden if element.is_visible() => {
                self.set_waiting(slot.as_str(), Visibility::Hidden.as_str());
                false
            }
            _ => true,
        }
    }
}

/// Builder for [`Playable`]; finished items are handed to
/// [`Player::play`](crate::player::Player::play), which assigns the id
/// and binds back-references.
#[derive(Debug)]
pub struct PlayableBuilder {
    target: Option<TargetSpec>,
    related_target: Option<TargetSpec>,
    event: Option<EventSpec>,
    callback: Option<Callback>,
    readiness: Readiness,
    availability: Availability,
    visibility: Visibility,
    animation: AnimationPolicy,
    delay_ms: Option<u64>,
    timeout_ms: Option<u64>,
}

impl PlayableBuilder {
    fn empty() -> Self {
        Self {
            target: None,
            related_target: None,
            event: None,
            callback: None,
            readiness: Readiness::Composite,
            availability: Availability::default(),
            visibility: Visibility::default(),
            animation: AnimationPolicy::default(),
            delay_ms: None,
            timeout_ms: None,
        }
    }

    /// An injected-event playable of the given DOM event type (or the
    /// composite gesture names "tap" / "type").
    #[must_use]
    pub fn event(event_type: impl Into<String>) -> Self {
        let mut builder = Self::empty();
        builder.event = Some(EventSpec::new(event_type));
        builder
    }

    /// A callback playable completing when the function returns.
    #[must_use]
    pub fn callback(f: impl FnOnce(&CallbackCx) + 'static) -> Self {
        let mut builder = Self::empty();
        builder.callback = Some(Callback::Sync(Box::new(f)));
        builder.animation = AnimationPolicy::Ignore;
        builder
    }

    /// A callback playable completing when its `done` continuation
    /// fires.
    #[must_use]
    pub fn callback_async(
        f: impl FnOnce(&CallbackCx, crate::block::Done) + 'static,
    ) -> Self {
        let mut builder = Self::empty();
        builder.callback = Some(Callback::Async(Box::new(f)));
        builder.animation = AnimationPolicy::Ignore;
        builder
    }

    /// A pure-delay playable.
    #[must_use]
    pub fn wait(delay_ms: u64) -> Self {
        let mut builder = Self::empty();
        builder.delay_ms = Some(delay_ms);
        builder.animation = AnimationPolicy::Ignore;
        builder
    }

    /// A polled-predicate playable; the predicate replaces the
    /// composite readiness check.
    #[must_use]
    pub fn wait_predicate(ready: impl FnMut(&mut ReadyCx<'_>) -> bool + 'static) -> Self {
        let mut builder = Self::empty();
        builder.readiness = Readiness::Custom(Box::new(ready));
        builder.animation = AnimationPolicy::Ignore;
        builder
    }

    /// Sets the target.
    #[must_use]
    pub fn target(mut self, target: impl Into<TargetSpec>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the related target.
    #[must_use]
    pub fn related_target(mut self, target: impl Into<TargetSpec>) -> Self {
        self.related_target = Some(target.into());
        self
    }

    /// Sets the availability policy.
    #[must_use]
    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Sets the visibility policy.
    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the animation policy.
    #[must_use]
    pub fn animation(mut self, animation: AnimationPolicy) -> Self {
        self.animation = animation;
        self
    }

    /// Adds an extra readiness predicate on top of the composite
    /// checks (used by state methods).
    #[must_use]
    pub fn state_predicate(
        mut self,
        predicate: impl FnMut(&mut ReadyCx<'_>) -> bool + 'static,
    ) -> Self {
        self.readiness = Readiness::CompositeAnd(Box::new(predicate));
        self
    }

    /// Sets the pre-readiness delay.
    #[must_use]
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay_ms = Some(ms);
        self
    }

    /// Sets the readiness deadline; `0` disables.
    #[must_use]
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    /// Sets pointer coordinates.
    #[must_use]
    pub fn at(mut self, x: i32, y: i32) -> Self {
        if let Some(event) = &mut self.event {
            event.x = Some(x);
            event.y = Some(y);
        }
        self
    }

    /// Sets the mouse button.
    #[must_use]
    pub fn button(mut self, button: u8) -> Self {
        if let Some(event) = &mut self.event {
            event.button = Some(button);
        }
        self
    }

    /// Sets the click detail counter.
    #[must_use]
    pub fn detail(mut self, detail: u32) -> Self {
        if let Some(event) = &mut self.event {
            event.detail = Some(detail);
        }
        self
    }

    /// Sets the key name for key events.
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        if let Some(event) = &mut self.event {
            event.key = Some(key.into());
        }
        self
    }

    /// Sets the text for a "type" composite.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        if let Some(event) = &mut self.event {
            event.text = Some(text.into());
        }
        self
    }

    /// Sets the caret position applied before typing.
    #[must_use]
    pub fn caret(mut self, caret: usize) -> Self {
        if let Some(event) = &mut self.event {
            event.caret = Some(caret);
        }
        self
    }

    /// Sets modifier flags.
    #[must_use]
    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        if let Some(event) = &mut self.event {
            event.modifiers = modifiers;
        }
        self
    }

    pub(crate) fn target_spec(&self) -> Option<&TargetSpec> {
        self.target.as_ref()
    }

    pub(crate) fn related_target_spec(&self) -> Option<&TargetSpec> {
        self.related_target.as_ref()
    }

    /// Finishes into a [`Playable`] with bound locators. Internal;
    /// back-reference specs must already be resolved by the player.
    pub(crate) fn into_playable(
        self,
        target: Option<Locator>,
        related_target: Option<Locator>,
    ) -> Playable {
        Playable {
            id: PlayableId::UNASSIGNED,
            state: PlayState::Queued,
            target,
            related_target,
            resolved_target: None,
            resolved_related: None,
            availability: self.availability,
            visibility: self.visibility,
            animation: self.animation,
            readiness: self.readiness,
            callback: self.callback,
            event: self.event,
            delay_ms: self.delay_ms,
            timeout_ms: self.timeout_ms,
            waiting: None,
            wait_started: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_derived_from_payload() {
        let event = PlayableBuilder::event("click").into_playable(None, None);
        assert_eq!(event.kind(), PlayableKind::InjectedEvent);

        let callback = PlayableBuilder::callback(|_| {}).into_playable(None, None);
        assert_eq!(callback.kind(), PlayableKind::Callback);

        let wait = PlayableBuilder::wait(50).into_playable(None, None);
        assert_eq!(wait.kind(), PlayableKind::WaitDelay);

        let predicate =
            PlayableBuilder::wait_predicate(|_| true).into_playable(None, None);
        assert_eq!(predicate.kind(), PlayableKind::WaitPredicate);
    }

    #[test]
    fn wait_started_stamps_once() {
        let mut playable = PlayableBuilder::wait(0).into_playable(None, None);
        playable.stamp_wait_started(Time::from_millis(10));
        playable.stamp_wait_started(Time::from_millis(99));
        assert_eq!(playable.wait_started(), Some(Time::from_millis(10)));
    }

    #[test]
    fn modifier_inheritance_skips_present_fields() {
        let mut source = EventSpec::new("tap");
        source.modifiers.shift = true;
        source.button = Some(2);
        source.detail = Some(1);

        let mut sub = EventSpec::new("pointerdown");
        sub.button = Some(0);
        sub.inherit_modifiers(&source);

        assert!(sub.modifiers.shift);
        assert_eq!(sub.button, Some(0));
        assert_eq!(sub.detail, Some(1));
    }

    #[test]
    fn gesture_classification() {
        assert!(EventSpec::new("pointerdown").is_gesture_start());
        assert!(EventSpec::new("pointerup").is_gesture_end());
        assert!(!EventSpec::new("click").is_gesture_start());
        assert!(!EventSpec::new("click").is_gesture_end());
    }
}
