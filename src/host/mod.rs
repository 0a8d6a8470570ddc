//! External collaborator seams.
//!
//! The engine owns no DOM, no event loop, and no widget library. Each
//! of those concerns enters through one trait here, bundled into a
//! [`Host`] that is injected wherever the engine needs to reach out
//! (no static globals). No-op implementations are provided for the
//! optional collaborators.
//!
//! - [`HostScheduler`]: timer deferral and the clock
//! - [`DomBackend`]: node queries and the pluggable `find`
//! - [`EventInjector`]: synthetic DOM event dispatch
//! - [`AnimationsProbe`]: animation-idle gating
//! - [`VisualFeedback`]: pointer/gesture indicators
//! - [`GestureObserver`]: framework gesture-completion handshake
//! - [`WidgetRuntime`]: widget-library probes and the collection
//!   contract

pub mod dom;

pub use dom::{DomBackend, Element, NodeId};

use crate::playable::EventSpec;
use crate::types::Time;
use core::fmt;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Cancellation handle for a deferred callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a handle from a raw scheduler key.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw scheduler key.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Timer scheduling and the clock.
///
/// The engine advances exclusively through `defer` callbacks; it never
/// blocks and never re-enters itself synchronously.
pub trait HostScheduler {
    /// Schedules `callback` to run after `delay_ms` milliseconds.
    fn defer(&self, callback: Box<dyn FnOnce()>, delay_ms: u64) -> TimerHandle;
    /// Cancels a previously deferred callback. Unknown or already
    /// fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
    /// Returns the current instant.
    fn now(&self) -> Time;
}

/// Probe for active animations; readiness gates on idle by default.
pub trait AnimationsProbe {
    /// Returns true while any animation is running.
    fn any_active(&self) -> bool;
}

/// Synthesises and dispatches the DOM event encoded in a playable
/// against the resolved target.
pub trait EventInjector {
    /// Dispatches `event` at `target`, with `related` as the DOM
    /// relatedTarget where the event type carries one.
    fn inject(&self, event: &EventSpec, target: &Element, related: Option<&Element>);
}

/// Pointer and gesture indicators; purely cosmetic.
pub trait VisualFeedback {
    /// Moves the pointer indicator.
    fn show_pointer(&self, x: i32, y: i32);
    /// Hides the pointer indicator.
    fn hide_pointer(&self);
    /// Shows the gesture-in-progress indicator.
    fn show_gesture(&self);
    /// Hides the gesture-in-progress indicator.
    fn hide_gesture(&self);
}

/// No-op [`VisualFeedback`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopVisualFeedback;

impl VisualFeedback for NoopVisualFeedback {
    fn show_pointer(&self, _x: i32, _y: i32) {}
    fn hide_pointer(&self) {}
    fn show_gesture(&self) {}
    fn hide_gesture(&self) {}
}

/// Optional framework handshake consulted by tap's readiness tail.
pub trait GestureObserver {
    /// Arms gesture observation.
    fn activate(&self);
    /// Disarms gesture observation.
    fn deactivate(&self);
    /// Returns true once the framework reports the gesture finished
    /// against the target.
    fn complete(&self, target: &Element, gesture: &str) -> bool;
}

/// Teardown for a widget event subscription. Dropping it removes the
/// underlying listener.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wraps a teardown closure.
    #[must_use]
    pub fn new(teardown: Box<dyn FnOnce()>) -> Self {
        Self {
            teardown: Some(teardown),
        }
    }

    /// A subscription with nothing to tear down.
    #[must_use]
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// Removes the underlying listener now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("armed", &self.teardown.is_some())
            .finish()
    }
}

/// Outcome of a collection scroll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The collection has no asynchronous scroller; the node is in
    /// view already.
    Completed,
    /// The scroller is moving; the `on_end` callback fires at scroll
    /// end.
    Pending,
}

/// Widget-library surface: component probes, event subscription, and
/// the collection (store/view) contract consumed by item, row, and
/// cell futures.
///
/// Every method takes the component's resolved element; implementors
/// map it back to their component instance.
pub trait WidgetRuntime {
    // component probes
    /// Returns true if the component is expanded.
    fn is_expanded(&self, el: &Element) -> bool;
    /// Returns true if the component is checked.
    fn is_checked(&self, el: &Element) -> bool;
    /// Returns true if the component is selected.
    fn is_selected(&self, el: &Element) -> bool;
    /// Returns true once the component has been destroyed.
    fn is_destroyed(&self, el: &Element) -> bool;
    /// Returns true once the component's view is fully rendered.
    fn is_view_ready(&self, el: &Element) -> bool;
    /// Reads the component's value, when it has one.
    fn value(&self, el: &Element) -> Option<Value>;
    /// Writes the component's value through the widget API.
    fn set_value(&self, el: &Element, value: &Value);
    /// Arms a listener for any of `events` on the component.
    fn subscribe(&self, el: &Element, events: &[String], callback: Rc<dyn Fn()>) -> Subscription;

    // collection contract
    /// Number of records backing the collection.
    fn record_count(&self, el: &Element) -> usize;
    /// Index of the record with the given id.
    fn index_of_id(&self, el: &Element, id: &Value) -> Option<usize>;
    /// Index of the first record whose `property` equals `value`.
    fn index_where(&self, el: &Element, property: &str, value: &Value) -> Option<usize>;
    /// Indexes of every record whose `property` equals `value`,
    /// ascending (linear scan).
    fn indexes_where(&self, el: &Element, property: &str, value: &Value) -> Vec<usize>;
    /// DOM node rendered for the record at `index`.
    fn node_for_record(&self, el: &Element, index: usize) -> Option<NodeId>;
    /// Indexes of the currently selected records, ascending.
    fn selected_indexes(&self, el: &Element) -> Vec<usize>;
    /// Selects the records at `indexes`, optionally keeping the
    /// existing selection.
    fn select_indexes(&self, el: &Element, indexes: &[usize], keep_existing: bool);
    /// Removes the records at `indexes` from the selection.
    fn deselect_indexes(&self, el: &Element, indexes: &[usize]);
    /// Number of columns, for tabular collections.
    fn column_count(&self, el: &Element) -> usize;
    /// Column index by column id.
    fn column_index_by_id(&self, el: &Element, id: &str) -> Option<usize>;
    /// Column index of the first column whose `property` equals
    /// `value` (e.g. `dataIndex`).
    fn column_index_where(&self, el: &Element, property: &str, value: &Value) -> Option<usize>;
    /// DOM node rendered for the cell at `row`/`column`.
    fn node_for_cell(&self, el: &Element, row: usize, column: usize) -> Option<NodeId>;
    /// Scrolls the record at `index` into view. Returns
    /// [`ScrollOutcome::Pending`] when `on_end` will fire at scroll
    /// end, [`ScrollOutcome::Completed`] for synchronous scrollers.
    fn scroll_to_record(
        &self,
        el: &Element,
        index: usize,
        on_end: Box<dyn FnOnce()>,
    ) -> ScrollOutcome;
}

/// [`WidgetRuntime`] for pages without a widget library: probes report
/// false, collections are empty, subscriptions are inert.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWidgetRuntime;

impl WidgetRuntime for NoopWidgetRuntime {
    fn is_expanded(&self, _el: &Element) -> bool {
        false
    }
    fn is_checked(&self, _el: &Element) -> bool {
        false
    }
    fn is_selected(&self, _el: &Element) -> bool {
        false
    }
    fn is_destroyed(&self, _el: &Element) -> bool {
        false
    }
    fn is_view_ready(&self, _el: &Element) -> bool {
        true
    }
    fn value(&self, _el: &Element) -> Option<Value> {
        None
    }
    fn set_value(&self, _el: &Element, _value: &Value) {}
    fn subscribe(
        &self,
        _el: &Element,
        _events: &[String],
        _callback: Rc<dyn Fn()>,
    ) -> Subscription {
        Subscription::noop()
    }
    fn record_count(&self, _el: &Element) -> usize {
        0
    }
    fn index_of_id(&self, _el: &Element, _id: &Value) -> Option<usize> {
        None
    }
    fn index_where(&self, _el: &Element, _property: &str, _value: &Value) -> Option<usize> {
        None
    }
    fn indexes_where(&self, _el: &Element, _property: &str, _value: &Value) -> Vec<usize> {
        Vec::new()
    }
    fn node_for_record(&self, _el: &Element, _index: usize) -> Option<NodeId> {
        None
    }
    fn selected_indexes(&self, _el: &Element) -> Vec<usize> {
        Vec::new()
    }
    fn select_indexes(&self, _el: &Element, _indexes: &[usize], _keep_existing: bool) {}
    fn deselect_indexes(&self, _el: &Element, _indexes: &[usize]) {}
    fn column_count(&self, _el: &Element) -> usize {
        0
    }
    fn column_index_by_id(&self, _el: &Element, _id: &str) -> Option<usize> {
        None
    }
    fn column_index_where(&self, _el: &Element, _property: &str, _value: &Value) -> Option<usize> {
        None
    }
    fn node_for_cell(&self, _el: &Element, _row: usize, _column: usize) -> Option<NodeId> {
        None
    }
    fn scroll_to_record(
        &self,
        _el: &Element,
        _index: usize,
        _on_end: Box<dyn FnOnce()>,
    ) -> ScrollOutcome {
        ScrollOutcome::Completed
    }
}

/// `AnimationsProbe` that always reports idle.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnimations;

impl AnimationsProbe for NoAnimations {
    fn any_active(&self) -> bool {
        false
    }
}

/// The bundle of collaborators injected into the engine.
///
/// Cheap to clone; all clones share the same collaborators.
#[derive(Clone)]
pub struct Host {
    inner: Rc<HostInner>,
}

struct HostInner {
    scheduler: Rc<dyn HostScheduler>,
    dom: Rc<dyn DomBackend>,
    injector: Rc<dyn EventInjector>,
    animations: Rc<dyn AnimationsProbe>,
    visual: Rc<dyn VisualFeedback>,
    widgets: Rc<dyn WidgetRuntime>,
    gestures: RefCell<Option<Rc<dyn GestureObserver>>>,
}

impl Host {
    /// Starts building a host from the three required collaborators.
    #[must_use]
    pub fn builder(
        scheduler: Rc<dyn HostScheduler>,
        dom: Rc<dyn DomBackend>,
        injector: Rc<dyn EventInjector>,
    ) -> HostBuilder {
        HostBuilder {
            scheduler,
            dom,
            injector,
            animations: None,
            visual: None,
            widgets: None,
            gestures: None,
        }
    }

    /// The timer scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Rc<dyn HostScheduler> {
        &self.inner.scheduler
    }

    /// The DOM backend.
    #[must_use]
    pub fn dom(&self) -> &Rc<dyn DomBackend> {
        &self.inner.dom
    }

    /// The event injector.
    #[must_use]
    pub fn injector(&self) -> &Rc<dyn EventInjector> {
        &self.inner.injector
    }

    /// The animations probe.
    #[must_use]
    pub fn animations(&self) -> &Rc<dyn AnimationsProbe> {
        &self.inner.animations
    }

    /// The visual feedback collaborator.
    #[must_use]
    pub fn visual(&self) -> &Rc<dyn VisualFeedback> {
        &self.inner.visual
    }

    /// The widget runtime.
    #[must_use]
    pub fn widgets(&self) -> &Rc<dyn WidgetRuntime> {
        &self.inner.widgets
    }

    /// The gesture observer, when one is registered.
    #[must_use]
    pub fn gestures(&self) -> Option<Rc<dyn GestureObserver>> {
        self.inner.gestures.borrow().clone()
    }

    /// Registers or clears the gesture observer at runtime.
    pub fn set_gestures(&self, gestures: Option<Rc<dyn GestureObserver>>) {
        *self.inner.gestures.borrow_mut() = gestures;
    }

    /// Current instant on the host clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.inner.scheduler.now()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("gestures", &self.inner.gestures.borrow().is_some())
            .finish()
    }
}

/// Builder for [`Host`]; optional collaborators default to no-ops.
pub struct HostBuilder {
    scheduler: Rc<dyn HostScheduler>,
    dom: Rc<dyn DomBackend>,
    injector: Rc<dyn EventInjector>,
    animations: Option<Rc<dyn AnimationsProbe>>,
    visual: Option<Rc<dyn VisualFeedback>>,
    widgets: Option<Rc<dyn WidgetRuntime>>,
    gestures: Option<Rc<dyn GestureObserver>>,
}

impl HostBuilder {
    /// Installs an animations probe.
    #[must_use]
    pub fn animations(mut self, probe: Rc<dyn AnimationsProbe>) -> Self {
        self.animations = Some(probe);
        self
    }

    /// Installs a visual feedback collaborator.
    #[must_use]
    pub fn visual(mut self, visual: Rc<dyn VisualFeedback>) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Installs a widget runtime.
    #[must_use]
    pub fn widgets(mut self, widgets: Rc<dyn WidgetRuntime>) -> Self {
        self.widgets = Some(widgets);
        self
    }

    /// Installs a gesture observer.
    #[must_use]
    pub fn gestures(mut self, gestures: Rc<dyn GestureObserver>) -> Self {
        self.gestures = Some(gestures);
        self
    }

    /// Finishes the host.
    #[must_use]
    pub fn build(self) -> Host {
        Host {
            inner: Rc::new(HostInner {
                scheduler: self.scheduler,
                dom: self.dom,
                injector: self.injector,
                animations: self.animations.unwrap_or_else(|| Rc::new(NoAnimations)),
                visual: self.visual.unwrap_or_else(|| Rc::new(NoopVisualFeedback)),
                widgets: self.widgets.unwrap_or_else(|| Rc::new(NoopWidgetRuntime)),
                gestures: RefCell::new(self.gestures),
            }),
        }
    }
}
