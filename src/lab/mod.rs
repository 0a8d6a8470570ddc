//! Deterministic lab harness for testing.
//!
//! The lab provides:
//!
//! - Virtual time (no wall-clock dependencies)
//! - A deterministic timer wheel (same schedule → same execution)
//! - A scripted fake DOM with mutations at virtual deadlines
//! - A recording injector capturing every synthetic event
//! - A fake widget runtime with scripted records, selection, and
//!   scroller
//!
//! # Quick start
//!
//! ```
//! use domplay::lab::Lab;
//! use domplay::playable::PlayableBuilder;
//!
//! let lab = Lab::new();
//! lab.dom.insert("#btn", lab.dom.node("button").visible(true));
//!
//! let player = lab.player();
//! player
//!     .play(PlayableBuilder::event("click").target("#btn"))
//!     .expect("enqueue");
//! lab.run_until_idle();
//!
//! assert_eq!(lab.injector.event_types(), vec!["click"]);
//! ```

use crate::config::PlayerConfig;
use crate::host::{
    AnimationsProbe, DomBackend, Element, EventInjector, Host, HostScheduler, NodeId,
    ScrollOutcome, Subscription, TimerHandle, WidgetRuntime,
};
use crate::playable::EventSpec;
use crate::player::Player;
use crate::types::{Direction, Time};
use serde_json::{Map, Value};
use slab::Slab;
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::rc::Rc;

/// One armed lab timer awaiting its virtual deadline.
///
/// Slab keys are reused, so both the timer and its heap entry carry
/// the arming generation; a key only counts as the same timer while
/// the generations agree.
struct LabTimer {
    generation: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct TimerEntry {
    deadline: Time,
    generation: u64,
    key: usize,
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest deadline first);
        // generation breaks ties in arming order.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Virtual-clock scheduler: timers fire in deadline order with
/// arming-order tie-breaks, advancing the clock to each deadline.
pub struct LabScheduler {
    now: Cell<Time>,
    timers: RefCell<Slab<LabTimer>>,
    order: RefCell<BinaryHeap<TimerEntry>>,
    next_generation: Cell<u64>,
}

impl LabScheduler {
    /// Creates a scheduler at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Cell::new(Time::ZERO),
            timers: RefCell::new(Slab::new()),
            order: RefCell::new(BinaryHeap::new()),
            next_generation: Cell::new(0),
        }
    }

    /// Number of armed timers.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.timers.borrow().len()
    }

    fn pop_due(&self, limit: Option<Time>) -> Option<(Time, LabTimer)> {
        loop {
            let entry = {
                let mut order = self.order.borrow_mut();
                let entry = *order.peek()?;
                if limit.is_some_and(|limit| entry.deadline > limit) {
                    return None;
                }
                order.pop();
                entry
            };
            // cancelled timers leave stale heap entries behind; a
            // reused key with a different generation is not ours
            let timer = {
                let mut timers = self.timers.borrow_mut();
                if timers
                    .get(entry.key)
                    .is_some_and(|timer| timer.generation == entry.generation)
                {
                    timers.try_remove(entry.key)
                } else {
                    None
                }
            };
            if let Some(timer) = timer {
                return Some((entry.deadline, timer));
            }
        }
    }

    /// Runs timers in order until none are armed.
    pub fn run_until_idle(&self) {
        while let Some((deadline, timer)) = self.pop_due(None) {
            if deadline > self.now.get() {
                self.now.set(deadline);
            }
            (timer.callback)();
        }
    }

    /// Runs timers due at or before `deadline`, then parks the clock
    /// there.
    pub fn run_until(&self, deadline: Time) {
        while let Some((due, timer)) = self.pop_due(Some(deadline)) {
            if due > self.now.get() {
                self.now.set(due);
            }
            (timer.callback)();
        }
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }

    /// Advances the clock by `ms`, running timers that come due.
    pub fn advance(&self, ms: u64) {
        let deadline = self.now.get().saturating_add_millis(ms);
        self.run_until(deadline);
    }
}

impl Default for LabScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostScheduler for LabScheduler {
    fn defer(&self, callback: Box<dyn FnOnce()>, delay_ms: u64) -> TimerHandle {
        let deadline = self.now.get().saturating_add_millis(delay_ms);
        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);
        let key = self.timers.borrow_mut().insert(LabTimer {
            generation,
            callback,
        });
        self.order.borrow_mut().push(TimerEntry {
            deadline,
            generation,
            key,
        });
        TimerHandle::from_raw((generation << 16) | key as u64)
    }

    fn cancel(&self, handle: TimerHandle) {
        // the heap entry stays; pop_due skips stale generations
        let key = (handle.raw() & 0xFFFF) as usize;
        let generation = handle.raw() >> 16;
        let mut timers = self.timers.borrow_mut();
        if timers
            .get(key)
            .is_some_and(|timer| timer.generation == generation)
        {
            let _ = timers.try_remove(key);
        }
    }

    fn now(&self) -> Time {
        self.now.get()
    }
}

/// A scripted DOM node.
#[derive(Debug, Clone)]
pub struct FakeNode {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attached: bool,
    visible: bool,
    text: String,
    parent: Option<NodeId>,
}

impl FakeNode {
    /// Starts a node of the given tag: attached, hidden, no classes.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attached: true,
            visible: false,
            text: String::new(),
            parent: None,
        }
    }

    /// Sets the DOM id used by `describe`.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets visibility.
    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets attachment.
    #[must_use]
    pub fn attached(mut self, attached: bool) -> Self {
        self.attached = attached;
        self
    }

    /// Adds a CSS class.
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the parent node.
    #[must_use]
    pub fn parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Scripted DOM backend: nodes keyed by selector expressions.
pub struct FakeDom {
    nodes: RefCell<HashMap<NodeId, FakeNode>>,
    by_selector: RefCell<HashMap<String, NodeId>>,
    next: Cell<u64>,
}

impl FakeDom {
    /// Creates an empty DOM.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(HashMap::new()),
            by_selector: RefCell::new(HashMap::new()),
            next: Cell::new(1),
        }
    }

    /// Shorthand for [`FakeNode::new`].
    #[must_use]
    pub fn node(&self, tag: impl Into<String>) -> FakeNode {
        FakeNode::new(tag)
    }

    /// Inserts a node reachable through `selector`.
    pub fn insert(&self, selector: impl Into<String>, node: FakeNode) -> NodeId {
        let id = NodeId::from_raw(self.next.get());
        self.next.set(id.raw() + 1);
        self.nodes.borrow_mut().insert(id, node);
        self.by_selector.borrow_mut().insert(selector.into(), id);
        id
    }

    /// Repoints `selector` at a replacement node (wrapper-rebind
    /// scenarios).
    pub fn replace(&self, selector: &str, node: FakeNode) -> NodeId {
        let id = NodeId::from_raw(self.next.get());
        self.next.set(id.raw() + 1);
        self.nodes.borrow_mut().insert(id, node);
        self.by_selector.borrow_mut().insert(selector.to_string(), id);
        id
    }

    /// Removes the selector binding so the expression stops
    /// resolving.
    pub fn unbind(&self, selector: &str) {
        self.by_selector.borrow_mut().remove(selector);
    }

    /// Flips visibility.
    pub fn set_visible(&self, node: NodeId, visible: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&node) {
            node.visible = visible;
        }
    }

    /// Flips attachment.
    pub fn set_attached(&self, node: NodeId, attached: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&node) {
            node.attached = attached;
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut cursor = nodes.get(&node).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomBackend for FakeDom {
    fn is_attached(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .is_some_and(|node| node.attached)
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .is_some_and(|node| node.visible)
    }

    fn text(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(&node)
            .map(|node| node.text.clone())
            .unwrap_or_default()
    }

    fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        self.is_ancestor(ancestor, descendant)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn describe(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        match nodes.get(&node) {
            Some(FakeNode { id: Some(id), .. }) => format!("#{id}"),
            Some(FakeNode { tag, .. }) => format!("<{tag}>"),
            None => "<detached>".to_string(),
        }
    }

    fn find(
        &self,
        expression: &str,
        root: Option<NodeId>,
        direction: Direction,
    ) -> Option<NodeId> {
        let candidate = *self.by_selector.borrow().get(expression)?;
        match (root, direction) {
            (None, _) => Some(candidate),
            (Some(root), Direction::Down) => {
                self.is_ancestor(root, candidate).then_some(candidate)
            }
            (Some(root), Direction::Up) => {
                self.is_ancestor(candidate, root).then_some(candidate)
            }
            (Some(root), Direction::Child) => {
                let nodes = self.nodes.borrow();
                (nodes.get(&candidate).and_then(|n| n.parent) == Some(root))
                    .then_some(candidate)
            }
        }
    }
}

/// One captured synthetic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedEvent {
    /// DOM event type.
    pub event_type: String,
    /// Resolved target node.
    pub target: NodeId,
    /// Resolved related target, when present.
    pub related: Option<NodeId>,
    /// Key name, for key events.
    pub key: Option<String>,
    /// Pointer x.
    pub x: Option<i32>,
    /// Pointer y.
    pub y: Option<i32>,
    /// Mouse button.
    pub button: Option<u8>,
    /// Held modifier keys.
    pub modifiers: crate::playable::Modifiers,
}

/// Injector that records instead of dispatching.
pub struct RecordingInjector {
    events: RefCell<Vec<InjectedEvent>>,
}

impl RecordingInjector {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    /// Everything captured so far.
    #[must_use]
    pub fn events(&self) -> Vec<InjectedEvent> {
        self.events.borrow().clone()
    }

    /// Just the event types, in dispatch order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }

    /// Drops everything captured so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Default for RecordingInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl EventInjector for RecordingInjector {
    fn inject(&self, event: &EventSpec, target: &Element, related: Option<&Element>) {
        self.events.borrow_mut().push(InjectedEvent {
            event_type: event.event_type.clone(),
            target: target.node(),
            related: related.map(Element::node),
            key: event.key.clone(),
            x: event.x,
            y: event.y,
            button: event.button,
            modifiers: event.modifiers,
        });
    }
}

/// Animations probe with a scriptable flag.
pub struct FakeAnimations {
    active: Cell<bool>,
}

impl FakeAnimations {
    /// Creates an idle probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Cell::new(false),
        }
    }

    /// Scripts the animation flag.
    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }
}

impl Default for FakeAnimations {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationsProbe for FakeAnimations {
    fn any_active(&self) -> bool {
        self.active.get()
    }
}

/// One scripted record of a fake collection.
#[derive(Debug, Clone)]
pub struct FakeRecord {
    /// Record id.
    pub id: Value,
    /// Record fields.
    pub properties: Map<String, Value>,
    /// Rendered node, when the record has one.
    pub node: Option<NodeId>,
}

impl FakeRecord {
    /// A record with an id and no fields.
    #[must_use]
    pub fn new(id: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            properties: Map::new(),
            node: None,
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Sets the rendered node.
    #[must_use]
    pub fn node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

/// A scripted collection backing a list or grid element.
#[derive(Debug, Clone, Default)]
pub struct FakeCollection {
    /// Records in store order.
    pub records: Vec<FakeRecord>,
    /// Selected record indexes.
    pub selection: BTreeSet<usize>,
    /// Column ids in header order.
    pub columns: Vec<String>,
    /// Rendered cell nodes by (row, column).
    pub cells: HashMap<(usize, usize), NodeId>,
    /// Whether scrolling completes asynchronously.
    pub async_scroll: bool,
}

struct ListenerEntry {
    node: NodeId,
    events: Vec<String>,
    callback: Rc<dyn Fn()>,
}

/// Scripted widget runtime: component flags, widget events, and fake
/// collections.
pub struct FakeWidgets {
    scheduler: Rc<LabScheduler>,
    expanded: RefCell<HashMap<NodeId, bool>>,
    checked: RefCell<HashMap<NodeId, bool>>,
    selected: RefCell<HashMap<NodeId, bool>>,
    destroyed: RefCell<HashMap<NodeId, bool>>,
    view_ready: RefCell<HashMap<NodeId, bool>>,
    values: RefCell<HashMap<NodeId, Value>>,
    collections: RefCell<HashMap<NodeId, FakeCollection>>,
    listeners: Rc<RefCell<Slab<ListenerEntry>>>,
    /// Virtual latency of the asynchronous scroller.
    pub scroll_latency_ms: Cell<u64>,
}

impl FakeWidgets {
    /// Creates an empty runtime over the lab scheduler (the
    /// asynchronous scroller defers through it).
    #[must_use]
    pub fn new(scheduler: Rc<LabScheduler>) -> Self {
        Self {
            scheduler,
            expanded: RefCell::new(HashMap::new()),
            checked: RefCell::new(HashMap::new()),
            selected: RefCell::new(HashMap::new()),
            destroyed: RefCell::new(HashMap::new()),
            view_ready: RefCell::new(HashMap::new()),
            values: RefCell::new(HashMap::new()),
            collections: RefCell::new(HashMap::new()),
            listeners: Rc::new(RefCell::new(Slab::new())),
            scroll_latency_ms: Cell::new(20),
        }
    }

    /// Scripts the expanded flag, firing `event` when given.
    pub fn set_expanded(&self, node: NodeId, expanded: bool, event: Option<&str>) {
        self.expanded.borrow_mut().insert(node, expanded);
        if let Some(event) = event {
            self.fire(node, event);
        }
    }

    /// Scripts the checked flag.
    pub fn set_checked(&self, node: NodeId, checked: bool) {
        self.checked.borrow_mut().insert(node, checked);
        self.fire(node, "change");
    }

    /// Scripts the component-selected flag.
    pub fn set_component_selected(&self, node: NodeId, selected: bool) {
        self.selected.borrow_mut().insert(node, selected);
        self.fire(node, "select");
    }

    /// Scripts the destroyed flag.
    pub fn set_destroyed(&self, node: NodeId) {
        self.destroyed.borrow_mut().insert(node, true);
    }

    /// Scripts the view-ready flag, firing the lifecycle `event` when
    /// given.
    pub fn set_view_ready(&self, node: NodeId, ready: bool, event: Option<&str>) {
        self.view_ready.borrow_mut().insert(node, ready);
        if let Some(event) = event {
            self.fire(node, event);
        }
    }

    /// Installs a collection behind a component node.
    pub fn install_collection(&self, node: NodeId, collection: FakeCollection) {
        self.collections.borrow_mut().insert(node, collection);
    }

    /// Read access to a collection's current state.
    #[must_use]
    pub fn collection(&self, node: NodeId) -> Option<FakeCollection> {
        self.collections.borrow().get(&node).cloned()
    }

    /// Number of live widget event listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Fires a widget event at every matching listener.
    pub fn fire(&self, node: NodeId, event: &str) {
        let callbacks: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, entry)| {
                entry.node == node && entry.events.iter().any(|e| e == event)
            })
            .map(|(_, entry)| Rc::clone(&entry.callback))
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

impl WidgetRuntime for FakeWidgets {
    fn is_expanded(&self, el: &Element) -> bool {
        self.expanded
            .borrow()
            .get(&el.node())
            .copied()
            .unwrap_or(false)
    }

    fn is_checked(&self, el: &Element) -> bool {
        self.checked
            .borrow()
            .get(&el.node())
            .copied()
            .unwrap_or(false)
    }

    fn is_selected(&self, el: &Element) -> bool {
        self.selected
            .borrow()
            .get(&el.node())
            .copied()
            .unwrap_or(false)
    }

    fn is_destroyed(&self, el: &Element) -> bool {
        self.destroyed
            .borrow()
            .get(&el.node())
            .copied()
            .unwrap_or(false)
    }

    fn is_view_ready(&self, el: &Element) -> bool {
        self.view_ready
            .borrow()
            .get(&el.node())
            .copied()
            .unwrap_or(true)
    }

    fn value(&self, el: &Element) -> Option<Value> {
        self.values.borrow().get(&el.node()).cloned()
    }

    fn set_value(&self, el: &Element, value: &Value) {
        self.values.borrow_mut().insert(el.node(), value.clone());
        self.fire(el.node(), "change");
    }

    fn subscribe(&self, el: &Element, events: &[String], callback: Rc<dyn Fn()>) -> Subscription {
        let key = self.listeners.borrow_mut().insert(ListenerEntry {
            node: el.node(),
            events: events.to_vec(),
            callback,
        });
        let listeners = Rc::clone(&self.listeners);
        Subscription::new(Box::new(move || {
            let _ = listeners.borrow_mut().try_remove(key);
        }))
    }

    fn record_count(&self, el: &Element) -> usize {
        self.collections
            .borrow()
            .get(&el.node())
            .map_or(0, |collection| collection.records.len())
    }

    fn index_of_id(&self, el: &Element, id: &Value) -> Option<usize> {
        self.collections
            .borrow()
            .get(&el.node())?
            .records
            .iter()
            .position(|record| &record.id == id)
    }

    fn index_where(&self, el: &Element, property: &str, value: &Value) -> Option<usize> {
        self.collections
            .borrow()
            .get(&el.node())?
            .records
            .iter()
            .position(|record| record.properties.get(property) == Some(value))
    }

    fn indexes_where(&self, el: &Element, property: &str, value: &Value) -> Vec<usize> {
        self.collections
            .borrow()
            .get(&el.node())
            .map_or_else(Vec::new, |collection| {
                collection
                    .records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| record.properties.get(property) == Some(value))
                    .map(|(index, _)| index)
                    .collect()
            })
    }

    fn node_for_record(&self, el: &Element, index: usize) -> Option<NodeId> {
        self.collections
            .borrow()
            .get(&el.node())?
            .records
            .get(index)?
            .node
    }

    fn selected_indexes(&self, el: &Element) -> Vec<usize> {
        self.collections
            .borrow()
            .get(&el.node())
            .map_or_else(Vec::new, |collection| {
                collection.selection.iter().copied().collect()
            })
    }

    fn select_indexes(&self, el: &Element, indexes: &[usize], keep_existing: bool) {
        if let Some(collection) = self.collections.borrow_mut().get_mut(&el.node()) {
            if !keep_existing {
                collection.selection.clear();
            }
            collection.selection.extend(indexes.iter().copied());
        }
    }

    fn deselect_indexes(&self, el: &Element, indexes: &[usize]) {
        if let Some(collection) = self.collections.borrow_mut().get_mut(&el.node()) {
            for index in indexes {
                collection.selection.remove(index);
            }
        }
    }

    fn column_count(&self, el: &Element) -> usize {
        self.collections
            .borrow()
            .get(&el.node())
            .map_or(0, |collection| collection.columns.len())
    }

    fn column_index_by_id(&self, el: &Element, id: &str) -> Option<usize> {
        self.collections
            .borrow()
            .get(&el.node())?
            .columns
            .iter()
            .position(|column| column == id)
    }

    fn column_index_where(&self, el: &Element, _property: &str, value: &Value) -> Option<usize> {
        let id = value.as_str()?;
        self.column_index_by_id(el, id)
    }

    fn node_for_cell(&self, el: &Element, row: usize, column: usize) -> Option<NodeId> {
        self.collections
            .borrow()
            .get(&el.node())?
            .cells
            .get(&(row, column))
            .copied()
    }

    fn scroll_to_record(
        &self,
        el: &Element,
        _index: usize,
        on_end: Box<dyn FnOnce()>,
    ) -> ScrollOutcome {
        let asynchronous = self
            .collections
            .borrow()
            .get(&el.node())
            .is_some_and(|collection| collection.async_scroll);
        if asynchronous {
            self.scheduler.defer(on_end, self.scroll_latency_ms.get());
            ScrollOutcome::Pending
        } else {
            ScrollOutcome::Completed
        }
    }
}

/// The assembled lab: scheduler, fake DOM, recorder, probe, widgets,
/// and a pre-built [`Host`].
pub struct Lab {
    /// The virtual clock and timer wheel.
    pub scheduler: Rc<LabScheduler>,
    /// The scripted DOM.
    pub dom: Rc<FakeDom>,
    /// The recording injector.
    pub injector: Rc<RecordingInjector>,
    /// The scriptable animations probe.
    pub animations: Rc<FakeAnimations>,
    /// The scripted widget runtime.
    pub widgets: Rc<FakeWidgets>,
    host: Host,
}

impl Lab {
    /// Assembles a fresh lab.
    #[must_use]
    pub fn new() -> Self {
        let scheduler = Rc::new(LabScheduler::new());
        let dom = Rc::new(FakeDom::new());
        let injector = Rc::new(RecordingInjector::new());
        let animations = Rc::new(FakeAnimations::new());
        let widgets = Rc::new(FakeWidgets::new(Rc::clone(&scheduler)));
        let host = Host::builder(
            Rc::clone(&scheduler) as Rc<dyn HostScheduler>,
            Rc::clone(&dom) as Rc<dyn DomBackend>,
            Rc::clone(&injector) as Rc<dyn EventInjector>,
        )
        .animations(Rc::clone(&animations) as Rc<dyn AnimationsProbe>)
        .widgets(Rc::clone(&widgets) as Rc<dyn WidgetRuntime>)
        .build();
        Self {
            scheduler,
            dom,
            injector,
            animations,
            widgets,
            host,
        }
    }

    /// A clone of the assembled host.
    #[must_use]
    pub fn host(&self) -> Host {
        self.host.clone()
    }

    /// The tight default tuning tests run with: no inter-event delay,
    /// short polls.
    #[must_use]
    pub fn test_config() -> PlayerConfig {
        PlayerConfig::new()
            .with_event_delay_ms(0)
            .with_poll_interval_ms(10)
            .with_default_timeout_ms(5000)
    }

    /// A player over this lab with [`Self::test_config`].
    #[must_use]
    pub fn player(&self) -> Player {
        Player::new(self.host(), Self::test_config())
    }

    /// A player over this lab with explicit tuning.
    #[must_use]
    pub fn player_with(&self, config: PlayerConfig) -> Player {
        Player::new(self.host(), config)
    }

    /// Scripts a mutation at a virtual deadline.
    pub fn at(&self, ms_from_now: u64, f: impl FnOnce() + 'static) {
        self.scheduler.defer(Box::new(f), ms_from_now);
    }

    /// Runs everything to quiescence.
    pub fn run_until_idle(&self) {
        self.scheduler.run_until_idle();
    }

    /// Advances virtual time by `ms`.
    pub fn advance(&self, ms: u64) {
        self.scheduler.advance(ms);
    }

    /// The current virtual instant.
    #[must_use]
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }
}

impl Default for Lab {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_then_arming_order() {
        let scheduler = LabScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("b", 20u64), ("a", 10), ("c", 20)] {
            let log = Rc::clone(&log);
            scheduler.defer(
                Box::new(move || log.borrow_mut().push(label)),
                delay,
            );
        }
        scheduler.run_until_idle();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), Time::from_millis(20));
    }

    #[test]
    fn cancel_prevents_firing() {
        let scheduler = LabScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let handle = scheduler.defer(Box::new(move || flag.set(true)), 10);
        scheduler.cancel(handle);
        scheduler.run_until_idle();
        assert!(!fired.get());
    }

    #[test]
    fn timers_scheduled_during_run_also_fire() {
        let scheduler = Rc::new(LabScheduler::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_log = Rc::clone(&log);
        let inner_scheduler = Rc::clone(&scheduler);
        scheduler.defer(
            Box::new(move || {
                inner_log.borrow_mut().push("outer");
                let log = Rc::clone(&inner_log);
                inner_scheduler.defer(Box::new(move || log.borrow_mut().push("inner")), 5);
            }),
            10,
        );
        scheduler.run_until_idle();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
        assert_eq!(scheduler.now(), Time::from_millis(15));
    }

    #[test]
    fn fake_dom_scoped_find() {
        let dom = FakeDom::new();
        let parent = dom.insert("#panel", FakeNode::new("div").id("panel"));
        let child = dom.insert("#inner", FakeNode::new("span").id("inner").parent(parent));

        assert_eq!(dom.find("#inner", Some(parent), Direction::Down), Some(child));
        assert_eq!(dom.find("#inner", Some(parent), Direction::Child), Some(child));
        assert_eq!(dom.find("#panel", Some(child), Direction::Up), Some(parent));
        assert_eq!(dom.find("#panel", Some(child), Direction::Down), None);
    }

    #[test]
    fn run_until_parks_the_clock() {
        let scheduler = LabScheduler::new();
        scheduler.run_until(Time::from_millis(100));
        assert_eq!(scheduler.now(), Time::from_millis(100));
    }
}
