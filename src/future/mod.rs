//! The futures layer: fluent builders that translate chained method
//! calls on a symbolic locator into playables.
//!
//! A future is a handle to a deferred element or component. Its
//! construction enqueues a single root playable that resolves the
//! element and caches it; every action, state, inspection, and wait
//! method enqueues further playables that share the root's resolved
//! element through back-references. Nested chains built from inside
//! inspection callbacks splice in source order (see
//! [`Player::play`](crate::player::Player::play)).
//!
//! - [`state`]: declarative state descriptors and the variant-aware
//!   registry
//! - [`select`]: the selection mixin for list-like futures
//! - [`element`], [`component`], [`field`]: scalar futures
//! - [`list`], [`tabular`]: collection futures with item/row/cell
//!   derivations

pub mod component;
pub mod element;
pub mod field;
pub mod list;
pub mod select;
pub mod state;
pub mod tabular;

pub use component::ComponentFuture;
pub use element::ElementFuture;
pub use field::FieldFuture;
pub use list::{ItemFuture, ListFuture, RecordLocator};
pub use select::{RecordSelector, Selectable};
pub use state::{
    FutureClass, StateArgs, StateDescriptor, StateProbeCx, StateRegistry, ToolkitVariant,
    WaitStrategy,
};
pub use tabular::{CellFuture, ColumnLocator, RowFuture, TabularFuture};

use crate::block::Done;
use crate::host::Element;
use crate::locator::{Locator, TargetSpec};
use crate::playable::{PlayableBuilder, PlayableHandle};
use crate::player::Player;
use crate::types::{Direction, Visibility};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Shared context handed to every future: the player plus the state
/// registry resolved once at startup.
#[derive(Clone)]
pub struct FutureCx {
    player: Player,
    registry: Rc<StateRegistry>,
}

impl FutureCx {
    /// Builds a context over `player`, constructing the registry for
    /// the active toolkit variant.
    #[must_use]
    pub fn new(player: Player, variant: ToolkitVariant) -> Self {
        Self {
            player,
            registry: Rc::new(StateRegistry::for_variant(variant)),
        }
    }

    /// Builds a context over a pre-built (possibly user-extended)
    /// registry.
    #[must_use]
    pub fn with_registry(player: Player, registry: Rc<StateRegistry>) -> Self {
        Self { player, registry }
    }

    /// The player chains enqueue into.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }

    /// The state registry.
    #[must_use]
    pub fn registry(&self) -> &Rc<StateRegistry> {
        &self.registry
    }
}

impl std::fmt::Debug for FutureCx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureCx")
            .field("variant", &self.registry.variant())
            .finish()
    }
}

/// The locator binding and chain bookkeeping shared by every future
/// type.
#[derive(Clone, Debug)]
pub struct FutureCore {
    cx: FutureCx,
    class: FutureClass,
    root: PlayableHandle,
    chain_timeout: Rc<Cell<Option<u64>>>,
}

impl FutureCore {
    /// Enqueues the root-binding playable and wraps its handle.
    ///
    /// The root waits for existence only: visibility and animation
    /// checks are disabled.
    pub(crate) fn bind(
        cx: FutureCx,
        class: FutureClass,
        locator: Locator,
        timeout_ms: Option<u64>,
    ) -> Self {
        let mut builder = PlayableBuilder::wait(0)
            .target(TargetSpec::Locator(locator))
            .visibility(Visibility::Ignore);
        if let Some(ms) = timeout_ms {
            builder = builder.timeout_ms(ms);
        }
        let root = match cx.player().play(builder) {
            Ok(handle) => handle,
            // unreachable: locator specs carry no back-references
            Err(error) => {
                cx.player().fail_with(error);
                Rc::new(RefCell::new(
                    PlayableBuilder::wait(0).into_playable(None, None),
                ))
            }
        };
        Self {
            cx,
            class,
            root,
            chain_timeout: Rc::new(Cell::new(timeout_ms)),
        }
    }

    /// The shared context.
    #[must_use]
    pub fn cx(&self) -> &FutureCx {
        &self.cx
    }

    /// The future class used for state lookup.
    #[must_use]
    pub fn class(&self) -> FutureClass {
        self.class
    }

    /// The root-binding playable.
    #[must_use]
    pub fn root(&self) -> &PlayableHandle {
        &self.root
    }

    /// The element resolved by the root playable, once it resolved.
    #[must_use]
    pub fn resolved(&self) -> Option<Element> {
        self.root.borrow().resolved_target()
    }

    /// A target spec sharing the root's resolved element.
    pub(crate) fn shared_target(&self) -> TargetSpec {
        TargetSpec::Locator(Locator::Shared(Rc::clone(&self.root)))
    }

    /// Applies the chain timeout to a builder.
    pub(crate) fn with_timeout(&self, builder: PlayableBuilder) -> PlayableBuilder {
        match self.chain_timeout.get() {
            Some(ms) => builder.timeout_ms(ms),
            None => builder,
        }
    }

    pub(crate) fn set_chain_timeout(&self, ms: u64) {
        self.chain_timeout.set(Some(ms));
        let root = self.root.borrow();
        if !root.state().is_terminal() {
            drop(root);
            self.root.borrow_mut().set_timeout_ms(ms);
        }
    }

    /// Enqueues a builder, surfacing enqueue errors as player
    /// failures.
    pub(crate) fn submit(&self, builder: PlayableBuilder) {
        if let Err(error) = self.cx.player().play(builder) {
            self.cx.player().fail_with(error);
        }
    }

    /// Enqueues an injected event against the shared root element.
    pub(crate) fn submit_event(&self, builder: PlayableBuilder) {
        self.submit(self.with_timeout(builder.target(self.shared_target())));
    }

    /// Enqueues a state playable from the registry descriptor.
    pub(crate) fn submit_state(&self, name: &str, args: StateArgs) {
        let Some(descriptor) = self.cx.registry.lookup(self.class, name).cloned() else {
            self.cx.player().fail(format!(
                "no state {name:?} is registered for {:?} futures",
                self.class
            ));
            return;
        };
        debug!(state = name, class = ?self.class, "enqueue state wait");
        let ready = state::state_ready_fn(
            &descriptor,
            args,
            self.cx.player.downgrade(),
            self.cx.player.config().state_debounce_ms,
        );
        let builder = PlayableBuilder::wait(0)
            .target(self.shared_target())
            .availability(descriptor.availability.unwrap_or_default())
            .visibility(descriptor.visibility.unwrap_or(Visibility::Ignore))
            .state_predicate(ready);
        self.submit(self.with_timeout(builder));
    }

    /// Binds a new element future scoped to this future's element.
    pub(crate) fn derive(&self, direction: Direction, expression: &str) -> FutureCore {
        FutureCore::bind(
            self.cx.clone(),
            FutureClass::Element,
            Locator::Relative {
                origin: Rc::clone(&self.root),
                direction,
                expression: expression.to_string(),
            },
            self.chain_timeout.get(),
        )
    }
}

/// The fluent method family shared by every future type.
///
/// Methods consume and return the future so calls chain; each call
/// enqueues one or more playables against the future's root binding.
pub trait Fluent: Sized {
    /// The future's locator binding.
    fn core(&self) -> &FutureCore;

    /// Sets the timeout for the root binding and all subsequently
    /// enqueued playables of this chain.
    fn timeout(self, ms: u64) -> Self {
        self.core().set_chain_timeout(ms);
        self
    }

    /// Enqueues a plain click event.
    fn click(self) -> Self {
        self.core().submit_event(PlayableBuilder::event("click"));
        self
    }

    /// Enqueues a click at element-relative coordinates.
    fn click_at(self, x: i32, y: i32) -> Self {
        self.core()
            .submit_event(PlayableBuilder::event("click").at(x, y));
        self
    }

    /// Enqueues a tap composite (pointerdown → pointerup → click →
    /// gesture wait).
    fn tap(self) -> Self {
        self.core().submit_event(PlayableBuilder::event("tap"));
        self
    }

    /// Enqueues a tap composite at element-relative coordinates.
    fn tap_at(self, x: i32, y: i32) -> Self {
        self.core()
            .submit_event(PlayableBuilder::event("tap").at(x, y));
        self
    }

    /// Enqueues a type composite: one keydown/keyup pair per
    /// character.
    fn type_text(self, text: impl Into<String>) -> Self {
        self.core()
            .submit_event(PlayableBuilder::event("type").text(text));
        self
    }

    /// Enqueues a single keydown/keyup pair.
    fn key(self, key: impl Into<String>) -> Self {
        self.core()
            .submit_event(PlayableBuilder::event("type").key(key));
        self
    }

    /// Enqueues a focus event.
    fn focus(self) -> Self {
        self.core().submit_event(PlayableBuilder::event("focus"));
        self
    }

    /// Enqueues a blur event.
    fn blur(self) -> Self {
        self.core().submit_event(PlayableBuilder::event("blur"));
        self
    }

    /// Enqueues a synchronous inspection of the future's value.
    fn and(self, f: impl FnOnce(&Element) + 'static) -> Self {
        let core = self.core();
        let builder = PlayableBuilder::callback(move |cx| {
            if let Some(element) = cx.value() {
                f(element);
            } else {
                cx.player().fail("inspection target never resolved");
            }
        })
        .target(core.shared_target());
        core.submit(core.with_timeout(builder));
        self
    }

    /// Enqueues an asynchronous inspection; the block suspends until
    /// `done` is called (or the playable's timeout expires).
    fn and_async(self, f: impl FnOnce(&Element, Done) + 'static) -> Self {
        let core = self.core();
        let builder = PlayableBuilder::callback_async(move |cx, done| {
            if let Some(element) = cx.value() {
                f(element, done);
            } else {
                done.fail("inspection target never resolved");
            }
        })
        .target(core.shared_target());
        core.submit(core.with_timeout(builder));
        self
    }

    /// Enqueues a pure delay.
    fn wait_ms(self, ms: u64) -> Self {
        self.core().submit(PlayableBuilder::wait(ms));
        self
    }

    /// Enqueues a labelled predicate wait over the future's element.
    /// The label names the awaited condition in timeout messages.
    fn wait_until(
        self,
        label: impl Into<String>,
        mut f: impl FnMut(&Element) -> bool + 'static,
    ) -> Self {
        let core = self.core();
        let label = label.into();
        let builder = PlayableBuilder::wait(0)
            .target(core.shared_target())
            .visibility(Visibility::Ignore)
            .state_predicate(move |cx| {
                let satisfied = cx.target().is_some_and(&mut f);
                if satisfied {
                    cx.clear_waiting();
                    true
                } else {
                    cx.set_waiting(label.clone(), "true");
                    false
                }
            });
        core.submit(core.with_timeout(builder));
        self
    }

    /// Enqueues a free predicate wait with no target.
    fn wait_for(self, mut f: impl FnMut() -> bool + 'static) -> Self {
        let core = self.core();
        let builder = PlayableBuilder::wait_predicate(move |cx| {
            if f() {
                cx.clear_waiting();
                true
            } else {
                cx.set_waiting("condition", "true");
                false
            }
        });
        core.submit(core.with_timeout(builder));
        self
    }

    /// Enqueues a registered state wait by name.
    fn state(self, name: &str) -> Self {
        self.core().submit_state(name, Vec::new());
        self
    }

    /// Enqueues a registered state wait with arguments.
    fn state_with(self, name: &str, args: StateArgs) -> Self {
        self.core().submit_state(name, args);
        self
    }

    /// Waits for the element to be visible.
    fn visible(self) -> Self {
        self.state("visible")
    }

    /// Waits for the element to be hidden.
    fn hidden(self) -> Self {
        self.state("hidden")
    }

    /// Waits for the element/component to be destroyed.
    fn destroyed(self) -> Self {
        self.state("destroyed")
    }

    /// Descends to a matching descendant element.
    fn down(self, expression: &str) -> ElementFuture {
        ElementFuture::from_core(self.core().derive(Direction::Down, expression))
    }

    /// Ascends to a matching ancestor element.
    fn up(self, expression: &str) -> ElementFuture {
        ElementFuture::from_core(self.core().derive(Direction::Up, expression))
    }

    /// Descends to a matching direct child element.
    fn child(self, expression: &str) -> ElementFuture {
        ElementFuture::from_core(self.core().derive(Direction::Child, expression))
    }
}

/// Factory surface for futures; owns the shared [`FutureCx`].
#[derive(Clone, Debug)]
pub struct Futures {
    cx: FutureCx,
}

impl Futures {
    /// Creates the factory, building the state registry for `variant`
    /// once.
    #[must_use]
    pub fn new(player: Player, variant: ToolkitVariant) -> Self {
        Self {
            cx: FutureCx::new(player, variant),
        }
    }

    /// Creates the factory over a pre-built registry.
    #[must_use]
    pub fn with_registry(player: Player, registry: Rc<StateRegistry>) -> Self {
        Self {
            cx: FutureCx::with_registry(player, registry),
        }
    }

    /// The shared context.
    #[must_use]
    pub fn cx(&self) -> &FutureCx {
        &self.cx
    }

    /// A future over a bare element.
    #[must_use]
    pub fn element(&self, locator: impl Into<Locator>) -> ElementFuture {
        ElementFuture::from_core(FutureCore::bind(
            self.cx.clone(),
            FutureClass::Element,
            locator.into(),
            None,
        ))
    }

    /// A future over a component's primary element.
    #[must_use]
    pub fn component(&self, locator: impl Into<Locator>) -> ComponentFuture {
        ComponentFuture::from_core(FutureCore::bind(
            self.cx.clone(),
            FutureClass::Component,
            locator.into(),
            None,
        ))
    }

    /// A future over a button component.
    #[must_use]
    pub fn button(&self, locator: impl Into<Locator>) -> ComponentFuture {
        self.component(locator)
    }

    /// A future over a form field.
    #[must_use]
    pub fn field(&self, locator: impl Into<Locator>) -> FieldFuture {
        FieldFuture::from_core(FutureCore::bind(
            self.cx.clone(),
            FutureClass::Field,
            locator.into(),
            None,
        ))
    }

    /// A future over a list-like collection.
    #[must_use]
    pub fn list(&self, locator: impl Into<Locator>) -> ListFuture {
        ListFuture::from_core(FutureCore::bind(
            self.cx.clone(),
            FutureClass::List,
            locator.into(),
            None,
        ))
    }

    /// A future over a tabular (grid) collection.
    #[must_use]
    pub fn grid(&self, locator: impl Into<Locator>) -> TabularFuture {
        TabularFuture::from_core(FutureCore::bind(
            self.cx.clone(),
            FutureClass::Tabular,
            locator.into(),
            None,
        ))
    }
}
