//! The cooperative scheduler.
//!
//! The player maintains an ordered queue of playables and drains it on
//! host timer callbacks. Exactly one playable is pending at any
//! instant; the player owns at most one pending timer handle and never
//! re-enters itself synchronously. Composite gestures expand at play
//! time into sub-events spliced at the queue head; callbacks that
//! enqueue further work splice at an insertion cursor so nested fluent
//! chains preserve source order.

mod diag;
mod expand;

use crate::block::{Done, WatchDog};
use crate::config::PlayerConfig;
use crate::error::{EngineError, Result};
use crate::host::{Host, TimerHandle};
use crate::locator::{Locator, TargetSpec};
use crate::playable::{
    Callback, CallbackCx, Playable, PlayableBuilder, PlayableHandle, PlayableKind,
};
use crate::types::{PlayState, PlayableId, Time};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Point-in-time snapshot of the player's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStats {
    /// Items still queued (excludes the pending playable).
    pub queue_len: usize,
    /// Id of the pending playable, when one is picked up.
    pub pending: Option<PlayableId>,
    /// Open gesture count (starts minus ends).
    pub touch_count: u32,
    /// Nested pause depth.
    pub pause_depth: u32,
}

/// The cooperative event player.
///
/// Cheap to clone; all clones drive the same queue.
#[derive(Clone)]
pub struct Player {
    shared: Rc<PlayerShared>,
}

struct PlayerShared {
    host: Host,
    config: PlayerConfig,
    queue: RefCell<VecDeque<PlayableHandle>>,
    pending: RefCell<Option<PlayableHandle>>,
    timer: Cell<Option<TimerHandle>>,
    insert_cursor: Cell<Option<usize>>,
    callback_depth: Cell<u32>,
    pause_depth: Cell<u32>,
    touch_count: Cell<u32>,
    last_gesture_end: Cell<Time>,
    next_id: Cell<u64>,
    end_listeners: RefCell<Vec<Box<dyn FnOnce()>>>,
    error_listeners: RefCell<Vec<Rc<dyn Fn(&EngineError)>>>,
    last_error: RefCell<Option<EngineError>>,
}

impl Player {
    /// Creates a player over the given host with the given tuning.
    #[must_use]
    pub fn new(host: Host, config: PlayerConfig) -> Self {
        Self {
            shared: Rc::new(PlayerShared {
                host,
                config,
                queue: RefCell::new(VecDeque::new()),
                pending: RefCell::new(None),
                timer: Cell::new(None),
                insert_cursor: Cell::new(None),
                callback_depth: Cell::new(0),
                pause_depth: Cell::new(0),
                touch_count: Cell::new(0),
                last_gesture_end: Cell::new(Time::ZERO),
                next_id: Cell::new(1),
                end_listeners: RefCell::new(Vec::new()),
                error_listeners: RefCell::new(Vec::new()),
                last_error: RefCell::new(None),
            }),
        }
    }

    /// The collaborator bundle this player drives.
    #[must_use]
    pub fn host(&self) -> &Host {
        &self.shared.host
    }

    /// The player's configuration.
    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    /// Enqueues a playable and starts the drain if idle.
    ///
    /// When called from inside a currently playing callback, the item
    /// is spliced at the insertion cursor rather than appended, so
    /// nested chains preserve source order. Integer back-references in
    /// the target specs are bound here, to direct references on the
    /// upstream playables.
    pub fn play(&self, builder: PlayableBuilder) -> Result<PlayableHandle> {
        let index = self
            .shared
            .insert_cursor
            .get()
            .unwrap_or_else(|| self.shared.queue.borrow().len());
        let handle = self.insert_at(builder, index)?;
        if let Some(cursor) = self.shared.insert_cursor.get() {
            self.shared.insert_cursor.set(Some(cursor + 1));
        }
        self.kick();
        Ok(handle)
    }

    /// Binds back-references against the queue as it stands and
    /// inserts at `index`. Does not touch the insertion cursor.
    pub(crate) fn insert_at(
        &self,
        builder: PlayableBuilder,
        index: usize,
    ) -> Result<PlayableHandle> {
        let target = self.bind_spec(builder.target_spec(), index)?;
        let related = self.bind_spec(builder.related_target_spec(), index)?;
        let mut playable = builder.into_playable(target, related);

        let id = PlayableId::from_raw(self.shared.next_id.get());
        self.shared.next_id.set(id.raw() + 1);
        playable.assign_id(id);
        debug!(id = id.raw(), kind = ?playable.kind(), index, "enqueue");

        let handle = Rc::new(RefCell::new(playable));
        self.shared.queue.borrow_mut().insert(index, Rc::clone(&handle));
        Ok(handle)
    }

    fn bind_spec(&self, spec: Option<&TargetSpec>, index: usize) -> Result<Option<Locator>> {
        match spec {
            None => Ok(None),
            Some(TargetSpec::Locator(locator)) => Ok(Some(locator.clone())),
            Some(TargetSpec::Back(n)) => {
                let queue = self.shared.queue.borrow();
                let missing = || EngineError::BackReference {
                    offset: *n,
                    queue_len: queue.len(),
                };
                if *n == 0 {
                    return Err(missing());
                }
                let upstream = index
                    .checked_sub(*n)
                    .and_then(|at| queue.get(at))
                    .ok_or_else(missing)?;
                Ok(Some(Locator::Shared(Rc::clone(upstream))))
            }
        }
    }

    /// True while the queue or the pending slot holds work.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.shared.queue.borrow().is_empty() || self.shared.pending.borrow().is_some()
    }

    /// Bookkeeping snapshot.
    #[must_use]
    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            queue_len: self.shared.queue.borrow().len(),
            pending: self
                .shared
                .pending
                .borrow()
                .as_ref()
                .map(|playable| playable.borrow().id()),
            touch_count: self.shared.touch_count.get(),
            pause_depth: self.shared.pause_depth.get(),
        }
    }

    /// The error that emptied the queue, when one did.
    #[must_use]
    pub fn last_error(&self) -> Option<EngineError> {
        self.shared.last_error.borrow().clone()
    }

    /// Consumes the stored error; blocks read it at drain time so one
    /// failure is reported against exactly one spec.
    pub fn take_last_error(&self) -> Option<EngineError> {
        self.shared.last_error.borrow_mut().take()
    }

    /// Instant of the most recent gesture-end event.
    #[must_use]
    pub fn last_gesture_end(&self) -> Time {
        self.shared.last_gesture_end.get()
    }

    /// Subscribes once to the next queue drain (or stop/fail).
    pub fn on_end(&self, listener: impl FnOnce() + 'static) {
        self.shared
            .end_listeners
            .borrow_mut()
            .push(Box::new(listener));
    }

    /// Subscribes to error events.
    pub fn on_error(&self, listener: impl Fn(&EngineError) + 'static) {
        self.shared
            .error_listeners
            .borrow_mut()
            .push(Rc::new(listener));
    }

    /// Pauses the drain. Nested; every `pause` needs a matching
    /// [`resume`](Self::resume).
    ///
    /// Pausing while an event is pending (but not yet playing)
    /// un-shifts it back to the queue head; pausing from inside the
    /// pending playable's own callback leaves it in place.
    pub fn pause(&self) {
        self.shared.pause_depth.set(self.shared.pause_depth.get() + 1);
        let unshift = {
            let pending = self.shared.pending.borrow();
            pending
                .as_ref()
                .is_some_and(|playable| playable.borrow().state() == PlayState::Pending)
        };
        if unshift {
            self.cancel_timer();
            if let Some(playable) = self.shared.pending.borrow_mut().take() {
                {
                    let mut playable = playable.borrow_mut();
                    playable.set_state(PlayState::Queued);
                    playable.reset_pending_bookkeeping();
                }
                self.shared.queue.borrow_mut().push_front(playable);
            }
        }
    }

    /// Resumes the drain once the pause depth drops to zero.
    pub fn resume(&self) {
        let depth = self.shared.pause_depth.get().saturating_sub(1);
        self.shared.pause_depth.set(depth);
        if depth == 0 {
            self.kick();
        }
    }

    /// Empties the queue, cancels the pending timer, and fires `end`.
    pub fn stop(&self) {
        self.cancel_timer();
        self.discard_queue();
        self.fire_end();
    }

    /// Empties the queue, fires an error with `message`, then `end`.
    pub fn fail(&self, message: impl Into<String>) {
        self.fail_with(EngineError::Callback {
            message: message.into(),
        });
    }

    /// Failure path shared by timeouts, callback errors, and `fail`:
    /// cleanup, `error`, `end`, then indicator teardown after a grace
    /// delay.
    pub(crate) fn fail_with(&self, error: EngineError) {
        warn!(%error, "player failure");
        self.cancel_timer();
        self.discard_queue();
        *self.shared.last_error.borrow_mut() = Some(error.clone());

        let listeners: Vec<_> = self.shared.error_listeners.borrow().clone();
        for listener in listeners {
            listener(&error);
        }
        self.fire_end();

        let host = self.shared.host.clone();
        self.shared.host.scheduler().defer(
            Box::new(move || {
                host.visual().hide_pointer();
                host.visual().hide_gesture();
            }),
            self.shared.config.indicator_grace_ms,
        );
    }

    fn discard_queue(&self) {
        let drained: Vec<_> = self.shared.queue.borrow_mut().drain(..).collect();
        for playable in &drained {
            playable.borrow_mut().set_state(PlayState::Errored);
        }
        if let Some(playable) = self.shared.pending.borrow_mut().take() {
            let mut playable = playable.borrow_mut();
            if !playable.state().is_terminal() {
                playable.set_state(PlayState::Errored);
            }
        }
    }

    fn fire_end(&self) {
        let listeners: Vec<_> = self.shared.end_listeners.borrow_mut().drain(..).collect();
        for listener in listeners {
            listener();
        }
    }

    /// Shifts the head playable into the pending slot and schedules
    /// its first readiness check after its delay.
    fn kick(&self) {
        if self.shared.pause_depth.get() > 0 || self.shared.pending.borrow().is_some() {
            return;
        }
        let Some(playable) = self.shared.queue.borrow_mut().pop_front() else {
            return;
        };

        let delay = self.effective_delay(&playable);
        {
            let mut playable = playable.borrow_mut();
            playable.set_state(PlayState::Pending);
            playable.reset_pending_bookkeeping();
            trace!(id = playable.id().raw(), delay, "pending");
        }
        *self.shared.pending.borrow_mut() = Some(Rc::clone(&playable));
        self.schedule_step(playable, delay);
    }

    fn effective_delay(&self, playable: &PlayableHandle) -> u64 {
        let playable = playable.borrow();
        playable.delay_ms().unwrap_or(match playable.kind() {
            PlayableKind::InjectedEvent => self.shared.config.event_delay_ms,
            _ => 0,
        })
    }

    pub(crate) fn effective_timeout(&self, playable: &Playable) -> u64 {
        playable
            .timeout_ms()
            .unwrap_or(self.shared.config.default_timeout_ms)
    }

    fn schedule_step(&self, playable: PlayableHandle, delay_ms: u64) {
        let player = self.clone();
        let handle = self.shared.host.scheduler().defer(
            Box::new(move || player.step(&playable)),
            delay_ms,
        );
        self.shared.timer.set(Some(handle));
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.shared.timer.take() {
            self.shared.host.scheduler().cancel(handle);
        }
    }

    /// One readiness tick of the pending playable.
    fn step(&self, playable: &PlayableHandle) {
        self.shared.timer.set(None);
        if self.shared.pause_depth.get() > 0 {
            return;
        }
        let is_current = self
            .shared
            .pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| Rc::ptr_eq(pending, playable));
        if !is_current {
            return;
        }

        let now = self.shared.host.now();
        let ready = playable.borrow_mut().is_ready(&self.shared.host);

        if !ready {
            let (started, timeout) = {
                let mut playable = playable.borrow_mut();
                playable.stamp_wait_started(now);
                (
                    playable.wait_started().unwrap_or(now),
                    self.effective_timeout(&playable),
                )
            };
            if timeout != 0 && now.saturating_since(started) >= timeout {
                self.on_timeout(playable);
            } else {
                trace!(id = playable.borrow().id().raw(), "not ready, re-polling");
                self.schedule_step(Rc::clone(playable), self.shared.config.poll_interval_ms);
            }
            return;
        }

        playable.borrow_mut().set_state(PlayState::Playing);
        self.dispatch(playable);
    }

    fn on_timeout(&self, playable: &PlayableHandle) {
        let details = {
            let mut inner = playable.borrow_mut();
            inner.set_state(PlayState::TimedOut);
            diag::timeout_details(&self.shared.host, &inner, self.effective_timeout(&inner))
        };
        self.fail_with(EngineError::Timeout(details));
    }

    /// Plays a ready playable according to its kind.
    fn dispatch(&self, playable: &PlayableHandle) {
        let kind = playable.borrow().kind();
        match kind {
            PlayableKind::InjectedEvent => {
                let event_type = playable
                    .borrow()
                    .event_type()
                    .unwrap_or_default()
                    .to_string();
                match event_type.as_str() {
                    expand::TAP => self.expand_and_continue(playable, expand::tap_sequence),
                    expand::TYPE => self.expand_and_continue(playable, expand::type_sequence),
                    _ => self.inject(playable),
                }
            }
            PlayableKind::Callback => self.run_callback(playable),
            PlayableKind::WaitDelay | PlayableKind::WaitPredicate => {
                // readiness was the whole job
                self.finish(playable);
            }
        }
    }

    fn inject(&self, playable: &PlayableHandle) {
        let (event, target, related) = {
            let inner = playable.borrow();
            let Some(target) = inner.resolved_target() else {
                drop(inner);
                self.fail_with(EngineError::Callback {
                    message: "injected event has no resolved target".into(),
                });
                return;
            };
            (
                inner.event().cloned().unwrap_or_default(),
                target,
                inner.resolved_related_target(),
            )
        };

        debug!(event = %event.event_type, target = %target.describe(), "inject");
        if let (Some(x), Some(y)) = (event.x, event.y) {
            self.shared.host.visual().show_pointer(x, y);
        }
        self.shared
            .host
            .injector()
            .inject(&event, &target, related.as_ref());

        if event.is_gesture_start() {
            self.shared.touch_count.set(self.shared.touch_count.get() + 1);
            self.shared.host.visual().show_gesture();
        }
        if event.is_gesture_end() {
            let count = self.shared.touch_count.get().saturating_sub(1);
            self.shared.touch_count.set(count);
            self.shared.last_gesture_end.set(self.shared.host.now());
            if count == 0 {
                self.shared.host.visual().hide_gesture();
            }
        }
        self.finish(playable);
    }

    /// Expands a composite gesture, splicing its sub-sequence at the
    /// queue head, and retires the original.
    fn expand_and_continue(
        &self,
        playable: &PlayableHandle,
        sequence: fn(&PlayableHandle, &Host) -> smallvec::SmallVec<[PlayableBuilder; 8]>,
    ) {
        let builders = sequence(playable, &self.shared.host);
        debug!(
            id = playable.borrow().id().raw(),
            count = builders.len(),
            "expand composite"
        );
        for (offset, builder) in builders.into_iter().enumerate() {
            if let Err(error) = self.insert_at(builder, offset) {
                self.fail_with(error);
                return;
            }
        }
        self.finish(playable);
    }

    fn run_callback(&self, playable: &PlayableHandle) {
        let (callback, cx) = {
            let mut inner = playable.borrow_mut();
            let cx = CallbackCx {
                player: self.clone(),
                id: inner.id(),
                value: inner.resolved_target(),
            };
            (inner.take_callback(), cx)
        };
        let Some(callback) = callback else {
            self.finish(playable);
            return;
        };

        self.shared.insert_cursor.set(Some(0));
        self.shared
            .callback_depth
            .set(self.shared.callback_depth.get() + 1);

        let outcome = match callback {
            Callback::Sync(f) => {
                let result = self.invoke_captured(move || f(&cx));
                result.map(|()| None)
            }
            Callback::Async(f) => {
                let player = self.clone();
                let target = Rc::clone(playable);
                let done = Done::new(move |result| match result {
                    Ok(()) => player.finish(&target),
                    Err(error) => player.fail_with(error),
                });
                let timeout = self.effective_timeout(&playable.borrow());
                if timeout != 0 {
                    done.arm(WatchDog::arm(
                        Rc::clone(self.shared.host.scheduler()),
                        timeout,
                        playable.borrow().timeout_ms().is_some(),
                        done.clone(),
                    ));
                }
                let done_for_callback = done.clone();
                let result = self.invoke_captured(move || f(&cx, done_for_callback));
                match result {
                    Ok(()) => Ok(Some(done)),
                    Err(error) => {
                        done.disarm();
                        Err(error)
                    }
                }
            }
        };

        self.shared
            .callback_depth
            .set(self.shared.callback_depth.get().saturating_sub(1));
        self.shared.insert_cursor.set(None);

        match outcome {
            Ok(None) => self.finish(playable),
            // completion belongs to the done continuation now
            Ok(Some(_done)) => {}
            Err(error) => {
                let mut inner = playable.borrow_mut();
                if !inner.state().is_terminal() {
                    inner.set_state(PlayState::Errored);
                }
                drop(inner);
                self.fail_with(error);
            }
        }
    }

    fn invoke_captured(&self, f: impl FnOnce()) -> std::result::Result<(), EngineError> {
        if self.shared.config.capture_panics {
            catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| EngineError::from_panic(payload.as_ref()))
        } else {
            f();
            Ok(())
        }
    }

    /// Retires a played item and resumes the drain.
    pub(crate) fn finish(&self, playable: &PlayableHandle) {
        {
            let mut inner = playable.borrow_mut();
            if inner.state().is_terminal() {
                return;
            }
            inner.set_state(PlayState::Done);
            trace!(id = inner.id().raw(), "done");
        }
        let was_pending = self
            .shared
            .pending
            .borrow()
            .as_ref()
            .is_some_and(|pending| Rc::ptr_eq(pending, playable));
        if was_pending {
            *self.shared.pending.borrow_mut() = None;
        }
        self.play_next();
    }

    fn play_next(&self) {
        if self.shared.queue.borrow().is_empty() && self.shared.pending.borrow().is_none() {
            self.fire_end();
            return;
        }
        self.kick();
    }
}

/// Non-owning handle to a player, used by long-lived readiness
/// closures so a dropped player is not kept alive by its own queue.
#[derive(Clone)]
pub struct WeakPlayer {
    shared: std::rc::Weak<PlayerShared>,
}

impl WeakPlayer {
    /// Upgrades back to a [`Player`] while one is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Player> {
        self.shared.upgrade().map(|shared| Player { shared })
    }
}

impl Player {
    /// Downgrades to a non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakPlayer {
        WeakPlayer {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Re-runs the pending playable's readiness check immediately.
    ///
    /// Used by event-subscription waits to shortcut the poll interval
    /// when a widget event suggests the awaited state flipped.
    pub(crate) fn poke(&self) {
        let pending = self.shared.pending.borrow().clone();
        if let Some(playable) = pending {
            if playable.borrow().state() == PlayState::Pending {
                self.step(&playable);
            }
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("Player")
            .field("queue_len", &stats.queue_len)
            .field("pending", &stats.pending)
            .field("pause_depth", &stats.pause_depth)
            .finish()
    }
}
