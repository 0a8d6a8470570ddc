//! Test-block adaptor: `Done`, `WatchDog`, and `Block`.
//!
//! A [`Block`] wraps one user test function, owns its timeout, and
//! decides when the test has fully resolved: the function returned (or
//! called its completion callback) AND the player drained (or was
//! never engaged). The result is reported exactly once through the
//! block's completion callback; a block never propagates panics
//! outward.

use crate::error::EngineError;
use crate::host::{HostScheduler, TimerHandle};
use crate::player::Player;
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tracing::{debug, warn};

/// Continuation handed to asynchronous callbacks and test functions.
///
/// A small object with two methods rather than a function with a
/// mutating property: [`done`](Self::done) reports success,
/// [`fail`](Self::fail) reports failure. The first call wins; later
/// calls (including a late watchdog) are ignored.
#[derive(Clone)]
pub struct Done {
    inner: Rc<DoneInner>,
}

struct DoneInner {
    consumed: Cell<bool>,
    on_result: RefCell<Option<Box<dyn FnOnce(Result<(), EngineError>)>>>,
    watchdog: RefCell<Option<WatchDog>>,
}

impl Done {
    /// Creates a continuation delivering its result to `on_result`.
    #[must_use]
    pub fn new(on_result: impl FnOnce(Result<(), EngineError>) + 'static) -> Self {
        Self {
            inner: Rc::new(DoneInner {
                consumed: Cell::new(false),
                on_result: RefCell::new(Some(Box::new(on_result))),
                watchdog: RefCell::new(None),
            }),
        }
    }

    /// Attaches a watchdog; resolved continuations cancel it.
    pub(crate) fn arm(&self, watchdog: WatchDog) {
        *self.inner.watchdog.borrow_mut() = Some(watchdog);
    }

    /// Cancels and drops the attached watchdog without resolving.
    pub(crate) fn disarm(&self) {
        if let Some(watchdog) = self.inner.watchdog.borrow_mut().take() {
            watchdog.cancel();
        }
    }

    /// Reports success.
    pub fn done(&self) {
        self.resolve(Ok(()));
    }

    /// Reports failure with a message.
    pub fn fail(&self, message: impl Into<String>) {
        self.resolve(Err(EngineError::Callback {
            message: message.into(),
        }));
    }

    /// Resolves with a prepared error (watchdog expiry path).
    pub(crate) fn expire(&self, error: EngineError) {
        self.resolve(Err(error));
    }

    /// True once the continuation has been resolved.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.inner.consumed.get()
    }

    fn resolve(&self, result: Result<(), EngineError>) {
        if self.inner.consumed.replace(true) {
            return;
        }
        self.disarm();
        if let Some(on_result) = self.inner.on_result.borrow_mut().take() {
            on_result(result);
        }
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("consumed", &self.inner.consumed.get())
            .finish()
    }
}

/// An asynchronous deadline attached to a single [`Done`].
pub struct WatchDog {
    scheduler: Rc<dyn HostScheduler>,
    handle: Cell<Option<TimerHandle>>,
    timeout_ms: u64,
    explicit: bool,
}

impl std::fmt::Debug for WatchDog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDog")
            .field("handle", &self.handle)
            .field("timeout_ms", &self.timeout_ms)
            .field("explicit", &self.explicit)
            .finish()
    }
}

impl WatchDog {
    /// Arms a deadline: if `done` is not resolved within `timeout_ms`,
    /// it is expired with a [`EngineError::WatchDogExpired`] whose
    /// message distinguishes explicit from defaulted timeouts.
    #[must_use]
    pub fn arm(
        scheduler: Rc<dyn HostScheduler>,
        timeout_ms: u64,
        explicit: bool,
        done: Done,
    ) -> Self {
        let handle = scheduler.defer(
            Box::new(move || {
                warn!(timeout_ms, "watchdog expired");
                done.expire(EngineError::WatchDogExpired {
                    timeout_ms,
                    explicit,
                });
            }),
            timeout_ms,
        );
        Self {
            scheduler,
            handle: Cell::new(Some(handle)),
            timeout_ms,
            explicit,
        }
    }

    /// Cancels the deadline.
    pub fn cancel(&self) {
        if let Some(handle) = self.handle.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// The armed deadline in milliseconds.
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// True when the timeout was supplied by the user.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }
}

/// Result of one block, handed to the completion callback exactly
/// once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    /// True when no failure was recorded.
    pub passed: bool,
    /// Failure messages, in the order recorded.
    pub failures: Vec<String>,
}

/// Context object handed to the user test function.
#[derive(Clone)]
pub struct BlockCx {
    player: Player,
}

impl BlockCx {
    /// The player the test drives.
    #[must_use]
    pub fn player(&self) -> &Player {
        &self.player
    }
}

/// Wraps one user test function and coordinates its completion with
/// the player's queue drain.
pub struct Block {
    inner: Rc<BlockInner>,
}

struct BlockInner {
    player: Player,
    timeout_ms: u64,
    explicit_timeout: bool,
    failures: RefCell<Vec<String>>,
    waiting_on_done: Cell<bool>,
    waiting_on_player: Cell<bool>,
    // completion checks are held off until the run method has
    // inspected the player, so a synchronous done() cannot race the
    // queue subscription
    setup_complete: Cell<bool>,
    reported: Cell<bool>,
    on_complete: RefCell<Option<Box<dyn FnOnce(BlockOutcome)>>>,
}

impl Block {
    /// Creates a block over `player`. `timeout_ms` of `None` falls
    /// back to the player's default timeout (and is reported as such
    /// if the watchdog expires).
    #[must_use]
    pub fn new(
        player: Player,
        timeout_ms: Option<u64>,
        on_complete: impl FnOnce(BlockOutcome) + 'static,
    ) -> Self {
        let explicit_timeout = timeout_ms.is_some();
        let timeout_ms = timeout_ms.unwrap_or(player.config().default_timeout_ms);
        Self {
            inner: Rc::new(BlockInner {
                player,
                timeout_ms,
                explicit_timeout,
                failures: RefCell::new(Vec::new()),
                waiting_on_done: Cell::new(false),
                waiting_on_player: Cell::new(false),
                setup_complete: Cell::new(false),
                reported: Cell::new(false),
                on_complete: RefCell::new(Some(Box::new(on_complete))),
            }),
        }
    }

    /// Runs a synchronous user function (no completion parameter).
    pub fn run(&self, f: impl FnOnce(&BlockCx) + 'static) {
        let cx = BlockCx {
            player: self.inner.player.clone(),
        };
        if let Err(error) = self.invoke(move || f(&cx)) {
            self.record_failure(error.to_string());
            self.report();
            return;
        }
        self.observe_player();
        self.inner.setup_complete.set(true);
        self.try_complete();
    }

    /// Runs an asynchronous user function: it declares a completion
    /// parameter, so a watchdog is constructed with the block's
    /// timeout and the block waits for `done` (or `fail`, or expiry).
    pub fn run_async(&self, f: impl FnOnce(&BlockCx, Done) + 'static) {
        self.inner.waiting_on_done.set(true);

        let block = self.clone_handle();
        let done = Done::new(move |result| {
            if let Err(error) = result {
                block.record_failure(error.to_string());
            }
            block.inner.waiting_on_done.set(false);
            block.try_complete();
        });
        if self.inner.timeout_ms != 0 {
            done.arm(WatchDog::arm(
                Rc::clone(self.inner.player.host().scheduler()),
                self.inner.timeout_ms,
                self.inner.explicit_timeout,
                done.clone(),
            ));
        }

        let cx = BlockCx {
            player: self.inner.player.clone(),
        };
        let done_for_fn = done.clone();
        if let Err(error) = self.invoke(move || f(&cx, done_for_fn)) {
            done.disarm();
            self.record_failure(error.to_string());
            self.report();
            return;
        }
        self.observe_player();
        self.inner.setup_complete.set(true);
        self.try_complete();
    }

    fn clone_handle(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }

    fn invoke(&self, f: impl FnOnce()) -> Result<(), EngineError> {
        if self.inner.player.config().capture_panics {
            catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| EngineError::from_panic(payload.as_ref()))
        } else {
            f();
            Ok(())
        }
    }

    /// Subscribes once to the player's `end` signal when it still has
    /// queued work.
    fn observe_player(&self) {
        if !self.inner.player.has_pending_work() {
            if let Some(error) = self.inner.player.take_last_error() {
                self.record_failure(error.to_string());
            }
            return;
        }
        self.inner.waiting_on_player.set(true);
        let block = self.clone_handle();
        self.inner.player.on_end(move || {
            if let Some(error) = block.inner.player.take_last_error() {
                block.record_failure(error.to_string());
            }
            block.inner.waiting_on_player.set(false);
            block.try_complete();
        });
    }

    fn record_failure(&self, message: String) {
        debug!(%message, "block failure");
        self.inner.failures.borrow_mut().push(message);
    }

    /// Completes when both the watchdog has reported (or was never
    /// armed) and the player has drained (or was never engaged).
    fn try_complete(&self) {
        if !self.inner.setup_complete.get()
            || self.inner.waiting_on_done.get()
            || self.inner.waiting_on_player.get()
        {
            return;
        }
        self.report();
    }

    fn report(&self) {
        if self.inner.reported.replace(true) {
            return;
        }
        let failures: Vec<String> = self.inner.failures.borrow().clone();
        let outcome = BlockOutcome {
            passed: failures.is_empty(),
            failures,
        };
        debug!(passed = outcome.passed, "block complete");
        if let Some(on_complete) = self.inner.on_complete.borrow_mut().take() {
            on_complete(outcome);
        }
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("timeout_ms", &self.inner.timeout_ms)
            .field("reported", &self.inner.reported.get())
            .finish()
    }
}
