//! Domplay: cooperative event player and fluent futures engine for
//! in-browser UI test automation.
//!
//! # Overview
//!
//! Domplay is the scheduling core of a UI test driver: given symbolic
//! descriptions of widgets and user intentions, it synthesises
//! low-level input events against a live DOM and suspends a
//! surrounding test until asynchronous UI preconditions are
//! satisfied. It owns no DOM, no event loop, and no widget library —
//! those enter through the collaborator traits in [`host`].
//!
//! # Core guarantees
//!
//! - **Single-track scheduling**: exactly one playable is pending at
//!   any instant; the player never re-enters itself synchronously
//! - **Source-order nesting**: playables enqueued from inside a
//!   playing callback splice in front of the remaining queue
//! - **Exactly-once termination**: every playable reaches exactly one
//!   terminal state, and every block reports exactly once
//! - **Deterministic testing**: the [`lab`] harness runs the whole
//!   engine on virtual time
//!
//! # Module structure
//!
//! - [`types`]: identifiers, time, policies, the playable state machine
//! - [`error`](mod@error): the error taxonomy and timeout diagnostics
//! - [`config`]: player tuning
//! - [`host`]: collaborator traits and the injected [`Host`] bundle
//! - [`locator`]: symbolic target resolution and back-references
//! - [`playable`]: the unit of scheduled work
//! - [`player`]: the cooperative scheduler
//! - [`future`]: the fluent builder layer and its derivations
//! - [`block`]: the test-block adaptor (`Block`, `WatchDog`, `Done`)
//! - [`report`]: the abstract reporter surface and status glue
//! - [`lab`]: deterministic harness for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

pub mod block;
pub mod config;
pub mod error;
pub mod future;
pub mod host;
pub mod lab;
pub mod locator;
pub mod playable;
pub mod player;
pub mod report;
pub mod types;

pub use block::{Block, BlockCx, BlockOutcome, Done, WatchDog};
pub use config::PlayerConfig;
pub use error::{EngineError, Result, TimeoutDetails};
pub use future::{
    CellFuture, ColumnLocator, ComponentFuture, ElementFuture, FieldFuture, Fluent, FutureClass,
    FutureCore, FutureCx, Futures, ItemFuture, ListFuture, RecordLocator, RecordSelector,
    RowFuture, Selectable, StateDescriptor, StateRegistry, TabularFuture, ToolkitVariant,
};
pub use host::{
    AnimationsProbe, DomBackend, Element, EventInjector, GestureObserver, Host, HostBuilder,
    HostScheduler, NodeId, ScrollOutcome, Subscription, TimerHandle, VisualFeedback,
    WidgetRuntime,
};
pub use locator::{Locator, TargetSpec};
pub use playable::{
    Callback, CallbackCx, EventSpec, Modifiers, Playable, PlayableBuilder, PlayableHandle,
    PlayableKind, ReadyCx, Readiness, Waiting,
};
pub use player::{Player, PlayerStats, WeakPlayer};
pub use report::{Expectation, Reporter, SpecOutcome, StatusReporter};
pub use types::{
    AnimationPolicy, Availability, Direction, PlayState, PlayableId, TargetSlot, Time, Visibility,
};
