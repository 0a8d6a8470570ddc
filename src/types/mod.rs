//! Core types for the player engine.
//!
//! - [`id`]: identifier and time types (`PlayableId`, `Time`)
//! - [`policy`]: readiness policies and directional tokens
//! - [`state`]: the playable lifecycle state machine

pub mod id;
pub mod policy;
pub mod state;

pub use id::{PlayableId, Time};
pub use policy::{Availability, AnimationPolicy, Direction, TargetSlot, Visibility};
pub use state::PlayState;
