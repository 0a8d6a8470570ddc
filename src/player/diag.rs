//! Timeout diagnostics.
//!
//! A readiness timeout names the element and the awaited condition.
//! The element identifier is recovered from the failing slot's
//! locator; shared-target chains are walked back to the originating
//! locator (see [`Locator::describe`](crate::locator::Locator::describe)),
//! which is described by expression, id, or tag.

use crate::error::TimeoutDetails;
use crate::host::Host;
use crate::playable::{Playable, Waiting};
use crate::types::{TargetSlot, Time};

pub(crate) fn timeout_details(
    host: &Host,
    playable: &Playable,
    timeout_ms: u64,
) -> TimeoutDetails {
    let waiting = playable.waiting().cloned().unwrap_or_else(|| Waiting {
        what: TargetSlot::Target.as_str().to_string(),
        state: "available".to_string(),
    });

    let selector = if waiting.what == TargetSlot::Target.as_str() {
        playable
            .target_locator()
            .and_then(|locator| locator.describe(host))
            .or_else(|| playable.resolved_target().map(|element| element.describe()))
    } else if waiting.what == TargetSlot::Related.as_str() {
        playable
            .related_target_locator()
            .and_then(|locator| locator.describe(host))
            .or_else(|| {
                playable
                    .resolved_related_target()
                    .map(|element| element.describe())
            })
    } else {
        None
    };

    TimeoutDetails {
        waiting_for: waiting.what,
        selector,
        waiting_state: waiting.state,
        event_type: playable.event_type().map(str::to_string),
        timeout_ms,
        wait_started: playable.wait_started().unwrap_or(Time::ZERO),
    }
}
