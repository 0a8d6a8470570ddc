//! Composite gesture expansion.
//!
//! A "tap" or "type" playable is expanded at play time (not enqueue
//! time) into its low-level sub-sequence, spliced at the queue head.
//! Sub-events share the original's resolved target through
//! back-references, inherit its modifier keys unless already present,
//! and fire in fixed order relative to the queue tail.

use crate::host::Host;
use crate::locator::{Locator, TargetSpec};
use crate::playable::{EventSpec, PlayableBuilder, PlayableHandle, ReadyCx};
use smallvec::SmallVec;
use std::rc::Rc;

/// Composite gesture name expanded into
/// pointerdown → pointerup → click → gesture-completion wait.
pub(crate) const TAP: &str = "tap";

/// Composite name expanded into keydown/keyup pairs.
pub(crate) const TYPE: &str = "type";

fn sub_event(
    original: &EventSpec,
    event_type: &str,
    target: TargetSpec,
    delay_ms: Option<u64>,
) -> PlayableBuilder {
    let mut builder = PlayableBuilder::event(event_type).target(target);
    if let Some(delay) = delay_ms {
        builder = builder.delay_ms(delay);
    }
    builder = builder.modifiers(original.modifiers);
    if let Some(button) = original.button {
        builder = builder.button(button);
    }
    if let Some(detail) = original.detail {
        builder = builder.detail(detail);
    }
    builder
}

/// Builds the four-step tap sub-sequence.
///
/// 1. `pointerdown` with the original target, delay, and coordinates.
/// 2. `pointerup` against the playable one back, zero delay.
/// 3. `click` against the playable two back, zero delay.
/// 4. A gesture-completion wait consulting the registered
///    [`GestureObserver`](crate::host::GestureObserver), or passing
///    immediately when none is registered.
pub(crate) fn tap_sequence(
    original: &PlayableHandle,
    host: &Host,
) -> SmallVec<[PlayableBuilder; 8]> {
    let (event, delay) = {
        let inner = original.borrow();
        (inner.event().cloned().unwrap_or_default(), inner.delay_ms())
    };

    if let Some(gestures) = host.gestures() {
        gestures.activate();
    }

    let mut sequence: SmallVec<[PlayableBuilder; 8]> = SmallVec::new();

    let mut down = sub_event(
        &event,
        "pointerdown",
        TargetSpec::Locator(Locator::Shared(Rc::clone(original))),
        delay,
    );
    if let (Some(x), Some(y)) = (event.x, event.y) {
        down = down.at(x, y);
    }
    sequence.push(down);

    sequence.push(sub_event(&event, "pointerup", TargetSpec::back(1), Some(0)));
    sequence.push(sub_event(&event, "click", TargetSpec::back(2), Some(0)));

    let origin = Rc::clone(original);
    let wait = PlayableBuilder::wait_predicate(move |cx: &mut ReadyCx<'_>| {
        let Some(gestures) = cx.host().gestures() else {
            cx.clear_waiting();
            return true;
        };
        let Some(element) = origin.borrow().resolved_target() else {
            cx.set_waiting("gesture", "complete");
            return false;
        };
        if gestures.complete(&element, TAP) {
            gestures.deactivate();
            cx.clear_waiting();
            true
        } else {
            cx.set_waiting("gesture", "complete");
            false
        }
    })
    .target(TargetSpec::back(2))
    .delay_ms(0);
    sequence.push(wait);

    sequence
}

/// Builds the keydown/keyup sub-sequence for a "type" composite.
///
/// With `text`, one pair per character; the first keydown inherits the
/// original delay and caret. With a lone `key`, exactly one pair. With
/// neither, the sequence is empty and the composite is skipped.
pub(crate) fn type_sequence(
    original: &PlayableHandle,
    _host: &Host,
) -> SmallVec<[PlayableBuilder; 8]> {
    let (event, delay) = {
        let inner = original.borrow();
        (inner.event().cloned().unwrap_or_default(), inner.delay_ms())
    };

    let mut sequence: SmallVec<[PlayableBuilder; 8]> = SmallVec::new();

    let keys: Vec<String> = if let Some(text) = &event.text {
        text.chars().map(|ch| ch.to_string()).collect()
    } else if let Some(key) = &event.key {
        vec![key.clone()]
    } else {
        return sequence;
    };

    for (index, key) in keys.iter().enumerate() {
        let mut down = sub_event(
            &event,
            "keydown",
            TargetSpec::Locator(Locator::Shared(Rc::clone(original))),
            if index == 0 { delay } else { Some(0) },
        )
        .key(key.clone());
        if index == 0 {
            if let Some(caret) = event.caret {
                down = down.caret(caret);
            }
        }
        sequence.push(down);

        sequence.push(
            sub_event(
                &event,
                "keyup",
                TargetSpec::Locator(Locator::Shared(Rc::clone(original))),
                Some(0),
            )
            .key(key.clone()),
        );
    }

    sequence
}
