//! End-to-end player scenarios on the lab harness: composite
//! expansion, deferred readiness, timeouts, pause/resume, and wrapper
//! rebinding — all on virtual time.

use domplay::lab::{FakeNode, Lab};
use domplay::{Modifiers, PlayState, PlayableBuilder, TargetSpec, Time};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn basic_tap_expands_into_four_sub_playables() {
    let lab = Lab::new();
    lab.dom
        .insert("#btn", FakeNode::new("button").id("btn").visible(true));
    let player = lab.player();

    let tap = player
        .play(PlayableBuilder::event("tap").target("#btn").at(10, 10))
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(
        lab.injector.event_types(),
        vec!["pointerdown", "pointerup", "click"]
    );
    assert!(tap.borrow().state().is_terminal());
    assert!(!player.has_pending_work());
    assert!(player.last_error().is_none());

    // all three sub-events resolved to the same element
    let events = lab.injector.events();
    assert!(events.iter().all(|event| event.target == events[0].target));
    assert_eq!(events[0].x, Some(10));
    assert_eq!(events[0].y, Some(10));
}

#[test]
fn tap_sub_events_inherit_modifiers_and_button() {
    let lab = Lab::new();
    lab.dom
        .insert("#btn", FakeNode::new("button").id("btn").visible(true));
    let player = lab.player();

    let modifiers = Modifiers {
        shift: true,
        ..Modifiers::default()
    };
    player
        .play(
            PlayableBuilder::event("tap")
                .target("#btn")
                .modifiers(modifiers)
                .button(2),
        )
        .expect("enqueue");
    lab.run_until_idle();

    let events = lab.injector.events();
    assert_eq!(events.len(), 3);
    for event in &events {
        assert!(event.modifiers.shift);
        assert_eq!(event.button, Some(2));
    }
}

#[test]
fn deferred_visibility_dispatches_after_element_shows() {
    let lab = Lab::new();
    let node = lab.dom.insert("#btn", FakeNode::new("button").id("btn"));
    let player = lab.player();

    let dom = Rc::clone(&lab.dom);
    lab.at(40, move || dom.set_visible(node, true));

    player
        .play(
            PlayableBuilder::event("click")
                .target("#btn")
                .timeout_ms(1000),
        )
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(lab.injector.event_types(), vec!["click"]);
    assert!(player.last_error().is_none());
    // dispatched on the first poll at or after the flip
    assert!(lab.now() >= Time::from_millis(40));
    assert!(lab.now() <= Time::from_millis(60));
}

#[test]
fn missing_element_times_out_with_descriptive_error() {
    let lab = Lab::new();
    let player = lab.player();

    let errors: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    player.on_error(move |error| sink.borrow_mut().push(error.to_string()));

    let ended = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ended);
    player.on_end(move || *flag.borrow_mut() = true);

    player
        .play(
            PlayableBuilder::event("click")
                .target("#missing")
                .timeout_ms(200),
        )
        .expect("enqueue");
    lab.run_until_idle();

    let errors = errors.borrow();
    assert_eq!(errors.len(), 1, "exactly one error event");
    assert!(errors[0].contains("#missing"), "names the element: {}", errors[0]);
    assert!(errors[0].contains("available"), "names the condition: {}", errors[0]);
    assert!(errors[0].contains("click"), "names the event type: {}", errors[0]);
    assert!(*ended.borrow(), "end event fired");
    assert!(!player.has_pending_work());
    assert!(lab.injector.events().is_empty());
}

#[test]
fn timeout_starts_at_first_not_ready_observation() {
    let lab = Lab::new();
    let player = lab.player();

    // the element turns up 150ms in; a 200ms timeout that started at
    // enqueue would have ~50ms of slack, one that starts at first
    // observation has the full budget
    let dom = Rc::clone(&lab.dom);
    player
        .play(PlayableBuilder::wait(100))
        .expect("enqueue");
    lab.at(150, move || {
        dom.insert("#late", FakeNode::new("div").id("late").visible(true));
    });
    player
        .play(
            PlayableBuilder::event("click")
                .target("#late")
                .timeout_ms(200),
        )
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(lab.injector.event_types(), vec!["click"]);
    assert!(player.last_error().is_none());
}

#[test]
fn zero_timeout_never_times_out_but_makes_progress() {
    let lab = Lab::new();
    let player = lab.player();

    let dom = Rc::clone(&lab.dom);
    lab.at(7000, move || {
        dom.insert("#late", FakeNode::new("div").id("late").visible(true));
    });

    let click = player
        .play(
            PlayableBuilder::event("click")
                .target("#late")
                .timeout_ms(0),
        )
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(click.borrow().state(), PlayState::Done);
    assert_eq!(lab.injector.event_types(), vec!["click"]);
    assert!(player.last_error().is_none());
}

#[test]
fn type_text_expands_into_alternating_key_pairs() {
    let lab = Lab::new();
    lab.dom
        .insert("#field", FakeNode::new("input").id("field").visible(true));
    let player = lab.player();

    player
        .play(PlayableBuilder::event("type").target("#field").text("abc"))
        .expect("enqueue");
    lab.run_until_idle();

    let events = lab.injector.events();
    assert_eq!(events.len(), 6);
    for (index, expected) in ["a", "a", "b", "b", "c", "c"].iter().enumerate() {
        let kind = if index % 2 == 0 { "keydown" } else { "keyup" };
        assert_eq!(events[index].event_type, kind);
        assert_eq!(events[index].key.as_deref(), Some(*expected));
    }
}

#[test]
fn type_with_single_key_produces_one_pair() {
    let lab = Lab::new();
    lab.dom
        .insert("#field", FakeNode::new("input").id("field").visible(true));
    let player = lab.player();

    player
        .play(PlayableBuilder::event("type").target("#field").key("Enter"))
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(lab.injector.event_types(), vec!["keydown", "keyup"]);
}

#[test]
fn type_with_neither_text_nor_key_is_skipped() {
    let lab = Lab::new();
    lab.dom
        .insert("#field", FakeNode::new("input").id("field").visible(true));
    let player = lab.player();

    let playable = player
        .play(PlayableBuilder::event("type").target("#field"))
        .expect("enqueue");
    lab.run_until_idle();

    assert!(lab.injector.events().is_empty());
    assert_eq!(playable.borrow().state(), PlayState::Done);
}

#[test]
fn back_reference_past_queue_start_is_rejected() {
    let lab = Lab::new();
    let player = lab.player();

    let result = player.play(PlayableBuilder::event("click").target(TargetSpec::back(3)));
    assert!(result.is_err());
}

#[test]
fn pause_unshifts_pending_event_and_resume_replays_it() {
    let lab = Lab::new();
    let node = lab.dom.insert("#btn", FakeNode::new("button").id("btn"));
    let player = lab.player();

    player
        .play(PlayableBuilder::event("click").target("#btn"))
        .expect("enqueue");
    // let the player pick the event up, then pause while it is pending
    lab.advance(5);
    assert_eq!(player.stats().pending.map(|id| id.raw()), Some(1));

    player.pause();
    assert_eq!(player.stats().pending, None);
    assert_eq!(player.stats().queue_len, 1);

    lab.dom.set_visible(node, true);
    lab.advance(100);
    assert!(lab.injector.events().is_empty(), "paused player stays idle");

    player.resume();
    lab.run_until_idle();
    assert_eq!(lab.injector.event_types(), vec!["click"]);
}

#[test]
fn selector_re_resolution_rebinds_the_cached_wrapper() {
    let lab = Lab::new();
    lab.dom.insert("#btn", FakeNode::new("button").id("btn"));
    let player = lab.player();

    // the original node is replaced before it ever becomes visible;
    // the swap must rebind, not fail
    let dom = Rc::clone(&lab.dom);
    lab.at(30, move || {
        dom.replace("#btn", FakeNode::new("button").id("btn").visible(true));
    });

    player
        .play(PlayableBuilder::event("click").target("#btn"))
        .expect("enqueue");
    lab.run_until_idle();

    let events = lab.injector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target.raw(), 2, "dispatched at the replacement node");
    assert!(player.last_error().is_none());
}

#[test]
fn stop_empties_queue_and_fires_end() {
    let lab = Lab::new();
    let player = lab.player();

    let ended = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&ended);
    player.on_end(move || *flag.borrow_mut() = true);

    let first = player
        .play(PlayableBuilder::event("click").target("#never"))
        .expect("enqueue");
    let second = player
        .play(PlayableBuilder::wait(10))
        .expect("enqueue");

    player.stop();
    assert!(*ended.borrow());
    assert!(!player.has_pending_work());
    assert!(first.borrow().state().is_terminal());
    assert!(second.borrow().state().is_terminal());
}

#[test]
fn callback_panic_is_captured_and_fails_the_queue() {
    let lab = Lab::new();
    let player = lab.player();

    let errors: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    player.on_error(move |error| sink.borrow_mut().push(error.to_string()));

    player
        .play(PlayableBuilder::callback(|_| panic!("user bug")))
        .expect("enqueue");
    let follower = player
        .play(PlayableBuilder::wait(10))
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("user bug"));
    assert!(follower.borrow().state().is_terminal());
    assert!(!player.has_pending_work());
}

#[test]
fn animations_gate_readiness_until_idle() {
    let lab = Lab::new();
    lab.dom
        .insert("#btn", FakeNode::new("button").id("btn").visible(true));
    lab.animations.set_active(true);
    let player = lab.player();

    let animations = Rc::clone(&lab.animations);
    lab.at(80, move || animations.set_active(false));

    player
        .play(PlayableBuilder::event("click").target("#btn"))
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(lab.injector.event_types(), vec!["click"]);
    assert!(lab.now() >= Time::from_millis(80));
}

#[test]
fn touch_count_balances_over_a_tap() {
    let lab = Lab::new();
    lab.dom
        .insert("#btn", FakeNode::new("button").id("btn").visible(true));
    let player = lab.player();

    player
        .play(PlayableBuilder::event("tap").target("#btn"))
        .expect("enqueue");
    lab.run_until_idle();

    assert_eq!(lab.injector.events().len(), 3);
    assert_eq!(player.stats().touch_count, 0, "gesture starts and ends balance");
}
