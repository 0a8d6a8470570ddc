//! Property tests for the scheduler's ordering and termination
//! invariants.

use domplay::lab::{FakeNode, Lab};
use domplay::{PlayState, PlayableBuilder, PlayableHandle};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// The playable shapes a top-level enqueue sequence draws from.
#[derive(Debug, Clone)]
enum Shape {
    Wait(u64),
    Callback,
    Event,
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    prop_oneof![
        (0u64..50).prop_map(Shape::Wait),
        Just(Shape::Callback),
        Just(Shape::Event),
    ]
}

proptest! {
    /// Every playable of a legal top-level enqueue sequence reaches
    /// exactly one terminal state, and completion order equals
    /// enqueue order.
    #[test]
    fn terminal_states_and_fifo_order(shapes in prop::collection::vec(shape_strategy(), 1..12)) {
        let lab = Lab::new();
        lab.dom.insert("#el", FakeNode::new("div").id("el").visible(true));
        let player = lab.player();

        let completed: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let mut handles: Vec<PlayableHandle> = Vec::new();

        for (index, shape) in shapes.iter().enumerate() {
            let builder = match shape {
                Shape::Wait(ms) => PlayableBuilder::wait(*ms),
                Shape::Callback => {
                    let log = Rc::clone(&completed);
                    PlayableBuilder::callback(move |_| log.borrow_mut().push(index))
                }
                Shape::Event => PlayableBuilder::event("click").target("#el"),
            };
            handles.push(player.play(builder).expect("enqueue"));
        }
        lab.run_until_idle();

        for handle in &handles {
            prop_assert_eq!(handle.borrow().state(), PlayState::Done);
        }
        let completed = completed.borrow();
        let mut sorted = completed.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&*completed, &sorted[..], "callbacks fired in enqueue order");
        prop_assert!(!player.has_pending_work());
    }

    /// Playables enqueued from inside a playing callback fire after
    /// it and before anything that was already queued behind it.
    #[test]
    fn nested_enqueues_fire_before_prior_tail(inner_count in 1usize..6) {
        let lab = Lab::new();
        let player = lab.player();

        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let outer_log = Rc::clone(&log);
        player
            .play(PlayableBuilder::callback(move |cx| {
                outer_log.borrow_mut().push("outer".to_string());
                for index in 0..inner_count {
                    let inner_log = Rc::clone(&outer_log);
                    cx.player()
                        .play(PlayableBuilder::callback(move |_| {
                            inner_log.borrow_mut().push(format!("inner-{index}"));
                        }))
                        .expect("nested enqueue");
                }
            }))
            .expect("enqueue outer");
        let tail_log = Rc::clone(&log);
        player
            .play(PlayableBuilder::callback(move |_| {
                tail_log.borrow_mut().push("tail".to_string());
            }))
            .expect("enqueue tail");
        lab.run_until_idle();

        let mut expected = vec!["outer".to_string()];
        expected.extend((0..inner_count).map(|index| format!("inner-{index}")));
        expected.push("tail".to_string());
        prop_assert_eq!(&*log.borrow(), &expected);
    }

    /// Type expansion of an N-character text dispatches exactly 2N
    /// events alternating keydown/keyup with matching keys.
    #[test]
    fn type_expansion_alternates_key_pairs(text in "[a-z0-9]{1,10}") {
        let lab = Lab::new();
        lab.dom.insert("#field", FakeNode::new("input").id("field").visible(true));
        let player = lab.player();

        player
            .play(PlayableBuilder::event("type").target("#field").text(text.clone()))
            .expect("enqueue");
        lab.run_until_idle();

        let events = lab.injector.events();
        prop_assert_eq!(events.len(), 2 * text.chars().count());
        for (pair, ch) in events.chunks(2).zip(text.chars()) {
            prop_assert_eq!(pair[0].event_type.as_str(), "keydown");
            prop_assert_eq!(pair[1].event_type.as_str(), "keyup");
            let ch_str = ch.to_string();
            prop_assert_eq!(pair[0].key.as_deref(), Some(ch_str.as_str()));
            prop_assert_eq!(pair[1].key.as_deref(), Some(ch_str.as_str()));
        }
    }

    /// Tap expansion dispatches its three DOM events in fixed order
    /// against one shared element, for any coordinates.
    #[test]
    fn tap_expansion_order_is_fixed(x in -50i32..50, y in -50i32..50) {
        let lab = Lab::new();
        lab.dom.insert("#btn", FakeNode::new("button").id("btn").visible(true));
        let player = lab.player();

        player
            .play(PlayableBuilder::event("tap").target("#btn").at(x, y))
            .expect("enqueue");
        lab.run_until_idle();

        let events = lab.injector.events();
        prop_assert_eq!(
            events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
            vec!["pointerdown", "pointerup", "click"]
        );
        prop_assert!(events.iter().all(|e| e.target == events[0].target));
    }
}

/// Deterministic seeds drive the same schedule twice; the lab must
/// produce identical event sequences.
#[test]
fn schedules_are_deterministic() {
    let run = |seed: u64| {
        let mut rng = fastrand::Rng::with_seed(seed);
        let lab = Lab::new();
        lab.dom
            .insert("#el", FakeNode::new("div").id("el").visible(true));
        let player = lab.player();
        for _ in 0..10 {
            let builder = match rng.u8(0..3) {
                0 => PlayableBuilder::wait(rng.u64(0..30)),
                1 => PlayableBuilder::event("click").target("#el"),
                _ => PlayableBuilder::event("type").target("#el").text("ab"),
            };
            player.play(builder).expect("enqueue");
        }
        lab.run_until_idle();
        lab.injector.event_types()
    };

    assert_eq!(run(42), run(42));
    assert_eq!(run(7), run(7));
}
