//! Selection mixin and collection futures: addressing modes, the
//! selection validator, item/row/cell resolution, and reveal.

use domplay::lab::{FakeCollection, FakeNode, FakeRecord, Lab};
use domplay::{DomBackend, Fluent, Futures, NodeId, RecordSelector, Selectable, ToolkitVariant};
use std::collections::HashMap;
use std::rc::Rc;

struct GridFixture {
    lab: Lab,
    grid_node: NodeId,
    row_nodes: Vec<NodeId>,
}

/// A grid with records id 1..=4, a name column, and rendered row and
/// cell nodes.
fn grid_fixture(async_scroll: bool) -> GridFixture {
    let lab = Lab::new();
    let grid_node = lab
        .dom
        .insert("#grid", FakeNode::new("div").id("grid").visible(true));

    let names = ["alice", "bob", "carol", "bob"];
    let mut records = Vec::new();
    let mut row_nodes = Vec::new();
    let mut cells = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        let row = lab.dom.insert(
            format!("#row-{index}"),
            FakeNode::new("tr").id(format!("row-{index}")).visible(true),
        );
        row_nodes.push(row);
        let cell = lab.dom.insert(
            format!("#cell-{index}-name"),
            FakeNode::new("td")
                .id(format!("cell-{index}-name"))
                .visible(true),
        );
        cells.insert((index, 1), cell);
        records.push(
            FakeRecord::new((index + 1) as i64)
                .property("name", *name)
                .node(row),
        );
    }

    lab.widgets.install_collection(
        grid_node,
        FakeCollection {
            records,
            selection: std::collections::BTreeSet::new(),
            columns: vec!["id".to_string(), "name".to_string()],
            cells,
            async_scroll,
        },
    );
    GridFixture {
        lab,
        grid_node,
        row_nodes,
    }
}

#[test]
fn select_by_ids_then_wait_selected() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .select_ids([1, 3])
        .selected_ids([1, 3]);
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn select_replaces_the_previous_selection() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .select_at(0)
        .select_ids([2])
        .selected(RecordSelector::at(1));
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn selected_wait_blocks_until_selection_matches() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    // selection happens out-of-band 80ms in
    let widgets = Rc::clone(&lab.widgets);
    let dom = Rc::clone(&lab.dom);
    let grid_node = fixture.grid_node;
    lab.at(80, move || {
        // reach through the runtime the way an app would
        let element = domplay::Element::wrap(dom as Rc<dyn domplay::DomBackend>, grid_node);
        use domplay::WidgetRuntime;
        widgets.select_indexes(&element, &[1, 3], false);
    });

    futures
        .grid("#grid")
        .selected(RecordSelector::Indexes(vec![1, 3]));
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    assert!(lab.now() >= domplay::Time::from_millis(80));
}

#[test]
fn selected_wait_fails_on_requested_count_mismatch() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    // id 9 resolves to no record: the validator must short-circuit to
    // false and the wait must time out even though ids 1 and 3 are
    // selected
    futures
        .grid("#grid")
        .select_ids([1, 3])
        .timeout(150)
        .selected_ids([1, 3, 9]);
    lab.run_until_idle();

    let message = player.last_error().expect("validator stays false").to_string();
    assert!(message.contains("selected"), "message: {message}");
}

#[test]
fn range_selection_is_inclusive_with_open_end() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .select_range(1, None)
        .selected(RecordSelector::range(1, None));
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn query_selection_matches_every_record() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .select_where("name", "bob")
        .selected(RecordSelector::query("name", "bob"));
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn deselect_then_wait_deselected() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .select_all()
        .deselect_at(2)
        .deselected(RecordSelector::at(2));
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![0, 1, 3]);
}

#[test]
fn row_future_resolves_by_record_id() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    let row = futures.grid("#grid").row_by_id(2);
    row.clone().click();
    lab.run_until_idle();

    assert_eq!(row.record_index(), Some(1));
    let events = lab.injector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, fixture.row_nodes[1]);
}

#[test]
fn row_future_resolves_by_property() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    let row = futures.grid("#grid").row_where("name", "carol");
    row.clone().click();
    lab.run_until_idle();

    assert_eq!(row.record_index(), Some(2));
    assert_eq!(lab.injector.events()[0].target, fixture.row_nodes[2]);
}

#[test]
fn cell_future_composes_row_and_column_locators() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .row_at(0)
        .cell_by_id("name")
        .click();
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let events = lab.injector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(lab.dom.describe(events[0].target), "#cell-0-name");
}

#[test]
fn missing_record_times_out_with_record_description() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures
        .grid("#grid")
        .row_by_id(42)
        .timeout(150)
        .click();
    lab.run_until_idle();

    let message = player.last_error().expect("timed out").to_string();
    assert!(message.contains("record id=42"), "message: {message}");
}

#[test]
fn reveal_completes_on_scroll_end_signal() {
    let fixture = grid_fixture(true);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures.grid("#grid").row_at(3).reveal().click();
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let events = lab.injector.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, fixture.row_nodes[3]);
    // the asynchronous scroller's latency elapsed before the click
    assert!(lab.now() >= domplay::Time::from_millis(20));
}

#[test]
fn reveal_is_synchronous_without_an_async_scroller() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    futures.grid("#grid").row_at(0).reveal().click();
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    assert_eq!(lab.injector.events().len(), 1);
}

#[test]
fn return_to_owner_continues_the_outer_chain() {
    let fixture = grid_fixture(false);
    let lab = &fixture.lab;
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    let row = futures.grid("#grid").row_at(1);
    let grid = row.clone().click().grid();
    grid.select_at(1);
    lab.run_until_idle();

    assert!(player.last_error().is_none());
    let selection = lab
        .widgets
        .collection(fixture.grid_node)
        .expect("collection")
        .selection;
    assert_eq!(selection.into_iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn list_items_resolve_like_rows() {
    let lab = Lab::new();
    let list_node = lab
        .dom
        .insert("#list", FakeNode::new("ul").id("list").visible(true));
    let item_node = lab
        .dom
        .insert("#item-0", FakeNode::new("li").id("item-0").visible(true));
    lab.widgets.install_collection(
        list_node,
        FakeCollection {
            records: vec![FakeRecord::new(10).node(item_node)],
            ..FakeCollection::default()
        },
    );
    let player = lab.player();
    let futures = Futures::new(player.clone(), ToolkitVariant::Classic);

    let item = futures.list("#list").item_by_id(10);
    item.clone().click();
    lab.run_until_idle();

    assert_eq!(item.record_index(), Some(0));
    assert_eq!(lab.injector.events()[0].target, item_node);
    // return-to-owner hands back the list future
    let _list = item.list();
}
