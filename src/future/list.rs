//! List futures and their item derivations.

use super::select::Selectable;
use super::{Fluent, FutureClass, FutureCore};
use crate::host::ScrollOutcome;
use crate::locator::Locator;
use crate::playable::PlayableBuilder;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;

/// Addresses one record of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLocator {
    /// By ordinal position.
    At(usize),
    /// Through the collection's id lookup.
    Id(Value),
    /// First record whose `property` equals `value`.
    Where(String, Value),
}

impl RecordLocator {
    pub(crate) fn resolve(
        &self,
        widgets: &Rc<dyn crate::host::WidgetRuntime>,
        el: &crate::host::Element,
    ) -> Option<usize> {
        match self {
            Self::At(index) => (*index < widgets.record_count(el)).then_some(*index),
            Self::Id(id) => widgets.index_of_id(el, id),
            Self::Where(property, value) => widgets.index_where(el, property, value),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::At(index) => format!("record #{index}"),
            Self::Id(id) => format!("record id={id}"),
            Self::Where(property, value) => format!("record {property}={value}"),
        }
    }
}

/// A future over a list-like collection component.
#[derive(Clone, Debug)]
pub struct ListFuture {
    core: FutureCore,
}

impl ListFuture {
    pub(crate) fn from_core(core: FutureCore) -> Self {
        Self { core }
    }

    /// A future over the item at an ordinal position.
    #[must_use]
    pub fn item_at(&self, index: usize) -> ItemFuture {
        ItemFuture::bind(self.clone(), RecordLocator::At(index))
    }

    /// A future over the item with the given record id.
    #[must_use]
    pub fn item_by_id(&self, id: impl Into<Value>) -> ItemFuture {
        ItemFuture::bind(self.clone(), RecordLocator::Id(id.into()))
    }

    /// A future over the first item whose `property` equals `value`.
    #[must_use]
    pub fn item_where(
        &self,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> ItemFuture {
        ItemFuture::bind(
            self.clone(),
            RecordLocator::Where(property.into(), value.into()),
        )
    }
}

impl Fluent for ListFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}

impl Selectable for ListFuture {}

/// Builds the node-locator for one record of a collection: resolve
/// the collection's wrapper, search for the record, stamp the index,
/// then obtain the rendered node.
pub(crate) fn record_node_locator(
    collection: &FutureCore,
    record: RecordLocator,
    index_cell: Rc<Cell<Option<usize>>>,
) -> Locator {
    let collection_root = Rc::clone(collection.root());
    let describe = record.describe();
    Locator::func(describe, move |host| {
        let collection = collection_root.borrow().resolved_target()?;
        let index = record.resolve(host.widgets(), &collection)?;
        index_cell.set(Some(index));
        host.widgets().node_for_record(&collection, index)
    })
}

/// Enqueues a reveal: scroll the record into view, completing at the
/// collection's scroll-end signal (or synchronously when the
/// collection has no asynchronous scroller).
pub(crate) fn submit_reveal(
    core: &FutureCore,
    collection: &FutureCore,
    index_cell: &Rc<Cell<Option<usize>>>,
) {
    let collection_root = Rc::clone(collection.root());
    let index_cell = Rc::clone(index_cell);
    let builder = PlayableBuilder::callback_async(move |cx, done| {
        let Some(collection) = collection_root.borrow().resolved_target() else {
            done.fail("collection never resolved");
            return;
        };
        let Some(index) = index_cell.get() else {
            done.fail("record never located");
            return;
        };
        let host = cx.player().host();
        let at_end = done.clone();
        match host.widgets().scroll_to_record(
            &collection,
            index,
            Box::new(move || at_end.done()),
        ) {
            ScrollOutcome::Completed => done.done(),
            ScrollOutcome::Pending => {}
        }
    })
    .target(core.shared_target());
    core.submit(core.with_timeout(builder));
}

/// A future over one item of a list, addressed by record.
#[derive(Clone, Debug)]
pub struct ItemFuture {
    core: FutureCore,
    owner: ListFuture,
    record_index: Rc<Cell<Option<usize>>>,
}

impl ItemFuture {
    fn bind(owner: ListFuture, record: RecordLocator) -> Self {
        let index_cell = Rc::new(Cell::new(None));
        let locator = record_node_locator(owner.core(), record, Rc::clone(&index_cell));
        let core = FutureCore::bind(
            owner.core().cx().clone(),
            FutureClass::Item,
            locator,
            None,
        );
        Self {
            core,
            owner,
            record_index: index_cell,
        }
    }

    /// The record index stamped by resolution, once it happened.
    #[must_use]
    pub fn record_index(&self) -> Option<usize> {
        self.record_index.get()
    }

    /// Scrolls the item's node into view; completes on the scroller's
    /// end signal.
    #[must_use]
    pub fn reveal(self) -> Self {
        submit_reveal(&self.core, self.owner.core(), &self.record_index);
        self
    }

    /// Returns to the owning list future.
    #[must_use]
    pub fn list(&self) -> ListFuture {
        self.owner.clone()
    }
}

impl Fluent for ItemFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}
