//! Tabular (grid) futures: rows and cells.
//!
//! Rows compose the record-locator layer of list items; cells add a
//! column-locator layer on top (by ordinal, column id, or column
//! property).

use super::list::{record_node_locator, submit_reveal, RecordLocator};
use super::select::Selectable;
use super::{Fluent, FutureClass, FutureCore};
use crate::locator::Locator;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;

/// Addresses one column of a tabular collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnLocator {
    /// By ordinal position.
    At(usize),
    /// By column id.
    Id(String),
    /// First column whose `property` equals `value` (e.g. a
    /// dataIndex).
    Where(String, Value),
}

impl ColumnLocator {
    fn resolve(
        &self,
        widgets: &Rc<dyn crate::host::WidgetRuntime>,
        el: &crate::host::Element,
    ) -> Option<usize> {
        match self {
            Self::At(index) => (*index < widgets.column_count(el)).then_some(*index),
            Self::Id(id) => widgets.column_index_by_id(el, id),
            Self::Where(property, value) => widgets.column_index_where(el, property, value),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::At(index) => format!("column #{index}"),
            Self::Id(id) => format!("column id={id}"),
            Self::Where(property, value) => format!("column {property}={value}"),
        }
    }
}

/// A future over a tabular (grid) collection component.
#[derive(Clone, Debug)]
pub struct TabularFuture {
    core: FutureCore,
}

impl TabularFuture {
    pub(crate) fn from_core(core: FutureCore) -> Self {
        Self { core }
    }

    /// A future over the row at an ordinal position.
    #[must_use]
    pub fn row_at(&self, index: usize) -> RowFuture {
        RowFuture::bind(self.clone(), RecordLocator::At(index))
    }

    /// A future over the row with the given record id.
    #[must_use]
    pub fn row_by_id(&self, id: impl Into<Value>) -> RowFuture {
        RowFuture::bind(self.clone(), RecordLocator::Id(id.into()))
    }

    /// A future over the first row whose `property` equals `value`.
    #[must_use]
    pub fn row_where(
        &self,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> RowFuture {
        RowFuture::bind(
            self.clone(),
            RecordLocator::Where(property.into(), value.into()),
        )
    }
}

impl Fluent for TabularFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}

impl Selectable for TabularFuture {}

/// A future over one row of a grid, addressed by record.
#[derive(Clone, Debug)]
pub struct RowFuture {
    core: FutureCore,
    owner: TabularFuture,
    record_index: Rc<Cell<Option<usize>>>,
}

impl RowFuture {
    fn bind(owner: TabularFuture, record: RecordLocator) -> Self {
        let index_cell = Rc::new(Cell::new(None));
        let locator = record_node_locator(owner.core(), record, Rc::clone(&index_cell));
        let core =
            FutureCore::bind(owner.core().cx().clone(), FutureClass::Row, locator, None);
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

    /// A future over this row's cell in the column at an ordinal
    /// position.
    #[must_use]
    pub fn cell_at(&self, column: usize) -> CellFuture {
        CellFuture::bind(self.clone(), ColumnLocator::At(column))
    }

    /// A future over this row's cell in the column with the given id.
    #[must_use]
    pub fn cell_by_id(&self, column_id: impl Into<String>) -> CellFuture {
        CellFuture::bind(self.clone(), ColumnLocator::Id(column_id.into()))
    }

    /// A future over this row's cell in the first column whose
    /// `property` equals `value`.
    #[must_use]
    pub fn cell_where(
        &self,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> CellFuture {
        CellFuture::bind(
            self.clone(),
            ColumnLocator::Where(property.into(), value.into()),
        )
    }

    /// Scrolls the row's node into view; completes on the scroller's
    /// end signal.
    #[must_use]
    pub fn reveal(self) -> Self {
        submit_reveal(&self.core, self.owner.core(), &self.record_index);
        self
    }

    /// Returns to the owning grid future.
    #[must_use]
    pub fn grid(&self) -> TabularFuture {
        self.owner.clone()
    }
}

impl Fluent for RowFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}

/// A future over one cell, addressed by row record and column.
#[derive(Clone, Debug)]
pub struct CellFuture {
    core: FutureCore,
    owner: RowFuture,
}

impl CellFuture {
    fn bind(owner: RowFuture, column: ColumnLocator) -> Self {
        let grid_root = Rc::clone(owner.grid().core().root());
        // the row future stamps its record index as it resolves
        let row_index = Rc::clone(&owner.record_index);
        let describe = column.describe();
        let locator = Locator::func(describe, move |host| {
            let grid = grid_root.borrow().resolved_target()?;
            let row = row_index.get()?;
            let column = column.resolve(host.widgets(), &grid)?;
            host.widgets().node_for_cell(&grid, row, column)
        });
        let core =
            FutureCore::bind(owner.core().cx().clone(), FutureClass::Cell, locator, None);
        Self { core, owner }
    }

    /// Returns to the owning row future.
    #[must_use]
    pub fn row(&self) -> RowFuture {
        self.owner.clone()
    }

    /// Returns to the owning grid future.
    #[must_use]
    pub fn grid(&self) -> TabularFuture {
        self.owner.grid()
    }
}

impl Fluent for CellFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}
