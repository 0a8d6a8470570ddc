//! The selection mixin for list-like futures.
//!
//! A uniform `select`/`deselect` verb family plus a matching
//! `selected`/`deselected` wait family, all over one addressing type:
//! [`RecordSelector`] (ids, indexes, inclusive ranges with open end,
//! property query, all).
//!
//! The wait validator compares the collection's current selection
//! against the requested record set. A requested-count mismatch
//! (fewer resolved records than requested ids or indexes)
//! short-circuits to false before any element comparison.

use super::{Fluent, FutureClass};
use crate::host::{Element, WidgetRuntime};
use crate::playable::PlayableBuilder;
use crate::types::Visibility;
use serde_json::Value;
use std::collections::BTreeSet;
use std::rc::Rc;

/// The four record addressing modes.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSelector {
    /// Records matched through the collection's id lookup.
    Ids(Vec<Value>),
    /// Records by position.
    Indexes(Vec<usize>),
    /// A positional range; endpoints inclusive, an omitted `end`
    /// means "through the last available record".
    Range {
        /// First index, inclusive.
        start: usize,
        /// Last index, inclusive; `None` runs to the end.
        end: Option<usize>,
    },
    /// Every record whose `property` equals `value` (linear scan).
    Query {
        /// Record property name.
        property: String,
        /// Value to match.
        value: Value,
    },
    /// Every record.
    All,
}

impl RecordSelector {
    /// One record by position.
    #[must_use]
    pub fn at(index: usize) -> Self {
        Self::Indexes(vec![index])
    }

    /// One record by id.
    #[must_use]
    pub fn id(id: impl Into<Value>) -> Self {
        Self::Ids(vec![id.into()])
    }

    /// Several records by id.
    #[must_use]
    pub fn ids<V: Into<Value>>(ids: impl IntoIterator<Item = V>) -> Self {
        Self::Ids(ids.into_iter().map(Into::into).collect())
    }

    /// A positional range, endpoints inclusive.
    #[must_use]
    pub fn range(start: usize, end: Option<usize>) -> Self {
        Self::Range { start, end }
    }

    /// A property/value query.
    #[must_use]
    pub fn query(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Query {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Outcome of resolving a selector against the live record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorResolution {
    /// How many records were requested.
    pub requested: usize,
    /// The indexes that actually resolved, ascending.
    pub indexes: Vec<usize>,
}

impl RecordSelector {
    pub(crate) fn resolve(
        &self,
        widgets: &Rc<dyn WidgetRuntime>,
        el: &Element,
    ) -> SelectorResolution {
        match self {
            Self::Ids(ids) => SelectorResolution {
                requested: ids.len(),
                indexes: ids
                    .iter()
                    .filter_map(|id| widgets.index_of_id(el, id))
                    .collect(),
            },
            Self::Indexes(indexes) => {
                let count = widgets.record_count(el);
                SelectorResolution {
                    requested: indexes.len(),
                    indexes: indexes.iter().copied().filter(|i| *i < count).collect(),
                }
            }
            Self::Range { start, end } => {
                let count = widgets.record_count(el);
                match end {
                    Some(end) => {
                        let requested = (end + 1).saturating_sub(*start);
                        SelectorResolution {
                            requested,
                            indexes: (*start..=*end).filter(|i| *i < count).collect(),
                        }
                    }
                    None => {
                        let indexes: Vec<usize> = (*start..count).collect();
                        SelectorResolution {
                            requested: indexes.len(),
                            indexes,
                        }
                    }
                }
            }
            Self::Query { property, value } => {
                let indexes = widgets.indexes_where(el, property, value);
                SelectorResolution {
                    requested: indexes.len(),
                    indexes,
                }
            }
            Self::All => {
                let indexes: Vec<usize> = (0..widgets.record_count(el)).collect();
                SelectorResolution {
                    requested: indexes.len(),
                    indexes,
                }
            }
        }
    }
}

/// Which way the validator compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCheck {
    /// Every requested record selected, counts equal.
    Selected,
    /// No requested record selected.
    Deselected,
}

/// The deterministic selection validator.
pub(crate) fn selection_satisfied(
    widgets: &Rc<dyn WidgetRuntime>,
    el: &Element,
    selector: &RecordSelector,
    check: SelectionCheck,
) -> bool {
    let resolution = selector.resolve(widgets, el);
    if resolution.indexes.len() != resolution.requested {
        return false;
    }
    let selected: BTreeSet<usize> = widgets.selected_indexes(el).into_iter().collect();
    match check {
        SelectionCheck::Selected => {
            resolution.indexes.iter().all(|i| selected.contains(i))
                && selected.len() == resolution.indexes.len()
        }
        SelectionCheck::Deselected => {
            resolution.indexes.iter().all(|i| !selected.contains(i))
        }
    }
}

/// The `select*`/`deselect*` verbs and `selected`/`deselected` waits
/// shared by list and tabular futures.
pub trait Selectable: Fluent {
    /// Replaces the selection with the addressed records.
    fn select(self, selector: RecordSelector) -> Self {
        self.apply_selection(selector, true)
    }

    /// Removes the addressed records from the selection.
    fn deselect(self, selector: RecordSelector) -> Self {
        self.apply_selection(selector, false)
    }

    /// Selects every record.
    fn select_all(self) -> Self {
        self.select(RecordSelector::All)
    }

    /// Selects one record by position.
    fn select_at(self, index: usize) -> Self {
        self.select(RecordSelector::at(index))
    }

    /// Selects one or more records by id.
    fn select_ids<V: Into<Value>>(self, ids: impl IntoIterator<Item = V>) -> Self {
        self.select(RecordSelector::ids(ids))
    }

    /// Selects an inclusive positional range; `None` end runs to the
    /// last record.
    fn select_range(self, start: usize, end: Option<usize>) -> Self {
        self.select(RecordSelector::range(start, end))
    }

    /// Selects every record whose `property` equals `value`.
    fn select_where(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.select(RecordSelector::query(property, value))
    }

    /// Deselects every record.
    fn deselect_all(self) -> Self {
        self.deselect(RecordSelector::All)
    }

    /// Deselects one record by position.
    fn deselect_at(self, index: usize) -> Self {
        self.deselect(RecordSelector::at(index))
    }

    /// Deselects one or more records by id.
    fn deselect_ids<V: Into<Value>>(self, ids: impl IntoIterator<Item = V>) -> Self {
        self.deselect(RecordSelector::ids(ids))
    }

    /// Waits until the addressed records are exactly the selection.
    fn selected(self, selector: RecordSelector) -> Self {
        self.selection_wait(selector, SelectionCheck::Selected)
    }

    /// Waits until none of the addressed records is selected.
    fn deselected(self, selector: RecordSelector) -> Self {
        self.selection_wait(selector, SelectionCheck::Deselected)
    }

    /// Waits until the records with the given ids are exactly the
    /// selection.
    fn selected_ids<V: Into<Value>>(self, ids: impl IntoIterator<Item = V>) -> Self {
        self.selected(RecordSelector::ids(ids))
    }

    #[doc(hidden)]
    fn apply_selection(self, selector: RecordSelector, select: bool) -> Self {
        let core = self.core();
        debug_assert!(matches!(
            core.class(),
            FutureClass::List | FutureClass::Tabular
        ));
        let builder = PlayableBuilder::callback(move |cx| {
            let Some(element) = cx.value() else {
                cx.player().fail("collection never resolved");
                return;
            };
            let widgets = Rc::clone(cx.player().host().widgets());
            let resolution = selector.resolve(&widgets, element);
            if select {
                widgets.select_indexes(element, &resolution.indexes, false);
            } else {
                widgets.deselect_indexes(element, &resolution.indexes);
            }
        })
        .target(core.shared_target());
        core.submit(core.with_timeout(builder));
        self
    }

    #[doc(hidden)]
    fn selection_wait(self, selector: RecordSelector, check: SelectionCheck) -> Self {
        let core = self.core();
        let state = match check {
            SelectionCheck::Selected => "selected",
            SelectionCheck::Deselected => "deselected",
        };
        let builder = PlayableBuilder::wait(0)
            .target(core.shared_target())
            .visibility(Visibility::Ignore)
            .state_predicate(move |cx| {
                let satisfied = cx.target().is_some_and(|element| {
                    selection_satisfied(cx.host().widgets(), element, &selector, check)
                });
                if satisfied {
                    cx.clear_waiting();
                    true
                } else {
                    cx.set_waiting("selection", state);
                    false
                }
            });
        core.submit(core.with_timeout(builder));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_requested_counts() {
        // explicit end is inclusive
        let selector = RecordSelector::range(1, Some(3));
        match selector {
            RecordSelector::Range { start, end } => {
                assert_eq!(start, 1);
                assert_eq!(end, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn constructors_normalize() {
        assert_eq!(RecordSelector::at(2), RecordSelector::Indexes(vec![2]));
        assert_eq!(
            RecordSelector::id(7),
            RecordSelector::Ids(vec![Value::from(7)])
        );
        assert_eq!(
            RecordSelector::query("name", "alice"),
            RecordSelector::Query {
                property: "name".into(),
                value: Value::from("alice"),
            }
        );
    }
}
