//! The form-field future.

use super::{Fluent, FutureCore};
use crate::playable::PlayableBuilder;
use serde_json::Value;

/// A future over a form field: value reads and writes go through the
/// widget API rather than raw key events.
#[derive(Clone, Debug)]
pub struct FieldFuture {
    core: FutureCore,
}

impl FieldFuture {
    pub(crate) fn from_core(core: FutureCore) -> Self {
        Self { core }
    }

    /// Sets the field's value through the widget API.
    #[must_use]
    pub fn set_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        let builder = PlayableBuilder::callback(move |cx| {
            if let Some(element) = cx.value() {
                cx.player().host().widgets().set_value(element, &value);
            } else {
                cx.player().fail("field never resolved");
            }
        })
        .target(self.core.shared_target());
        self.core.submit(self.core.with_timeout(builder));
        self
    }

    /// Waits for the field's value to match `pattern` (substring for
    /// string values, equality otherwise).
    #[must_use]
    pub fn value_like(self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.state_with("valueLike", vec![Value::String(pattern)])
    }

    /// Waits for the field to be checked (or unchecked).
    #[must_use]
    pub fn checked(self, want: bool) -> Self {
        self.state_with("checked", vec![Value::Bool(want)])
    }
}

impl Fluent for FieldFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}
