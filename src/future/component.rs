//! The component future: element futures enriched with
//! component-lifecycle states.

use super::{Fluent, FutureCore};

/// A future over a widget component's primary element.
///
/// Adds the component-level states ("expanded", "collapsed",
/// "viewReady", "selected") registered for the component class.
#[derive(Clone, Debug)]
pub struct ComponentFuture {
    core: FutureCore,
}

impl ComponentFuture {
    pub(crate) fn from_core(core: FutureCore) -> Self {
        Self { core }
    }

    /// Waits for the component to be expanded.
    #[must_use]
    pub fn expanded(self) -> Self {
        self.state("expanded")
    }

    /// Waits for the component to be collapsed.
    #[must_use]
    pub fn collapsed(self) -> Self {
        self.state("collapsed")
    }

    /// Waits for the component's view to be fully rendered.
    #[must_use]
    pub fn view_ready(self) -> Self {
        self.state("viewReady")
    }
}

impl Fluent for ComponentFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}
