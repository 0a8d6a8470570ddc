//! The bare element future.

use super::{Fluent, FutureCore};

/// A future over a plain DOM element located by expression, node, or
/// resolver function.
#[derive(Clone, Debug)]
pub struct ElementFuture {
    core: FutureCore,
}

impl ElementFuture {
    pub(crate) fn from_core(core: FutureCore) -> Self {
        Self { core }
    }
}

impl Fluent for ElementFuture {
    fn core(&self) -> &FutureCore {
        &self.core
    }
}
