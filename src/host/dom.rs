//! DOM seam: opaque node handles, the backend trait, and the wrapped
//! element type.
//!
//! The engine never owns a DOM. It sees nodes as opaque [`NodeId`]s
//! behind a [`DomBackend`] and holds at most one [`Element`] wrapper
//! per resolved target. When a locator re-resolves to a different node
//! the wrapper is rebound in place, so chained futures keep observing
//! the same `Element` identity across node replacement.

use crate::types::Direction;
use core::fmt;
use std::cell::Cell;
use std::rc::Rc;

/// Opaque handle to a DOM node owned by the backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node id from a raw backend handle.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw backend handle.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The DOM facing surface the engine consumes.
///
/// `find` is the pluggable query-dialect hook: it receives the locator
/// expression verbatim, an optional scope root, and a search
/// [`Direction`], and returns a matching node or `None`.
pub trait DomBackend {
    /// Returns true if the node is attached to the document.
    fn is_attached(&self, node: NodeId) -> bool;
    /// Returns true if the node is rendered visible.
    fn is_visible(&self, node: NodeId) -> bool;
    /// Returns the node's text content.
    fn text(&self, node: NodeId) -> String;
    /// Returns true if `ancestor` contains `descendant`.
    fn contains(&self, ancestor: NodeId, descendant: NodeId) -> bool;
    /// Returns true if the node carries the CSS class.
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    /// Human identifier for diagnostics: the node's id when it has
    /// one, otherwise its tag.
    fn describe(&self, node: NodeId) -> String;
    /// Resolves a locator expression to a node, optionally scoped.
    fn find(&self, expression: &str, root: Option<NodeId>, direction: Direction)
    -> Option<NodeId>;
}

/// A wrapped element: a backend handle with identity that survives
/// node replacement.
///
/// Cloning an `Element` clones the identity, not the data; all clones
/// observe a [`rebind`](Self::rebind).
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

struct ElementInner {
    dom: Rc<dyn DomBackend>,
    node: Cell<NodeId>,
}

impl Element {
    /// Wraps a backend node.
    #[must_use]
    pub fn wrap(dom: Rc<dyn DomBackend>, node: NodeId) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                dom,
                node: Cell::new(node),
            }),
        }
    }

    /// Returns the current backing node.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.inner.node.get()
    }

    /// Repoints this wrapper at a replacement node.
    ///
    /// Chained futures that hold clones of this element all observe
    /// the new node; the swap is not a failure.
    pub fn rebind(&self, node: NodeId) {
        self.inner.node.set(node);
    }

    /// Returns true if the element is attached to the document.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.dom.is_attached(self.node())
    }

    /// Returns true if the element is rendered visible.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.dom.is_visible(self.node())
    }

    /// Returns the element's text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.inner.dom.text(self.node())
    }

    /// Returns true if this element contains `other`.
    #[must_use]
    pub fn contains(&self, other: &Element) -> bool {
        self.inner.dom.contains(self.node(), other.node())
    }

    /// Returns true if the element carries the CSS class.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.inner.dom.has_class(self.node(), class)
    }

    /// Human identifier for diagnostics (id or tag).
    #[must_use]
    pub fn describe(&self) -> String {
        self.inner.dom.describe(self.node())
    }

    /// Returns true if `self` and `other` are the same wrapper.
    #[must_use]
    pub fn same_wrapper(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("node", &self.node())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapDom {
        visible: RefCell<HashMap<NodeId, bool>>,
    }

    impl DomBackend for MapDom {
        fn is_attached(&self, node: NodeId) -> bool {
            self.visible.borrow().contains_key(&node)
        }
        fn is_visible(&self, node: NodeId) -> bool {
            self.visible.borrow().get(&node).copied().unwrap_or(false)
        }
        fn text(&self, _node: NodeId) -> String {
            String::new()
        }
        fn contains(&self, _ancestor: NodeId, _descendant: NodeId) -> bool {
            false
        }
        fn has_class(&self, _node: NodeId, _class: &str) -> bool {
            false
        }
        fn describe(&self, node: NodeId) -> String {
            format!("<node {}>", node.raw())
        }
        fn find(
            &self,
            _expression: &str,
            _root: Option<NodeId>,
            _direction: Direction,
        ) -> Option<NodeId> {
            None
        }
    }

    #[test]
    fn rebind_is_visible_through_clones() {
        let dom: Rc<dyn DomBackend> = Rc::new(MapDom::default());
        let el = Element::wrap(Rc::clone(&dom), NodeId::from_raw(1));
        let alias = el.clone();
        assert!(alias.same_wrapper(&el));

        el.rebind(NodeId::from_raw(2));
        assert_eq!(alias.node(), NodeId::from_raw(2));
    }

    #[test]
    fn wrap_does_not_share_identity() {
        let dom: Rc<dyn DomBackend> = Rc::new(MapDom::default());
        let a = Element::wrap(Rc::clone(&dom), NodeId::from_raw(1));
        let b = Element::wrap(dom, NodeId::from_raw(1));
        assert!(!a.same_wrapper(&b));
        assert_eq!(a.node(), b.node());
    }
}
