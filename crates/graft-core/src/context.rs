//! Ancestor-to-descendant data flow with subscriber invalidation.

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::collections::map::HashMap;
use crate::node::{NodeId, NodeInner};

/// Lazily allocated per-node publication point.
///
/// Holds at most one published value plus the set of descendant nodes that
/// resolved it through the context hook. Subscribers are weak back-references
/// keyed by node id; dead entries are pruned whenever the set is collected.
#[derive(Default)]
pub(crate) struct ContextSlot {
    value: Option<Box<dyn Any>>,
    subscribers: HashMap<NodeId, Weak<NodeInner>>,
}

impl ContextSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publishes `value`, returning whether it differs from the old one.
    ///
    /// A value of a different type always counts as changed.
    pub(crate) fn publish<T: PartialEq + 'static>(&mut self, value: T) -> bool {
        let unchanged = self
            .value
            .as_ref()
            .and_then(|old| old.downcast_ref::<T>())
            .is_some_and(|old| *old == value);
        if unchanged {
            return false;
        }
        self.value = Some(Box::new(value));
        true
    }

    pub(crate) fn read<T: Clone + 'static>(&self) -> Option<T> {
        self.value.as_ref()?.downcast_ref::<T>().cloned()
    }

    pub(crate) fn subscribe(&mut self, id: NodeId, node: Weak<NodeInner>) {
        self.subscribers.insert(id, node);
    }

    /// Upgrades the live subscribers and prunes the dead ones.
    pub(crate) fn live_subscribers(&mut self) -> Vec<Rc<NodeInner>> {
        let mut live = Vec::with_capacity(self.subscribers.len());
        self.subscribers.retain(|_, weak| match weak.upgrade() {
            Some(node) => {
                live.push(node);
                true
            }
            None => false,
        });
        live
    }
}
