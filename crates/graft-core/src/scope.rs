//! The explicit render context handed to element render bodies.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::context::ContextSlot;
use crate::effect::{Deps, EffectHandle, EffectRecord, EffectResult, EffectScope};
use crate::element::{self, Element};
use crate::error::RenderError;
use crate::node::{Node, RenderResult};
use crate::retained::Retained;
use crate::root::lock_queue;
use crate::state::{InvalidateHandle, StateHandle};
use crate::store::SlotKey;

/// Render context for the node currently bound to an element.
///
/// A scope exists only for the duration of one bound render, so hooks cannot
/// be called outside one; the node's bound flag keeps a single render active
/// per call stack. Hooks must be called unconditionally and in the same order
/// on every render of a given node.
pub struct RenderScope<'a> {
    node: &'a Node,
    cursor: usize,
}

impl<'a> RenderScope<'a> {
    pub(crate) fn new(node: &'a Node) -> Self {
        Self { node, cursor: 0 }
    }

    /// The node this scope is rendering into.
    pub fn node(&self) -> &Node {
        self.node
    }

    pub(crate) fn hooks_used(&self) -> usize {
        self.cursor
    }

    fn next_index(&mut self) -> SlotKey {
        let key = SlotKey::Index(self.cursor);
        self.cursor += 1;
        key
    }

    fn retained_slot<T: 'static>(
        &mut self,
        key: SlotKey,
        init: impl FnOnce() -> T,
    ) -> Result<Retained<T>, RenderError> {
        let inner = self.node.inner();
        let mut store = inner.store.borrow_mut();
        let slot = store
            .slot_mut::<Retained<T>>(key, || Retained::new(init()))
            .map_err(|err| err.into_render_error(inner.id))?;
        Ok(slot.clone())
    }

    /// Persistent slot at the next hook index, seeded on first access.
    ///
    /// Mutating the returned value never schedules a re-render.
    pub fn use_ref<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<Retained<T>, RenderError> {
        let key = self.next_index();
        self.retained_slot(key, init)
    }

    /// Persistent slot at a case-insensitive name, for attribute-bound
    /// fields. Named slots do not consume a hook index.
    pub fn use_named_ref<T: 'static>(
        &mut self,
        name: &str,
        init: impl FnOnce() -> T,
    ) -> Result<Retained<T>, RenderError> {
        self.retained_slot(SlotKey::named(name), init)
    }

    /// Persistent state cell whose setter invalidates the owning node.
    pub fn use_state<T: 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<StateHandle<T>, RenderError> {
        let key = self.next_index();
        let inner = self.node.inner();
        let invalidator = InvalidateHandle::new(Arc::clone(&inner.queue), inner.id);
        let mut store = inner.store.borrow_mut();
        let slot = store
            .slot_mut::<StateHandle<T>>(key, || StateHandle::new(init(), invalidator))
            .map_err(|err| err.into_render_error(inner.id))?;
        Ok(slot.clone())
    }

    /// Records a side effect at the current hook index.
    ///
    /// The effect is enqueued on the root's pending-effect queue on first
    /// registration and whenever `deps` differs from the previous render's
    /// fingerprint. Its cleanup runs before each re-invocation and at node
    /// disposal.
    pub fn use_effect<F>(&mut self, deps: Deps, effect: F) -> Result<(), RenderError>
    where
        F: FnOnce(&EffectScope) -> EffectResult + 'static,
    {
        let key = self.next_index();
        let inner = self.node.inner();
        let handle = {
            let mut store = inner.store.borrow_mut();
            store
                .slot_mut::<EffectHandle>(key, || {
                    let record = Rc::new(RefCell::new(EffectRecord::default()));
                    let mut effects = inner.effects.borrow_mut();
                    effects.push(Rc::clone(&record));
                    EffectHandle {
                        record,
                        index: effects.len() - 1,
                    }
                })
                .map_err(|err| err.into_render_error(inner.id))?
                .clone()
        };
        let changed = handle.record.borrow_mut().update(deps, Box::new(effect));
        if changed {
            lock_queue(&inner.queue).enqueue_effect(inner.id, handle.index);
        }
        Ok(())
    }

    /// Resolves the nearest ancestor context value of type `T`, registering
    /// this node as a subscriber of that ancestor's slot.
    ///
    /// The lookup walks the current ancestor chain on every call, so moves in
    /// the tree are reflected on the next render.
    pub fn use_context<T: Clone + 'static>(&mut self) -> Option<T> {
        let me = self.node.inner_rc();
        let mut current = me.parent.upgrade();
        while let Some(ancestor) = current {
            let found = {
                let mut slot = ancestor.context.borrow_mut();
                slot.as_mut().and_then(|slot| {
                    let value = slot.read::<T>()?;
                    slot.subscribe(me.id, Rc::downgrade(&me));
                    Some(value)
                })
            };
            if found.is_some() {
                return found;
            }
            current = ancestor.parent.upgrade();
        }
        None
    }

    /// Publishes `value` on this node's context slot.
    ///
    /// Old and new values are compared with `PartialEq`; on change every
    /// subscribed descendant is invalidated. Descendants that never read the
    /// context are untouched.
    pub fn provide_context<T: PartialEq + 'static>(&mut self, value: T) {
        let inner = self.node.inner();
        let changed_subscribers = {
            let mut slot = inner.context.borrow_mut();
            let slot = slot.get_or_insert_with(ContextSlot::new);
            if slot.publish(value) {
                slot.live_subscribers()
            } else {
                Vec::new()
            }
        };
        for subscriber in changed_subscribers {
            subscriber.invalidate();
        }
    }

    /// Reconciles `elements` against this node's persisted child list.
    pub fn render_children(
        &mut self,
        elements: impl IntoIterator<Item = Option<Box<dyn Element>>>,
    ) -> Result<RenderResult, RenderError> {
        element::reconcile_children(self, elements.into_iter().collect())
    }

    /// Renders a single child element, reusing or replacing the child node.
    pub fn render_child(
        &mut self,
        element: impl Element + 'static,
    ) -> Result<RenderResult, RenderError> {
        self.render_children([Some(Box::new(element) as Box<dyn Element>)])
    }
}
