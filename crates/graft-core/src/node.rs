//! Persistent node identities and the single-node render algorithm.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use crate::context::ContextSlot;
use crate::effect::{EffectRecord, EffectScope};
use crate::element::{matches, ChildList, Element};
use crate::error::RenderError;
use crate::root::{lock_queue, RenderQueue, RootInner};
use crate::scope::RenderScope;
use crate::state::InvalidateHandle;
use crate::store::StateStore;

pub type NodeId = usize;

/// Outcome of offering an element to a node.
///
/// `Mismatch` means the node must not be reused for the element; it is a
/// result, not an error, so list reconciliation can probe candidates cheaply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderResult {
    Rendered,
    Skipped,
    Mismatch,
}

impl RenderResult {
    pub fn did_render(self) -> bool {
        self == RenderResult::Rendered
    }
}

pub(crate) struct NodeInner {
    pub(crate) id: NodeId,
    pub(crate) parent: Weak<NodeInner>,
    pub(crate) root: Weak<RootInner>,
    pub(crate) queue: Arc<Mutex<RenderQueue>>,
    pub(crate) store: RefCell<StateStore>,
    pub(crate) effects: RefCell<Vec<Rc<RefCell<EffectRecord>>>>,
    pub(crate) context: RefCell<Option<ContextSlot>>,
    always_invalid: Cell<bool>,
    bound: Cell<bool>,
    disposed: Cell<bool>,
    last_element: RefCell<Option<Box<dyn Element>>>,
    hook_checkpoint: Cell<Option<usize>>,
}

impl NodeInner {
    pub(crate) fn new(
        id: NodeId,
        parent: Weak<NodeInner>,
        root: Weak<RootInner>,
        queue: Arc<Mutex<RenderQueue>>,
    ) -> Self {
        Self {
            id,
            parent,
            root,
            queue,
            store: RefCell::new(StateStore::default()),
            effects: RefCell::new(Vec::new()),
            context: RefCell::new(None),
            always_invalid: Cell::new(false),
            bound: Cell::new(false),
            disposed: Cell::new(false),
            last_element: RefCell::new(None),
            hook_checkpoint: Cell::new(None),
        }
    }

    pub(crate) fn invalidate(&self) -> bool {
        if self.disposed.get() {
            return false;
        }
        let newly = lock_queue(&self.queue).enqueue(self.id);
        if newly {
            log::trace!("node {} invalidated", self.id);
        }
        newly
    }

    fn dequeue(&self) -> bool {
        lock_queue(&self.queue).dequeue(self.id)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn with_root(&self, f: impl FnOnce(&RootInner)) {
        if let Some(root) = self.root.upgrade() {
            f(&root);
        }
    }

    /// Tears the node down: effect cleanups run in registration order, stored
    /// children are disposed, and every remaining slot is dropped. The node
    /// is inert afterwards; future render attempts report `Mismatch`.
    pub(crate) fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        debug_assert!(!self.bound.get(), "dispose during an in-progress render");
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for record in &effects {
            record.borrow_mut().run_cleanup();
        }
        let slots = self.store.borrow_mut().take_slots();
        for slot in &slots {
            if let Some(children) = slot.value.downcast_ref::<ChildList>() {
                for child in &children.nodes {
                    child.dispose();
                }
            }
        }
        drop(slots);
        *self.last_element.borrow_mut() = None;
        self.context.borrow_mut().take();
        lock_queue(&self.queue).dequeue(self.id);
        self.with_root(|root| {
            root.unregister(self.id);
            root.with_diagnostics(|sink| sink.node_disposed(self.id));
        });
        log::debug!("node {} disposed", self.id);
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        if !self.disposed.get() {
            self.dispose();
        }
    }
}

/// Persistent stateful identity bound to at most one element per render pass.
///
/// Handles clone cheaply; ownership of the underlying identity lives in the
/// parent's child list (or with the root). Parent and root references are
/// weak back-pointers, never owning.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl Node {
    pub(crate) fn from_inner(inner: Rc<NodeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &NodeInner {
        &self.inner
    }

    pub(crate) fn inner_rc(&self) -> Rc<NodeInner> {
        Rc::clone(&self.inner)
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// When set, the node re-renders on every pass regardless of prop
    /// equality.
    pub fn set_always_invalid(&self, value: bool) {
        self.inner.always_invalid.set(value);
    }

    pub fn always_invalid(&self) -> bool {
        self.inner.always_invalid.get()
    }

    /// Enqueues the node for re-render on the next pass; returns whether it
    /// was newly enqueued.
    pub fn invalidate(&self) -> bool {
        self.inner.invalidate()
    }

    /// A `Send + Sync` handle that invalidates this node from any thread.
    pub fn invalidate_handle(&self) -> InvalidateHandle {
        InvalidateHandle::new(Arc::clone(&self.inner.queue), self.inner.id)
    }

    /// Allocates a fresh child identity under this node.
    ///
    /// The caller owns the returned node and is responsible for disposing it;
    /// list reconciliation does this for children it manages.
    pub fn create_child(&self) -> Node {
        let root = self
            .inner
            .root
            .upgrade()
            .expect("create_child after the root was dropped");
        let child = Rc::new(NodeInner::new(
            root.next_node_id(),
            Rc::downgrade(&self.inner),
            self.inner.root.clone(),
            Arc::clone(&self.inner.queue),
        ));
        root.register(child.id, Rc::downgrade(&child));
        Node::from_inner(child)
    }

    /// Tears down this node and its managed subtree.
    ///
    /// Not safe to call while a render of the same subtree is in progress.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether this node could bind `element` right now. Mirrors the
    /// `Mismatch` conditions of [`render_element`](Node::render_element).
    pub(crate) fn accepts(&self, element: &dyn Element) -> bool {
        if self.inner.disposed.get() {
            return false;
        }
        match self.inner.last_element.borrow().as_deref() {
            Some(last) => matches(element, last),
            None => true,
        }
    }

    /// Offers `element` to this node, rendering it if anything changed.
    pub fn render_element(
        &self,
        element: Option<Box<dyn Element>>,
    ) -> Result<RenderResult, RenderError> {
        self.render_node(element, false)
    }

    /// Re-renders an invalidated node from its last bound element.
    pub(crate) fn render_invalidated(&self) -> Result<RenderResult, RenderError> {
        let element = self.inner.last_element.borrow_mut().take();
        match element {
            Some(element) => self.render_node(Some(element), true),
            None => Ok(RenderResult::Mismatch),
        }
    }

    fn render_node(
        &self,
        element: Option<Box<dyn Element>>,
        forced: bool,
    ) -> Result<RenderResult, RenderError> {
        let inner = &*self.inner;
        let dequeued = inner.dequeue();
        let Some(element) = element else {
            return Ok(RenderResult::Mismatch);
        };
        if inner.disposed.get() {
            return Ok(RenderResult::Mismatch);
        }
        {
            let last = inner.last_element.borrow();
            if let Some(last) = last.as_deref() {
                if !matches(element.as_ref(), last) {
                    log::trace!("node {} rejected element: type/key mismatch", inner.id);
                    return Ok(RenderResult::Mismatch);
                }
            }
        }

        let should_render = forced || dequeued || inner.always_invalid.get() || {
            let last = inner.last_element.borrow();
            match last.as_deref() {
                Some(last) => !element.props_eq(last),
                None => true,
            }
        };
        if !should_render {
            log::trace!("node {} skipped: props unchanged", inner.id);
            inner.with_root(|root| root.with_diagnostics(|sink| sink.node_skipped(inner.id)));
            return Ok(RenderResult::Skipped);
        }

        if inner.bound.replace(true) {
            return Err(RenderError::BindingConflict { node: inner.id });
        }
        let body = {
            let mut scope = RenderScope::new(self);
            let outcome = element.render(&mut scope);
            (outcome, scope.hooks_used())
        };
        inner.bound.set(false);
        *inner.last_element.borrow_mut() = Some(element);

        let (outcome, hooks_used) = body;
        let result = outcome.and_then(|outcome| {
            let validate = inner
                .root
                .upgrade()
                .map_or(true, |root| root.validate_hooks());
            if validate {
                if let Some(expected) = inner.hook_checkpoint.get() {
                    if expected != hooks_used {
                        return Err(RenderError::HookCountMismatch {
                            node: inner.id,
                            expected,
                            actual: hooks_used,
                        });
                    }
                }
            }
            inner.hook_checkpoint.set(Some(hooks_used));
            Ok(outcome)
        });

        match result {
            Ok(outcome) => {
                log::trace!("node {} rendered: {:?}", inner.id, outcome);
                inner.with_root(|root| {
                    root.with_diagnostics(|sink| match outcome {
                        RenderResult::Rendered => sink.node_rendered(inner.id),
                        _ => sink.node_skipped(inner.id),
                    })
                });
                Ok(outcome)
            }
            Err(error) => {
                inner
                    .with_root(|root| root.with_diagnostics(|sink| sink.render_failed(inner.id, &error)));
                Err(error)
            }
        }
    }

    /// Runs the pending invocation of the effect at `index`, cleanup first.
    ///
    /// Returns whether the effect actually ran; a record whose invocation was
    /// already consumed this pass is a no-op.
    pub(crate) fn run_effect(&self, index: usize) -> bool {
        let record = self.inner.effects.borrow().get(index).cloned();
        let Some(record) = record else {
            return false;
        };
        let Some((cleanup, effect)) = record.borrow_mut().take_pending() else {
            return false;
        };
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        let result = effect(&EffectScope);
        record.borrow_mut().store_cleanup(result);
        log::trace!("node {} effect {} invoked", self.inner.id, index);
        true
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}
