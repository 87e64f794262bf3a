//! Root orchestration: invalidation queue, effect queue, fixed-point loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::collections::map::{HashMap, HashSet};
use crate::diagnostics::DiagnosticsSink;
use crate::element::Element;
use crate::error::RenderError;
use crate::node::{Node, NodeId, NodeInner, RenderResult};

/// Shared work queue of one root: the invalidation set and the pending-effect
/// queue behind a single lock.
///
/// Contents are plain ids so the lock can be taken from any thread; resolving
/// an id back to a node happens on the render thread via the root's registry.
#[derive(Debug, Default)]
pub(crate) struct RenderQueue {
    invalid: HashSet<NodeId>,
    order: Vec<NodeId>,
    effects: VecDeque<(NodeId, usize)>,
}

impl RenderQueue {
    /// Returns whether the node was newly enqueued.
    pub(crate) fn enqueue(&mut self, id: NodeId) -> bool {
        let newly = self.invalid.insert(id);
        if newly {
            self.order.push(id);
        }
        newly
    }

    /// Removes the node from the invalidation set; stale queue entries are
    /// filtered when the set is snapshotted.
    pub(crate) fn dequeue(&mut self, id: NodeId) -> bool {
        self.invalid.remove(&id)
    }

    pub(crate) fn enqueue_effect(&mut self, node: NodeId, index: usize) {
        self.effects.push_back((node, index));
    }

    fn pop_effect(&mut self) -> Option<(NodeId, usize)> {
        self.effects.pop_front()
    }

    fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// Drains the queued ids that are still members of the invalidation set.
    fn snapshot(&mut self) -> Vec<NodeId> {
        let invalid = &self.invalid;
        self.order.drain(..).filter(|id| invalid.contains(id)).collect()
    }
}

pub(crate) fn lock_queue(queue: &Mutex<RenderQueue>) -> MutexGuard<'_, RenderQueue> {
    // Queue operations cannot panic while holding the lock, so a poisoned
    // mutex still carries consistent state.
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct RootInner {
    queue: Arc<Mutex<RenderQueue>>,
    registry: RefCell<HashMap<NodeId, Weak<NodeInner>>>,
    next_id: Cell<NodeId>,
    diagnostics: RefCell<Option<Rc<dyn DiagnosticsSink>>>,
    validate_hooks: Cell<bool>,
}

impl RootInner {
    pub(crate) fn queue(&self) -> &Arc<Mutex<RenderQueue>> {
        &self.queue
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    pub(crate) fn register(&self, id: NodeId, node: Weak<NodeInner>) {
        self.registry.borrow_mut().insert(id, node);
    }

    pub(crate) fn unregister(&self, id: NodeId) {
        self.registry.borrow_mut().remove(&id);
    }

    fn resolve(&self, id: NodeId) -> Option<Node> {
        let inner = self.registry.borrow().get(&id)?.upgrade()?;
        if inner.is_disposed() {
            return None;
        }
        Some(Node::from_inner(inner))
    }

    pub(crate) fn validate_hooks(&self) -> bool {
        self.validate_hooks.get()
    }

    pub(crate) fn with_diagnostics(&self, f: impl FnOnce(&dyn DiagnosticsSink)) {
        let sink = self.diagnostics.borrow().clone();
        if let Some(sink) = sink {
            f(sink.as_ref());
        }
    }
}

/// Construction-time options for a [`RootNode`].
pub struct RootOptions {
    /// Validate that each node consumes the same number of hook slots on
    /// every render. Disable to skip the check in hot paths.
    pub validate_hooks: bool,
    /// Optional diagnostics listener, observability only.
    pub diagnostics: Option<Rc<dyn DiagnosticsSink>>,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            validate_hooks: true,
            diagnostics: None,
        }
    }
}

/// Owner of a node tree: drives full render passes to a fixed point.
pub struct RootNode {
    node: Node,
    inner: Rc<RootInner>,
}

impl Default for RootNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RootNode {
    pub fn new() -> Self {
        Self::with_options(RootOptions::default())
    }

    pub fn with_options(options: RootOptions) -> Self {
        let inner = Rc::new(RootInner {
            queue: Arc::new(Mutex::new(RenderQueue::default())),
            registry: RefCell::new(HashMap::default()),
            next_id: Cell::new(0),
            diagnostics: RefCell::new(options.diagnostics),
            validate_hooks: Cell::new(options.validate_hooks),
        });
        let node_inner = Rc::new(NodeInner::new(
            inner.next_node_id(),
            Weak::new(),
            Rc::downgrade(&inner),
            Arc::clone(&inner.queue),
        ));
        inner.register(node_inner.id, Rc::downgrade(&node_inner));
        Self {
            node: Node::from_inner(node_inner),
            inner,
        }
    }

    /// The persistent node the top-level element binds to.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn set_diagnostics(&self, sink: Rc<dyn DiagnosticsSink>) {
        *self.inner.diagnostics.borrow_mut() = Some(sink);
    }

    pub fn set_validate_hooks(&self, value: bool) {
        self.inner.validate_hooks.set(value);
    }

    /// Renders `element` into the tree and drains all resulting work.
    ///
    /// The call returns only once a pass produces no new invalidations and no
    /// new effects. Effects may call state setters; an update that perpetually
    /// re-triggers itself loops forever, which is the caller's responsibility.
    pub fn render_element(
        &mut self,
        element: Box<dyn Element>,
    ) -> Result<RenderResult, RenderError> {
        self.inner.with_diagnostics(|sink| sink.pass_began());
        log::debug!("render pass started");
        let outcome = self.render_to_fixed_point(element);
        match &outcome {
            Ok(result) => {
                log::debug!("render pass finished: {result:?}");
                self.inner.with_diagnostics(|sink| sink.pass_finished(*result));
            }
            Err(error) => log::debug!("render pass failed: {error}"),
        }
        outcome
    }

    fn render_to_fixed_point(
        &mut self,
        element: Box<dyn Element>,
    ) -> Result<RenderResult, RenderError> {
        let first = self.node.render_element(Some(element))?;
        if first == RenderResult::Mismatch {
            return Err(RenderError::RootMismatch);
        }
        let mut rendered = first.did_render();

        loop {
            let (queued, has_effects) = {
                let mut queue = lock_queue(&self.inner.queue);
                (queue.snapshot(), queue.has_effects())
            };
            if queued.is_empty() && !has_effects {
                break;
            }

            for id in queued {
                // Membership may have been consumed by a parent-driven
                // re-render earlier in this pass.
                if !lock_queue(&self.inner.queue).dequeue(id) {
                    continue;
                }
                let Some(node) = self.inner.resolve(id) else {
                    continue;
                };
                self.inner.with_diagnostics(|sink| sink.node_invalidated(id));
                rendered |= node.render_invalidated()?.did_render();
            }

            loop {
                let entry = lock_queue(&self.inner.queue).pop_effect();
                let Some((id, index)) = entry else {
                    break;
                };
                let Some(node) = self.inner.resolve(id) else {
                    continue;
                };
                if node.run_effect(index) {
                    rendered = true;
                    self.inner.with_diagnostics(|sink| sink.effect_invoked(id));
                }
            }
        }

        Ok(if rendered {
            RenderResult::Rendered
        } else {
            RenderResult::Skipped
        })
    }
}
