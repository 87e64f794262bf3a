//! Cross-thread-capable state cells and invalidation handles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::node::NodeId;
use crate::root::{lock_queue, RenderQueue};

/// Marks one node as needing a re-render on the next pass.
///
/// The handle is `Send + Sync`; it holds the root's shared render queue and a
/// node id, so background work can request a re-render while a pass is in
/// progress on the UI thread.
#[derive(Clone)]
pub struct InvalidateHandle {
    queue: Arc<Mutex<RenderQueue>>,
    node: NodeId,
}

impl InvalidateHandle {
    pub(crate) fn new(queue: Arc<Mutex<RenderQueue>>, node: NodeId) -> Self {
        Self { queue, node }
    }

    /// Enqueues the node; returns whether it was newly enqueued.
    pub fn invalidate(&self) -> bool {
        lock_queue(&self.queue).enqueue(self.node)
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl std::fmt::Debug for InvalidateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidateHandle")
            .field("node", &self.node)
            .finish()
    }
}

/// Persistent state cell paired with its owning node's invalidation handle.
///
/// Reads never track anything; writes go through [`set`](StateHandle::set) or
/// [`update`](StateHandle::update), which unconditionally invalidate the
/// owning node even if a later render decides to skip. The handle is
/// `Send + Sync` when `T` is, so setters may be called from background
/// callbacks.
pub struct StateHandle<T> {
    cell: Arc<Mutex<T>>,
    invalidator: InvalidateHandle,
}

impl<T> Clone for StateHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            invalidator: self.invalidator.clone(),
        }
    }
}

impl<T: 'static> StateHandle<T> {
    pub(crate) fn new(value: T, invalidator: InvalidateHandle) -> Self {
        Self {
            cell: Arc::new(Mutex::new(value)),
            invalidator,
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with the current value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock())
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.lock().clone()
    }

    /// Replaces the value and invalidates the owning node.
    pub fn set(&self, value: T) {
        *self.lock() = value;
        self.invalidator.invalidate();
    }

    /// Mutates the value in place and invalidates the owning node.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.lock());
        self.invalidator.invalidate();
        result
    }

    /// The invalidation half of the handle, detachable for background work.
    pub fn invalidate_handle(&self) -> InvalidateHandle {
        self.invalidator.clone()
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for StateHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHandle")
            .field("value", &*self.lock())
            .finish()
    }
}
