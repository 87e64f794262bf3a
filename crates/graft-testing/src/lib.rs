//! Testing utilities and harness for the Graft reconciler.
//!
//! [`RenderProbe`] is a counting [`DiagnosticsSink`] for asserting on render,
//! skip, disposal and effect activity; [`Harness`] wires one to a fresh
//! [`RootNode`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use graft_core::{
    DiagnosticsSink, Element, NodeId, RenderError, RenderResult, RootNode, RootOptions,
};

#[derive(Default)]
struct ProbeCounters {
    passes: Cell<usize>,
    rendered: Cell<usize>,
    skipped: Cell<usize>,
    invalidated: Cell<usize>,
    disposed: Cell<usize>,
    effects: Cell<usize>,
    failures: RefCell<Vec<String>>,
}

/// Counting diagnostics sink for tests.
///
/// Clones share their counters, so a copy can be kept for assertions while
/// another is installed on the root.
#[derive(Clone, Default)]
pub struct RenderProbe {
    counters: Rc<ProbeCounters>,
}

impl RenderProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passes(&self) -> usize {
        self.counters.passes.get()
    }

    pub fn rendered(&self) -> usize {
        self.counters.rendered.get()
    }

    pub fn skipped(&self) -> usize {
        self.counters.skipped.get()
    }

    pub fn invalidated(&self) -> usize {
        self.counters.invalidated.get()
    }

    pub fn disposed(&self) -> usize {
        self.counters.disposed.get()
    }

    pub fn effects(&self) -> usize {
        self.counters.effects.get()
    }

    pub fn failures(&self) -> Vec<String> {
        self.counters.failures.borrow().clone()
    }

    pub fn reset(&self) {
        self.counters.passes.set(0);
        self.counters.rendered.set(0);
        self.counters.skipped.set(0);
        self.counters.invalidated.set(0);
        self.counters.disposed.set(0);
        self.counters.effects.set(0);
        self.counters.failures.borrow_mut().clear();
    }
}

impl DiagnosticsSink for RenderProbe {
    fn pass_began(&self) {
        self.counters.passes.set(self.counters.passes.get() + 1);
    }

    fn node_rendered(&self, _node: NodeId) {
        self.counters.rendered.set(self.counters.rendered.get() + 1);
    }

    fn node_skipped(&self, _node: NodeId) {
        self.counters.skipped.set(self.counters.skipped.get() + 1);
    }

    fn node_invalidated(&self, _node: NodeId) {
        self.counters
            .invalidated
            .set(self.counters.invalidated.get() + 1);
    }

    fn node_disposed(&self, _node: NodeId) {
        self.counters.disposed.set(self.counters.disposed.get() + 1);
    }

    fn effect_invoked(&self, _node: NodeId) {
        self.counters.effects.set(self.counters.effects.get() + 1);
    }

    fn render_failed(&self, _node: NodeId, error: &RenderError) {
        self.counters.failures.borrow_mut().push(error.to_string());
    }
}

/// A root with a probe attached, for one-line test setup.
pub struct Harness {
    root: RootNode,
    probe: RenderProbe,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let probe = RenderProbe::new();
        let root = RootNode::with_options(RootOptions {
            validate_hooks: true,
            diagnostics: Some(Rc::new(probe.clone())),
        });
        Self { root, probe }
    }

    pub fn probe(&self) -> &RenderProbe {
        &self.probe
    }

    pub fn root(&self) -> &RootNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut RootNode {
        &mut self.root
    }

    /// Renders `element` to a fixed point.
    pub fn render(&mut self, element: impl Element + 'static) -> Result<RenderResult, RenderError> {
        self.root.render_element(Box::new(element))
    }
}

#[cfg(test)]
#[path = "tests/probe_tests.rs"]
mod probe_tests;
