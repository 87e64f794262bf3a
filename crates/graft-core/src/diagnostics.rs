//! Optional per-pass observability for host tooling.

use crate::error::RenderError;
use crate::node::{NodeId, RenderResult};

/// Listener receiving per-pass records from a root.
///
/// All callbacks default to no-ops; implement only what the tooling needs.
/// The sink observes, it never participates in correctness: errors are
/// reported here and still propagate to the caller.
pub trait DiagnosticsSink {
    /// A top-level render pass started; per-pass records begin anew.
    fn pass_began(&self) {}

    /// The pass reached its fixed point.
    fn pass_finished(&self, _result: RenderResult) {}

    fn node_rendered(&self, _node: NodeId) {}

    fn node_skipped(&self, _node: NodeId) {}

    /// An invalidated node was picked up for re-render by the loop.
    fn node_invalidated(&self, _node: NodeId) {}

    fn node_disposed(&self, _node: NodeId) {}

    fn effect_invoked(&self, _node: NodeId) {}

    /// A render body or validation failed; the error still propagates.
    fn render_failed(&self, _node: NodeId, _error: &RenderError) {}
}
