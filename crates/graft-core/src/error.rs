use crate::node::NodeId;
use crate::store::SlotKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The node is already bound to an element on this call stack.
    BindingConflict { node: NodeId },
    /// The root entry point's top-level element cannot bind to the root node.
    RootMismatch,
    /// The number of hook slots consumed differs from the previous render.
    HookCountMismatch {
        node: NodeId,
        expected: usize,
        actual: usize,
    },
    /// A persisted slot was read back as an incompatible type.
    SlotTypeMismatch {
        node: NodeId,
        slot: SlotKey,
        expected: &'static str,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::BindingConflict { node } => {
                write!(f, "node {node} is already bound to an element")
            }
            RenderError::RootMismatch => {
                write!(f, "top-level element does not match the root node")
            }
            RenderError::HookCountMismatch {
                node,
                expected,
                actual,
            } => write!(
                f,
                "node {node} consumed {actual} hooks, previous render consumed {expected}; \
                 hooks must be called unconditionally and in the same order"
            ),
            RenderError::SlotTypeMismatch {
                node,
                slot,
                expected,
            } => write!(f, "slot {slot} of node {node} is not a {expected}"),
        }
    }
}

impl std::error::Error for RenderError {}
