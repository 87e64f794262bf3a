//! Reconciler and hook-state engine for a declarative scene-graph UI runtime.
//!
//! A tree of immutable [`Element`]s describes the desired UI state for one
//! render pass. Each element is reconciled against a persistent [`Node`] that
//! retains hook state, effects and context subscriptions across passes.
//! [`RootNode`] drives full passes to a fixed point, draining invalidated
//! nodes and pending effects until no work remains.
//!
//! The engine is host-agnostic: binding nodes to a concrete drawable
//! representation, markup building and widgets live outside this crate and
//! consume it purely through the [`Element`]/[`Node`] contract.

pub mod collections;
mod context;
mod diagnostics;
mod effect;
mod element;
mod error;
pub mod hash;
mod key;
mod node;
mod retained;
mod root;
mod scope;
mod state;
mod store;

pub use diagnostics::DiagnosticsSink;
pub use effect::{Deps, DepsValues, EffectResult, EffectScope};
pub use element::{matches, Element, ElementType, Fragment};
pub use error::RenderError;
pub use key::Key;
pub use node::{Node, NodeId, RenderResult};
pub use retained::Retained;
pub use root::{RootNode, RootOptions};
pub use scope::RenderScope;
pub use state::{InvalidateHandle, StateHandle};
pub use store::SlotKey;

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod render_tests;

#[cfg(test)]
#[path = "tests/children_tests.rs"]
mod children_tests;

#[cfg(test)]
#[path = "tests/effect_tests.rs"]
mod effect_tests;

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod context_tests;

#[cfg(test)]
#[path = "tests/root_tests.rs"]
mod root_tests;
