//! Scheduled side effects with dependency-gated re-invocation.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// Inline storage for per-element dependency fingerprints.
pub type DepsValues = SmallVec<[u64; 4]>;

/// Dependency fingerprint of an effect.
///
/// `Deps::once()` runs the effect on mount only, with its cleanup at unmount.
/// `Deps::always()` (or an empty `deps![]`) re-runs it on every render of the
/// owning node. A non-empty fingerprint re-runs the effect whenever any
/// element differs from the previous render's fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deps {
    Once,
    Values(DepsValues),
}

impl Deps {
    pub fn once() -> Self {
        Deps::Once
    }

    pub fn always() -> Self {
        Deps::Values(DepsValues::new())
    }
}

/// Builds a [`Deps`] fingerprint by hashing each dependency individually.
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {{
        let mut values = $crate::DepsValues::new();
        $(values.push($crate::hash::fingerprint(&$dep));)*
        $crate::Deps::Values(values)
    }};
}

/// Handed to an effect body so it can register a cleanup.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectScope;

#[derive(Default)]
pub struct EffectResult {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectScope {
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) -> EffectResult {
        EffectResult {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

impl EffectResult {
    fn into_cleanup(self) -> Option<Box<dyn FnOnce()>> {
        self.cleanup
    }
}

pub(crate) type EffectFn = Box<dyn FnOnce(&EffectScope) -> EffectResult>;

/// One registered side effect of a node.
///
/// The effect callable is replaced every time its declaring hook executes;
/// the stored cleanup runs immediately before the next invocation and
/// unconditionally when the record is dropped.
#[derive(Default)]
pub(crate) struct EffectRecord {
    registered: bool,
    deps: Option<Deps>,
    effect: Option<EffectFn>,
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl EffectRecord {
    /// Stores the fresh effect and fingerprint; returns whether the record
    /// must be enqueued for invocation.
    pub(crate) fn update(&mut self, deps: Deps, effect: EffectFn) -> bool {
        let changed = if !self.registered {
            true
        } else {
            match (self.deps.as_ref(), &deps) {
                (Some(Deps::Once), Deps::Once) => false,
                (Some(Deps::Values(previous)), Deps::Values(next)) => {
                    previous.is_empty() || next.is_empty() || previous != next
                }
                _ => true,
            }
        };
        self.registered = true;
        self.deps = Some(deps);
        self.effect = Some(effect);
        changed
    }

    /// Takes the pending invocation out of the record, if any.
    ///
    /// Returns the stored cleanup together with the effect callable so the
    /// caller can run both without holding a borrow on the record.
    pub(crate) fn take_pending(&mut self) -> Option<(Option<Box<dyn FnOnce()>>, EffectFn)> {
        let effect = self.effect.take()?;
        Some((self.cleanup.take(), effect))
    }

    pub(crate) fn store_cleanup(&mut self, result: EffectResult) {
        self.cleanup = result.into_cleanup();
    }

    pub(crate) fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for EffectRecord {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

/// Store entry tying an effect record to its position in the owning node's
/// effect list.
#[derive(Clone)]
pub(crate) struct EffectHandle {
    pub(crate) record: Rc<RefCell<EffectRecord>>,
    pub(crate) index: usize,
}
