//! Immutable per-render element descriptors and list reconciliation.

use std::any::{Any, TypeId};
use std::cell::RefCell;

use smallvec::SmallVec;

use crate::error::RenderError;
use crate::key::Key;
use crate::node::{Node, RenderResult};
use crate::scope::RenderScope;
use crate::store::SlotKey;

/// Immutable description of desired UI state for one render pass.
///
/// Elements are constructed fresh every pass, consumed exactly once by the
/// reconciler, and retained only as a node's last bound element for the next
/// prop comparison. Prop equality is declared explicitly per type, either by
/// hand or with [`element_props!`](crate::element_props).
pub trait Element: Any {
    /// Identity token disambiguating siblings of the same type.
    fn key(&self) -> Key {
        Key::None
    }

    /// Structural equality over this type's declared prop fields.
    ///
    /// Returning `false` for a different concrete type is mandatory; the
    /// engine only calls this after a type match, but collaborators may not.
    fn props_eq(&self, other: &dyn Element) -> bool;

    /// Declared prop-field names, consumed by markup builders.
    fn prop_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Renders this element against the bound node.
    ///
    /// Returns whether anything was rendered; returning
    /// [`RenderResult::Skipped`] signals no visible change.
    fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError>;
}

impl dyn Element {
    pub fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Identity of a concrete element kind, the surface a markup builder matches
/// constructors against.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    pub fn of<E: Element>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_type_of(&self, element: &dyn Element) -> bool {
        self.id == element.as_any().type_id()
    }
}

/// True iff the two elements have the same concrete type and equal keys.
///
/// This governs whether an existing node may be reused for a new element; an
/// absent key matches an absent key.
pub fn matches(a: &dyn Element, b: &dyn Element) -> bool {
    a.as_any().type_id() == b.as_any().type_id() && a.key() == b.key()
}

/// Declares the comparable prop fields of an element type.
///
/// Expands to `props_eq` and `prop_names` inside an `impl Element` block:
///
/// ```ignore
/// impl Element for Label {
///     element_props!(Label { text, size });
///     fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
///         ...
///     }
/// }
/// ```
#[macro_export]
macro_rules! element_props {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        fn props_eq(&self, other: &dyn $crate::Element) -> bool {
            match other.as_any().downcast_ref::<$ty>() {
                Some(_other) => true $(&& self.$field == _other.$field)*,
                None => false,
            }
        }

        fn prop_names(&self) -> &'static [&'static str] {
            &[$(stringify!($field)),*]
        }
    };
}

/// Name of the state slot holding a node's reconciled child list.
pub(crate) const CHILDREN_SLOT: &str = "children";

/// Ordered child nodes persisted between renders of a fragment.
#[derive(Default)]
pub(crate) struct ChildList {
    pub(crate) nodes: Vec<Node>,
}

/// An element that renders an ordered list of keyed children.
///
/// Absent entries are skipped. The child elements are consumed on first
/// render; a forced re-render of an already-consumed fragment reports
/// `Skipped` and leaves its children untouched.
pub struct Fragment {
    key: Key,
    children: RefCell<Option<Vec<Option<Box<dyn Element>>>>>,
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

impl Fragment {
    pub fn new() -> Self {
        Self::keyed(Key::None)
    }

    pub fn keyed(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            children: RefCell::new(Some(Vec::new())),
        }
    }

    pub fn child(self, element: impl Element + 'static) -> Self {
        self.maybe_child(Some(Box::new(element) as Box<dyn Element>))
    }

    pub fn maybe_child(self, element: Option<Box<dyn Element>>) -> Self {
        self.children
            .borrow_mut()
            .get_or_insert_with(Vec::new)
            .push(element);
        self
    }

    pub fn children(self, elements: impl IntoIterator<Item = Option<Box<dyn Element>>>) -> Self {
        self.children
            .borrow_mut()
            .get_or_insert_with(Vec::new)
            .extend(elements);
        self
    }
}

impl Element for Fragment {
    fn key(&self) -> Key {
        self.key.clone()
    }

    // Children are not props; a fragment always re-renders so its list is
    // reconciled every pass.
    fn props_eq(&self, _other: &dyn Element) -> bool {
        false
    }

    fn render(&self, ui: &mut RenderScope<'_>) -> Result<RenderResult, RenderError> {
        match self.children.borrow_mut().take() {
            Some(elements) => reconcile_children(ui, elements),
            None => Ok(RenderResult::Skipped),
        }
    }
}

/// First-fit keyed reconciliation of a node's child list.
///
/// For each present element the previous children are scanned in order for
/// the first unmatched node that would accept it; matched nodes re-render in
/// place and keep their position in the new list, unmatched elements get a
/// fresh child node, and previous nodes left unmatched are disposed. The
/// first-fit scan is intentional: a child keeping its (type, key) identity
/// survives any reorder.
pub(crate) fn reconcile_children(
    ui: &mut RenderScope<'_>,
    elements: Vec<Option<Box<dyn Element>>>,
) -> Result<RenderResult, RenderError> {
    let node = ui.node().clone();
    let previous: Vec<Node> = {
        let inner = node.inner();
        let mut store = inner.store.borrow_mut();
        let list = store
            .slot_mut::<ChildList>(SlotKey::named(CHILDREN_SLOT), ChildList::default)
            .map_err(|err| err.into_render_error(inner.id))?;
        std::mem::take(&mut list.nodes)
    };

    let mut matched: SmallVec<[bool; 8]> = SmallVec::new();
    matched.resize(previous.len(), false);
    let mut next: Vec<Node> = Vec::with_capacity(elements.len());
    let mut rendered = false;
    let mut failure: Option<RenderError> = None;

    for element in elements.into_iter().flatten() {
        let reused = previous
            .iter()
            .enumerate()
            .find(|(i, candidate)| !matched[*i] && candidate.accepts(element.as_ref()))
            .map(|(i, _)| i);
        let target = match reused {
            Some(i) => {
                matched[i] = true;
                previous[i].clone()
            }
            None => node.create_child(),
        };
        match target.render_element(Some(element)) {
            Ok(result) => rendered |= result == RenderResult::Rendered,
            Err(error) => {
                failure = Some(error);
                next.push(target);
                break;
            }
        }
        next.push(target);
    }

    for (i, stale) in previous.iter().enumerate() {
        if matched[i] {
            continue;
        }
        if failure.is_none() {
            stale.dispose();
            rendered = true;
        } else {
            // An aborted pass keeps every surviving node; nothing rolls back.
            next.push(stale.clone());
        }
    }

    {
        let inner = node.inner();
        let mut store = inner.store.borrow_mut();
        let list = store
            .slot_mut::<ChildList>(SlotKey::named(CHILDREN_SLOT), ChildList::default)
            .map_err(|err| err.into_render_error(inner.id))?;
        list.nodes = next;
    }

    if let Some(error) = failure {
        return Err(error);
    }
    Ok(if rendered {
        RenderResult::Rendered
    } else {
        RenderResult::Skipped
    })
}
