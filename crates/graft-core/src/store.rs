//! Per-node persisted slot storage backing all hooks.
//!
//! A node's store maps slot keys to type-erased values. Hook-ordered slots use
//! integer keys handed out by the render scope's cursor; attribute-bound
//! fields use named keys. Insertion order is preserved so teardown visits
//! slots in the order they were first created.

use std::any::Any;
use std::fmt;

use crate::collections::map::HashMap;
use crate::error::RenderError;
use crate::node::NodeId;

/// Address of one persisted value inside a node's state store.
///
/// Named keys are case-insensitive; the stored form is lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Index(usize),
    Named(Box<str>),
}

impl SlotKey {
    pub fn named(name: &str) -> Self {
        SlotKey::Named(name.to_ascii_lowercase().into_boxed_str())
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Index(index) => write!(f, "#{index}"),
            SlotKey::Named(name) => write!(f, "{name:?}"),
        }
    }
}

pub(crate) struct SlotEntry {
    pub(crate) key: SlotKey,
    pub(crate) value: Box<dyn Any>,
}

#[derive(Default)]
pub(crate) struct StateStore {
    slots: Vec<SlotEntry>,
    index: HashMap<SlotKey, usize>,
}

#[derive(Debug)]
pub(crate) struct SlotTypeError {
    pub(crate) slot: SlotKey,
    pub(crate) expected: &'static str,
}

impl SlotTypeError {
    pub(crate) fn into_render_error(self, node: NodeId) -> RenderError {
        RenderError::SlotTypeMismatch {
            node,
            slot: self.slot,
            expected: self.expected,
        }
    }
}

impl StateStore {
    /// Returns the slot at `key`, creating it with `init` on first access.
    pub(crate) fn slot_mut<T: 'static>(
        &mut self,
        key: SlotKey,
        init: impl FnOnce() -> T,
    ) -> Result<&mut T, SlotTypeError> {
        let index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.slots.len();
                self.slots.push(SlotEntry {
                    key: key.clone(),
                    value: Box::new(init()),
                });
                self.index.insert(key, index);
                index
            }
        };
        let entry = &mut self.slots[index];
        if !entry.value.is::<T>() {
            return Err(SlotTypeError {
                slot: entry.key.clone(),
                expected: std::any::type_name::<T>(),
            });
        }
        Ok(entry
            .value
            .downcast_mut::<T>()
            .expect("slot type checked above"))
    }

    /// Drains every slot in insertion order, leaving the store empty.
    pub(crate) fn take_slots(&mut self) -> Vec<SlotEntry> {
        self.index.clear();
        std::mem::take(&mut self.slots)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_keys_are_case_insensitive() {
        let mut store = StateStore::default();
        *store
            .slot_mut(SlotKey::named("Children"), || 1u32)
            .unwrap() = 7;
        let value = *store.slot_mut(SlotKey::named("CHILDREN"), || 0u32).unwrap();
        assert_eq!(value, 7);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn type_mismatch_reports_slot_and_expected_type() {
        let mut store = StateStore::default();
        store.slot_mut(SlotKey::Index(0), || 1u32).unwrap();
        let err = store
            .slot_mut::<String>(SlotKey::Index(0), String::new)
            .err()
            .expect("mismatch");
        assert_eq!(err.slot, SlotKey::Index(0));
        assert!(err.expected.contains("String"));
    }

    #[test]
    fn slots_drain_in_insertion_order() {
        let mut store = StateStore::default();
        store.slot_mut(SlotKey::named("b"), || 0u8).unwrap();
        store.slot_mut(SlotKey::Index(0), || 0u8).unwrap();
        store.slot_mut(SlotKey::named("a"), || 0u8).unwrap();
        let keys: Vec<SlotKey> = store.take_slots().into_iter().map(|s| s.key).collect();
        assert_eq!(
            keys,
            vec![SlotKey::named("b"), SlotKey::Index(0), SlotKey::named("a")]
        );
    }
}
