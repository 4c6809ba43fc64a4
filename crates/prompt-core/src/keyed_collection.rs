use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::context::with_current_store;
use crate::mutable_state::MutableState;
use crate::slot_table::{HookError, HookStore};

/// Immutable keyed mapping held in a state slot.
///
/// Every write builds a new map, and only when at least one value actually
/// changes; a write that changes nothing never requests a render.
pub struct KeyedCollection<K, V> {
    state: MutableState<Rc<IndexMap<K, V>>>,
}

impl<K, V> Clone for KeyedCollection<K, V> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<K, V> KeyedCollection<K, V>
where
    K: Hash + Eq + Clone,
    V: PartialEq + Clone,
{
    pub fn entries(&self) -> Rc<IndexMap<K, V>> {
        self.state.value()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.state.with(|map| map.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.state.with(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set(&self, key: K, value: V) -> bool {
        self.set_each(std::iter::once((key, value)))
    }

    /// Apply several writes with at most one render request.
    pub fn set_each(&self, entries: impl IntoIterator<Item = (K, V)>) -> bool {
        let current = self.state.value();
        let mut next: Option<IndexMap<K, V>> = None;
        for (key, value) in entries {
            let unchanged = match &next {
                Some(map) => map.get(&key) == Some(&value),
                None => current.get(&key) == Some(&value),
            };
            if unchanged {
                continue;
            }
            next.get_or_insert_with(|| (*current).clone())
                .insert(key, value);
        }
        match next {
            Some(map) => self.state.set(Rc::new(map)),
            None => false,
        }
    }

    pub fn remove(&self, key: &K) -> bool {
        let current = self.state.value();
        if !current.contains_key(key) {
            return false;
        }
        let mut next = (*current).clone();
        next.shift_remove(key);
        self.state.set(Rc::new(next))
    }
}

impl HookStore {
    pub fn use_keyed_collection<K, V>(
        &self,
        init: impl FnOnce() -> IndexMap<K, V>,
    ) -> Result<KeyedCollection<K, V>, HookError>
    where
        K: Hash + Eq + 'static,
        V: PartialEq + 'static,
    {
        let state = self.use_state(|| Rc::new(init()))?;
        Ok(KeyedCollection { state })
    }
}

pub fn use_keyed_collection<K, V>(init: impl FnOnce() -> IndexMap<K, V>) -> KeyedCollection<K, V>
where
    K: Hash + Eq + 'static,
    V: PartialEq + 'static,
{
    with_current_store(|store| store.use_keyed_collection(init))
}
