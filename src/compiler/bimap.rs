//! Bijective map used for variable <-> register and variable <-> slot bindings

use std::collections::HashMap;
use std::hash::Hash;

/// Two synchronized lookup directions; each key and each value appears at most once
#[derive(Debug, Clone)]
pub struct BiMap<K, V> {
    forward: HashMap<K, V>,
    backward: HashMap<V, K>,
}

impl<K, V> BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
        }
    }

    /// Bind `key` to `value`, dropping any previous binding of either side
    pub fn insert(&mut self, key: K, value: V) {
        self.remove_by_key(&key);
        self.remove_by_value(&value);
        self.forward.insert(key.clone(), value.clone());
        self.backward.insert(value, key);
    }

    /// Remove the binding of `key`, returning its value
    pub fn remove_by_key(&mut self, key: &K) -> Option<V> {
        let value = self.forward.remove(key)?;
        self.backward.remove(&value);
        Some(value)
    }

    /// Remove the binding of `value`, returning its key
    pub fn remove_by_value(&mut self, value: &V) -> Option<K> {
        let key = self.backward.remove(value)?;
        self.forward.remove(&key);
        Some(key)
    }

    pub fn get_by_key(&self, key: &K) -> Option<&V> {
        self.forward.get(key)
    }

    pub fn get_by_value(&self, value: &V) -> Option<&K> {
        self.backward.get(value)
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.backward.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<K, V> Default for BiMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
