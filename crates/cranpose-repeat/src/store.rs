//! Owned node cache: one [`CacheItem`] per key, indexed both globally and by
//! template type. Whether a key is a spare (L2) is decided by the caller
//! against the active set; the store itself does not know.

use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::source::{CacheKey, RecyclableNode};
use crate::NodeId;

/// A cached node and the template it was built from.
pub struct CacheItem<T, N> {
    pub(crate) valid: bool,
    pub(crate) ttype: T,
    pub(crate) node: Rc<N>,
}

impl<T, N> CacheItem<T, N> {
    /// `false` while the node may still show data for a stale index.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn ttype(&self) -> &T {
        &self.ttype
    }

    pub fn node(&self) -> &Rc<N> {
        &self.node
    }
}

pub(crate) struct NodeStore<K, T, N> {
    items: HashMap<K, CacheItem<T, N>>,
    by_type: HashMap<T, HashMap<K, Rc<N>>>,
    /// Diagnostic back-reference from node identity to its current key.
    key_for_node: HashMap<NodeId, K>,
}

impl<K, T, N> Default for NodeStore<K, T, N> {
    fn default() -> Self {
        Self {
            items: HashMap::default(),
            by_type: HashMap::default(),
            key_for_node: HashMap::default(),
        }
    }
}

impl<K: CacheKey, T: CacheKey, N: RecyclableNode> NodeStore<K, T, N> {
    /// Registers a valid node for `key`, returning the item it replaced.
    pub(crate) fn insert(&mut self, key: K, ttype: T, node: Rc<N>) -> Option<CacheItem<T, N>> {
        let replaced = self.remove(&key);
        self.by_type
            .entry(ttype.clone())
            .or_default()
            .insert(key.clone(), Rc::clone(&node));
        self.key_for_node.insert(node.node_id(), key.clone());
        self.items.insert(
            key,
            CacheItem {
                valid: true,
                ttype,
                node,
            },
        );
        replaced
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<CacheItem<T, N>> {
        let item = self.items.remove(key)?;
        if let Some(pool) = self.by_type.get_mut(&item.ttype) {
            pool.remove(key);
            if pool.is_empty() {
                self.by_type.remove(&item.ttype);
            }
        }
        let node_id = item.node.node_id();
        if self.key_for_node.get(&node_id) == Some(key) {
            self.key_for_node.remove(&node_id);
        }
        Some(item)
    }

    /// Moves the item cached under `old` to `new` in every index. An item
    /// already cached under `new` is dropped.
    pub(crate) fn rename(&mut self, old: &K, new: K) -> bool {
        if *old == new {
            return self.items.contains_key(old);
        }
        let Some(item) = self.items.remove(old) else {
            return false;
        };
        if self.remove(&new).is_some() {
            log::warn!("repeat: dropping node cached under {new:?} to make room for {old:?}");
        }
        if let Some(pool) = self.by_type.get_mut(&item.ttype) {
            pool.remove(old);
            pool.insert(new.clone(), Rc::clone(&item.node));
        }
        self.key_for_node.insert(item.node.node_id(), new.clone());
        self.items.insert(new, item);
        true
    }

    pub(crate) fn get(&self, key: &K) -> Option<&CacheItem<T, N>> {
        self.items.get(key)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.items.contains_key(key)
    }

    pub(crate) fn set_valid(&mut self, key: &K) {
        if let Some(item) = self.items.get_mut(key) {
            item.valid = true;
        }
    }

    pub(crate) fn set_stale(&mut self, key: &K) -> bool {
        match self.items.get_mut(key) {
            Some(item) => {
                item.valid = false;
                true
            }
            None => false,
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        for item in self.items.values_mut() {
            item.valid = false;
        }
    }

    /// Keys cached for `ttype`, sorted.
    pub(crate) fn keys_of_type(&self, ttype: &T) -> Vec<K> {
        let mut keys: Vec<K> = self
            .by_type
            .get(ttype)
            .map(|pool| pool.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Template types with at least one cached node, sorted.
    pub(crate) fn ttypes(&self) -> Vec<T> {
        let mut ttypes: Vec<T> = self.by_type.keys().cloned().collect();
        ttypes.sort_unstable();
        ttypes
    }

    pub(crate) fn key_for_node(&self, node_id: NodeId) -> Option<&K> {
        self.key_for_node.get(&node_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Every cached key, sorted.
    pub(crate) fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.items.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.by_type.clear();
        self.key_for_node.clear();
    }
}
