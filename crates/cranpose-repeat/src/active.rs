//! Keys whose nodes are attached to the render tree (L1), plus the set of
//! nodes that have been recycled and owe an `on_reuse` when they come back.

use crate::collections::map::HashSet;
use crate::source::CacheKey;
use crate::NodeId;

pub(crate) struct ActiveSet<K> {
    keys: HashSet<K>,
    recycled_nodes: HashSet<NodeId>,
}

impl<K> Default for ActiveSet<K> {
    fn default() -> Self {
        Self {
            keys: HashSet::default(),
            recycled_nodes: HashSet::default(),
        }
    }
}

impl<K: CacheKey> ActiveSet<K> {
    pub(crate) fn insert(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }

    pub(crate) fn remove(&mut self, key: &K) -> bool {
        self.keys.remove(key)
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Sorted copy of the members, safe to iterate while mutating the set.
    pub(crate) fn snapshot(&self) -> Vec<K> {
        let mut keys: Vec<K> = self.keys.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Records that `node` left the tree. `false` if it was already recycled.
    pub(crate) fn mark_recycled(&mut self, node: NodeId) -> bool {
        self.recycled_nodes.insert(node)
    }

    /// Clears the recycled mark. `true` if the node was marked.
    pub(crate) fn take_recycled(&mut self, node: NodeId) -> bool {
        self.recycled_nodes.remove(&node)
    }

    pub(crate) fn is_recycled(&self, node: NodeId) -> bool {
        self.recycled_nodes.contains(&node)
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
        self.recycled_nodes.clear();
    }
}
