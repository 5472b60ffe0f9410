//! Node cache and reuse engine for a virtualized repeat.
//!
//! [`RepeatCaches`] maps indices to keys and template types through the
//! resolver, keeps the nodes of on-screen keys in L1 and everything else it
//! still holds as spares (L2), and hands out nodes in a fixed order:
//!
//! 1. a node already cached for the key ([`RepeatCaches::get_node`]),
//! 2. a spare of the same template type rewritten for the new key
//!    ([`RepeatCaches::reconcile_from_spare`]),
//! 3. a freshly built node ([`RepeatCaches::allocate_new`]).
//!
//! Spares are trimmed by [`RepeatCaches::purge`], which keeps the ones closest
//! to the active range up to the per-type quota.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::active::ActiveSet;
use crate::config::RepeatCacheConfig;
use crate::error::CacheError;
use crate::range::{ActiveRange, RangeTracker, ScrollDirection};
use crate::resolver::IndexKeyTypeResolver;
use crate::source::{ItemSource, NodeSink, RecyclableNode};
use crate::store::{CacheItem, NodeStore};
use crate::NodeId;

/// Snapshot of cache occupancy and lifetime counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Keys currently attached to the render tree.
    pub items_in_l1: usize,
    /// Cached nodes not attached to the render tree.
    pub items_in_l2: usize,
    /// Nodes produced by `build_node`.
    pub total_built: usize,
    /// Spares rewritten for another key instead of building a new node.
    pub reuse_count: usize,
    /// Calls made to `update_node`, including in-place refreshes.
    pub update_count: usize,
    /// Spares evicted by purge.
    pub purged_count: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    built: usize,
    reused: usize,
    updated: usize,
    purged: usize,
}

pub struct RepeatCaches<S: ItemSource> {
    source: S,
    config: RepeatCacheConfig<S::TemplateType>,
    pub(crate) ranges: RangeTracker,
    pub(crate) resolver: IndexKeyTypeResolver<S::Key, S::TemplateType>,
    pub(crate) store: NodeStore<S::Key, S::TemplateType, S::Node>,
    pub(crate) active: ActiveSet<S::Key>,
    /// Widest active range seen so far; never shrinks.
    dynamic_quota: usize,
    counters: Counters,
}

impl<S: ItemSource> fmt::Debug for RepeatCaches<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatCaches")
            .field("active_range", &self.ranges.current())
            .field("previous_range", &self.ranges.previous())
            .field("indexed_count", &self.resolver.len())
            .field("cached_count", &self.store.len())
            .field("l1_count", &self.active.len())
            .field("dynamic_quota", &self.dynamic_quota)
            .finish()
    }
}

impl<S: ItemSource> RepeatCaches<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, RepeatCacheConfig::default())
    }

    pub fn with_config(source: S, config: RepeatCacheConfig<S::TemplateType>) -> Self {
        Self {
            source,
            config,
            ranges: RangeTracker::new(),
            resolver: IndexKeyTypeResolver::new(),
            store: NodeStore::default(),
            active: ActiveSet::default(),
            dynamic_quota: 0,
            counters: Counters::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Mutable access to the item source. Call [`Self::invalidate`] after
    /// any structural change made through it.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn config(&self) -> &RepeatCacheConfig<S::TemplateType> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RepeatCacheConfig<S::TemplateType> {
        &mut self.config
    }

    // ========== Active range ==========

    /// Records the inclusive range the layout pass is about to render.
    pub fn set_active_range(&mut self, from: usize, to: usize) {
        let range = self.ranges.set_active_range(from, to);
        if range.width() > self.dynamic_quota {
            self.dynamic_quota = range.width();
            log::trace!("repeat: dynamic spare quota grown to {}", self.dynamic_quota);
        }
    }

    pub fn active_range(&self) -> Option<ActiveRange> {
        self.ranges.current()
    }

    pub fn scroll_direction(&self) -> ScrollDirection {
        self.ranges.direction()
    }

    pub fn distance_from_range(&self, index: usize) -> usize {
        self.ranges.distance_from_range(Some(index))
    }

    /// Distance of the key's current index; `usize::MAX` for unindexed keys.
    pub fn distance_for_key(&self, key: &S::Key) -> usize {
        self.ranges.distance_from_range(self.resolver.index_for_key(key))
    }

    // ========== Index resolution ==========

    /// Key at `index`. With `allow_fetch`, a missing key triggers one batch
    /// fetch from the source before giving up.
    pub fn get_key(&mut self, index: usize, allow_fetch: bool) -> Option<S::Key> {
        if let Some(key) = self.resolver.key(index) {
            return Some(key.clone());
        }
        if !allow_fetch {
            return None;
        }
        self.fetch_for_index(index);
        self.resolver.key(index).cloned()
    }

    /// Template type at `index`, fetched like [`Self::get_key`].
    pub fn get_ttype(&mut self, index: usize, allow_fetch: bool) -> Option<S::TemplateType> {
        if let Some(ttype) = self.resolver.ttype(index) {
            return Some(ttype.clone());
        }
        if !allow_fetch {
            return None;
        }
        self.fetch_for_index(index);
        self.resolver.ttype(index).cloned()
    }

    pub fn index_for_key(&self, key: &S::Key) -> Option<usize> {
        self.resolver.index_for_key(key)
    }

    /// Fetches keys and types for `[from, to]` from the source.
    ///
    /// With `extend`, an overlapping active range is fetched as a whole. Every
    /// cached node whose key came back is marked valid. Returns the number of
    /// indices resolved.
    pub fn fetch_range(
        &mut self,
        from: usize,
        to: usize,
        extend: bool,
    ) -> Result<usize, CacheError> {
        let widen_to = if extend { self.ranges.current() } else { None };
        let fetched = self
            .resolver
            .fetch_range(&mut self.source, from, to, widen_to)?;
        for key in &fetched {
            self.store.set_valid(key);
        }
        Ok(fetched.len())
    }

    /// Drops every positional mapping after a structural change in the
    /// source. Cached nodes survive, marked stale until their key is fetched
    /// again.
    pub fn invalidate(&mut self) {
        self.resolver.invalidate();
        self.store.invalidate_all();
        log::debug!(
            "repeat: invalidated index maps; {} cached nodes ({} in L1) pending refetch",
            self.store.len(),
            self.active.len()
        );
    }

    /// Flags the node cached for `key` as stale, e.g. after the item's data
    /// changed without moving. The next [`Self::get_node`] refreshes it.
    pub fn mark_stale(&mut self, key: &S::Key) -> bool {
        self.store.set_stale(key)
    }

    fn fetch_for_index(&mut self, index: usize) -> bool {
        let (from, to) = match self.ranges.current() {
            Some(active) if active.contains(index) => (active.from, active.to),
            _ => (index, index.saturating_add(self.config.fetch_ahead)),
        };
        let extend = self.resolver.extend_pending();
        self.fetch_range(from, to, extend).is_ok()
    }

    fn resolve(&mut self, index: usize) -> Option<(S::Key, S::TemplateType)> {
        let key = self.get_key(index, true)?;
        let ttype = self.get_ttype(index, true)?;
        Some((key, ttype))
    }

    // ========== L1 membership ==========

    /// Marks `key` as attached to the render tree. A key without a cached
    /// node is refused.
    pub fn add_to_l1(&mut self, key: S::Key, trigger_reuse_hook: bool) -> bool {
        let Some(item) = self.store.get(&key) else {
            log::warn!("repeat: cannot activate {key:?}: no cached node");
            return false;
        };
        let node = Rc::clone(&item.node);
        let inserted = self.active.insert(key);
        if trigger_reuse_hook && self.active.take_recycled(node.node_id()) {
            log::trace!("repeat: reusing node #{}", node.node_id());
            node.on_reuse();
        }
        inserted
    }

    /// Detaches `key` from the render tree, keeping its node as a spare.
    /// Returns `false` if the key was not in L1.
    pub fn remove_from_l1(&mut self, key: &S::Key, trigger_recycle_hook: bool) -> bool {
        if !self.active.remove(key) {
            return false;
        }
        if trigger_recycle_hook {
            if let Some(item) = self.store.get(key) {
                if self.active.mark_recycled(item.node.node_id()) {
                    log::trace!("repeat: recycling node #{} ({key:?})", item.node.node_id());
                    item.node.on_recycle();
                }
            }
        }
        true
    }

    pub fn is_in_l1(&self, key: &S::Key) -> bool {
        self.active.contains(key)
    }

    /// Keys in L1, sorted.
    pub fn l1_keys(&self) -> Vec<S::Key> {
        self.active.snapshot()
    }

    /// Re-evaluates every L1 member with `keep(index, node)`. Members that
    /// are not kept are demoted to spares. Returns the number demoted.
    pub fn rebuild<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(Option<usize>, &Rc<S::Node>) -> bool,
    {
        let mut demoted = 0;
        for key in self.active.snapshot() {
            let index = self.resolver.index_for_key(&key);
            let kept = self
                .store
                .get(&key)
                .is_some_and(|item| keep(index, &item.node));
            if !kept && self.remove_from_l1(&key, true) {
                demoted += 1;
            }
        }
        demoted
    }

    /// Like [`Self::rebuild`], deciding on the key alone.
    pub fn rebuild_with_key<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&S::Key) -> bool,
    {
        let mut demoted = 0;
        for key in self.active.snapshot() {
            if !keep(&key) && self.remove_from_l1(&key, true) {
                demoted += 1;
            }
        }
        demoted
    }

    /// Demotes L1 keys that are unindexed or outside the active range.
    ///
    /// After an invalidation the active range is refetched first so that keys
    /// still on screen resolve to their new indices.
    pub fn recycle_out_of_range(&mut self) -> usize {
        let Some(active) = self.ranges.current() else {
            return 0;
        };
        let has_unindexed = self
            .active
            .snapshot()
            .iter()
            .any(|key| self.resolver.index_for_key(key).is_none());
        if has_unindexed {
            if let Err(err) = self.fetch_range(active.from, active.to, true) {
                log::debug!(
                    "repeat: refetch of [{}, {}] failed ({err}); demoting unindexed L1 keys",
                    active.from,
                    active.to
                );
            }
        }
        self.rebuild(|index, _| index.is_some_and(|index| active.contains(index)))
    }

    // ========== Node lookup and allocation ==========

    /// Returns the node already cached for the key at `index`, without
    /// building or repurposing anything.
    ///
    /// A node built from a different template than the one now expected for
    /// its key is dropped and `None` is returned. A stale node is refreshed
    /// through `update_node` before it is handed out.
    pub fn get_node(&mut self, index: usize) -> Option<Rc<S::Node>> {
        let (key, ttype) = self.resolve(index)?;
        let item = self.store.get(&key)?;
        if item.ttype != ttype {
            log::warn!(
                "repeat: node for {key:?} was built from template {:?} but index {index} expects {ttype:?}; rebuilding",
                item.ttype
            );
            self.discard(&key);
            return None;
        }
        let node = Rc::clone(&item.node);
        if !item.valid {
            self.source.update_node(&key, index, &node);
            self.store.set_valid(&key);
            self.counters.updated += 1;
        }
        self.add_to_l1(key, true);
        Some(node)
    }

    /// Rewrites a spare of the matching template type for the key at `index`.
    ///
    /// A spare at distance 0 is taken first; otherwise the spare farthest
    /// from the active range, with unindexed keys counting as farthest.
    /// Returns `None` when no spare of that type exists.
    pub fn reconcile_from_spare(&mut self, index: usize) -> Option<Rc<S::Node>> {
        let (key, ttype) = self.resolve(index)?;
        if self.store.contains(&key) {
            if let Some(node) = self.get_node(index) {
                return Some(node);
            }
        }
        let candidate = self.spare_to_update(&ttype)?;
        let node = Rc::clone(&self.store.get(&candidate)?.node);
        self.source.update_node(&candidate, index, &node);
        self.store.rename(&candidate, key.clone());
        self.store.set_valid(&key);
        log::trace!(
            "repeat: node #{} moved from {candidate:?} to {key:?} at index {index}",
            node.node_id()
        );
        self.counters.reused += 1;
        self.counters.updated += 1;
        self.add_to_l1(key, true);
        Some(node)
    }

    /// Builds a new node for `index` through the source's `build_node`.
    pub fn allocate_new(&mut self, index: usize) -> Result<Rc<S::Node>, CacheError> {
        let (key, ttype) = self
            .resolve(index)
            .ok_or(CacheError::UnresolvedIndex { index })?;
        let mut sink = NodeSink::new();
        self.source.build_node(index, &mut sink);
        let node = sink.finish().map_err(|produced| {
            log::warn!("repeat: build_node for index {index} emitted {produced} nodes");
            CacheError::BuildContract { index, produced }
        })?;
        let node = Rc::new(node);
        if let Some(replaced) = self.store.insert(key.clone(), ttype, Rc::clone(&node)) {
            log::debug!(
                "repeat: replaced cached node #{} for {key:?}",
                replaced.node.node_id()
            );
            self.active.take_recycled(replaced.node.node_id());
        }
        self.counters.built += 1;
        self.add_to_l1(key, false);
        Ok(node)
    }

    /// Node for `index`, trying the cache, then a spare, then a new build.
    /// `Ok(None)` when the index does not resolve to an item.
    pub fn get_or_create_node(
        &mut self,
        index: usize,
    ) -> Result<Option<Rc<S::Node>>, CacheError> {
        if self.resolve(index).is_none() {
            return Ok(None);
        }
        if let Some(node) = self.get_node(index) {
            return Ok(Some(node));
        }
        if let Some(node) = self.reconcile_from_spare(index) {
            return Ok(Some(node));
        }
        self.allocate_new(index).map(Some)
    }

    fn spare_to_update(&self, ttype: &S::TemplateType) -> Option<S::Key> {
        let mut best: Option<(usize, S::Key)> = None;
        for key in self.store.keys_of_type(ttype) {
            if self.active.contains(&key) {
                continue;
            }
            let distance = self.distance_for_key(&key);
            if distance == 0 {
                return Some(key);
            }
            match &best {
                Some((farthest, _)) if *farthest >= distance => {}
                _ => best = Some((distance, key)),
            }
        }
        best.map(|(_, key)| key)
    }

    /// Removes `key` from L1 and the store without running hooks.
    fn discard(&mut self, key: &S::Key) -> Option<CacheItem<S::TemplateType, S::Node>> {
        self.active.remove(key);
        let item = self.store.remove(key)?;
        self.active.take_recycled(item.node.node_id());
        Some(item)
    }

    /// Forgets a key the source reports as permanently gone.
    pub fn drop_key(&mut self, key: &S::Key) -> bool {
        self.discard(key).is_some()
    }

    // ========== Purge ==========

    /// Spare-pool capacity for `ttype`.
    pub fn quota_for(&self, ttype: &S::TemplateType) -> usize {
        self.config.cache_count(ttype).unwrap_or(if self.config.dynamic_quota {
            self.dynamic_quota
        } else {
            0
        })
    }

    pub fn dynamic_quota(&self) -> usize {
        self.dynamic_quota
    }

    /// Evicts spares beyond each template type's quota, farthest from the
    /// active range first. Call at idle time, after layout settled.
    pub fn purge(&mut self) -> usize {
        let mut evicted = 0;
        for ttype in self.store.ttypes() {
            let quota = self.quota_for(&ttype);
            let mut spares: Vec<(usize, S::Key)> = self
                .store
                .keys_of_type(&ttype)
                .into_iter()
                .filter(|key| !self.active.contains(key))
                .map(|key| (self.distance_for_key(&key), key))
                .collect();
            if spares.len() <= quota {
                continue;
            }
            spares.sort();
            let victims: SmallVec<[S::Key; 8]> =
                spares.into_iter().skip(quota).map(|(_, key)| key).collect();
            for key in victims {
                if self.discard(&key).is_some() {
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            log::debug!("repeat: purged {evicted} spare nodes");
        }
        self.counters.purged += evicted;
        evicted
    }

    // ========== Introspection ==========

    /// Spare keys cached for `ttype`, sorted.
    pub fn spare_keys(&self, ttype: &S::TemplateType) -> Vec<S::Key> {
        self.store
            .keys_of_type(ttype)
            .into_iter()
            .filter(|key| !self.active.contains(key))
            .collect()
    }

    pub fn cached_item(&self, key: &S::Key) -> Option<&CacheItem<S::TemplateType, S::Node>> {
        self.store.get(key)
    }

    /// Number of cached nodes, L1 and L2 together.
    pub fn cached_len(&self) -> usize {
        self.store.len()
    }

    /// Key a node currently renders; for diagnostics.
    pub fn key_for_node(&self, node_id: NodeId) -> Option<&S::Key> {
        self.store.key_for_node(node_id)
    }

    /// Visits L1 members ordered by index, unindexed members last.
    pub fn for_each_l1_node(&self, mut f: impl FnMut(Option<usize>, &S::Key, &Rc<S::Node>)) {
        let mut members: Vec<(Option<usize>, S::Key)> = self
            .active
            .snapshot()
            .into_iter()
            .map(|key| (self.resolver.index_for_key(&key), key))
            .collect();
        members.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        for (index, key) in members {
            if let Some(item) = self.store.get(&key) {
                f(index, &key, &item.node);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            items_in_l1: self.active.len(),
            items_in_l2: self.store.len().saturating_sub(self.active.len()),
            total_built: self.counters.built,
            reuse_count: self.counters.reused,
            update_count: self.counters.updated,
            purged_count: self.counters.purged,
        }
    }

    /// Drops every node, mapping and range. Counters are kept.
    pub fn reset(&mut self) {
        self.store.clear();
        self.active.clear();
        self.resolver = IndexKeyTypeResolver::new();
        self.ranges = RangeTracker::new();
        self.dynamic_quota = 0;
    }
}

#[cfg(test)]
#[path = "tests/caches_tests.rs"]
mod tests;
