//! Positional index → key / template type maps filled lazily from the item
//! source.
//!
//! Everything here is positional and therefore invalid the moment the source
//! changes structurally; [`IndexKeyTypeResolver::invalidate`] drops it all and
//! arms the next fetch to cover the whole active range again.

use crate::collections::map::HashMap;
use crate::error::CacheError;
use crate::range::ActiveRange;
use crate::source::{CacheKey, ItemSource};

pub struct IndexKeyTypeResolver<K, T> {
    key_for_index: HashMap<usize, K>,
    index_for_key: HashMap<K, usize>,
    ttype_for_index: HashMap<usize, T>,
    /// Most recent index seen for each template type.
    index_for_ttype: HashMap<T, usize>,
    extend_next_fetch: bool,
}

impl<K, T> Default for IndexKeyTypeResolver<K, T> {
    fn default() -> Self {
        Self {
            key_for_index: HashMap::default(),
            index_for_key: HashMap::default(),
            ttype_for_index: HashMap::default(),
            index_for_ttype: HashMap::default(),
            extend_next_fetch: false,
        }
    }
}

impl<K: CacheKey, T: CacheKey> IndexKeyTypeResolver<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self, index: usize) -> Option<&K> {
        self.key_for_index.get(&index)
    }

    pub fn ttype(&self, index: usize) -> Option<&T> {
        self.ttype_for_index.get(&index)
    }

    pub fn index_for_key(&self, key: &K) -> Option<usize> {
        self.index_for_key.get(key).copied()
    }

    pub fn last_index_for_ttype(&self, ttype: &T) -> Option<usize> {
        self.index_for_ttype.get(ttype).copied()
    }

    /// Number of indices with a resolved key.
    pub fn len(&self) -> usize {
        self.key_for_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_for_index.is_empty()
    }

    /// Whether the next automatic fetch should widen over the active range.
    pub fn extend_pending(&self) -> bool {
        self.extend_next_fetch
    }

    /// Index → key pairs sorted by index.
    pub fn indexed_keys(&self) -> Vec<(usize, &K)> {
        let mut entries: Vec<(usize, &K)> = self
            .key_for_index
            .iter()
            .map(|(index, key)| (*index, key))
            .collect();
        entries.sort_unstable_by_key(|(index, _)| *index);
        entries
    }

    /// Drops every positional mapping.
    pub fn invalidate(&mut self) {
        self.key_for_index.clear();
        self.index_for_key.clear();
        self.ttype_for_index.clear();
        self.index_for_ttype.clear();
        self.extend_next_fetch = true;
    }

    /// Fetches keys and types for `[from, to]` and records them.
    ///
    /// When `widen_to` is an active range overlapping the request, the fetch
    /// covers both. Returns the keys that were mapped, in index order. On a
    /// contract violation nothing is recorded.
    pub fn fetch_range<S>(
        &mut self,
        source: &mut S,
        from: usize,
        to: usize,
        widen_to: Option<ActiveRange>,
    ) -> Result<Vec<K>, CacheError>
    where
        S: ItemSource<Key = K, TemplateType = T>,
    {
        let requested = ActiveRange::new(from, to);
        let range = match widen_to {
            Some(active) if active.overlaps(&requested) => active.union(&requested),
            _ => requested,
        };

        let keys = source.fetch_keys(range.from, range.to);
        let types = source.fetch_types(range.from, range.to);
        if keys.is_empty() || types.is_empty() {
            log::warn!(
                "repeat: item source returned {} keys / {} types for [{}, {}]",
                keys.len(),
                types.len(),
                range.from,
                range.to
            );
            return Err(CacheError::EmptyFetch {
                from: range.from,
                to: range.to,
            });
        }
        if keys.len() != types.len() {
            log::warn!(
                "repeat: key/type length mismatch for [{}, {}]: {} keys, {} types",
                range.from,
                range.to,
                keys.len(),
                types.len()
            );
            return Err(CacheError::FetchLengthMismatch {
                from: range.from,
                to: range.to,
                keys: keys.len(),
                types: types.len(),
            });
        }

        self.extend_next_fetch = false;
        let mut fetched = Vec::with_capacity(keys.len().min(range.width()));
        for (offset, (key, ttype)) in keys
            .into_iter()
            .zip(types)
            .take(range.width())
            .enumerate()
        {
            let index = range.from + offset;
            self.map_key(index, key.clone());
            self.map_ttype(index, ttype);
            fetched.push(key);
        }
        log::trace!(
            "repeat: fetched {} keys starting at {}",
            fetched.len(),
            range.from
        );
        Ok(fetched)
    }

    /// Records `index ↔ key`, unlinking whatever either side pointed at before.
    fn map_key(&mut self, index: usize, key: K) {
        if let Some(old_key) = self.key_for_index.insert(index, key.clone()) {
            if old_key != key && self.index_for_key.get(&old_key) == Some(&index) {
                self.index_for_key.remove(&old_key);
            }
        }
        if let Some(old_index) = self.index_for_key.insert(key.clone(), index) {
            if old_index != index && self.key_for_index.get(&old_index) == Some(&key) {
                self.key_for_index.remove(&old_index);
            }
        }
    }

    fn map_ttype(&mut self, index: usize, ttype: T) {
        self.index_for_ttype.insert(ttype.clone(), index);
        self.ttype_for_index.insert(index, ttype);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestSource;

    fn source(len: usize) -> TestSource {
        TestSource::uniform(len, "row")
    }

    #[test]
    fn fetch_populates_both_directions() {
        let mut source = source(10);
        let mut resolver = IndexKeyTypeResolver::new();
        let fetched = resolver.fetch_range(&mut source, 3, 5, None).unwrap();
        assert_eq!(fetched, vec!["k3", "k4", "k5"]);
        assert_eq!(resolver.key(4).map(String::as_str), Some("k4"));
        assert_eq!(resolver.ttype(4).map(String::as_str), Some("row"));
        assert_eq!(resolver.index_for_key(&"k5".to_string()), Some(5));
        assert_eq!(resolver.last_index_for_ttype(&"row".to_string()), Some(5));
        assert_eq!(resolver.key(6), None);
    }

    #[test]
    fn short_result_at_end_of_data_is_accepted() {
        let mut source = source(5);
        let mut resolver = IndexKeyTypeResolver::new();
        let fetched = resolver.fetch_range(&mut source, 3, 9, None).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn mismatched_lengths_leave_maps_untouched() {
        let mut source = source(20);
        source.truncate_types_to = Some(4);
        let mut resolver = IndexKeyTypeResolver::new();
        let err = resolver.fetch_range(&mut source, 1, 10, None).unwrap_err();
        assert_eq!(
            err,
            CacheError::FetchLengthMismatch {
                from: 1,
                to: 10,
                keys: 10,
                types: 4
            }
        );
        assert!(resolver.is_empty());
        assert_eq!(resolver.ttype(1), None);
    }

    #[test]
    fn empty_result_is_a_failure() {
        let mut source = source(3);
        let mut resolver = IndexKeyTypeResolver::new();
        let err = resolver.fetch_range(&mut source, 7, 9, None).unwrap_err();
        assert_eq!(err, CacheError::EmptyFetch { from: 7, to: 9 });
    }

    #[test]
    fn widening_covers_overlapping_active_range() {
        let mut source = source(50);
        let mut resolver = IndexKeyTypeResolver::new();
        resolver.invalidate();
        assert!(resolver.extend_pending());
        resolver
            .fetch_range(&mut source, 12, 12, Some(ActiveRange::new(10, 20)))
            .unwrap();
        assert_eq!(source.fetch_log, vec![(10, 20)]);
        assert_eq!(resolver.len(), 11);
        assert!(!resolver.extend_pending());
    }

    #[test]
    fn widening_ignores_disjoint_active_range() {
        let mut source = source(50);
        let mut resolver = IndexKeyTypeResolver::new();
        resolver
            .fetch_range(&mut source, 30, 31, Some(ActiveRange::new(10, 20)))
            .unwrap();
        assert_eq!(source.fetch_log, vec![(30, 31)]);
    }

    #[test]
    fn moved_key_drops_its_old_index() {
        let mut source = source(10);
        let mut resolver = IndexKeyTypeResolver::new();
        resolver.fetch_range(&mut source, 0, 3, None).unwrap();
        // A new item lands at the front and everything shifts by one.
        source.insert(0, "new", "row");
        resolver.fetch_range(&mut source, 1, 1, None).unwrap();
        assert_eq!(resolver.index_for_key(&"k0".to_string()), Some(1));
        assert_eq!(resolver.key(0), None);
        assert_eq!(resolver.index_for_key(&"k1".to_string()), None);
    }

    #[test]
    fn invalidate_clears_positions() {
        let mut source = source(10);
        let mut resolver = IndexKeyTypeResolver::new();
        resolver.fetch_range(&mut source, 0, 4, None).unwrap();
        resolver.invalidate();
        assert!(resolver.is_empty());
        assert_eq!(resolver.index_for_key(&"k2".to_string()), None);
        assert_eq!(resolver.ttype(2), None);
    }
}
