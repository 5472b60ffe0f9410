//! Tuning knobs for [`RepeatCaches`](crate::RepeatCaches).

use std::hash::Hash;

use crate::collections::map::HashMap;

/// Number of indices past the requested one that an automatic fetch asks the
/// item source for, when the index lies outside the active range.
pub const DEFAULT_FETCH_AHEAD: usize = 8;

/// Spare-pool sizing and fetch behaviour.
///
/// Template types with a declared cache count keep at most that many spares.
/// Undeclared types follow the dynamic quota: the width of the widest active
/// range seen so far, or zero when dynamic quotas are disabled.
#[derive(Clone, Debug)]
pub struct RepeatCacheConfig<T> {
    cache_counts: HashMap<T, usize>,
    /// Grow the quota of undeclared template types with the active range width.
    pub dynamic_quota: bool,
    /// Extra indices fetched after the requested one outside the active range.
    pub fetch_ahead: usize,
}

impl<T> Default for RepeatCacheConfig<T> {
    fn default() -> Self {
        Self {
            cache_counts: HashMap::default(),
            dynamic_quota: true,
            fetch_ahead: DEFAULT_FETCH_AHEAD,
        }
    }
}

impl<T: Hash + Eq> RepeatCacheConfig<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config where only declared template types keep spares.
    pub fn fixed() -> Self {
        Self {
            dynamic_quota: false,
            ..Self::default()
        }
    }

    /// Declares the spare-pool size for `ttype`.
    pub fn with_cache_count(mut self, ttype: T, count: usize) -> Self {
        self.set_cache_count(ttype, count);
        self
    }

    pub fn with_fetch_ahead(mut self, fetch_ahead: usize) -> Self {
        self.fetch_ahead = fetch_ahead;
        self
    }

    pub fn set_cache_count(&mut self, ttype: T, count: usize) {
        self.cache_counts.insert(ttype, count);
    }

    /// Returns the declared spare-pool size for `ttype`, if any.
    pub fn cache_count(&self, ttype: &T) -> Option<usize> {
        self.cache_counts.get(ttype).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_counts_are_per_type() {
        let config = RepeatCacheConfig::new()
            .with_cache_count("header", 1)
            .with_cache_count("row", 4);
        assert_eq!(config.cache_count(&"header"), Some(1));
        assert_eq!(config.cache_count(&"row"), Some(4));
        assert_eq!(config.cache_count(&"footer"), None);
        assert!(config.dynamic_quota);
    }

    #[test]
    fn fixed_disables_dynamic_quota() {
        let config: RepeatCacheConfig<u32> = RepeatCacheConfig::fixed().with_fetch_ahead(0);
        assert!(!config.dynamic_quota);
        assert_eq!(config.fetch_ahead, 0);
    }
}
