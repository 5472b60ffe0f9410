//! Contracts between the cache and its host: the item source that resolves
//! keys, types and nodes, and the lifecycle hooks a cached node exposes.

use std::fmt;
use std::hash::Hash;

use crate::NodeId;

/// Bounds shared by item keys and template types: opaque, hashable and
/// totally ordered so ties in the eviction order resolve deterministically.
pub trait CacheKey: Clone + Eq + Hash + Ord + fmt::Debug + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + Ord + fmt::Debug + 'static {}

/// A view node the cache can hold on to while it is off-tree.
///
/// Hooks take `&self`; nodes keep their mutable state behind `Cell`/`RefCell`
/// the same way the rest of the runtime does.
pub trait RecyclableNode {
    fn node_id(&self) -> NodeId;

    /// Called once when a previously recycled node re-enters the render tree.
    fn on_reuse(&self) {}

    /// Called once when the node leaves the render tree but stays cached.
    fn on_recycle(&self) {}
}

/// Scoped capture for a node produced by [`ItemSource::build_node`].
///
/// Replaces an ambient builder stack: the source emits into the sink it was
/// handed, and the cache takes the result once the callback returns.
pub struct NodeSink<N> {
    node: Option<N>,
    produced: usize,
}

impl<N> NodeSink<N> {
    pub(crate) fn new() -> Self {
        Self {
            node: None,
            produced: 0,
        }
    }

    /// Hands the freshly built node to the cache. Exactly one call is expected.
    pub fn emit(&mut self, node: N) {
        self.produced += 1;
        if self.node.is_none() {
            self.node = Some(node);
        }
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Returns the captured node, or the number of emitted nodes when that
    /// number is not exactly one.
    pub(crate) fn finish(self) -> Result<N, usize> {
        match (self.node, self.produced) {
            (Some(node), 1) => Ok(node),
            (_, produced) => Err(produced),
        }
    }
}

/// Host-supplied data source for a virtualized repeat.
///
/// All callbacks are synchronous and must not call back into the cache; the
/// cache owns the source, so doing so is not expressible.
pub trait ItemSource {
    type Key: CacheKey;
    type TemplateType: CacheKey;
    type Node: RecyclableNode;

    /// Keys for the inclusive range `[from, to]`. A shorter list is fine when
    /// the data ends before `to`.
    fn fetch_keys(&mut self, from: usize, to: usize) -> Vec<Self::Key>;

    /// Template types for `[from, to]`, same length as [`Self::fetch_keys`].
    fn fetch_types(&mut self, from: usize, to: usize) -> Vec<Self::TemplateType>;

    /// Builds the node for `index` and emits it into `sink`.
    fn build_node(&mut self, index: usize, sink: &mut NodeSink<Self::Node>);

    /// Re-renders `node`, which currently shows `old_key`, with the data at `index`.
    fn update_node(&mut self, old_key: &Self::Key, index: usize, node: &Self::Node);
}

type RangeCallback<V> = Box<dyn FnMut(usize, usize) -> Vec<V>>;
type BuildCallback<N> = Box<dyn FnMut(usize, &mut NodeSink<N>)>;
type UpdateCallback<K, N> = Box<dyn FnMut(&K, usize, &N)>;

/// [`ItemSource`] assembled from closures, for hosts that hand the cache a
/// set of callbacks instead of implementing the trait.
pub struct CallbackSource<K, T, N> {
    on_get_keys: RangeCallback<K>,
    on_get_types: RangeCallback<T>,
    on_create_node: BuildCallback<N>,
    on_update_node: UpdateCallback<K, N>,
}

impl<K, T, N> CallbackSource<K, T, N> {
    pub fn new(
        on_get_keys: impl FnMut(usize, usize) -> Vec<K> + 'static,
        on_get_types: impl FnMut(usize, usize) -> Vec<T> + 'static,
        on_create_node: impl FnMut(usize, &mut NodeSink<N>) + 'static,
        on_update_node: impl FnMut(&K, usize, &N) + 'static,
    ) -> Self {
        Self {
            on_get_keys: Box::new(on_get_keys),
            on_get_types: Box::new(on_get_types),
            on_create_node: Box::new(on_create_node),
            on_update_node: Box::new(on_update_node),
        }
    }
}

impl<K, T, N> fmt::Debug for CallbackSource<K, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSource").finish_non_exhaustive()
    }
}

impl<K, T, N> ItemSource for CallbackSource<K, T, N>
where
    K: CacheKey,
    T: CacheKey,
    N: RecyclableNode,
{
    type Key = K;
    type TemplateType = T;
    type Node = N;

    fn fetch_keys(&mut self, from: usize, to: usize) -> Vec<K> {
        (self.on_get_keys)(from, to)
    }

    fn fetch_types(&mut self, from: usize, to: usize) -> Vec<T> {
        (self.on_get_types)(from, to)
    }

    fn build_node(&mut self, index: usize, sink: &mut NodeSink<N>) {
        (self.on_create_node)(index, sink)
    }

    fn update_node(&mut self, old_key: &K, index: usize, node: &N) {
        (self.on_update_node)(old_key, index, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_accepts_exactly_one_node() {
        let mut sink = NodeSink::new();
        sink.emit(7u32);
        assert_eq!(sink.finish(), Ok(7));
    }

    #[test]
    fn sink_reports_empty_and_extra_emissions() {
        let empty: NodeSink<u32> = NodeSink::new();
        assert_eq!(empty.finish(), Err(0));

        let mut twice = NodeSink::new();
        twice.emit(1u32);
        twice.emit(2u32);
        assert_eq!(twice.produced(), 2);
        assert_eq!(twice.finish(), Err(2));
    }
}
