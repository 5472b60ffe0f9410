//! Drives the cache the way a lazy list's layout pass does: set the visible
//! window, recycle what scrolled away, ask for a node per visible index, then
//! purge at idle. Checks that attached nodes always render their own key and
//! that spare reuse keeps the number of builds bounded.

use std::cell::Cell;
use std::rc::Rc;

use cranpose_repeat::{
    ItemSource, NodeId, NodeSink, RecyclableNode, RepeatCacheConfig, RepeatCaches,
};

struct Row {
    id: NodeId,
    shows: Cell<u64>,
}

impl RecyclableNode for Row {
    fn node_id(&self) -> NodeId {
        self.id
    }
}

struct Feed {
    ids: Vec<u64>,
    header_every: u64,
    next_id: NodeId,
}

impl Feed {
    fn new(len: u64, header_every: u64) -> Self {
        Self {
            ids: (0..len).collect(),
            header_every,
            next_id: 0,
        }
    }

    fn template(&self, id: u64) -> &'static str {
        if self.header_every > 0 && id % self.header_every == 0 {
            "header"
        } else {
            "row"
        }
    }

    fn window(&self, from: usize, to: usize) -> &[u64] {
        if from >= self.ids.len() {
            return &[];
        }
        &self.ids[from..=to.min(self.ids.len() - 1)]
    }
}

impl ItemSource for Feed {
    type Key = u64;
    type TemplateType = &'static str;
    type Node = Row;

    fn fetch_keys(&mut self, from: usize, to: usize) -> Vec<u64> {
        self.window(from, to).to_vec()
    }

    fn fetch_types(&mut self, from: usize, to: usize) -> Vec<&'static str> {
        self.window(from, to)
            .iter()
            .map(|id| self.template(*id))
            .collect()
    }

    fn build_node(&mut self, index: usize, sink: &mut NodeSink<Row>) {
        self.next_id += 1;
        sink.emit(Row {
            id: self.next_id,
            shows: Cell::new(self.ids[index]),
        });
    }

    fn update_node(&mut self, _old_key: &u64, index: usize, node: &Row) {
        node.shows.set(self.ids[index]);
    }
}

fn frame(caches: &mut RepeatCaches<Feed>, from: usize, to: usize) {
    caches.set_active_range(from, to);
    caches.recycle_out_of_range();
    for index in from..=to {
        caches
            .get_or_create_node(index)
            .expect("layout pass")
            .expect("index inside the feed");
    }
    caches.purge();
}

fn assert_l1_consistent(caches: &RepeatCaches<Feed>) {
    let range = caches.active_range().expect("range set");
    let mut seen = 0;
    caches.for_each_l1_node(|index, key, node: &Rc<Row>| {
        let index = index.expect("attached key is indexed");
        assert!(range.contains(index), "index {index} outside {range:?}");
        assert_eq!(node.shows.get(), *key);
        assert_eq!(caches.key_for_node(node.node_id()), Some(key));
        seen += 1;
    });
    assert_eq!(seen, range.width());
}

#[test]
fn steady_scroll_reuses_instead_of_building() {
    let mut caches = RepeatCaches::new(Feed::new(1_000, 0));
    let frames = 200;
    for step in 0..frames {
        frame(&mut caches, step * 3, step * 3 + 9);
        assert_l1_consistent(&caches);
    }

    let stats = caches.stats();
    assert_eq!(stats.total_built, 10);
    assert_eq!(stats.reuse_count, 3 * (frames - 1));
    assert_eq!(stats.items_in_l1, 10);
    assert_eq!(stats.purged_count, 0);
}

#[test]
fn mixed_templates_only_reuse_matching_spares() {
    let mut caches = RepeatCaches::new(Feed::new(500, 4));
    for step in 0..100 {
        frame(&mut caches, step * 3, step * 3 + 9);
        assert_l1_consistent(&caches);
        caches.for_each_l1_node(|_, key, _| {
            let expected = if key % 4 == 0 { "header" } else { "row" };
            assert_eq!(caches.cached_item(key).map(|item| *item.ttype()), Some(expected));
        });
    }

    // A window of ten holds at most three headers and eight rows.
    assert!(caches.stats().total_built <= 11);
}

#[test]
fn backward_scroll_after_forward_scroll() {
    let mut caches = RepeatCaches::new(Feed::new(300, 5));
    for step in 0..30 {
        frame(&mut caches, step * 4, step * 4 + 11);
    }
    for step in (0..30).rev() {
        frame(&mut caches, step * 4, step * 4 + 11);
        assert_l1_consistent(&caches);
    }
    assert_eq!(caches.active_range().map(|range| range.from), Some(0));
}

#[test]
fn jump_keeps_spare_pool_within_quota() {
    let config = RepeatCacheConfig::fixed().with_cache_count("row", 4);
    let mut caches = RepeatCaches::with_config(Feed::new(10_000, 0), config);

    frame(&mut caches, 0, 19);
    // Narrower window far away: half the old nodes are reused, the rest are
    // spares trimmed down to the declared count.
    frame(&mut caches, 5_000, 5_009);
    assert_l1_consistent(&caches);

    let stats = caches.stats();
    assert_eq!(stats.items_in_l1, 10);
    assert_eq!(stats.items_in_l2, 4);
    assert_eq!(stats.total_built, 20);
    assert_eq!(stats.reuse_count, 10);
    assert_eq!(stats.purged_count, 6);

    frame(&mut caches, 9_000, 9_019);
    assert_l1_consistent(&caches);
    let stats = caches.stats();
    assert_eq!(stats.total_built, 26);
    assert_eq!(stats.reuse_count, 24);
    assert_eq!(stats.items_in_l2, 0);
}

#[test]
fn insertion_above_viewport_is_absorbed() {
    let mut caches = RepeatCaches::new(Feed::new(100, 0));
    frame(&mut caches, 10, 19);

    caches.source_mut().ids.insert(12, 1_000);
    caches.invalidate();
    frame(&mut caches, 10, 19);
    assert_l1_consistent(&caches);
    assert_eq!(caches.index_for_key(&1_000), Some(12));
    assert_eq!(caches.index_for_key(&18), Some(19));
    // The node pushed out of the window now renders the inserted item.
    assert!(caches.cached_item(&19).is_none());
    assert_eq!(caches.stats().total_built, 10);

    caches.source_mut().ids.remove(12);
    caches.invalidate();
    frame(&mut caches, 10, 19);
    assert_l1_consistent(&caches);
    assert_eq!(caches.index_for_key(&19), Some(19));
}
