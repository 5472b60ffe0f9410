//! Recording item source and node for exercising the cache without a UI tree.

use std::cell::Cell;

use crate::source::{ItemSource, NodeSink, RecyclableNode};
use crate::NodeId;

/// Node that remembers which index it renders and how often its hooks ran.
#[derive(Debug)]
pub struct TestNode {
    id: NodeId,
    index: Cell<usize>,
    reuse_calls: Cell<usize>,
    recycle_calls: Cell<usize>,
}

impl TestNode {
    pub fn new(id: NodeId, index: usize) -> Self {
        Self {
            id,
            index: Cell::new(index),
            reuse_calls: Cell::new(0),
            recycle_calls: Cell::new(0),
        }
    }

    /// Index whose data the node currently shows.
    pub fn index(&self) -> usize {
        self.index.get()
    }

    pub fn reuse_calls(&self) -> usize {
        self.reuse_calls.get()
    }

    pub fn recycle_calls(&self) -> usize {
        self.recycle_calls.get()
    }
}

impl RecyclableNode for TestNode {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn on_reuse(&self) {
        self.reuse_calls.set(self.reuse_calls.get() + 1);
    }

    fn on_recycle(&self) {
        self.recycle_calls.set(self.recycle_calls.get() + 1);
    }
}

/// In-memory list of `(key, template type)` pairs that logs every callback.
#[derive(Debug, Default)]
pub struct TestSource {
    items: Vec<(String, String)>,
    /// Truncates type results to this length to provoke a contract violation.
    pub truncate_types_to: Option<usize>,
    /// Nodes emitted per `build_node` call; anything but 1 breaks the contract.
    pub nodes_per_build: usize,
    /// `(from, to)` of every key fetch.
    pub fetch_log: Vec<(usize, usize)>,
    pub build_log: Vec<usize>,
    /// `(old key, index)` of every update.
    pub update_log: Vec<(String, usize)>,
    next_node_id: NodeId,
}

impl TestSource {
    pub fn new(items: Vec<(String, String)>) -> Self {
        Self {
            items,
            nodes_per_build: 1,
            next_node_id: 1,
            ..Self::default()
        }
    }

    /// `len` items keyed `k0..k{len-1}`, all of template `ttype`.
    pub fn uniform(len: usize, ttype: &str) -> Self {
        Self::new(
            (0..len)
                .map(|index| (format!("k{index}"), ttype.to_string()))
                .collect(),
        )
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(key, ttype)| (key.to_string(), ttype.to_string()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, index: usize, key: &str, ttype: &str) {
        self.items.insert(index, (key.to_string(), ttype.to_string()));
    }

    pub fn remove(&mut self, index: usize) -> (String, String) {
        self.items.remove(index)
    }

    pub fn set_ttype(&mut self, index: usize, ttype: &str) {
        self.items[index].1 = ttype.to_string();
    }

    fn slice(&self, from: usize, to: usize) -> &[(String, String)] {
        if from >= self.items.len() {
            return &[];
        }
        let end = to.min(self.items.len() - 1);
        &self.items[from..=end]
    }
}

impl ItemSource for TestSource {
    type Key = String;
    type TemplateType = String;
    type Node = TestNode;

    fn fetch_keys(&mut self, from: usize, to: usize) -> Vec<String> {
        self.fetch_log.push((from, to));
        self.slice(from, to)
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn fetch_types(&mut self, from: usize, to: usize) -> Vec<String> {
        let mut types: Vec<String> = self
            .slice(from, to)
            .iter()
            .map(|(_, ttype)| ttype.clone())
            .collect();
        if let Some(len) = self.truncate_types_to {
            types.truncate(len);
        }
        types
    }

    fn build_node(&mut self, index: usize, sink: &mut NodeSink<TestNode>) {
        self.build_log.push(index);
        for _ in 0..self.nodes_per_build {
            sink.emit(TestNode::new(self.next_node_id, index));
            self.next_node_id += 1;
        }
    }

    fn update_node(&mut self, old_key: &String, index: usize, node: &TestNode) {
        self.update_log.push((old_key.clone(), index));
        node.index.set(index);
    }
}
