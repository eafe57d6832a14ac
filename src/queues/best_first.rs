use super::NodeQueue;
use super::Prio;
use super::QueueContext;
use crate::search::node::NodePtr;
use std::collections::BinaryHeap;

/// Global heap on the node ordering: deepest frontier first, then the
/// tightest bound, then the lowest peak switch count.
pub struct BestFirst {
    heap: BinaryHeap<Prio>,
}

impl BestFirst {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }
}

impl Default for BestFirst {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeQueue for BestFirst {
    fn size(&self) -> usize {
        self.heap.len()
    }

    fn top(&mut self, _: &QueueContext) -> Option<NodePtr> {
        self.heap.peek().map(|prio| prio.0.clone())
    }

    fn pop(&mut self, _: &QueueContext) {
        self.heap.pop();
    }

    fn push(&mut self, nodes: Vec<NodePtr>, _: &QueueContext) {
        for node in nodes {
            self.heap.push(Prio(node));
        }
    }

    fn clear(&mut self) {
        self.heap.clear();
    }
}
