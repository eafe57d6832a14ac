use super::NodeQueue;
use super::Prio;
use super::QueueContext;
use crate::search::node::NodePtr;
use std::collections::BinaryHeap;

/// Best-first heap with a diving preference: each branching step
/// installs one preferred child as the current top so the search keeps
/// descending, while the remaining siblings join the global heap.
/// Children already dominated by the incumbent at push time are parked
/// in a limbo list and dispensed first so the driver fathoms them
/// cheaply.
pub struct BestThenDive {
    curtop: Option<NodePtr>,
    limbo: Vec<NodePtr>,
    store: BinaryHeap<Prio>,
}

impl BestThenDive {
    pub fn new() -> Self {
        Self {
            curtop: None,
            limbo: Vec::new(),
            store: BinaryHeap::new(),
        }
    }

    /// diving preference: smallest bound, then lowest peak switch count.
    fn prefer(a: &NodePtr, b: &NodePtr) -> bool {
        match a.lb().total_cmp(&b.lb()) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => a.max_sigma() < b.max_sigma(),
        }
    }
}

impl Default for BestThenDive {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeQueue for BestThenDive {
    fn size(&self) -> usize {
        self.limbo.len() + self.store.len() + usize::from(self.curtop.is_some())
    }

    fn top(&mut self, _: &QueueContext) -> Option<NodePtr> {
        if let Some(parked) = self.limbo.last() {
            Some(parked.clone())
        } else if let Some(diving) = &self.curtop {
            Some(diving.clone())
        } else {
            self.store.peek().map(|prio| prio.0.clone())
        }
    }

    fn pop(&mut self, _: &QueueContext) {
        if self.limbo.pop().is_some() {
        } else if self.curtop.take().is_some() {
        } else {
            self.store.pop();
        }
    }

    fn push(&mut self, nodes: Vec<NodePtr>, ctx: &QueueContext) {
        if nodes.is_empty() {
            return;
        }
        if let Some(stashed) = self.curtop.take() {
            self.store.push(Prio(stashed));
        }
        let mut target: Option<usize> = None;
        for (k, node) in nodes.iter().enumerate() {
            if node.lb() < ctx.upper_bound
                && target.is_none_or(|best| Self::prefer(node, &nodes[best]))
            {
                target = Some(k);
            }
        }
        for (k, node) in nodes.into_iter().enumerate() {
            if Some(k) == target {
                self.curtop = Some(node);
            } else if node.lb() >= ctx.upper_bound {
                self.limbo.push(node);
            } else {
                self.store.push(Prio(node));
            }
        }
    }

    fn clear(&mut self) {
        self.curtop = None;
        self.limbo.clear();
        self.store.clear();
    }
}
