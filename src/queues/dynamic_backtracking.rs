use super::NodeQueue;
use super::Prio;
use super::QueueContext;
use crate::search::node::NodePtr;
use crate::Deviation;
use std::collections::BinaryHeap;
use std::collections::VecDeque;

/// incumbents after which the cutoff reaches the global lower bound
const SATURATION_SOLUTIONS: f64 = 10.0;
/// queue size at which backlog pressure relaxes the cutoff fully
const PRESSURE_NODES: f64 = 100_000.0;

/// Depth-first stack backed by a best-first heap. A node stays on the
/// stack only while its bound is below an adaptive cutoff
/// `glob_lb + beta * (ub - glob_lb)`; anything above migrates to the
/// heap. Until a first incumbent exists `beta` is 1 and the policy is a
/// pure dive; each further incumbent shrinks `beta` toward 0, with
/// queue pressure pushing back. `min_beta` records the tightest cutoff
/// reached so the policy never becomes more depth-first again.
pub struct DynamicBacktracking {
    glob_lb: Deviation,
    min_beta: f64,
    heap: BinaryHeap<Prio>,
    stack: VecDeque<NodePtr>,
}

impl DynamicBacktracking {
    pub fn new() -> Self {
        Self {
            glob_lb: f64::INFINITY,
            min_beta: 1.0,
            heap: BinaryHeap::new(),
            stack: VecDeque::new(),
        }
    }

    fn cutoff(&mut self, ctx: &QueueContext) -> Deviation {
        if ctx.num_solutions == 0 {
            self.min_beta = 1.0;
            return ctx.upper_bound;
        }
        let mut beta = 1.0 - (ctx.num_solutions as f64 / SATURATION_SOLUTIONS).min(1.0);
        let pressure = (1.0 - self.min_beta) * (self.size() as f64 / PRESSURE_NODES);
        beta += pressure.min(1.0 - beta);
        if beta < self.min_beta {
            self.min_beta = beta;
        }
        self.glob_lb + beta * (ctx.upper_bound - self.glob_lb)
    }

    /// migrate stack nodes above the cutoff to the heap; a node already
    /// dominated by the incumbent stays put so the driver fathoms it
    /// on the next pop.
    fn rearrange(&mut self, ctx: &QueueContext) {
        let cutoff = self.cutoff(ctx);
        loop {
            let migrate = match self.stack.front() {
                Some(front) => front.lb() <= ctx.upper_bound && front.lb() > cutoff,
                None => break,
            };
            if !migrate {
                break;
            }
            let migrated = self.stack.pop_front().expect("front exists");
            self.heap.push(Prio(migrated));
        }
    }
}

impl Default for DynamicBacktracking {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeQueue for DynamicBacktracking {
    fn size(&self) -> usize {
        self.heap.len() + self.stack.len()
    }

    fn top(&mut self, ctx: &QueueContext) -> Option<NodePtr> {
        self.rearrange(ctx);
        if let Some(front) = self.stack.front() {
            Some(front.clone())
        } else {
            self.heap.peek().map(|prio| prio.0.clone())
        }
    }

    fn pop(&mut self, ctx: &QueueContext) {
        let node = match self.stack.pop_front() {
            Some(front) => Some(front),
            None => self.heap.pop().map(|prio| prio.0),
        };
        let Some(node) = node else { return };
        // the departing node may have carried the global lower bound
        if node.lb() == self.glob_lb {
            let mut glob_lb = ctx.upper_bound;
            for waiting in &self.stack {
                glob_lb = glob_lb.min(waiting.lb());
            }
            if let Some(best) = self.heap.peek() {
                glob_lb = glob_lb.min(best.0.lb());
            }
            self.glob_lb = glob_lb;
        }
    }

    fn push(&mut self, mut nodes: Vec<NodePtr>, _: &QueueContext) {
        nodes.sort_by(|a, b| b.priority(a));
        for node in nodes {
            if node.lb() < self.glob_lb {
                self.glob_lb = node.lb();
            }
            self.stack.push_front(node);
        }
    }

    fn clear(&mut self) {
        self.glob_lb = f64::INFINITY;
        self.min_beta = 1.0;
        self.heap.clear();
        self.stack.clear();
    }
}
