use crate::Control;
use crate::Deviation;
use crate::Seconds;
use std::cmp::Ordering;
use std::sync::Arc;

/// shared handle to a search node. the queue, the incumbent, and every
/// child hold one count; a node is reclaimed when the last one drops.
pub type NodePtr = Arc<Node>;

/// An immutable record of a partial assignment. A node owns the
/// contiguous interval range `[parent.depth, depth)` during which
/// `b_active` is the single active control, and carries the running
/// per-control bookkeeping accrued up to `depth`.
#[derive(Debug)]
pub struct Node {
    parent: Option<NodePtr>,
    seq: usize,
    b_active: Control,
    sigma: Vec<u32>,
    min_down_time: Vec<Seconds>,
    up_time: Vec<Seconds>,
    total_up_time: Vec<Seconds>,
    depth: usize,
    eta: Vec<Deviation>,
    lb: Deviation,
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        parent: Option<NodePtr>,
        seq: usize,
        b_active: Control,
        sigma: Vec<u32>,
        min_down_time: Vec<Seconds>,
        up_time: Vec<Seconds>,
        total_up_time: Vec<Seconds>,
        depth: usize,
        eta: Vec<Deviation>,
        lb: Deviation,
    ) -> Self {
        #[cfg(debug_assertions)]
        counters::CREATED.with(|c| c.set(c.get() + 1));
        Self {
            parent,
            seq,
            b_active,
            sigma,
            min_down_time,
            up_time,
            total_up_time,
            depth,
            eta,
            lb,
        }
    }

    pub fn parent(&self) -> Option<&NodePtr> {
        self.parent.as_ref()
    }
    pub fn seq(&self) -> usize {
        self.seq
    }
    pub fn b_active(&self) -> Control {
        self.b_active
    }
    pub fn sigma(&self) -> &[u32] {
        &self.sigma
    }
    pub fn min_down_time(&self) -> &[Seconds] {
        &self.min_down_time
    }
    pub fn up_time(&self) -> &[Seconds] {
        &self.up_time
    }
    pub fn total_up_time(&self) -> &[Seconds] {
        &self.total_up_time
    }
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn eta(&self) -> &[Deviation] {
        &self.eta
    }
    pub fn lb(&self) -> Deviation {
        self.lb
    }

    pub fn max_sigma(&self) -> u32 {
        self.sigma.iter().copied().max().unwrap_or(0)
    }

    /// queue ordering shared by every strategy. `Less` dispenses first:
    /// deeper frontiers, then tighter bounds, then lower peak switch
    /// counts.
    pub fn priority(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| self.lb.total_cmp(&other.lb))
            .then_with(|| self.max_sigma().cmp(&other.max_sigma()))
    }
}

/// Dropping the last handle to a leaf may release a parent chain as
/// long as the whole horizon. The chain is unlinked iteratively; a
/// recursive teardown would overflow the stack on deep instances.
impl Drop for Node {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        counters::DROPPED.with(|c| c.set(c.get() + 1));
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            match Arc::try_unwrap(node) {
                Ok(mut only) => parent = only.parent.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(debug_assertions)]
mod counters {
    use std::cell::Cell;

    thread_local! {
        pub static CREATED: Cell<usize> = const { Cell::new(0) };
        pub static DROPPED: Cell<usize> = const { Cell::new(0) };
    }
}

/// nodes created on this thread since startup (debug builds only).
#[cfg(debug_assertions)]
pub fn created() -> usize {
    counters::CREATED.with(|c| c.get())
}

/// nodes destroyed on this thread since startup (debug builds only).
#[cfg(debug_assertions)]
pub fn destroyed() -> usize {
    counters::DROPPED.with(|c| c.get())
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "N{} depth {} control {} lb {:.6}",
            self.seq, self.depth, self.b_active, self.lb
        )
    }
}
