use super::bounds::EtaTables;
use super::node::Node;
use super::node::NodePtr;
use crate::problem::Problem;
use crate::Control;
use crate::Deviation;
use crate::Seconds;
use std::sync::Arc;

/// Branching kernel: pure functions from a parent state and a tentative
/// child control to either a rejection or a fully extended child node.
/// A child owns at least one interval and keeps absorbing intervals
/// until the minimum up time of its control is satisfied; exhausting a
/// switch budget closes the remainder of the horizon in one step.
pub struct Expansion<'a> {
    problem: &'a Problem,
    tables: &'a EtaTables,
}

/// outcome of one expansion step, per candidate control.
enum Attempt {
    /// rejected by a feasibility rule, no node built
    Forbidden,
    /// feasible but bounded out by the incumbent
    Fathomed,
    Child(NodePtr),
}

/// the surviving children of one branching step, plus how many
/// candidates passed the feasibility rules before bounding.
pub struct Branching {
    pub children: Vec<NodePtr>,
    pub admissible: usize,
}

/// parent state as seen by the kernel; the root step borrows synthetic
/// zero vectors instead of a node.
struct View<'a> {
    b_active: Control,
    sigma: &'a [u32],
    min_down_time: &'a [Seconds],
    up_time: &'a [Seconds],
    total_up_time: &'a [Seconds],
    depth: usize,
    eta: &'a [Deviation],
    lb: Deviation,
}

/// result of the minimum-up-time lookahead walk.
struct Walk {
    depth: usize,
    span: Seconds,
}

impl<'a> View<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            b_active: node.b_active(),
            sigma: node.sigma(),
            min_down_time: node.min_down_time(),
            up_time: node.up_time(),
            total_up_time: node.total_up_time(),
            depth: node.depth(),
            eta: node.eta(),
            lb: node.lb(),
        }
    }
}

impl<'a> Expansion<'a> {
    pub fn new(problem: &'a Problem, tables: &'a EtaTables) -> Self {
        Self { problem, tables }
    }

    /// children of the synthetic root: same kernel, with the pre-horizon
    /// control as predecessor and all counters at zero.
    pub fn root_children(&self, ub: Deviation, seq: &mut usize) -> Branching {
        let n_c = self.problem.n_c();
        let zeros_u = vec![0u32; n_c];
        let zeros_f = vec![0.0; n_c];
        let view = View {
            b_active: self.problem.b_active_pre(),
            sigma: &zeros_u,
            min_down_time: self.problem.min_down_time_pre(),
            up_time: &zeros_f,
            total_up_time: &zeros_f,
            depth: 0,
            eta: &zeros_f,
            lb: 0.0,
        };
        self.branch(&view, None, ub, seq)
    }

    /// children of a queue node.
    pub fn children(&self, parent: &NodePtr, ub: Deviation, seq: &mut usize) -> Branching {
        self.branch(&View::from(parent.as_ref()), Some(parent), ub, seq)
    }

    fn branch(
        &self,
        view: &View,
        parent: Option<&NodePtr>,
        ub: Deviation,
        seq: &mut usize,
    ) -> Branching {
        let mut children = Vec::with_capacity(self.problem.n_c());
        let mut admissible = 0;
        for c in 0..self.problem.n_c() {
            match self.attempt(view, parent, c, ub, seq) {
                Attempt::Forbidden => {}
                Attempt::Fathomed => admissible += 1,
                Attempt::Child(child) => {
                    admissible += 1;
                    children.push(child);
                }
            }
        }
        Branching { children, admissible }
    }

    fn attempt(
        &self,
        view: &View,
        parent: Option<&NodePtr>,
        c: Control,
        ub: Deviation,
        seq: &mut usize,
    ) -> Attempt {
        let p = self.problem;
        let caps = p.n_max_switches();
        if view.sigma[c] >= caps[c] {
            return Attempt::Forbidden;
        }
        if view.b_active < p.n_c() && view.sigma[view.b_active] >= caps[view.b_active] {
            return Attempt::Forbidden;
        }
        if view.min_down_time[c] > 0.0 {
            return Attempt::Forbidden;
        }
        if view.b_active < p.n_c() && !p.adjacent(c, view.b_active) {
            return Attempt::Forbidden;
        }
        let Some(walk) = self.lookahead(view, c) else {
            return Attempt::Forbidden;
        };

        let n_c = p.n_c();
        let same = view.b_active == c;
        let mut sigma = view.sigma.to_vec();
        let mut min_down_time = view.min_down_time.to_vec();
        let mut up_time = view.up_time.to_vec();
        let mut total_up_time = view.total_up_time.to_vec();
        let mut eta = view.eta.to_vec();
        if !same {
            up_time[c] = 0.0;
        }
        for t in view.depth..walk.depth {
            let dt = p.dt()[t];
            for i in 0..n_c {
                if sigma[i] < caps[i] {
                    let active = if i == c { 1.0 } else { 0.0 };
                    eta[i] += dt * (p.b_rel()[i][t] - active);
                }
                min_down_time[i] = (min_down_time[i] - dt).max(0.0);
            }
            up_time[c] += dt;
            total_up_time[c] += dt;
        }

        let mut depth = walk.depth;
        if !same && view.b_active < n_c {
            let prev = view.b_active;
            sigma[prev] += 1;
            debug_assert!(sigma[prev] <= caps[prev], "switch budget of {prev} exceeded");
            min_down_time[prev] = (p.min_down_time()[prev] - walk.span).max(0.0);
            up_time[prev] = 0.0;
            if sigma[prev] == caps[prev] {
                eta[prev] += self.tables.off(prev, depth);
            }
            sigma[c] += 1;
            debug_assert!(sigma[c] <= caps[c], "switch budget of {c} exceeded");
            if sigma[c] == caps[c] {
                eta[c] += self.tables.on(c, depth);
                for i in (0..n_c).filter(|i| *i != c) {
                    if sigma[i] < caps[i] {
                        eta[i] += self.tables.off(i, depth);
                    }
                }
                depth = p.n_t();
            }
        }

        let lb = eta.iter().fold(view.lb, |lb, e| lb.max(e.abs()));
        if lb >= ub {
            return Attempt::Fathomed;
        }
        let node = Node::new(
            parent.cloned(),
            *seq,
            c,
            sigma,
            min_down_time,
            up_time,
            total_up_time,
            depth,
            eta,
            lb,
        );
        *seq += 1;
        Attempt::Child(Arc::new(node))
    }

    /// Walk forward from the parent's depth until the minimum up time
    /// of `c` is fulfilled or the horizon ends, vetting every touched
    /// interval. Continuing the current activation seeds the
    /// accumulator so exactly one interval is absorbed.
    fn lookahead(&self, view: &View, c: Control) -> Option<Walk> {
        let p = self.problem;
        let same = view.b_active == c;
        let mut fulfilled = if same { p.min_up_time()[c] } else { 0.0 };
        let mut up_time = if same { view.up_time[c] } else { 0.0 };
        let mut total_up_time = view.total_up_time[c];
        let mut depth = view.depth;
        let mut span = 0.0;
        loop {
            if !p.valid(c, depth) {
                return None;
            }
            let dt = p.dt()[depth];
            fulfilled += dt;
            up_time += dt;
            total_up_time += dt;
            span += dt;
            depth += 1;
            if fulfilled >= p.min_up_time()[c] || depth == p.n_t() {
                break;
            }
        }
        if up_time > p.max_up_time()[c] || total_up_time > p.total_max_up_time()[c] {
            return None;
        }
        Some(Walk { depth, span })
    }
}
