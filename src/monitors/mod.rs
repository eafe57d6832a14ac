pub mod timer;
pub mod vbc;

use crate::search::node::Node;

/// Node lifecycle states reported to monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Active,
    Selected,
    Fathomed,
    Infeasible,
    Solved,
    Integer,
}

impl NodeState {
    /// display color codes, adopted from the tree-visualization format
    pub fn color(self) -> u32 {
        match self {
            Self::Active => 4,
            Self::Selected => 8,
            Self::Fathomed => 6,
            Self::Infeasible => 13,
            Self::Solved => 9,
            Self::Integer => 2,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::Active | Self::Selected => None,
            Self::Fathomed => Some("fathomed by upper bound"),
            Self::Infeasible => Some("no feasible children"),
            Self::Solved => Some("branching performed"),
            Self::Integer => Some("solution found"),
        }
    }

    /// whether the node is done for good
    pub fn terminal(self) -> bool {
        matches!(
            self,
            Self::Fathomed | Self::Infeasible | Self::Solved | Self::Integer
        )
    }
}

/// Optional observer of the search. Hooks fire in a fixed order:
/// `on_start_search` before any node event, `on_create` before the
/// node can be selected, `on_stop_search` exactly once at the end.
pub trait Monitor {
    fn on_start_search(&mut self) {}
    fn on_create(&mut self, _node: &Node) {}
    fn on_select(&mut self, _node: &Node) {}
    fn on_change(&mut self, _node: &Node, _state: NodeState) {}
    fn on_stop_search(&mut self) {}
}

/// Forwards every event to an ordered list of monitors.
#[derive(Default)]
pub struct MultiMonitor {
    monitors: Vec<Box<dyn Monitor>>,
}

impl MultiMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, monitor: Box<dyn Monitor>) {
        self.monitors.push(monitor);
    }
}

impl Monitor for MultiMonitor {
    fn on_start_search(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_start_search();
        }
    }
    fn on_create(&mut self, node: &Node) {
        for monitor in &mut self.monitors {
            monitor.on_create(node);
        }
    }
    fn on_select(&mut self, node: &Node) {
        for monitor in &mut self.monitors {
            monitor.on_select(node);
        }
    }
    fn on_change(&mut self, node: &Node, state: NodeState) {
        for monitor in &mut self.monitors {
            monitor.on_change(node, state);
        }
    }
    fn on_stop_search(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_stop_search();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct Tape(Arc<Mutex<Vec<&'static str>>>);

    impl Monitor for Tape {
        fn on_start_search(&mut self) {
            self.0.lock().unwrap().push("start");
        }
        fn on_stop_search(&mut self) {
            self.0.lock().unwrap().push("stop");
        }
    }

    #[test]
    fn composite_forwards_in_order() {
        let tape = Arc::new(Mutex::new(Vec::new()));
        let mut multi = MultiMonitor::new();
        multi.add(Box::new(Tape(tape.clone())));
        multi.add(Box::new(Tape(tape.clone())));
        multi.on_start_search();
        multi.on_stop_search();
        assert!(*tape.lock().unwrap() == ["start", "start", "stop", "stop"]);
    }

    #[test]
    fn states_carry_their_colors() {
        assert!(NodeState::Active.color() == 4);
        assert!(NodeState::Selected.color() == 8);
        assert!(NodeState::Fathomed.color() == 6);
        assert!(NodeState::Infeasible.color() == 13);
        assert!(NodeState::Solved.color() == 9);
        assert!(NodeState::Integer.color() == 2);
        assert!(!NodeState::Selected.terminal());
        assert!(NodeState::Integer.terminal());
    }
}
