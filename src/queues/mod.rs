pub mod best_first;
pub mod best_then_dive;
pub mod depth_first;
pub mod dynamic_backtracking;

use crate::problem::Problem;
use crate::search::node::NodePtr;
use crate::Deviation;
use anyhow::bail;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::OnceLock;

/// What a strategy is allowed to know about the running search when it
/// rearranges itself: the instance, the incumbent bound, and how many
/// incumbents have been accepted.
pub struct QueueContext<'a> {
    pub problem: &'a Problem,
    pub upper_bound: Deviation,
    pub num_solutions: usize,
}

/// A pluggable container dispensing the next node to expand. `push`
/// ingests a whole sibling batch at once so a strategy can rearrange
/// its internals a single time per branching step. Bound shrinkage
/// never reorders a queue; stale nodes are fathomed lazily at the
/// driver.
pub trait NodeQueue {
    fn size(&self) -> usize;
    /// the node the current policy would dispense next
    fn top(&mut self, ctx: &QueueContext) -> Option<NodePtr>;
    fn pop(&mut self, ctx: &QueueContext);
    fn push(&mut self, nodes: Vec<NodePtr>, ctx: &QueueContext);
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// max-heap wrapper dispensing the minimum of the node ordering.
pub(crate) struct Prio(pub NodePtr);

impl Ord for Prio {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.priority(&self.0)
    }
}
impl PartialOrd for Prio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Prio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Prio {}

/// process-wide strategy registry

pub type QueueFactory = fn() -> Box<dyn NodeQueue>;

struct Registry {
    factories: BTreeMap<String, QueueFactory>,
    default: String,
}

impl Registry {
    /// built-in strategies; the first registration is the default.
    fn builtin() -> Self {
        let mut registry = Self {
            factories: BTreeMap::new(),
            default: String::new(),
        };
        registry.insert("dfs", || Box::new(depth_first::DepthFirst::new()), false);
        registry.insert("bfs", || Box::new(best_first::BestFirst::new()), false);
        registry.insert("btd", || Box::new(best_then_dive::BestThenDive::new()), false);
        registry.insert(
            "dbt",
            || Box::new(dynamic_backtracking::DynamicBacktracking::new()),
            false,
        );
        registry
    }

    fn insert(&mut self, name: &str, factory: QueueFactory, make_default: bool) {
        self.factories.insert(name.to_string(), factory);
        if make_default || self.default.is_empty() {
            self.default = name.to_string();
        }
    }
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Registry::builtin()))
}

/// register an additional strategy under a short name.
pub fn register(name: &str, factory: QueueFactory, make_default: bool) {
    registry()
        .lock()
        .expect("queue registry lock")
        .insert(name, factory, make_default);
}

/// instantiate a strategy by name; `None` takes the default.
pub fn create(name: Option<&str>) -> Result<Box<dyn NodeQueue>> {
    let registry = registry().lock().expect("queue registry lock");
    let name = name.unwrap_or(&registry.default);
    match registry.factories.get(name) {
        Some(factory) => Ok(factory()),
        None => bail!(
            "unknown search strategy '{}', registered: {}",
            name,
            registry.factories.keys().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// name the default strategy resolves to.
pub fn default_name() -> String {
    registry()
        .lock()
        .expect("queue registry lock")
        .default
        .clone()
}

/// sorted names of all registered strategies.
pub fn names() -> Vec<String> {
    registry()
        .lock()
        .expect("queue registry lock")
        .factories
        .keys()
        .cloned()
        .collect()
}
