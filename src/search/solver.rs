use super::bounds::EtaTables;
use super::branching::Expansion;
use super::node::NodePtr;
use super::options::RunOptions;
use super::solution;
use super::status::Status;
use crate::monitors::vbc::VbcMonitor;
use crate::monitors::Monitor;
use crate::monitors::MultiMonitor;
use crate::monitors::NodeState;
use crate::problem::Problem;
use crate::queues;
use crate::queues::QueueContext;
use crate::Deviation;
use crate::Seconds;
use anyhow::Result;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// cloneable handle for requesting termination from another thread.
/// idempotent; the loop exits at the next iteration boundary.
#[derive(Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// The search driver. Owns the instance, the incumbent, and the upper
/// bound; each `run` instantiates the configured queue, seeds it from
/// the synthetic root, and loops select → fathom/accept/branch until
/// the queue drains or a limit trips. Early exits keep the best
/// incumbent found so far.
pub struct Solver {
    problem: Problem,
    tables: EtaTables,
    incumbent: Option<NodePtr>,
    ub: Deviation,
    status: Status,
    n_sol: usize,
    n_iter: u64,
    runtime: Seconds,
    stop: Arc<AtomicBool>,
}

impl From<Problem> for Solver {
    fn from(problem: Problem) -> Self {
        let tables = EtaTables::from(&problem);
        let ub = tables.trivial_bound();
        Self {
            problem,
            tables,
            incumbent: None,
            ub,
            status: Status::Running,
            n_sol: 0,
            n_iter: 0,
            runtime: 0.0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Solver {
    pub fn new(problem: Problem) -> Self {
        Self::from(problem)
    }

    /// execute the search with the configured monitors.
    pub fn run(&mut self, options: &RunOptions) -> Result<Status> {
        let mut monitor = self.monitor(options);
        self.search(options, &mut monitor)
    }

    /// execute the search with an additional observer attached.
    pub fn run_with(&mut self, options: &RunOptions, extra: Box<dyn Monitor>) -> Result<Status> {
        let mut monitor = self.monitor(options);
        monitor.add(extra);
        self.search(options, &mut monitor)
    }

    fn monitor(&self, options: &RunOptions) -> MultiMonitor {
        let mut monitor = MultiMonitor::new();
        if let Some(path) = &options.vbc_file {
            monitor.add(Box::new(VbcMonitor::new(
                path,
                options.vbc_timing,
                options.vbc_time_dilation,
            )));
        }
        monitor
    }

    fn search(&mut self, options: &RunOptions, monitor: &mut MultiMonitor) -> Result<Status> {
        options.validate()?;
        let mut queue = queues::create(options.strategy.as_deref())?;
        self.stop.store(false, Ordering::Relaxed);
        if !options.warm_start || self.incumbent.is_none() {
            self.incumbent = None;
            self.ub = self.tables.trivial_bound();
        }
        self.status = Status::Running;
        self.n_sol = 0;
        self.n_iter = 0;
        let mut seq = 0usize;
        let start = Instant::now();
        if options.verbosity >= 1 {
            log::info!(
                "searching {} controls over {} intervals with strategy '{}'",
                self.problem.n_c(),
                self.problem.n_t(),
                options
                    .strategy
                    .clone()
                    .unwrap_or_else(queues::default_name),
            );
        }

        let expansion = Expansion::new(&self.problem, &self.tables);
        monitor.on_start_search();
        let roots = expansion.root_children(self.ub, &mut seq);
        for child in &roots.children {
            monitor.on_create(child);
        }
        if !roots.children.is_empty() {
            let ctx = QueueContext {
                problem: &self.problem,
                upper_bound: self.ub,
                num_solutions: self.n_sol,
            };
            queue.push(roots.children, &ctx);
        }

        let status = loop {
            if self.stop.load(Ordering::Relaxed) {
                break Status::UserInterrupt;
            }
            if options.max_iter.is_some_and(|cap| self.n_iter >= cap) {
                break Status::IterLimit;
            }
            if options
                .max_cpu_time
                .is_some_and(|cap| start.elapsed().as_secs_f64() >= cap)
            {
                break Status::TimeLimit;
            }
            let ctx = QueueContext {
                problem: &self.problem,
                upper_bound: self.ub,
                num_solutions: self.n_sol,
            };
            let Some(node) = queue.top(&ctx) else {
                break Status::Optimal;
            };
            queue.pop(&ctx);
            self.n_iter += 1;
            monitor.on_select(&node);
            if node.lb() >= self.ub {
                monitor.on_change(&node, NodeState::Fathomed);
                continue;
            }
            if node.depth() == self.problem.n_t() {
                self.ub = node.lb();
                self.incumbent = Some(node.clone());
                self.n_sol += 1;
                if options.verbosity >= 2 {
                    log::info!(
                        "incumbent {} with deviation {:.6} at iteration {}",
                        self.n_sol,
                        self.ub,
                        self.n_iter,
                    );
                }
                monitor.on_change(&node, NodeState::Integer);
                continue;
            }
            let branching = expansion.children(&node, self.ub, &mut seq);
            for child in &branching.children {
                monitor.on_create(child);
            }
            let state = match (branching.children.is_empty(), branching.admissible) {
                (true, 0) => NodeState::Infeasible,
                (true, _) => NodeState::Fathomed,
                (false, _) => NodeState::Solved,
            };
            if !branching.children.is_empty() {
                let ctx = QueueContext {
                    problem: &self.problem,
                    upper_bound: self.ub,
                    num_solutions: self.n_sol,
                };
                queue.push(branching.children, &ctx);
            }
            monitor.on_change(&node, state);
        };

        queue.clear();
        monitor.on_stop_search();
        self.runtime = start.elapsed().as_secs_f64();
        self.status = status;
        if options.verbosity >= 1 {
            log::info!(
                "{} after {} iterations in {:.3}s, deviation {:.6}, {} incumbents",
                status,
                self.n_iter,
                self.runtime,
                self.ub,
                self.n_sol,
            );
        }
        Ok(status)
    }

    /// request early termination; callable from any thread.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.stop.clone())
    }

    /// best attained maximum absolute accumulated deviation.
    pub fn eta(&self) -> Deviation {
        self.ub
    }

    /// binary trajectory of the incumbent, all zero without one.
    pub fn b_bin(&self) -> Vec<Vec<u8>> {
        solution::reconstruct(&self.problem, self.incumbent.as_ref())
    }

    pub fn status(&self) -> Status {
        self.status
    }
    pub fn num_solutions(&self) -> usize {
        self.n_sol
    }
    pub fn num_iterations(&self) -> u64 {
        self.n_iter
    }
    pub fn runtime(&self) -> Seconds {
        self.runtime
    }
    pub fn incumbent(&self) -> Option<&NodePtr> {
        self.incumbent.as_ref()
    }
    pub fn problem(&self) -> &Problem {
        &self.problem
    }
    pub fn n_c(&self) -> usize {
        self.problem.n_c()
    }
    pub fn n_t(&self) -> usize {
        self.problem.n_t()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::node::Node;
    use crate::Arbitrary;
    use std::sync::Mutex;

    fn rounding_problem() -> Problem {
        Problem::new(
            vec![1.0; 4],
            vec![vec![0.4, 0.6, 0.4, 0.6], vec![0.6, 0.4, 0.6, 0.4]],
        )
        .unwrap()
    }

    fn sticking_problem() -> Problem {
        let mut problem = Problem::new(
            vec![1.0; 4],
            vec![vec![0.6, 0.6, 0.4, 0.4], vec![0.4, 0.4, 0.6, 0.6]],
        )
        .unwrap();
        problem.set_n_max_switches(vec![1, 1]).unwrap();
        problem
    }

    fn wide_problem() -> Problem {
        let n_c = 3;
        let n_t = 20;
        let mut b_rel = vec![vec![0.0; n_t]; n_c];
        for t in 0..n_t {
            let weights = (0..n_c)
                .map(|i| 1.0 + ((i * 7 + t * 3) % 5) as f64)
                .collect::<Vec<f64>>();
            let sum = weights.iter().sum::<f64>();
            for (i, w) in weights.iter().enumerate() {
                b_rel[i][t] = w / sum;
            }
        }
        Problem::new(vec![1.0; n_t], b_rel).unwrap()
    }

    fn solve(problem: Problem, strategy: &str) -> Solver {
        let mut solver = Solver::new(problem);
        let options = RunOptions {
            strategy: Some(strategy.to_string()),
            verbosity: 0,
            ..RunOptions::default()
        };
        solver.run(&options).unwrap();
        solver
    }

    /// smallest attainable running deviation over assignments honoring
    /// validity and adjacency, evaluated interval by interval. only
    /// sound while switch budgets stay unspent.
    fn brute_force(problem: &Problem) -> f64 {
        fn descend(
            problem: &Problem,
            t: usize,
            prev: usize,
            eta: &mut Vec<f64>,
            peak: f64,
            best: &mut f64,
        ) {
            if t == problem.n_t() {
                *best = best.min(peak);
                return;
            }
            for c in 0..problem.n_c() {
                if !problem.valid(c, t) {
                    continue;
                }
                if prev < problem.n_c() && !problem.adjacent(c, prev) {
                    continue;
                }
                let mut local = peak;
                for i in 0..problem.n_c() {
                    let active = if i == c { 1.0 } else { 0.0 };
                    eta[i] += problem.dt()[t] * (problem.b_rel()[i][t] - active);
                    local = local.max(eta[i].abs());
                }
                descend(problem, t + 1, c, eta, local, best);
                for i in 0..problem.n_c() {
                    let active = if i == c { 1.0 } else { 0.0 };
                    eta[i] -= problem.dt()[t] * (problem.b_rel()[i][t] - active);
                }
            }
        }
        let mut best = f64::INFINITY;
        let mut eta = vec![0.0; problem.n_c()];
        descend(
            problem,
            0,
            problem.b_active_pre(),
            &mut eta,
            0.0,
            &mut best,
        );
        best
    }

    /// check the combinatorial promises of an accepted assignment.
    fn assert_feasible(problem: &Problem, b_bin: &[Vec<u8>]) {
        for t in 0..problem.n_t() {
            let active = (0..problem.n_c()).filter(|i| b_bin[*i][t] == 1).count();
            assert!(active == 1, "interval {} has {} active controls", t, active);
            for i in 0..problem.n_c() {
                assert!(problem.valid(i, t) || b_bin[i][t] == 0);
            }
        }
        for t in 1..problem.n_t() {
            let prev = (0..problem.n_c()).find(|i| b_bin[*i][t - 1] == 1).unwrap();
            let next = (0..problem.n_c()).find(|i| b_bin[*i][t] == 1).unwrap();
            assert!(problem.adjacent(next, prev));
        }
        for i in 0..problem.n_c() {
            let switches = (1..problem.n_t())
                .filter(|t| b_bin[i][*t] != b_bin[i][*t - 1])
                .count();
            assert!(switches as u32 <= problem.n_max_switches()[i]);
            // dwell times, measured in grid widths
            let mut t = 0;
            while t < problem.n_t() {
                if b_bin[i][t] == 1 {
                    let begin = t;
                    while t < problem.n_t() && b_bin[i][t] == 1 {
                        t += 1;
                    }
                    let span = problem.dt()[begin..t].iter().sum::<f64>();
                    if t < problem.n_t() {
                        assert!(span + 1e-9 >= problem.min_up_time()[i]);
                    }
                } else {
                    let begin = t;
                    while t < problem.n_t() && b_bin[i][t] == 0 {
                        t += 1;
                    }
                    let span = problem.dt()[begin..t].iter().sum::<f64>();
                    if begin > 0 && t < problem.n_t() {
                        assert!(span + 1e-9 >= problem.min_down_time()[i]);
                    }
                }
            }
        }
    }

    fn chain_len(solver: &Solver) -> usize {
        let mut len = 0;
        let mut cursor = solver.incumbent();
        while let Some(node) = cursor {
            len += 1;
            cursor = node.parent();
        }
        len
    }

    #[test]
    fn pure_rounding_alternates_controls() {
        let solver = solve(rounding_problem(), "dfs");
        assert!(solver.status() == Status::Optimal);
        assert!((solver.eta() - 0.4).abs() < 1e-9);
        let b_bin = solver.b_bin();
        assert!(b_bin[0] == [0, 1, 0, 1]);
        assert!(b_bin[1] == [1, 0, 1, 0]);
        assert_feasible(solver.problem(), &b_bin);
    }

    #[test]
    fn switch_budget_forces_sticking() {
        let solver = solve(sticking_problem(), "bfs");
        assert!(solver.status() == Status::Optimal);
        assert!((solver.eta() - 0.8).abs() < 1e-9);
        let b_bin = solver.b_bin();
        assert!(b_bin[0] == [1, 1, 0, 0]);
        assert!(b_bin[1] == [0, 0, 1, 1]);
        assert_feasible(solver.problem(), &b_bin);
    }

    #[test]
    fn minimum_up_time_pairs_intervals() {
        let mut problem = rounding_problem();
        problem.set_min_up_time(vec![2.0, 2.0]).unwrap();
        let solver = solve(problem, "dfs");
        assert!(solver.status() == Status::Optimal);
        assert!((solver.eta() - 1.0).abs() < 1e-9);
        let b_bin = solver.b_bin();
        let mirrored = b_bin[0] == [1, 1, 0, 0] && b_bin[1] == [0, 0, 1, 1];
        let straight = b_bin[0] == [0, 0, 1, 1] && b_bin[1] == [1, 1, 0, 0];
        assert!(mirrored || straight);
        assert_feasible(solver.problem(), &b_bin);
    }

    #[test]
    fn forbidden_interval_excludes_the_control() {
        let mut problem = rounding_problem();
        problem
            .set_valid(vec![vec![true, false, true, true], vec![true; 4]])
            .unwrap();
        let expected = brute_force(&problem);
        let solver = solve(problem, "bfs");
        assert!(solver.status() == Status::Optimal);
        assert!((solver.eta() - expected).abs() < 1e-9);
        let b_bin = solver.b_bin();
        assert!(b_bin[0][1] == 0);
        assert_feasible(solver.problem(), &b_bin);
    }

    #[test]
    fn adjacency_interposes_a_control() {
        let mut problem = Problem::new(
            vec![1.0; 3],
            vec![
                vec![0.8, 0.1, 0.1],
                vec![0.1, 0.2, 0.1],
                vec![0.1, 0.7, 0.8],
            ],
        )
        .unwrap();
        problem
            .set_adjacencies(vec![
                vec![true, true, true],
                vec![true, true, true],
                vec![false, true, true],
            ])
            .unwrap();
        let expected = brute_force(&problem);
        let solver = solve(problem, "bfs");
        assert!(solver.status() == Status::Optimal);
        assert!((solver.eta() - expected).abs() < 1e-9);
        assert_feasible(solver.problem(), &solver.b_bin());
    }

    #[test]
    fn iteration_cap_returns_the_best_so_far() {
        let mut solver = Solver::new(wide_problem());
        let options = RunOptions {
            max_iter: Some(10),
            verbosity: 0,
            ..RunOptions::default()
        };
        solver.run(&options).unwrap();
        assert!(solver.status() == Status::IterLimit);
        assert!(solver.num_iterations() == 10);
        let b_bin = solver.b_bin();
        for t in 0..solver.n_t() {
            let active = (0..solver.n_c()).filter(|i| b_bin[*i][t] == 1).count();
            let expected = usize::from(solver.incumbent().is_some());
            assert!(active == expected);
        }
    }

    #[test]
    fn strategies_agree_on_the_optimum() {
        for _ in 0..3 {
            let problem = Problem::random();
            let reference = solve(problem.clone(), "dfs").eta();
            for strategy in ["bfs", "btd", "dbt"] {
                let eta = solve(problem.clone(), strategy).eta();
                assert!(
                    (eta - reference).abs() < 1e-9,
                    "strategy {} found {} instead of {}",
                    strategy,
                    eta,
                    reference,
                );
            }
        }
    }

    #[test]
    fn binary_input_round_trips_to_itself() {
        let rows = vec![vec![1.0, 1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0, 1.0]];
        let mut problem = Problem::new(vec![1.0; 4], rows.clone()).unwrap();
        problem.set_n_max_switches(vec![1, 1]).unwrap();
        let solver = solve(problem, "dfs");
        assert!(solver.status() == Status::Optimal);
        assert!(solver.eta() == 0.0);
        let b_bin = solver.b_bin();
        for (i, row) in rows.iter().enumerate() {
            for (t, b) in row.iter().enumerate() {
                assert!(b_bin[i][t] == *b as u8);
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        integers: std::sync::Arc<Mutex<Vec<f64>>>,
        order: std::sync::Arc<Mutex<Vec<&'static str>>>,
    }

    impl Monitor for Recorder {
        fn on_start_search(&mut self) {
            self.order.lock().unwrap().push("start");
        }
        fn on_create(&mut self, _: &Node) {
            self.order.lock().unwrap().push("create");
        }
        fn on_select(&mut self, _: &Node) {
            self.order.lock().unwrap().push("select");
        }
        fn on_change(&mut self, node: &Node, state: NodeState) {
            if state == NodeState::Integer {
                self.integers.lock().unwrap().push(node.lb());
            }
        }
        fn on_stop_search(&mut self) {
            self.order.lock().unwrap().push("stop");
        }
    }

    #[test]
    fn bound_shrinks_with_every_incumbent() {
        let recorder = Recorder::default();
        let mut solver = Solver::new(wide_problem());
        let options = RunOptions {
            strategy: Some("dfs".to_string()),
            max_iter: Some(2_000),
            verbosity: 0,
            ..RunOptions::default()
        };
        solver
            .run_with(&options, Box::new(recorder.clone()))
            .unwrap();
        let integers = recorder.integers.lock().unwrap();
        assert!(!integers.is_empty());
        for pair in integers.windows(2) {
            assert!(pair[1] < pair[0]);
        }
        let order = recorder.order.lock().unwrap();
        assert!(order.first() == Some(&"start"));
        assert!(order.last() == Some(&"stop"));
        assert!(order.iter().filter(|e| **e == "stop").count() == 1);
    }

    #[test]
    fn warm_start_retains_the_incumbent() {
        let mut solver = Solver::new(rounding_problem());
        let cold = RunOptions {
            verbosity: 0,
            ..RunOptions::default()
        };
        solver.run(&cold).unwrap();
        assert!((solver.eta() - 0.4).abs() < 1e-9);
        let warm = RunOptions {
            warm_start: true,
            verbosity: 0,
            ..RunOptions::default()
        };
        solver.run(&warm).unwrap();
        assert!(solver.status() == Status::Optimal);
        assert!(solver.num_solutions() == 0);
        assert!((solver.eta() - 0.4).abs() < 1e-9);
        assert!(solver.b_bin()[0] == [0, 1, 0, 1]);
    }

    struct Interrupter(StopHandle);

    impl Monitor for Interrupter {
        fn on_select(&mut self, _: &Node) {
            self.0.stop();
        }
    }

    #[test]
    fn stop_is_observed_at_the_next_boundary() {
        let mut solver = Solver::new(wide_problem());
        let handle = solver.stop_handle();
        let options = RunOptions {
            verbosity: 0,
            ..RunOptions::default()
        };
        solver
            .run_with(&options, Box::new(Interrupter(handle)))
            .unwrap();
        assert!(solver.status() == Status::UserInterrupt);
        assert!(solver.num_iterations() == 1);
    }

    #[test]
    fn time_cap_trips_before_any_work() {
        let mut solver = Solver::new(wide_problem());
        let options = RunOptions {
            max_cpu_time: Some(1e-9),
            verbosity: 0,
            ..RunOptions::default()
        };
        solver.run(&options).unwrap();
        assert!(solver.status() == Status::TimeLimit);
    }

    #[test]
    fn unknown_strategy_fails_before_searching() {
        let mut solver = Solver::new(rounding_problem());
        let options = RunOptions {
            strategy: Some("annealing".to_string()),
            verbosity: 0,
            ..RunOptions::default()
        };
        assert!(solver.run(&options).is_err());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn nodes_balance_once_the_solver_drops() {
        use crate::search::node;
        let created = node::created();
        let destroyed = node::destroyed();
        {
            let solver = solve(rounding_problem(), "bfs");
            let live = chain_len(&solver);
            assert!(live > 0);
            assert!(node::created() - created == node::destroyed() - destroyed + live);
        }
        assert!(node::created() - created == node::destroyed() - destroyed);
    }
}

