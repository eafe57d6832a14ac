use crate::problem::Problem;
use crate::Deviation;

/// Suffix closure tables for the deviation bookkeeping. Once a control
/// has spent its switch budget its remaining trajectory is fixed, so
/// the rest of its deviation integral is known in closed form:
///
/// - `off[i][t]` accrues if control `i` is never active from `t` on,
/// - `on[i][t]` accrues if control `i` is active in every remaining
///   interval.
///
/// Both tables carry a zero sentinel at `t == n_t` so closures at the
/// end of the horizon need no special case.
#[derive(Debug, Clone)]
pub struct EtaTables {
    off: Vec<Vec<Deviation>>,
    on: Vec<Vec<Deviation>>,
    ub: Deviation,
}

impl From<&Problem> for EtaTables {
    fn from(problem: &Problem) -> Self {
        let n_c = problem.n_c();
        let n_t = problem.n_t();
        let dt = problem.dt();
        let b_rel = problem.b_rel();
        let mut off = vec![vec![0.0; n_t + 1]; n_c];
        let mut on = vec![vec![0.0; n_t + 1]; n_c];
        for i in 0..n_c {
            for t in (0..n_t).rev() {
                off[i][t] = off[i][t + 1] + dt[t] * b_rel[i][t];
                on[i][t] = on[i][t + 1] + dt[t] * (b_rel[i][t] - 1.0);
            }
        }
        Self {
            off,
            on,
            ub: problem.horizon(),
        }
    }
}

impl EtaTables {
    pub fn off(&self, i: usize, t: usize) -> Deviation {
        self.off[i][t]
    }
    pub fn on(&self, i: usize, t: usize) -> Deviation {
        self.on[i][t]
    }

    /// the trivially attainable upper bound, sum of all widths.
    pub fn trivial_bound(&self) -> Deviation {
        self.ub
    }
}
