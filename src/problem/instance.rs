use crate::Control;
use crate::Fraction;
use crate::Seconds;
use anyhow::bail;
use anyhow::Result;

/// A read-only rounding instance. `dt` holds the widths of the time
/// intervals and `b_rel` the relaxed activity of each control per
/// interval. Every other field constrains the switching pattern the
/// engine is allowed to produce.
///
/// Construction validates shapes and ranges up front; once a `Problem`
/// exists the engine assumes it is well-formed.
#[derive(Debug, Clone)]
pub struct Problem {
    dt: Vec<Seconds>,
    b_rel: Vec<Vec<Fraction>>,
    n_c: usize,
    n_t: usize,
    n_max_switches: Vec<u32>,
    min_up_time: Vec<Seconds>,
    min_down_time: Vec<Seconds>,
    max_up_time: Vec<Seconds>,
    total_max_up_time: Vec<Seconds>,
    b_valid: Vec<Vec<bool>>,
    b_adjacencies: Vec<Vec<bool>>,
    b_active_pre: Control,
    min_down_time_pre: Vec<Seconds>,
}

impl Problem {
    /// build an unconstrained instance from interval widths and the
    /// relaxed trajectory. constraints default to "anything goes" and
    /// are tightened through the setters.
    pub fn new(dt: Vec<Seconds>, b_rel: Vec<Vec<Fraction>>) -> Result<Self> {
        if dt.is_empty() {
            bail!("time grid must contain at least one interval");
        }
        if b_rel.is_empty() {
            bail!("relaxed trajectory must contain at least one control");
        }
        let n_c = b_rel.len();
        let n_t = dt.len();
        for (t, width) in dt.iter().enumerate() {
            if !width.is_finite() || *width <= 0.0 {
                bail!("interval {} has non-positive width {}", t, width);
            }
        }
        for (i, row) in b_rel.iter().enumerate() {
            if row.len() != n_t {
                bail!(
                    "control {} has {} relaxed values, expected {}",
                    i,
                    row.len(),
                    n_t
                );
            }
            for (t, b) in row.iter().enumerate() {
                if !(0.0..=1.0).contains(b) {
                    bail!("relaxed value {} of control {} at interval {} outside [0, 1]", b, i, t);
                }
            }
        }
        for t in 0..n_t {
            let sum = b_rel.iter().map(|row| row[t]).sum::<f64>();
            if (sum - 1.0).abs() > crate::COLUMN_SUM_TOLERANCE {
                bail!("relaxed values at interval {} sum to {}, expected 1", t, sum);
            }
        }
        Ok(Self {
            n_max_switches: vec![n_t as u32; n_c],
            min_up_time: vec![0.0; n_c],
            min_down_time: vec![0.0; n_c],
            max_up_time: vec![f64::INFINITY; n_c],
            total_max_up_time: vec![f64::INFINITY; n_c],
            b_valid: vec![vec![true; n_t]; n_c],
            b_adjacencies: vec![vec![true; n_c]; n_c],
            b_active_pre: n_c,
            min_down_time_pre: vec![0.0; n_c],
            dt,
            b_rel,
            n_c,
            n_t,
        })
    }

    /// derive interval widths from strictly increasing time points.
    pub fn from_time_points(t: Vec<Seconds>, b_rel: Vec<Vec<Fraction>>) -> Result<Self> {
        if t.len() < 2 {
            bail!("time points must contain at least two entries");
        }
        for w in t.windows(2) {
            if w[1] - w[0] <= 0.0 {
                bail!("time points must be strictly increasing");
            }
        }
        let dt = t.windows(2).map(|w| w[1] - w[0]).collect();
        Self::new(dt, b_rel)
    }

    /// constraint setters, host-binding style

    pub fn set_n_max_switches(&mut self, n_max_switches: Vec<u32>) -> Result<()> {
        if n_max_switches.len() != self.n_c {
            bail!("switch bounds must have one entry per control");
        }
        self.n_max_switches = n_max_switches;
        Ok(())
    }

    pub fn set_min_up_time(&mut self, min_up_time: Vec<Seconds>) -> Result<()> {
        self.check_durations(&min_up_time, "minimum up times")?;
        self.min_up_time = min_up_time;
        Ok(())
    }

    pub fn set_min_down_time(&mut self, min_down_time: Vec<Seconds>) -> Result<()> {
        self.check_durations(&min_down_time, "minimum down times")?;
        self.min_down_time = min_down_time;
        Ok(())
    }

    pub fn set_max_up_time(&mut self, max_up_time: Vec<Seconds>) -> Result<()> {
        if max_up_time.len() != self.n_c {
            bail!("maximum up times must have one entry per control");
        }
        if max_up_time.iter().any(|d| d.is_nan() || *d <= 0.0) {
            bail!("maximum up times must be positive");
        }
        self.max_up_time = max_up_time;
        Ok(())
    }

    pub fn set_total_max_up_time(&mut self, total_max_up_time: Vec<Seconds>) -> Result<()> {
        if total_max_up_time.len() != self.n_c {
            bail!("total up time budgets must have one entry per control");
        }
        if total_max_up_time.iter().any(|d| d.is_nan() || *d <= 0.0) {
            bail!("total up time budgets must be positive");
        }
        self.total_max_up_time = total_max_up_time;
        Ok(())
    }

    /// `b_valid[i][t] == false` forbids control `i` in interval `t`.
    pub fn set_valid(&mut self, b_valid: Vec<Vec<bool>>) -> Result<()> {
        if b_valid.len() != self.n_c || b_valid.iter().any(|row| row.len() != self.n_t) {
            bail!("validity mask must be shaped like the relaxed trajectory");
        }
        self.b_valid = b_valid;
        Ok(())
    }

    /// `b_adjacencies[j][i] == false` forbids switching directly from
    /// control `i` to control `j`.
    pub fn set_adjacencies(&mut self, b_adjacencies: Vec<Vec<bool>>) -> Result<()> {
        if b_adjacencies.len() != self.n_c || b_adjacencies.iter().any(|row| row.len() != self.n_c) {
            bail!("adjacency mask must be square over the controls");
        }
        self.b_adjacencies = b_adjacencies;
        Ok(())
    }

    /// control active just before the first interval; `n_c` means none.
    pub fn set_active_pre(&mut self, b_active_pre: Control) -> Result<()> {
        if b_active_pre > self.n_c {
            bail!("pre-active control {} out of range", b_active_pre);
        }
        self.b_active_pre = b_active_pre;
        Ok(())
    }

    /// down time still owed from before the horizon, per control.
    pub fn set_min_down_time_pre(&mut self, min_down_time_pre: Vec<Seconds>) -> Result<()> {
        self.check_durations(&min_down_time_pre, "pre-horizon down times")?;
        self.min_down_time_pre = min_down_time_pre;
        Ok(())
    }

    fn check_durations(&self, durations: &[Seconds], what: &str) -> Result<()> {
        if durations.len() != self.n_c {
            bail!("{} must have one entry per control", what);
        }
        if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
            bail!("{} must be non-negative and finite", what);
        }
        Ok(())
    }

    /// accessors

    pub fn n_c(&self) -> usize {
        self.n_c
    }
    pub fn n_t(&self) -> usize {
        self.n_t
    }
    pub fn dt(&self) -> &[Seconds] {
        &self.dt
    }
    pub fn b_rel(&self) -> &[Vec<Fraction>] {
        &self.b_rel
    }
    pub fn n_max_switches(&self) -> &[u32] {
        &self.n_max_switches
    }
    pub fn min_up_time(&self) -> &[Seconds] {
        &self.min_up_time
    }
    pub fn min_down_time(&self) -> &[Seconds] {
        &self.min_down_time
    }
    pub fn max_up_time(&self) -> &[Seconds] {
        &self.max_up_time
    }
    pub fn total_max_up_time(&self) -> &[Seconds] {
        &self.total_max_up_time
    }
    pub fn valid(&self, i: Control, t: usize) -> bool {
        self.b_valid[i][t]
    }
    pub fn adjacent(&self, to: Control, from: Control) -> bool {
        self.b_adjacencies[to][from]
    }
    pub fn b_active_pre(&self) -> Control {
        self.b_active_pre
    }
    pub fn min_down_time_pre(&self) -> &[Seconds] {
        &self.min_down_time_pre
    }

    /// total width of the horizon, the trivially attainable bound.
    pub fn horizon(&self) -> Seconds {
        self.dt.iter().sum()
    }
}

impl crate::Arbitrary for Problem {
    /// a small well-formed instance with normalized columns and mild
    /// switching constraints, for tests and benches.
    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let n_c = rng.random_range(2..4usize);
        let n_t = rng.random_range(6..10usize);
        let dt = (0..n_t).map(|_| rng.random_range(0.5..2.0)).collect();
        let mut b_rel = vec![vec![0.0; n_t]; n_c];
        for t in 0..n_t {
            let raw = (0..n_c)
                .map(|_| rng.random_range(0.05..1.0))
                .collect::<Vec<f64>>();
            let sum = raw.iter().sum::<f64>();
            for (i, r) in raw.iter().enumerate() {
                b_rel[i][t] = r / sum;
            }
        }
        let mut problem = Self::new(dt, b_rel).expect("random instance is well-formed");
        let caps = (0..n_c).map(|_| rng.random_range(2..5u32)).collect();
        problem.set_n_max_switches(caps).expect("cap vector fits");
        problem
    }
}
