use crate::Seconds;
use anyhow::bail;
use anyhow::Result;
use std::path::PathBuf;

/// Per-run configuration. Everything is optional; defaults mean "search
/// to optimality with the default strategy, quietly, without recording".
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// registered queue strategy name; `None` takes the registry default
    pub strategy: Option<String>,
    /// cap on driver iterations
    pub max_iter: Option<u64>,
    /// cap on wall-clock seconds, measured from run() entry
    pub max_cpu_time: Option<Seconds>,
    /// 0 silent, 1 run summary, 2 a line per incumbent
    pub verbosity: u8,
    /// keep the previous run's incumbent as the starting bound
    pub warm_start: bool,
    /// tree recorder output path, if any
    pub vbc_file: Option<PathBuf>,
    /// stamp recorder lines with real time
    pub vbc_timing: bool,
    /// stretch factor applied to recorder timestamps
    pub vbc_time_dilation: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            strategy: None,
            max_iter: None,
            max_cpu_time: None,
            verbosity: 1,
            warm_start: false,
            vbc_file: None,
            vbc_timing: true,
            vbc_time_dilation: 1.0,
        }
    }
}

impl RunOptions {
    /// fail fast on nonsensical limits, before any node exists.
    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.max_iter {
            bail!("iteration cap must be positive");
        }
        if let Some(limit) = self.max_cpu_time {
            if !limit.is_finite() || limit <= 0.0 {
                bail!("time cap must be positive");
            }
        }
        if !self.vbc_time_dilation.is_finite() || self.vbc_time_dilation <= 0.0 {
            bail!("time dilation must be positive");
        }
        Ok(())
    }
}
