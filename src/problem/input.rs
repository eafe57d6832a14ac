use super::Problem;
use crate::Control;
use crate::Fraction;
use crate::Seconds;
use anyhow::bail;
use serde::Deserialize;
use serde::Serialize;

/// Serde-facing description of an instance, as read by the CLI.
/// Either `dt` (interval widths) or `t` (time points) must be given.
/// Masks are written as 0/1 for readability of the JSON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemInput {
    #[serde(default)]
    pub dt: Option<Vec<Seconds>>,
    #[serde(default)]
    pub t: Option<Vec<Seconds>>,
    pub b_rel: Vec<Vec<Fraction>>,
    #[serde(default)]
    pub n_max_switches: Option<Vec<u32>>,
    #[serde(default)]
    pub min_up_time: Option<Vec<Seconds>>,
    #[serde(default)]
    pub min_down_time: Option<Vec<Seconds>>,
    #[serde(default)]
    pub max_up_time: Option<Vec<Seconds>>,
    #[serde(default)]
    pub total_max_up_time: Option<Vec<Seconds>>,
    #[serde(default)]
    pub b_valid: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    pub b_adjacencies: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    pub b_active_pre: Option<Control>,
    #[serde(default)]
    pub min_down_time_pre: Option<Vec<Seconds>>,
}

impl TryFrom<ProblemInput> for Problem {
    type Error = anyhow::Error;

    fn try_from(input: ProblemInput) -> Result<Self, Self::Error> {
        let mut problem = match (input.dt, input.t) {
            (Some(_), Some(_)) => bail!("give either interval widths or time points, not both"),
            (Some(dt), None) => Problem::new(dt, input.b_rel)?,
            (None, Some(t)) => Problem::from_time_points(t, input.b_rel)?,
            (None, None) => bail!("either interval widths or time points are required"),
        };
        if let Some(caps) = input.n_max_switches {
            problem.set_n_max_switches(caps)?;
        }
        if let Some(up) = input.min_up_time {
            problem.set_min_up_time(up)?;
        }
        if let Some(down) = input.min_down_time {
            problem.set_min_down_time(down)?;
        }
        if let Some(up) = input.max_up_time {
            problem.set_max_up_time(up)?;
        }
        if let Some(total) = input.total_max_up_time {
            problem.set_total_max_up_time(total)?;
        }
        if let Some(valid) = input.b_valid {
            problem.set_valid(bits(valid))?;
        }
        if let Some(adjacencies) = input.b_adjacencies {
            problem.set_adjacencies(bits(adjacencies))?;
        }
        if let Some(pre) = input.b_active_pre {
            problem.set_active_pre(pre)?;
        }
        if let Some(down) = input.min_down_time_pre {
            problem.set_min_down_time_pre(down)?;
        }
        Ok(problem)
    }
}

fn bits(mask: Vec<Vec<u8>>) -> Vec<Vec<bool>> {
    mask.into_iter()
        .map(|row| row.into_iter().map(|b| b != 0).collect())
        .collect()
}
