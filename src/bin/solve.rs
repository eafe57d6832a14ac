//! Solve Binary
//!
//! Reads a JSON instance, runs the branch-and-bound search, and writes
//! the rounded trajectory as JSON to stdout or a file.

use anyhow::Context;
use binapprox::problem::Problem;
use binapprox::problem::ProblemInput;
use binapprox::search::RunOptions;
use binapprox::search::Solver;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Round a relaxed multi-control trajectory to a binary one")]
struct Args {
    /// JSON instance file
    instance: PathBuf,
    /// search strategy (dfs, bfs, btd, dbt)
    #[arg(long)]
    strategy: Option<String>,
    /// cap on search iterations
    #[arg(long)]
    max_iter: Option<u64>,
    /// cap on wall-clock seconds
    #[arg(long)]
    max_cpu_time: Option<f64>,
    /// 0 silent, 1 summary, 2 per-incumbent lines
    #[arg(long, default_value_t = 1)]
    verbosity: u8,
    /// record the search tree to this file
    #[arg(long)]
    vbc_file: Option<PathBuf>,
    /// drop real-time stamps from the tree recording
    #[arg(long)]
    no_vbc_timing: bool,
    /// stretch factor for recorded timestamps
    #[arg(long, default_value_t = 1.0)]
    vbc_time_dilation: f64,
    /// write the solution here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    status: String,
    status_code: u8,
    eta: f64,
    num_solutions: usize,
    num_iterations: u64,
    runtime: f64,
    b_bin: Vec<Vec<u8>>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    binapprox::init(args.verbosity);

    let text = std::fs::read_to_string(&args.instance)
        .with_context(|| format!("reading instance {:?}", args.instance))?;
    let input = serde_json::from_str::<ProblemInput>(&text)
        .with_context(|| format!("parsing instance {:?}", args.instance))?;
    let problem = Problem::try_from(input)?;

    let mut solver = Solver::new(problem);
    let options = RunOptions {
        strategy: args.strategy,
        max_iter: args.max_iter,
        max_cpu_time: args.max_cpu_time,
        verbosity: args.verbosity,
        warm_start: false,
        vbc_file: args.vbc_file,
        vbc_timing: !args.no_vbc_timing,
        vbc_time_dilation: args.vbc_time_dilation,
    };
    let status = solver.run(&options)?;

    let report = Report {
        status: status.to_string(),
        status_code: status.code(),
        eta: solver.eta(),
        num_solutions: solver.num_solutions(),
        num_iterations: solver.num_iterations(),
        runtime: solver.runtime(),
        b_bin: solver.b_bin(),
    };
    let rendered = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing solution {:?}", path))?,
        None => println!("{}", rendered),
    }
    Ok(())
}
