//! Solves a graph file with the selected auction variants and prints their costs.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use transport_auction::{
    evaluate, AssignmentAuction, AuctionParams, AuctionSolution, AuctionSolver, GeneralAuction,
    Problem, ReverseAuction, SimilarObjectAuction,
};

const RULE: &str = "  ----------------------------------------------------------";

#[derive(Parser)]
#[command(name = "auction")]
#[command(about = "Epsilon-scaling auctions for the transportation problem", long_about = None)]
struct Cli {
    /// Graph file to load
    #[arg(short = 'l', long = "load")]
    load: PathBuf,

    /// Save the first solved plan to this graph file
    #[arg(short = 's', long = "save")]
    save: Option<PathBuf>,

    /// Starting ε, a fifth of the largest cost by default
    #[arg(short = 'm', long = "max-eps")]
    max_eps: Option<f64>,

    /// ε that stops the scaling, one over the number of supply nodes by default
    #[arg(short = 'n', long = "min-eps")]
    min_eps: Option<f64>,

    /// ε scaling rate in (0, 1)
    #[arg(short = 'r', long = "rate", default_value_t = 0.25)]
    rate: f64,

    /// Run the assignment auction
    #[arg(short = 'a', long)]
    assignment: bool,

    /// Run the general auction
    #[arg(short = 'g', long)]
    general: bool,

    /// Run the similar object auction
    #[arg(short = 'o', long)]
    similar: bool,

    /// Run the reverse auction
    #[arg(short = 'p', long)]
    reverse: bool,

    /// -v for info, -vv for trace output
    #[arg(short = 'v', action = ArgAction::Count)]
    verbose: u8,
}

fn run<S: AuctionSolver<u32>>(
    name: &str,
    problem: &Problem<u32>,
    params: AuctionParams,
) -> Result<AuctionSolution<u32>> {
    let start = Instant::now();
    let mut solver = S::new(&problem.demand, &problem.supply, &problem.arcs, params)
        .with_context(|| format!("can't set up {}", name))?;
    let solution = solver.solve();
    let elapsed = start.elapsed();

    if solution.is_empty() {
        println!("  {} NOT SOLVED", name);
    } else {
        let report = evaluate(&problem.demand, &problem.supply, &problem.arcs, &solution);
        let label = |what: &str| format!("{} {}", name, what);
        println!("  {:<31}: {:25.15}", label("primal cost"), report.primal);
        println!("  {:<31}: {:25.15}", label("dual cost"), report.dual);
        println!("  {:<31}: {:25.15}", label("diff"), report.gap());
        info!(
            "{}: {} rounds over {} levels, final eps {:e}",
            name, solution.nits, solution.nreductions, solution.eps
        );
    }
    println!(
        "  {:<31}: {:13.3} sec",
        format!("{} time", name),
        elapsed.as_secs_f64()
    );
    println!("{}", RULE);
    Ok(solution)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let problem = Problem::<u32>::load(&cli.load)?;
    let defaults = AuctionParams::for_problem(&problem.arcs, problem.supply.len());
    let params = AuctionParams {
        max_eps: cli.max_eps.unwrap_or(defaults.max_eps),
        min_eps: cli.min_eps.unwrap_or(defaults.min_eps),
        scale: cli.rate,
        ..defaults
    };
    params.validate()?;

    println!(
        "  GRAPH: {} sinks, {} sources, {} arcs",
        problem.demand.len(),
        problem.supply.len(),
        problem.num_arcs()
    );
    println!(
        "  EPS  : {:.6} starting, {:e} minimum",
        params.max_eps, params.min_eps
    );
    println!("{}", RULE);

    let general = cli.general || !(cli.assignment || cli.similar || cli.reverse);
    let mut solutions = Vec::new();
    if general {
        solutions.push(run::<GeneralAuction<u32>>("General auction", &problem, params)?);
    }
    if cli.assignment {
        solutions.push(run::<AssignmentAuction<u32>>("Assignment auction", &problem, params)?);
    }
    if cli.similar {
        solutions.push(run::<SimilarObjectAuction<u32>>("AUCTION-SO", &problem, params)?);
    }
    if cli.reverse {
        solutions.push(run::<ReverseAuction<u32>>("AUCTION-SOP", &problem, params)?);
    }

    if let Some(path) = cli.save {
        match solutions.iter().find(|solution| !solution.is_empty()) {
            Some(solution) => {
                problem.save(&path, &solution.plan)?;
                info!("saved plan to {}", path.display());
            }
            None => info!("no plan to save"),
        }
    }
    Ok(())
}
