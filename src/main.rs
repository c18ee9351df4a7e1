//! Command-line front end: plan from a snapshot file, save the plan, optionally replay it.
//!
//! Run with: `strips-planner scenario.json --wood 200 --gold 100 --build-workers`

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use strips_planner::{
    AStarSearch, GridSimulation, Plan, PlanExecutor, PlanVisualizer, Planner, PlannerConfig,
    Result, SearchLimits, SearchOutcome, Simulation, World, WorldSnapshot,
};

/// Plans how to gather gold and wood from a world snapshot
#[derive(Parser)]
#[command(name = "strips-planner")]
#[command(about = "Plans resource gathering with A* over STRIPS actions", long_about = None)]
#[command(version)]
struct Cli {
    /// World snapshot (JSON)
    snapshot: PathBuf,

    /// Wood that must be stockpiled
    #[arg(long)]
    wood: u32,

    /// Gold that must be stockpiled
    #[arg(long)]
    gold: u32,

    /// Allow the plan to produce new workers
    #[arg(long)]
    build_workers: bool,

    /// Where to write the plan
    #[arg(long, default_value = "saves/plan.txt")]
    output: PathBuf,

    /// Give up after this many expansions
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Use uniform-cost search instead of the resource heuristic
    #[arg(long)]
    dijkstra: bool,

    /// Replay the plan in the built-in grid simulation
    #[arg(long)]
    simulate: bool,

    /// Also write the plan's state chain as Graphviz DOT
    #[arg(long)]
    dot: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("No plan was found");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether a plan was found.
fn run(cli: &Cli) -> Result<bool> {
    let snapshot = WorldSnapshot::load(&cli.snapshot)?;
    let config = PlannerConfig::new(cli.gold, cli.wood, cli.build_workers);
    println!(
        "required wood: {} required gold: {} build workers: {}",
        config.required_wood, config.required_gold, config.allow_worker_production
    );

    let search = if cli.dijkstra {
        AStarSearch::dijkstra()
    } else {
        AStarSearch::default()
    };
    let limits = SearchLimits {
        max_expansions: cli.max_expansions,
        timeout: cli.timeout_ms.map(Duration::from_millis),
    };
    let planner = Planner::with_search(search.with_limits(limits));

    let solution = match planner.search(&snapshot, &config)? {
        SearchOutcome::Found(solution) => solution,
        SearchOutcome::Exhausted(stats) => {
            log::error!("Frontier exhausted after {} expansions", stats.expanded);
            return Ok(false);
        }
        SearchOutcome::LimitReached(stats) => {
            log::error!("Search limits hit after {} expansions", stats.expanded);
            return Ok(false);
        }
    };
    let plan = Plan::new(solution.actions);
    println!(
        "Plan: {} actions, cost {}, {} states expanded",
        plan.len(),
        plan.cost(),
        solution.stats.expanded
    );

    if let Err(e) = plan.save(&cli.output) {
        log::error!("Could not save plan to {}: {}", cli.output.display(), e);
    }

    if let Some(path) = &cli.dot {
        let (world, start) = World::from_snapshot(&snapshot)?;
        PlanVisualizer::new().write(path, &world, &start, &plan, &config)?;
    }

    if cli.simulate {
        let mut simulation = GridSimulation::new(snapshot.clone());
        let mut executor = PlanExecutor::new(plan, &snapshot);
        let ticks = executor.run(&mut simulation, 1_000_000)?;
        let end = simulation.snapshot();
        println!(
            "Simulation finished after {} ticks with {} gold and {} wood",
            ticks, end.gold, end.wood
        );
    }

    Ok(true)
}
