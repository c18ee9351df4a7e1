mod action;
mod config;
mod error;
mod executor;
mod heuristic;
mod plan;
mod planner;
mod search;
mod simulation;
mod state;
mod successor;
mod visualizer;
mod world;

pub use action::Action;
pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use executor::{Command, ExecutorStatus, PlanExecutor, Simulation};
pub use heuristic::{Heuristic, ResourceDeficitHeuristic, ZeroHeuristic};
pub use plan::{Plan, DEFAULT_PLAN_PATH};
pub use planner::Planner;
pub use search::{AStarSearch, SearchLimits, SearchOutcome, SearchStats, Solution};
pub use simulation::{GridSimulation, DEFAULT_SPAWN_BASE};
pub use state::{Location, State, Worker};
pub use successor::Successor;
pub use visualizer::PlanVisualizer;
pub use world::{
    Cargo, Cost, Position, ResourceId, ResourceKind, ResourceNode, ResourceSnapshot, Rules,
    TownHallSnapshot, UnitId, WorkerSnapshot, World, WorldSnapshot,
};
