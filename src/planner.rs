//! # Planner Module
//!
//! The planning entry point. [`Planner::plan`] takes a world snapshot and a goal configuration,
//! builds the initial state, runs the search and hands back the ordered action sequence.
//!
//! ## Outcomes
//!
//! - `Err(PlannerError::InvalidSnapshot)` when the snapshot is rejected before searching;
//! - `Ok(None)` when no plan exists, or none was found within the search limits;
//! - `Ok(Some(plan))` otherwise. A start state that already meets the goal gives an empty plan.
//!
//! ## Basic Usage
//!
//! ```
//! use strips_planner::{Planner, PlannerConfig, WorldSnapshot};
//!
//! let snapshot = WorldSnapshot::from_json(r#"{
//!     "width": 10, "height": 10,
//!     "town_hall": { "id": 0, "position": { "x": 0, "y": 0 } },
//!     "workers": [ { "id": 1, "position": { "x": 1, "y": 0 } } ],
//!     "resources": [ { "id": 5, "kind": "wood", "position": { "x": 3, "y": 0 }, "amount": 1000 } ]
//! }"#).unwrap();
//!
//! // wood, gold, build workers
//! let config = PlannerConfig::from_params(&["200", "0", "false"]).unwrap();
//! let plan = Planner::new().plan(&snapshot, &config).unwrap().expect("a plan exists");
//!
//! assert_eq!(plan.len(), 8);
//! for action in &plan {
//!     println!("{}", action);
//! }
//! ```

use crate::search::{AStarSearch, SearchLimits, SearchOutcome};
use crate::{Plan, PlannerConfig, Result, World, WorldSnapshot};

/// Runs planning requests with a configured search.
pub struct Planner {
    search: AStarSearch,
}

impl Planner {
    /// A planner using A* with the resource-deficit heuristic and no limits.
    pub fn new() -> Self {
        Self {
            search: AStarSearch::default(),
        }
    }

    pub fn with_search(search: AStarSearch) -> Self {
        Self { search }
    }

    /// Shorthand for the default search bounded by `limits`.
    pub fn with_limits(limits: SearchLimits) -> Self {
        Self::with_search(AStarSearch::default().with_limits(limits))
    }

    /// Validates the snapshot and runs the search, reporting every detail of the outcome.
    pub fn search(&self, snapshot: &WorldSnapshot, config: &PlannerConfig) -> Result<SearchOutcome> {
        let (world, start) = World::from_snapshot(snapshot)?;
        log::info!(
            "Planning for {} gold and {} wood (worker production {}), {} worker(s) available",
            config.required_gold,
            config.required_wood,
            if config.allow_worker_production {
                "allowed"
            } else {
                "disabled"
            },
            start.worker_count()
        );
        Ok(self.search.search(&start, &world, config))
    }

    /// Finds a plan that takes the snapshot's stockpiles to the configured targets.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidSnapshot`](crate::PlannerError::InvalidSnapshot) when
    /// the snapshot cannot be turned into an initial state. Not finding a plan is `Ok(None)`.
    pub fn plan(&self, snapshot: &WorldSnapshot, config: &PlannerConfig) -> Result<Option<Plan>> {
        let outcome = self.search(snapshot, config)?;
        match outcome {
            SearchOutcome::Found(solution) => Ok(Some(Plan::new(solution.actions))),
            SearchOutcome::Exhausted(_) => {
                log::warn!("No plan reaches the goal from this snapshot");
                Ok(None)
            }
            SearchOutcome::LimitReached(_) => {
                log::warn!("No plan found within the search limits");
                Ok(None)
            }
        }
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
