//! Goal configuration for a planning request.
//!
//! The configuration is built once at the boundary (CLI arguments, a JSON document or the
//! positional `[wood, gold, build_workers]` parameter triple) and then passed explicitly into
//! [`Planner::plan`](crate::Planner::plan). Nothing is ever defaulted: a missing or malformed
//! goal parameter is rejected with [`PlannerError::InvalidConfig`].

use crate::{PlannerError, Result};
use serde::{Deserialize, Serialize};

/// What the planner has to achieve and which operators it may use.
///
/// # Examples
///
/// ```
/// use strips_planner::PlannerConfig;
///
/// let config = PlannerConfig::from_params(&["200", "100", "true"]).unwrap();
/// assert_eq!(config.required_wood, 200);
/// assert_eq!(config.required_gold, 100);
/// assert!(config.allow_worker_production);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
    /// Gold that must be stockpiled at the town hall
    pub required_gold: u32,
    /// Wood that must be stockpiled at the town hall
    pub required_wood: u32,
    /// Whether the plan may contain `ProduceWorker` steps
    pub allow_worker_production: bool,
}

impl PlannerConfig {
    pub fn new(required_gold: u32, required_wood: u32, allow_worker_production: bool) -> Self {
        Self {
            required_gold,
            required_wood,
            allow_worker_production,
        }
    }

    /// Parses the positional parameter triple `[required_wood, required_gold, build_workers]`.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidConfig`] when fewer than three parameters are given or
    /// when any of them fails to parse.
    pub fn from_params<S: AsRef<str>>(params: &[S]) -> Result<Self> {
        if params.len() < 3 {
            return Err(PlannerError::InvalidConfig(format!(
                "expected required wood, required gold and build-workers flag, got {} parameter(s)",
                params.len()
            )));
        }

        let required_wood = parse_amount("required wood", params[0].as_ref())?;
        let required_gold = parse_amount("required gold", params[1].as_ref())?;
        let flag = params[2].as_ref().trim();
        let allow_worker_production = flag.parse::<bool>().map_err(|_| {
            PlannerError::InvalidConfig(format!("build-workers flag '{}' is not a boolean", flag))
        })?;

        Ok(Self::new(required_gold, required_wood, allow_worker_production))
    }

    /// Parses a JSON document; every field is mandatory.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PlannerError::InvalidConfig(e.to_string()))
    }
}

fn parse_amount(what: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        PlannerError::InvalidConfig(format!("{} '{}' is not a non-negative integer", what, raw))
    })
}
