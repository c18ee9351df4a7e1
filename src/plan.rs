//! The plan artifact: an ordered action sequence and its canonical text form.
//!
//! The text form is one canonical action rendering per line, in execution order. It is the only
//! file the planner writes, so it has to be exactly reproducible from the plan.

use crate::world::{Cost, World};
use crate::{Action, PlannerConfig, Result, State};
use std::fs;
use std::path::Path;

/// Where the plan is written when no other location is given.
pub const DEFAULT_PLAN_PATH: &str = "saves/plan.txt";

/// An ordered sequence of grounded actions, start to finish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<Action>,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Sum of the action costs.
    pub fn cost(&self) -> Cost {
        self.actions
            .iter()
            .fold(0, |total: Cost, action| total.saturating_add(action.cost()))
    }

    /// Renders one action per line, each line newline-terminated.
    ///
    /// ```
    /// use strips_planner::{Action, Plan};
    ///
    /// let plan = Plan::new(vec![
    ///     Action::Harvest { unit: 1, resource: 3, cost: 1 },
    ///     Action::Deposit { unit: 1, cost: 1 },
    /// ]);
    /// assert_eq!(plan.to_text(), "Harvest(1, 3)\nDeposit(1)\n");
    /// assert_eq!(strips_planner::Plan::default().to_text(), "");
    /// ```
    pub fn to_text(&self) -> String {
        self.actions
            .iter()
            .map(|action| format!("{}\n", action))
            .collect()
    }

    /// Writes the text form to `path`, creating missing parent directories.
    ///
    /// A failure leaves the plan itself untouched; the caller decides whether it matters.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_text())?;
        log::info!("Saved plan of {} actions to {}", self.len(), path.display());
        Ok(())
    }

    /// Applies the plan step by step from `start`, returning the final state, or `None` as soon
    /// as a step's precondition does not hold.
    pub fn replay(&self, start: &State, world: &World, config: &PlannerConfig) -> Option<State> {
        self.actions.iter().try_fold(start.clone(), |state, action| {
            action
                .is_applicable(&state, world, config)
                .then(|| action.apply(&state, world, config))
        })
    }
}

impl From<Vec<Action>> for Plan {
    fn from(actions: Vec<Action>) -> Self {
        Self::new(actions)
    }
}

impl IntoIterator for Plan {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
