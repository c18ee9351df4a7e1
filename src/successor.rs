//! Successor generation: grounding every operator against a state and keeping the ones whose
//! precondition holds.
//!
//! Candidates are grounded in a fixed order (production first, then each worker in id order:
//! deposit, harvest, moves to the town hall and to each node in id order) so that search runs
//! are reproducible.

use crate::state::{Location, State};
use crate::world::World;
use crate::{Action, PlannerConfig};

/// A child of a state together with the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Successor {
    pub action: Action,
    pub state: State,
}

impl State {
    /// Every grounded action whose precondition holds in this state.
    pub fn applicable_actions(&self, world: &World, config: &PlannerConfig) -> Vec<Action> {
        self.candidate_actions(world)
            .into_iter()
            .filter(|action| action.is_applicable(self, world, config))
            .collect()
    }

    /// Applies each applicable action to obtain the children of this state.
    pub fn successors(&self, world: &World, config: &PlannerConfig) -> Vec<Successor> {
        self.applicable_actions(world, config)
            .into_iter()
            .map(|action| {
                let state = action.apply(self, world, config);
                Successor { action, state }
            })
            .collect()
    }

    /// Groundings worth testing; a superset of the applicable actions.
    fn candidate_actions(&self, world: &World) -> Vec<Action> {
        let mut candidates = vec![Action::produce_worker(world)];

        for (id, worker) in self.workers() {
            candidates.push(Action::deposit(world, id));
            if let Location::Resource(resource) = worker.location {
                candidates.push(Action::harvest(world, id, resource));
            }
            candidates.push(Action::move_to(world, id, worker.location, Location::TownHall));
            for node in world.resources() {
                candidates.push(Action::move_to(
                    world,
                    id,
                    worker.location,
                    Location::Resource(node.id),
                ));
            }
        }

        candidates
    }
}
