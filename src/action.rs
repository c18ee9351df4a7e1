//! # Action Module
//!
//! Grounded STRIPS operators for the resource-gathering domain.
//!
//! The operator set is closed, so [`Action`] is an enum: adding an operator means the compiler
//! points at every `match` that has to learn about it. Each variant carries its bound
//! parameters and its execution cost, fixed at grounding time.
//!
//! | Operator | Precondition | Effect |
//! |----------|--------------|--------|
//! | `Move(unit, x, y)` | unit stands at `from`; destination is the town hall or a non-empty node | unit stands at `to` |
//! | `Harvest(unit, resource)` | unit is next to the node, empty-handed; node not depleted | unit carries one load; node shrinks |
//! | `Deposit(unit)` | unit is next to the town hall carrying something | stockpile grows; unit empty-handed |
//! | `ProduceWorker(town_hall)` | production allowed; enough gold; below supply cap | gold spent; new worker at the town hall |
//!
//! Callers check [`Action::is_applicable`] before [`Action::apply`]; applying an action whose
//! precondition does not hold is a bug and panics.

use crate::state::{Location, State};
use crate::world::{Cargo, Cost, Position, ResourceId, UnitId, World};
use crate::PlannerConfig;
use std::fmt;

/// A grounded operator.
///
/// The [`Display`](fmt::Display) form is the canonical `Name(param, ...)` rendering written to
/// the plan file.
///
/// # Examples
///
/// ```
/// use strips_planner::{Action, Location, Position};
///
/// let step = Action::Move {
///     unit: 1,
///     from: Location::TownHall,
///     to: Location::Resource(4),
///     target: Position::new(10, 15),
///     cost: 9,
/// };
/// assert_eq!(step.to_string(), "Move(1, 10, 15)");
/// assert_eq!(Action::Deposit { unit: 1, cost: 1 }.to_string(), "Deposit(1)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Move {
        unit: UnitId,
        from: Location,
        to: Location,
        /// Cell the unit walks to
        target: Position,
        cost: Cost,
    },
    Harvest {
        unit: UnitId,
        resource: ResourceId,
        cost: Cost,
    },
    Deposit {
        unit: UnitId,
        cost: Cost,
    },
    ProduceWorker {
        town_hall: UnitId,
        cost: Cost,
    },
}

impl Action {
    /// Grounds a move of `unit` from `from` to `to`, costed by walking distance.
    pub fn move_to(world: &World, unit: UnitId, from: Location, to: Location) -> Self {
        Action::Move {
            unit,
            from,
            to,
            target: world.position_of(&to),
            cost: world.move_cost(&from, &to),
        }
    }

    pub fn harvest(world: &World, unit: UnitId, resource: ResourceId) -> Self {
        Action::Harvest {
            unit,
            resource,
            cost: world.rules().harvest_cost,
        }
    }

    pub fn deposit(world: &World, unit: UnitId) -> Self {
        Action::Deposit {
            unit,
            cost: world.rules().deposit_cost,
        }
    }

    pub fn produce_worker(world: &World) -> Self {
        Action::ProduceWorker {
            town_hall: world.town_hall(),
            cost: world.rules().produce_cost,
        }
    }

    /// Operator name as it appears in the rendered plan.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move { .. } => "Move",
            Action::Harvest { .. } => "Harvest",
            Action::Deposit { .. } => "Deposit",
            Action::ProduceWorker { .. } => "ProduceWorker",
        }
    }

    /// The unit that performs the action.
    pub fn unit(&self) -> UnitId {
        match self {
            Action::Move { unit, .. } | Action::Harvest { unit, .. } | Action::Deposit { unit, .. } => {
                *unit
            }
            Action::ProduceWorker { town_hall, .. } => *town_hall,
        }
    }

    /// Execution cost in ticks. Always positive for actions grounded against a validated world.
    pub fn cost(&self) -> Cost {
        match self {
            Action::Move { cost, .. }
            | Action::Harvest { cost, .. }
            | Action::Deposit { cost, .. }
            | Action::ProduceWorker { cost, .. } => *cost,
        }
    }

    /// Checks the precondition of this action against a state.
    pub fn is_applicable(&self, state: &State, world: &World, config: &PlannerConfig) -> bool {
        match self {
            Action::Move { unit, from, to, .. } => {
                let Some(worker) = state.worker(*unit) else {
                    return false;
                };
                if worker.location != *from || from == to {
                    return false;
                }
                match to {
                    Location::TownHall => true,
                    Location::Resource(id) => {
                        world.resource(*id).is_some() && state.remaining(*id) > 0
                    }
                    Location::Field(_) => false,
                }
            }
            Action::Harvest { unit, resource, .. } => {
                state.worker(*unit).is_some_and(|w| {
                    w.location == Location::Resource(*resource) && w.cargo.is_none()
                }) && world.resource(*resource).is_some()
                    && state.remaining(*resource) > 0
            }
            Action::Deposit { unit, .. } => state
                .worker(*unit)
                .is_some_and(|w| w.location == Location::TownHall && w.cargo.is_some()),
            Action::ProduceWorker { town_hall, .. } => {
                let rules = world.rules();
                config.allow_worker_production
                    && *town_hall == world.town_hall()
                    && state.gold() >= rules.worker_gold_cost
                    && state.worker_count() < rules.supply_cap as usize
            }
        }
    }

    /// Produces the state that results from performing this action. The input is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if the precondition does not hold; that is a bug in the caller.
    pub fn apply(&self, state: &State, world: &World, config: &PlannerConfig) -> State {
        assert!(
            self.is_applicable(state, world, config),
            "{} applied to a state that violates its precondition: {}",
            self,
            state
        );

        let mut next = state.clone();
        match self {
            Action::Move { unit, to, .. } => {
                if let Some(worker) = next.worker_mut(*unit) {
                    worker.location = *to;
                }
            }
            Action::Harvest { unit, resource, .. } => {
                let remaining = state.remaining(*resource);
                let amount = remaining.min(world.rules().carry_capacity);
                if let (Some(node), Some(worker)) = (world.resource(*resource), next.worker_mut(*unit)) {
                    worker.cargo = Some(Cargo {
                        kind: node.kind,
                        amount,
                    });
                }
                next.set_remaining(*resource, remaining - amount);
            }
            Action::Deposit { unit, .. } => {
                if let Some(cargo) = next.worker_mut(*unit).and_then(|w| w.cargo.take()) {
                    next.add_stock(cargo.kind, cargo.amount);
                }
            }
            Action::ProduceWorker { .. } => {
                next.spend_gold(world.rules().worker_gold_cost);
                next.spawn_worker();
            }
        }
        next
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { unit, target, .. } => {
                write!(f, "Move({}, {}, {})", unit, target.x, target.y)
            }
            Action::Harvest { unit, resource, .. } => write!(f, "Harvest({}, {})", unit, resource),
            Action::Deposit { unit, .. } => write!(f, "Deposit({})", unit),
            Action::ProduceWorker { town_hall, .. } => write!(f, "ProduceWorker({})", town_hall),
        }
    }
}
