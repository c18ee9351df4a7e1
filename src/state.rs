//! # State Module
//!
//! A [`State`] is one fully specified configuration of the planning world: where each worker
//! stands, what it carries, how much every resource node still holds and what has been
//! stockpiled at the town hall.
//!
//! ## Identity
//!
//! States are plain values. Equality and hashing cover every field, and nothing else: the path
//! cost, heuristic estimate, parent link and producing action that the search attaches to a
//! state live next to it in the search node, never inside it. Two states reached along
//! different paths therefore compare equal, which is what duplicate detection relies on.
//!
//! ```
//! use std::collections::BTreeMap;
//! use strips_planner::{Location, State, Worker};
//!
//! let mut workers = BTreeMap::new();
//! workers.insert(1, Worker { location: Location::TownHall, cargo: None });
//!
//! let a = State::new(workers.clone(), BTreeMap::new(), 0, 0, 2);
//! let b = State::new(workers, BTreeMap::new(), 0, 0, 2);
//! assert_eq!(a, b);
//! ```
//!
//! ## Lifecycle
//!
//! The initial state comes from [`World::from_snapshot`](crate::World::from_snapshot). Every
//! other state is produced by [`Action::apply`](crate::Action::apply), which clones its input
//! and changes the clone; a state is never modified once the search holds it.

use crate::world::{Cargo, Position, ResourceId, ResourceKind, UnitId};
use crate::PlannerConfig;
use std::collections::BTreeMap;
use std::fmt;

/// Where a worker is, abstracted to the places that matter for planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Next to the town hall, able to deposit
    TownHall,
    /// Next to a resource node, able to harvest it
    Resource(ResourceId),
    /// Anywhere else; only occurs in initial states
    Field(Position),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::TownHall => write!(f, "town hall"),
            Location::Resource(id) => write!(f, "resource {}", id),
            Location::Field(position) => write!(f, "{}", position),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Worker {
    pub location: Location,
    pub cargo: Option<Cargo>,
}

/// A snapshot of everything an action can change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    workers: BTreeMap<UnitId, Worker>,
    remaining: BTreeMap<ResourceId, u32>,
    gold: u32,
    wood: u32,
    next_unit_id: UnitId,
}

impl State {
    pub fn new(
        workers: BTreeMap<UnitId, Worker>,
        remaining: BTreeMap<ResourceId, u32>,
        gold: u32,
        wood: u32,
        next_unit_id: UnitId,
    ) -> Self {
        Self {
            workers,
            remaining,
            gold,
            wood,
            next_unit_id,
        }
    }

    /// Workers in id order.
    pub fn workers(&self) -> impl Iterator<Item = (UnitId, &Worker)> {
        self.workers.iter().map(|(id, worker)| (*id, worker))
    }

    pub fn worker(&self, id: UnitId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// What a resource node still holds; unknown nodes hold nothing.
    pub fn remaining(&self, resource: ResourceId) -> u32 {
        self.remaining.get(&resource).copied().unwrap_or(0)
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn wood(&self) -> u32 {
        self.wood
    }

    pub fn stock(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    /// Total amount of `kind` currently in workers' hands.
    pub fn carried(&self, kind: ResourceKind) -> u32 {
        self.workers
            .values()
            .filter_map(|w| w.cargo)
            .filter(|c| c.kind == kind)
            .map(|c| c.amount)
            .sum()
    }

    /// The id the next produced worker will get.
    pub fn next_unit_id(&self) -> UnitId {
        self.next_unit_id
    }

    /// Whether both stockpiles meet the configured targets.
    pub fn is_goal(&self, config: &PlannerConfig) -> bool {
        self.gold >= config.required_gold && self.wood >= config.required_wood
    }

    pub(crate) fn worker_mut(&mut self, id: UnitId) -> Option<&mut Worker> {
        self.workers.get_mut(&id)
    }

    pub(crate) fn set_remaining(&mut self, resource: ResourceId, amount: u32) {
        self.remaining.insert(resource, amount);
    }

    pub(crate) fn add_stock(&mut self, kind: ResourceKind, amount: u32) {
        let stock = match kind {
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Wood => &mut self.wood,
        };
        *stock = stock.saturating_add(amount);
    }

    pub(crate) fn spend_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_sub(amount);
    }

    /// Adds an empty-handed worker at the town hall and returns its id.
    pub(crate) fn spawn_worker(&mut self) -> UnitId {
        let id = self.next_unit_id;
        self.workers.insert(
            id,
            Worker {
                location: Location::TownHall,
                cargo: None,
            },
        );
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        id
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gold={} wood={}", self.gold, self.wood)?;
        for (id, worker) in &self.workers {
            write!(f, " | worker {} at {}", id, worker.location)?;
            if let Some(cargo) = worker.cargo {
                write!(f, " carrying {} {}", cargo.amount, cargo.kind)?;
            }
        }
        Ok(())
    }
}
