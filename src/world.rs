//! # World Module
//!
//! A planning request starts from a [`WorldSnapshot`]: the serialized picture of the game at the
//! moment planning begins (map size, the town hall, every worker with whatever it carries, every
//! resource node and the stockpiles). [`World::from_snapshot`] validates the snapshot and splits
//! it into two parts:
//!
//! - the static [`World`] (map bounds, town hall, resource node kinds and positions, [`Rules`]),
//!   shared by every state of one search;
//! - the initial [`State`], which only holds what actions can change.
//!
//! ## Snapshot format
//!
//! ```
//! use strips_planner::{World, WorldSnapshot};
//!
//! let snapshot = WorldSnapshot::from_json(r#"{
//!     "width": 16,
//!     "height": 16,
//!     "town_hall": { "id": 0, "position": { "x": 2, "y": 2 } },
//!     "workers": [ { "id": 1, "position": { "x": 3, "y": 2 } } ],
//!     "resources": [
//!         { "id": 7, "kind": "wood", "position": { "x": 9, "y": 2 }, "amount": 400 }
//!     ],
//!     "gold": 0,
//!     "wood": 0
//! }"#).unwrap();
//!
//! let (world, state) = World::from_snapshot(&snapshot).unwrap();
//! assert_eq!(world.rules().carry_capacity, 100);
//! assert_eq!(state.worker_count(), 1);
//! assert_eq!(state.remaining(7), 400);
//! ```

use crate::state::{Location, State, Worker};
use crate::{PlannerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Identifier of a unit (town hall or worker).
pub type UnitId = u32;
/// Identifier of a resource node.
pub type ResourceId = u32;
/// Execution cost of an action, in simulation ticks.
pub type Cost = u32;

/// A cell on the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of steps between two cells when diagonal steps are allowed.
    pub fn chebyshev(&self, other: &Position) -> u32 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        u32::try_from(dx.max(dy)).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Gold,
    Wood,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Gold, ResourceKind::Wood];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Gold => write!(f, "gold"),
            ResourceKind::Wood => write!(f, "wood"),
        }
    }
}

/// Resources a worker is carrying back to the town hall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cargo {
    pub kind: ResourceKind,
    pub amount: u32,
}

/// Game rules the planner needs to ground actions and their costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rules {
    /// Amount a single harvest yields (and the most a worker can carry)
    pub carry_capacity: u32,
    /// Gold spent by `ProduceWorker`
    pub worker_gold_cost: u32,
    /// Maximum number of workers alive at once
    pub supply_cap: u32,
    pub harvest_cost: Cost,
    pub deposit_cost: Cost,
    pub produce_cost: Cost,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            carry_capacity: 100,
            worker_gold_cost: 400,
            supply_cap: 3,
            harvest_cost: 1,
            deposit_cost: 1,
            produce_cost: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownHallSnapshot {
    pub id: UnitId,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub id: UnitId,
    pub position: Position,
    #[serde(default)]
    pub cargo: Option<Cargo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub position: Position,
    pub amount: u32,
}

/// The planning-relevant picture of a live game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub width: u32,
    pub height: u32,
    pub town_hall: TownHallSnapshot,
    #[serde(default)]
    pub workers: Vec<WorkerSnapshot>,
    #[serde(default)]
    pub resources: Vec<ResourceSnapshot>,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub wood: u32,
    #[serde(default)]
    pub rules: Rules,
}

impl WorldSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON snapshot from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The id a newly produced worker receives: one past the highest unit id in the snapshot.
    pub fn first_free_unit_id(&self) -> UnitId {
        self.workers
            .iter()
            .map(|w| w.id)
            .chain(std::iter::once(self.town_hall.id))
            .max()
            .map_or(0, |id| id.saturating_add(1))
    }

    pub fn worker(&self, id: UnitId) -> Option<&WorkerSnapshot> {
        self.workers.iter().find(|w| w.id == id)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceSnapshot> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn stock(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    fn in_bounds(&self, position: &Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && i64::from(position.x) < i64::from(self.width)
            && i64::from(position.y) < i64::from(self.height)
    }
}

/// A resource node as the planner sees it; the remaining amount lives in [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub position: Position,
}

/// The part of the world no action can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    width: u32,
    height: u32,
    town_hall: UnitId,
    town_hall_position: Position,
    resources: BTreeMap<ResourceId, ResourceNode>,
    rules: Rules,
}

impl World {
    /// Validates a snapshot and derives the static world plus the initial state.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::InvalidSnapshot`] when the map is empty, a position lies outside
    /// the map, ids collide, a rule value is zero or a worker carries more than it could.
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Result<(World, State)> {
        validate(snapshot)?;

        let town_hall_position = snapshot.town_hall.position;
        let resources: BTreeMap<ResourceId, ResourceNode> = snapshot
            .resources
            .iter()
            .map(|r| {
                (
                    r.id,
                    ResourceNode {
                        id: r.id,
                        kind: r.kind,
                        position: r.position,
                    },
                )
            })
            .collect();

        let world = World {
            width: snapshot.width,
            height: snapshot.height,
            town_hall: snapshot.town_hall.id,
            town_hall_position,
            resources,
            rules: snapshot.rules,
        };

        let workers = snapshot
            .workers
            .iter()
            .map(|w| {
                let worker = Worker {
                    location: world.locate(&w.position),
                    cargo: w.cargo.filter(|c| c.amount > 0),
                };
                (w.id, worker)
            })
            .collect();
        let remaining = snapshot.resources.iter().map(|r| (r.id, r.amount)).collect();

        let state = State::new(
            workers,
            remaining,
            snapshot.gold,
            snapshot.wood,
            snapshot.first_free_unit_id(),
        );

        Ok((world, state))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn town_hall(&self) -> UnitId {
        self.town_hall
    }

    pub fn town_hall_position(&self) -> Position {
        self.town_hall_position
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceNode> {
        self.resources.get(&id)
    }

    /// Resource nodes in id order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> {
        self.resources.values()
    }

    /// The cell a location stands for.
    ///
    /// # Panics
    ///
    /// Panics if the location names a resource node this world does not contain; locations are
    /// only ever built from this world's nodes.
    pub fn position_of(&self, location: &Location) -> Position {
        match location {
            Location::TownHall => self.town_hall_position,
            Location::Resource(id) => self.resources[id].position,
            Location::Field(position) => *position,
        }
    }

    /// Ticks needed to walk between two locations; never zero.
    pub fn move_cost(&self, from: &Location, to: &Location) -> Cost {
        self.position_of(from)
            .chebyshev(&self.position_of(to))
            .max(1)
    }

    /// The cheapest walk between the town hall and a node of `kind` that still has resources.
    pub fn shortest_haul(&self, kind: ResourceKind, state: &State) -> Option<Cost> {
        self.resources
            .values()
            .filter(|node| node.kind == kind && state.remaining(node.id) > 0)
            .map(|node| self.move_cost(&Location::TownHall, &Location::Resource(node.id)))
            .min()
    }

    /// Abstracts a raw cell into a planning location: next to the town hall, next to a
    /// resource node (lowest id wins), or somewhere else on the map.
    fn locate(&self, position: &Position) -> Location {
        if position.chebyshev(&self.town_hall_position) <= 1 {
            return Location::TownHall;
        }
        self.resources
            .values()
            .find(|node| position.chebyshev(&node.position) <= 1)
            .map_or(Location::Field(*position), |node| Location::Resource(node.id))
    }
}

fn validate(snapshot: &WorldSnapshot) -> Result<()> {
    let invalid = |msg: String| Err(PlannerError::InvalidSnapshot(msg));

    if snapshot.width == 0 || snapshot.height == 0 {
        return invalid(format!(
            "map must not be empty, got {}x{}",
            snapshot.width, snapshot.height
        ));
    }

    let rules = &snapshot.rules;
    for (name, value) in [
        ("carry_capacity", rules.carry_capacity),
        ("supply_cap", rules.supply_cap),
        ("harvest_cost", rules.harvest_cost),
        ("deposit_cost", rules.deposit_cost),
        ("produce_cost", rules.produce_cost),
    ] {
        if value == 0 {
            return invalid(format!("rule {} must be positive", name));
        }
    }

    if !snapshot.in_bounds(&snapshot.town_hall.position) {
        return invalid(format!(
            "town hall {} is outside the map at {}",
            snapshot.town_hall.id, snapshot.town_hall.position
        ));
    }

    let mut unit_ids = BTreeSet::new();
    unit_ids.insert(snapshot.town_hall.id);
    for worker in &snapshot.workers {
        if !unit_ids.insert(worker.id) {
            return invalid(format!("unit id {} is used more than once", worker.id));
        }
        if !snapshot.in_bounds(&worker.position) {
            return invalid(format!(
                "worker {} is outside the map at {}",
                worker.id, worker.position
            ));
        }
        if let Some(cargo) = worker.cargo {
            if cargo.amount > rules.carry_capacity {
                return invalid(format!(
                    "worker {} carries {} {} but capacity is {}",
                    worker.id, cargo.amount, cargo.kind, rules.carry_capacity
                ));
            }
        }
    }

    let mut resource_ids = BTreeSet::new();
    for resource in &snapshot.resources {
        if !resource_ids.insert(resource.id) {
            return invalid(format!("resource id {} is used more than once", resource.id));
        }
        if !snapshot.in_bounds(&resource.position) {
            return invalid(format!(
                "resource {} is outside the map at {}",
                resource.id, resource.position
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            width: 10,
            height: 10,
            town_hall: TownHallSnapshot {
                id: 0,
                position: Position::new(1, 1),
            },
            workers: vec![
                WorkerSnapshot {
                    id: 3,
                    position: Position::new(2, 2),
                    cargo: None,
                },
                WorkerSnapshot {
                    id: 5,
                    position: Position::new(7, 6),
                    cargo: Some(Cargo {
                        kind: ResourceKind::Gold,
                        amount: 40,
                    }),
                },
                WorkerSnapshot {
                    id: 6,
                    position: Position::new(4, 9),
                    cargo: None,
                },
            ],
            resources: vec![
                ResourceSnapshot {
                    id: 1,
                    kind: ResourceKind::Gold,
                    position: Position::new(8, 6),
                    amount: 500,
                },
                ResourceSnapshot {
                    id: 2,
                    kind: ResourceKind::Wood,
                    position: Position::new(1, 8),
                    amount: 300,
                },
            ],
            gold: 10,
            wood: 20,
            rules: Rules::default(),
        }
    }

    #[test]
    fn test_chebyshev() {
        let a = Position::new(0, 0);
        assert_eq!(a.chebyshev(&Position::new(3, -2)), 3);
        assert_eq!(a.chebyshev(&a), 0);
    }

    #[test]
    fn test_initial_locations() {
        let (world, state) = World::from_snapshot(&snapshot()).unwrap();
        assert_eq!(state.worker(3).unwrap().location, Location::TownHall);
        assert_eq!(state.worker(5).unwrap().location, Location::Resource(1));
        assert_eq!(
            state.worker(6).unwrap().location,
            Location::Field(Position::new(4, 9))
        );
        assert_eq!(state.gold(), 10);
        assert_eq!(state.wood(), 20);
        assert_eq!(state.next_unit_id(), 7);
        assert_eq!(world.town_hall(), 0);
        assert_eq!(world.resources().count(), 2);
    }

    #[test]
    fn test_move_cost_never_zero() {
        let (world, _) = World::from_snapshot(&snapshot()).unwrap();
        assert_eq!(
            world.move_cost(&Location::TownHall, &Location::Resource(1)),
            7
        );
        assert_eq!(world.move_cost(&Location::TownHall, &Location::TownHall), 1);
    }

    #[test]
    fn test_shortest_haul_skips_depleted_nodes() {
        let mut snap = snapshot();
        snap.resources.push(ResourceSnapshot {
            id: 4,
            kind: ResourceKind::Gold,
            position: Position::new(3, 1),
            amount: 0,
        });
        let (world, state) = World::from_snapshot(&snap).unwrap();
        assert_eq!(world.shortest_haul(ResourceKind::Gold, &state), Some(7));
        assert_eq!(world.shortest_haul(ResourceKind::Wood, &state), Some(7));
    }

    #[test]
    fn test_rejects_duplicate_unit_ids() {
        let mut snap = snapshot();
        snap.workers[1].id = 0;
        assert!(matches!(
            World::from_snapshot(&snap),
            Err(PlannerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_bounds_worker() {
        let mut snap = snapshot();
        snap.workers[0].position = Position::new(10, 0);
        assert!(matches!(
            World::from_snapshot(&snap),
            Err(PlannerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut snap = snapshot();
        snap.rules.carry_capacity = 0;
        assert!(matches!(
            World::from_snapshot(&snap),
            Err(PlannerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_rules_default_when_omitted() {
        let snap = WorldSnapshot::from_json(
            r#"{"width": 4, "height": 4, "town_hall": {"id": 0, "position": {"x": 0, "y": 0}}}"#,
        )
        .unwrap();
        assert_eq!(snap.rules, Rules::default());
        assert!(snap.workers.is_empty());
        assert_eq!(snap.first_free_unit_id(), 1);
    }
}
