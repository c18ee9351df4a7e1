use crate::executor::{Command, Simulation};
use crate::world::{Cargo, ResourceKind, UnitId, WorkerSnapshot, WorldSnapshot};
use crate::{PlannerError, Result};
use std::collections::BTreeMap;

/// Base id for workers trained by a [`GridSimulation`], far from typical snapshot ids.
pub const DEFAULT_SPAWN_BASE: UnitId = 1000;

#[derive(Debug, Clone, Copy)]
struct Task {
    command: Command,
    ticks_left: u32,
}

/// A small tick-based stand-in for the game, used to replay and check plans.
///
/// Walking takes one tick per cell (at least one); the other commands take the durations in the
/// snapshot's rules. Effects land when a command finishes.
///
/// The planner measures a walk from the cell of the place a worker stands at (the town hall or
/// a node), while the simulation measures it from the worker's real cell. Once a worker has
/// walked onto such a cell the two agree, so only a first walk from a neighbouring cell can be
/// shorter here than in the plan.
#[derive(Debug, Clone)]
pub struct GridSimulation {
    world: WorldSnapshot,
    tasks: BTreeMap<UnitId, Task>,
    next_unit_id: UnitId,
    ticks: u64,
}

impl GridSimulation {
    pub fn new(world: WorldSnapshot) -> Self {
        let next_unit_id = world.first_free_unit_id().max(DEFAULT_SPAWN_BASE);
        Self {
            world,
            tasks: BTreeMap::new(),
            next_unit_id,
            ticks: 0,
        }
    }

    /// Trained workers get ids starting at `base`.
    pub fn with_spawn_base(mut self, base: UnitId) -> Self {
        self.next_unit_id = base.max(self.world.first_free_unit_id());
        self
    }

    /// Ticks simulated so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn rejected(command: &Command, reason: &str) -> PlannerError {
        PlannerError::Execution(format!("cannot {}: {}", command, reason))
    }

    /// Checks that a command can start now and returns how long it takes.
    fn duration(&self, command: &Command) -> Result<u32> {
        let rules = &self.world.rules;
        let worker = |unit: UnitId| {
            self.world
                .worker(unit)
                .ok_or_else(|| Self::rejected(command, "no such worker"))
        };

        match command {
            Command::MoveTo { unit, target } => {
                let worker = worker(*unit)?;
                if target.x < 0
                    || target.y < 0
                    || i64::from(target.x) >= i64::from(self.world.width)
                    || i64::from(target.y) >= i64::from(self.world.height)
                {
                    return Err(Self::rejected(command, "target is off the map"));
                }
                Ok(worker.position.chebyshev(target).max(1))
            }
            Command::Gather { unit, resource } => {
                let worker = worker(*unit)?;
                let node = self
                    .world
                    .resource(*resource)
                    .ok_or_else(|| Self::rejected(command, "no such resource"))?;
                if worker.position.chebyshev(&node.position) > 1 {
                    return Err(Self::rejected(command, "worker is not next to the resource"));
                }
                if worker.cargo.is_some() {
                    return Err(Self::rejected(command, "worker is already carrying"));
                }
                if node.amount == 0 {
                    return Err(Self::rejected(command, "resource is depleted"));
                }
                Ok(rules.harvest_cost)
            }
            Command::Deposit { unit, town_hall } => {
                let worker = worker(*unit)?;
                if *town_hall != self.world.town_hall.id {
                    return Err(Self::rejected(command, "no such town hall"));
                }
                if worker.position.chebyshev(&self.world.town_hall.position) > 1 {
                    return Err(Self::rejected(command, "worker is not next to the town hall"));
                }
                if worker.cargo.is_none() {
                    return Err(Self::rejected(command, "worker carries nothing"));
                }
                Ok(rules.deposit_cost)
            }
            Command::Train { town_hall } => {
                if *town_hall != self.world.town_hall.id {
                    return Err(Self::rejected(command, "no such town hall"));
                }
                if self.world.gold < rules.worker_gold_cost {
                    return Err(Self::rejected(command, "not enough gold"));
                }
                if self.world.workers.len() >= rules.supply_cap as usize {
                    return Err(Self::rejected(command, "supply cap reached"));
                }
                Ok(rules.produce_cost)
            }
        }
    }

    fn finish(&mut self, command: Command) {
        let capacity = self.world.rules.carry_capacity;
        match command {
            Command::MoveTo { unit, target } => {
                if let Some(worker) = self.world.workers.iter_mut().find(|w| w.id == unit) {
                    worker.position = target;
                }
            }
            Command::Gather { unit, resource } => {
                let Some(node) = self.world.resources.iter_mut().find(|r| r.id == resource) else {
                    return;
                };
                let amount = node.amount.min(capacity);
                node.amount -= amount;
                let kind = node.kind;
                if let Some(worker) = self.world.workers.iter_mut().find(|w| w.id == unit) {
                    worker.cargo = Some(Cargo { kind, amount });
                }
            }
            Command::Deposit { unit, .. } => {
                let cargo = self
                    .world
                    .workers
                    .iter_mut()
                    .find(|w| w.id == unit)
                    .and_then(|w| w.cargo.take());
                if let Some(cargo) = cargo {
                    let stock = match cargo.kind {
                        ResourceKind::Gold => &mut self.world.gold,
                        ResourceKind::Wood => &mut self.world.wood,
                    };
                    *stock = stock.saturating_add(cargo.amount);
                }
            }
            Command::Train { .. } => {
                self.world.gold = self.world.gold.saturating_sub(self.world.rules.worker_gold_cost);
                self.world.workers.push(WorkerSnapshot {
                    id: self.next_unit_id,
                    position: self.world.town_hall.position,
                    cargo: None,
                });
                log::debug!("Trained worker {}", self.next_unit_id);
                self.next_unit_id = self.next_unit_id.saturating_add(1);
            }
        }
    }
}

impl Simulation for GridSimulation {
    fn snapshot(&self) -> WorldSnapshot {
        self.world.clone()
    }

    fn is_busy(&self, unit: UnitId) -> bool {
        self.tasks.contains_key(&unit)
    }

    fn submit(&mut self, command: Command) -> Result<()> {
        if self.is_busy(command.unit()) {
            return Err(Self::rejected(&command, "unit is busy"));
        }
        let ticks_left = self.duration(&command)?;
        self.tasks.insert(
            command.unit(),
            Task {
                command,
                ticks_left,
            },
        );
        Ok(())
    }

    fn step(&mut self) {
        self.ticks += 1;
        let mut finished = Vec::new();
        for (unit, task) in self.tasks.iter_mut() {
            task.ticks_left = task.ticks_left.saturating_sub(1);
            if task.ticks_left == 0 {
                finished.push(*unit);
            }
        }
        for unit in finished {
            if let Some(task) = self.tasks.remove(&unit) {
                self.finish(task.command);
            }
        }
    }
}
