//! # Executor Module
//!
//! Replays a finished [`Plan`] against a running [`Simulation`], one tick at a time.
//!
//! Plan steps are issued strictly in order: a step is turned into a primitive [`Command`] only
//! once the unit carrying out the previous step has gone idle. Unit ids in the plan are the
//! planner's ids; workers produced during execution get whatever id the simulation hands out,
//! so the executor keeps a map from planned ids to live ids and fills it in as new workers
//! appear.
//!
//! ```
//! use strips_planner::{
//!     ExecutorStatus, GridSimulation, PlanExecutor, Planner, PlannerConfig, Simulation,
//!     WorldSnapshot,
//! };
//!
//! let snapshot = WorldSnapshot::from_json(r#"{
//!     "width": 8, "height": 8,
//!     "town_hall": { "id": 0, "position": { "x": 0, "y": 0 } },
//!     "workers": [ { "id": 1, "position": { "x": 1, "y": 0 } } ],
//!     "resources": [ { "id": 2, "kind": "gold", "position": { "x": 5, "y": 0 }, "amount": 300 } ]
//! }"#).unwrap();
//! let config = PlannerConfig::new(200, 0, false);
//! let plan = Planner::new().plan(&snapshot, &config).unwrap().unwrap();
//!
//! let mut simulation = GridSimulation::new(snapshot.clone());
//! let mut executor = PlanExecutor::new(plan, &snapshot);
//! while executor.tick(&mut simulation).unwrap() == ExecutorStatus::Running {
//!     simulation.step();
//! }
//! assert_eq!(simulation.snapshot().gold, 200);
//! ```

use crate::world::{Position, ResourceId, UnitId, WorldSnapshot};
use crate::{Action, Plan, PlannerError, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;

/// A primitive order the simulation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveTo { unit: UnitId, target: Position },
    Gather { unit: UnitId, resource: ResourceId },
    Deposit { unit: UnitId, town_hall: UnitId },
    Train { town_hall: UnitId },
}

impl Command {
    /// The unit that is busy while the command runs.
    pub fn unit(&self) -> UnitId {
        match self {
            Command::MoveTo { unit, .. }
            | Command::Gather { unit, .. }
            | Command::Deposit { unit, .. } => *unit,
            Command::Train { town_hall } => *town_hall,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::MoveTo { unit, target } => write!(f, "unit {} move to {}", unit, target),
            Command::Gather { unit, resource } => {
                write!(f, "unit {} gather from resource {}", unit, resource)
            }
            Command::Deposit { unit, town_hall } => {
                write!(f, "unit {} deposit at town hall {}", unit, town_hall)
            }
            Command::Train { town_hall } => write!(f, "town hall {} train worker", town_hall),
        }
    }
}

/// The live world the executor drives.
pub trait Simulation {
    /// Current picture of the world
    fn snapshot(&self) -> WorldSnapshot;

    /// Whether a unit is still carrying out its last command
    fn is_busy(&self, unit: UnitId) -> bool;

    /// Hands a command to the simulation; it starts running on the next step
    fn submit(&mut self, command: Command) -> Result<()>;

    /// Advances the world by one tick
    fn step(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorStatus {
    /// Steps remain or one is still in progress
    Running,
    /// Every step has been issued and has finished
    Finished,
}

#[derive(Debug)]
struct InFlight {
    action: Action,
    unit: UnitId,
    /// Workers alive when a `ProduceWorker` was issued
    workers_before: BTreeSet<UnitId>,
}

/// Issues plan steps to a simulation in order.
#[derive(Debug)]
pub struct PlanExecutor {
    pending: VecDeque<Action>,
    in_flight: Option<InFlight>,
    live_ids: HashMap<UnitId, UnitId>,
    next_planned_id: UnitId,
    town_hall: UnitId,
    completed: usize,
}

impl PlanExecutor {
    /// Prepares to execute `plan`, which was computed from `snapshot`.
    pub fn new(plan: Plan, snapshot: &WorldSnapshot) -> Self {
        let live_ids = snapshot
            .workers
            .iter()
            .map(|w| (w.id, w.id))
            .chain(std::iter::once((snapshot.town_hall.id, snapshot.town_hall.id)))
            .collect();

        Self {
            pending: plan.into_iter().collect(),
            in_flight: None,
            live_ids,
            next_planned_id: snapshot.first_free_unit_id(),
            town_hall: snapshot.town_hall.id,
            completed: 0,
        }
    }

    /// Steps not yet issued.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Steps issued and finished.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Live id of a unit the plan refers to, if it exists yet.
    pub fn live_id(&self, planned: UnitId) -> Option<UnitId> {
        self.live_ids.get(&planned).copied()
    }

    /// Does this tick's work: retires the running step if its unit went idle and issues the
    /// next one.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::Execution`] when a step names a unit that does not exist, a
    /// produced worker never shows up, or the simulation refuses a command. The failed step
    /// stays where it was, so a later tick retries it.
    pub fn tick<S: Simulation + ?Sized>(&mut self, simulation: &mut S) -> Result<ExecutorStatus> {
        if let Some(flight) = &self.in_flight {
            if simulation.is_busy(flight.unit) {
                return Ok(ExecutorStatus::Running);
            }
        }
        if let Some(flight) = self.in_flight.take() {
            if let Err(e) = self.retire(&flight, simulation) {
                self.in_flight = Some(flight);
                return Err(e);
            }
        }

        // a step leaves the queue only once the simulation has accepted it
        let Some(action) = self.pending.front().cloned() else {
            return Ok(ExecutorStatus::Finished);
        };
        self.issue(action, simulation)?;
        self.pending.pop_front();
        Ok(ExecutorStatus::Running)
    }

    /// Ticks and steps the simulation until the plan finishes, returning the ticks taken.
    pub fn run<S: Simulation + ?Sized>(&mut self, simulation: &mut S, max_ticks: u64) -> Result<u64> {
        let mut ticks = 0;
        while self.tick(simulation)? == ExecutorStatus::Running {
            if ticks >= max_ticks {
                return Err(PlannerError::Execution(format!(
                    "plan still running after {} ticks with {} step(s) left",
                    max_ticks,
                    self.pending.len()
                )));
            }
            simulation.step();
            ticks += 1;
        }
        log::info!("Plan finished after {} ticks", ticks);
        Ok(ticks)
    }

    fn retire<S: Simulation + ?Sized>(&mut self, flight: &InFlight, simulation: &S) -> Result<()> {
        if let Action::ProduceWorker { .. } = flight.action {
            let snapshot = simulation.snapshot();
            let spawned = snapshot
                .workers
                .iter()
                .map(|w| w.id)
                .find(|id| !flight.workers_before.contains(id))
                .ok_or_else(|| {
                    PlannerError::Execution(format!(
                        "{} finished but no new worker appeared",
                        flight.action
                    ))
                })?;
            log::debug!(
                "Planned worker {} is live unit {}",
                self.next_planned_id,
                spawned
            );
            self.live_ids.insert(self.next_planned_id, spawned);
            self.next_planned_id = self.next_planned_id.saturating_add(1);
        }
        self.completed += 1;
        Ok(())
    }

    fn issue<S: Simulation + ?Sized>(&mut self, action: Action, simulation: &mut S) -> Result<()> {
        let unit = self.live_id(action.unit()).ok_or_else(|| {
            PlannerError::Execution(format!("{} refers to a unit that does not exist", action))
        })?;

        let command = match &action {
            Action::Move { target, .. } => Command::MoveTo {
                unit,
                target: *target,
            },
            Action::Harvest { resource, .. } => Command::Gather {
                unit,
                resource: *resource,
            },
            Action::Deposit { .. } => Command::Deposit {
                unit,
                town_hall: self.town_hall,
            },
            Action::ProduceWorker { .. } => Command::Train { town_hall: unit },
        };

        let workers_before = match action {
            Action::ProduceWorker { .. } => {
                simulation.snapshot().workers.iter().map(|w| w.id).collect()
            }
            _ => BTreeSet::new(),
        };

        log::info!("Step {}: {} -> {}", self.completed + 1, action, command);
        simulation.submit(command)?;
        self.in_flight = Some(InFlight {
            action,
            unit,
            workers_before,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ResourceKind, ResourceSnapshot, TownHallSnapshot, WorkerSnapshot};
    use crate::{GridSimulation, Rules};

    /// Records commands and keeps each unit busy for two ticks.
    struct Recorder {
        snapshot: WorldSnapshot,
        busy: HashMap<UnitId, u32>,
        submitted: Vec<Command>,
        spawn_id: UnitId,
        spawns: bool,
    }

    impl Recorder {
        fn new(snapshot: WorldSnapshot) -> Self {
            Self {
                snapshot,
                busy: HashMap::new(),
                submitted: Vec::new(),
                spawn_id: 90,
                spawns: true,
            }
        }
    }

    impl Simulation for Recorder {
        fn snapshot(&self) -> WorldSnapshot {
            self.snapshot.clone()
        }

        fn is_busy(&self, unit: UnitId) -> bool {
            self.busy.contains_key(&unit)
        }

        fn submit(&mut self, command: Command) -> Result<()> {
            self.busy.insert(command.unit(), 2);
            self.submitted.push(command);
            Ok(())
        }

        fn step(&mut self) {
            let finished: Vec<UnitId> = self
                .busy
                .iter_mut()
                .filter_map(|(unit, left)| {
                    *left -= 1;
                    (*left == 0).then_some(*unit)
                })
                .collect();
            for unit in finished {
                self.busy.remove(&unit);
                if !self.spawns {
                    continue;
                }
                if let Some(Command::Train { .. }) = self.submitted.last() {
                    self.snapshot.workers.push(WorkerSnapshot {
                        id: self.spawn_id,
                        position: self.snapshot.town_hall.position,
                        cargo: None,
                    });
                    self.spawn_id += 1;
                }
            }
        }
    }

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            width: 5,
            height: 5,
            town_hall: TownHallSnapshot {
                id: 0,
                position: Position::new(0, 0),
            },
            workers: vec![WorkerSnapshot {
                id: 1,
                position: Position::new(1, 1),
                cargo: None,
            }],
            resources: Vec::new(),
            gold: 0,
            wood: 0,
            rules: Rules::default(),
        }
    }

    #[test]
    fn test_waits_for_unit_before_next_step() {
        let snap = snapshot();
        let plan = Plan::new(vec![
            Action::Harvest {
                unit: 1,
                resource: 4,
                cost: 1,
            },
            Action::Deposit { unit: 1, cost: 1 },
        ]);
        let mut sim = Recorder::new(snap.clone());
        let mut executor = PlanExecutor::new(plan, &snap);

        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Running);
        assert_eq!(sim.submitted.len(), 1);
        sim.step();
        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Running);
        assert_eq!(sim.submitted.len(), 1);
        sim.step();
        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Running);
        assert_eq!(
            sim.submitted,
            [
                Command::Gather {
                    unit: 1,
                    resource: 4
                },
                Command::Deposit {
                    unit: 1,
                    town_hall: 0
                },
            ]
        );
        sim.step();
        sim.step();
        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Finished);
        assert_eq!(executor.completed(), 2);
        assert_eq!(executor.remaining(), 0);
    }

    #[test]
    fn test_maps_produced_worker_to_live_id() {
        let snap = snapshot();
        let plan = Plan::new(vec![
            Action::ProduceWorker {
                town_hall: 0,
                cost: 1,
            },
            Action::Deposit { unit: 2, cost: 1 },
        ]);
        let mut sim = Recorder::new(snap.clone());
        let mut executor = PlanExecutor::new(plan, &snap);

        executor.run(&mut sim, 20).unwrap();
        assert_eq!(executor.live_id(2), Some(90));
        assert_eq!(
            sim.submitted.last(),
            Some(&Command::Deposit {
                unit: 90,
                town_hall: 0
            })
        );
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let snap = snapshot();
        let plan = Plan::new(vec![Action::Deposit { unit: 7, cost: 1 }]);
        let mut sim = Recorder::new(snap.clone());
        let mut executor = PlanExecutor::new(plan, &snap);
        assert!(matches!(
            executor.tick(&mut sim),
            Err(PlannerError::Execution(_))
        ));
    }

    #[test]
    fn test_run_gives_up_after_max_ticks() {
        let snap = snapshot();
        let plan = Plan::new(vec![Action::Deposit { unit: 1, cost: 1 }]);
        let mut sim = Recorder::new(snap.clone());
        let mut executor = PlanExecutor::new(plan, &snap);
        assert!(matches!(
            executor.run(&mut sim, 1),
            Err(PlannerError::Execution(_))
        ));
    }

    #[test]
    fn test_rejected_step_stays_pending() {
        let mut snap = snapshot();
        snap.resources.push(ResourceSnapshot {
            id: 2,
            kind: ResourceKind::Wood,
            position: Position::new(4, 4),
            amount: 100,
        });
        // the worker never walked to the node
        let plan = Plan::new(vec![
            Action::Harvest {
                unit: 1,
                resource: 2,
                cost: 1,
            },
            Action::Move {
                unit: 1,
                from: crate::Location::Resource(2),
                to: crate::Location::TownHall,
                target: Position::new(0, 0),
                cost: 4,
            },
        ]);
        let mut sim = GridSimulation::new(snap.clone());
        let mut executor = PlanExecutor::new(plan, &snap);

        for _ in 0..2 {
            assert!(matches!(
                executor.tick(&mut sim),
                Err(PlannerError::Execution(_))
            ));
            assert_eq!(executor.remaining(), 2);
            assert_eq!(executor.completed(), 0);
            assert!(!sim.is_busy(1));
        }
    }

    #[test]
    fn test_failed_retire_keeps_step_in_flight() {
        let snap = snapshot();
        let plan = Plan::new(vec![
            Action::ProduceWorker {
                town_hall: 0,
                cost: 1,
            },
            Action::Deposit { unit: 2, cost: 1 },
        ]);
        let mut sim = Recorder::new(snap.clone());
        sim.spawns = false;
        let mut executor = PlanExecutor::new(plan, &snap);

        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Running);
        sim.step();
        sim.step();
        for _ in 0..2 {
            assert!(matches!(
                executor.tick(&mut sim),
                Err(PlannerError::Execution(_))
            ));
            assert_eq!(executor.completed(), 0);
            assert_eq!(executor.remaining(), 1);
        }
        assert_eq!(sim.submitted, [Command::Train { town_hall: 0 }]);

        // the worker turns up late and execution carries on
        sim.snapshot.workers.push(WorkerSnapshot {
            id: 90,
            position: Position::new(0, 0),
            cargo: None,
        });
        assert_eq!(executor.tick(&mut sim).unwrap(), ExecutorStatus::Running);
        assert_eq!(executor.completed(), 1);
        assert_eq!(executor.live_id(2), Some(90));
    }
}
