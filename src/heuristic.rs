use crate::state::{Location, State, Worker};
use crate::world::{Cost, ResourceKind, Rules, World};
use crate::PlannerConfig;

/// Estimates the cost still needed to reach the goal from a state.
///
/// The search stays correct for any estimate; the returned plan is only guaranteed to be
/// cheapest when the estimate never exceeds the true remaining cost.
pub trait Heuristic: Send + Sync {
    fn estimate(&self, state: &State, world: &World, config: &PlannerConfig) -> Cost;
}

/// Workers with something to contribute beyond which loads are no longer assigned one by one.
const EXACT_ASSIGNMENT_LIMIT: usize = 6;

/// Lower bound on the gathering work left.
///
/// Every unit still missing from a stockpile arrives in some load, and a load is one of:
/// - cargo a worker already carries, costing a deposit plus the walk home;
/// - the first harvest of an empty-handed worker, costing a harvest, a deposit, the walk to the
///   nearest usable node and the shortest haul home;
/// - a full trip from the town hall, costing a harvest, a deposit and the shortest haul both ways.
///
/// Each worker contributes at most one of the first two kinds of load, and to one resource kind
/// only; the estimate is the cheapest such assignment with full trips covering the rest. With no
/// workers at all, one production step is added.
///
/// The estimate never exceeds the true remaining cost, and no action lowers it by more than its
/// own cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceDeficitHeuristic;

/// One load a worker could bring to the town hall.
#[derive(Debug, Clone, Copy)]
struct Load {
    slot: usize,
    amount: u32,
    cost: Cost,
}

/// What is still missing of one resource kind.
#[derive(Debug, Clone, Copy, Default)]
struct Shortfall {
    deficit: u32,
    /// Cheapest hall-to-node walk; `None` when no node of the kind has anything left
    haul: Option<Cost>,
}

impl Shortfall {
    /// Cost of the full trips still needed once `covered` has been delivered by other loads.
    fn trips_cost(&self, covered: u32, rules: &Rules) -> Cost {
        let rest = self.deficit.saturating_sub(covered);
        if rest == 0 {
            return 0;
        }
        match self.haul {
            Some(haul) => rest.div_ceil(rules.carry_capacity).saturating_mul(
                rules
                    .harvest_cost
                    .saturating_add(rules.deposit_cost)
                    .saturating_add(haul.saturating_mul(2)),
            ),
            // nothing left to harvest: only loads already carried can help
            None => Cost::MAX,
        }
    }
}

fn slot(kind: ResourceKind) -> usize {
    match kind {
        ResourceKind::Gold => 0,
        ResourceKind::Wood => 1,
    }
}

impl ResourceDeficitHeuristic {
    /// Loads `worker` could contribute on its own, at most one of which is used.
    fn loads(
        worker: &Worker,
        state: &State,
        world: &World,
        shortfalls: &[Shortfall; 2],
    ) -> Vec<Load> {
        let rules = world.rules();

        if let Some(cargo) = worker.cargo {
            let slot = slot(cargo.kind);
            if shortfalls[slot].deficit == 0 {
                return Vec::new();
            }
            let walk = match worker.location {
                Location::TownHall => 0,
                other => world.move_cost(&other, &Location::TownHall),
            };
            return vec![Load {
                slot,
                amount: cargo.amount,
                cost: rules.deposit_cost.saturating_add(walk),
            }];
        }

        ResourceKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let slot = slot(kind);
                let haul = shortfalls[slot].haul?;
                let leg = world
                    .resources()
                    .filter(|node| node.kind == kind && state.remaining(node.id) > 0)
                    .map(|node| {
                        let at_node = Location::Resource(node.id);
                        if worker.location == at_node {
                            0
                        } else {
                            world.move_cost(&worker.location, &at_node)
                        }
                    })
                    .min()?;
                // a first trip no shorter than a full one is already counted as a full trip
                (leg < haul).then(|| Load {
                    slot,
                    amount: rules.carry_capacity,
                    cost: rules
                        .harvest_cost
                        .saturating_add(rules.deposit_cost)
                        .saturating_add(leg)
                        .saturating_add(haul),
                })
            })
            .collect()
    }

    /// Cheapest way to cover every shortfall, choosing at most one load per worker.
    fn cheapest(
        options: &[Vec<Load>],
        covered: [u32; 2],
        spent: Cost,
        shortfalls: &[Shortfall; 2],
        rules: &Rules,
    ) -> Cost {
        let Some((first, rest)) = options.split_first() else {
            return shortfalls
                .iter()
                .zip(covered)
                .fold(spent, |acc, (shortfall, covered)| {
                    acc.saturating_add(shortfall.trips_cost(covered, rules))
                });
        };

        let mut best = Self::cheapest(rest, covered, spent, shortfalls, rules);
        for load in first {
            let mut covered = covered;
            covered[load.slot] = covered[load.slot].saturating_add(load.amount);
            let cost = Self::cheapest(
                rest,
                covered,
                spent.saturating_add(load.cost),
                shortfalls,
                rules,
            );
            best = best.min(cost);
        }
        best
    }
}

impl Heuristic for ResourceDeficitHeuristic {
    fn estimate(&self, state: &State, world: &World, config: &PlannerConfig) -> Cost {
        let rules = world.rules();

        let mut shortfalls = [Shortfall::default(); 2];
        for kind in ResourceKind::ALL {
            let required = match kind {
                ResourceKind::Gold => config.required_gold,
                ResourceKind::Wood => config.required_wood,
            };
            let deficit = required.saturating_sub(state.stock(kind));
            if deficit > 0 {
                shortfalls[slot(kind)] = Shortfall {
                    deficit,
                    haul: world.shortest_haul(kind, state),
                };
            }
        }
        if shortfalls.iter().all(|shortfall| shortfall.deficit == 0) {
            return 0;
        }

        let options: Vec<Vec<Load>> = state
            .workers()
            .map(|(_, worker)| Self::loads(worker, state, world, &shortfalls))
            .filter(|loads| !loads.is_empty())
            .collect();

        let gathering = if options.len() <= EXACT_ASSIGNMENT_LIMIT {
            Self::cheapest(&options, [0; 2], 0, &shortfalls, rules)
        } else {
            // every load needs its own deposit
            shortfalls.iter().fold(0, |acc: Cost, shortfall| {
                acc.saturating_add(
                    shortfall
                        .deficit
                        .div_ceil(rules.carry_capacity)
                        .saturating_mul(rules.deposit_cost),
                )
            })
        };

        if state.worker_count() == 0 {
            gathering.saturating_add(rules.produce_cost)
        } else {
            gathering
        }
    }
}

/// Always estimates zero, turning A* into uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl Heuristic for ZeroHeuristic {
    fn estimate(&self, _state: &State, _world: &World, _config: &PlannerConfig) -> Cost {
        0
    }
}
