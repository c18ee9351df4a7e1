use crate::heuristic::{Heuristic, ResourceDeficitHeuristic, ZeroHeuristic};
use crate::successor::Successor;
use crate::world::{Cost, World};
use crate::{Action, PlannerConfig, State};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Bounds on a single search run, checked once per loop iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Stop after this many expansions
    pub max_expansions: Option<usize>,
    /// Stop once this much wall-clock time has passed since the search started
    pub timeout: Option<Duration>,
}

/// Counters collected while searching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States moved to the explored set
    pub expanded: usize,
    /// Children produced by successor generation
    pub generated: usize,
    /// Children dropped because an equal state was explored or queued at no greater cost
    pub duplicates: usize,
    /// Largest number of live states in the frontier
    pub frontier_peak: usize,
}

/// A goal state together with the actions leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Actions in execution order
    pub actions: Vec<Action>,
    /// Path cost of the goal state
    pub cost: Cost,
    /// The state the actions lead to
    pub goal: State,
    /// Counters from the run that found it
    pub stats: SearchStats,
}

/// How a search run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Solution),
    /// The frontier emptied without reaching a goal
    Exhausted(SearchStats),
    /// A [`SearchLimits`] bound was hit first
    LimitReached(SearchStats),
}

impl SearchOutcome {
    /// Counters of the run, whichever way it ended.
    pub fn stats(&self) -> &SearchStats {
        match self {
            SearchOutcome::Found(solution) => &solution.stats,
            SearchOutcome::Exhausted(stats) | SearchOutcome::LimitReached(stats) => stats,
        }
    }

    /// The solution, if the run found one.
    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SearchOutcome::Found(solution) => Some(solution),
            _ => None,
        }
    }
}

/// Represents a node in the search space.
#[derive(Debug, Clone)]
struct Node {
    state: State,
    /// Index of the parent node in the arena
    parent: Option<usize>,
    /// Action that led to this state (from parent)
    action: Option<Action>,
    g_cost: Cost,
    h_cost: Cost,
}

impl Node {
    fn f_cost(&self) -> Cost {
        self.g_cost.saturating_add(self.h_cost)
    }
}

/// Frontier entry ordered by f, then h, then arena index (insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrontierEntry {
    idx: usize,
    f_cost: Cost,
    h_cost: Cost,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_cost
            .cmp(&other.f_cost)
            .then(self.h_cost.cmp(&other.h_cost))
            .then(self.idx.cmp(&other.idx))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Manages the state of a graph search.
struct SearchContext {
    /// Every node created during the search; parents are indices into it
    nodes: Vec<Node>,
    /// Min-heap of frontier entries; superseded entries are skipped when popped
    open_set: BinaryHeap<Reverse<FrontierEntry>>,
    /// Best node for every state discovered so far
    index: HashMap<State, usize>,
    /// Nodes that have been expanded
    closed_set: HashSet<usize>,
    open_count: usize,
    stats: SearchStats,
}

impl SearchContext {
    fn new(start: State, h_cost: Cost) -> Self {
        let mut context = Self {
            nodes: Vec::new(),
            open_set: BinaryHeap::new(),
            index: HashMap::new(),
            closed_set: HashSet::new(),
            open_count: 0,
            stats: SearchStats::default(),
        };
        context.push(Node {
            state: start,
            parent: None,
            action: None,
            g_cost: 0,
            h_cost,
        });
        context
    }

    /// Adds a node to the arena and the frontier, superseding any queued node for its state.
    fn push(&mut self, node: Node) {
        let idx = self.nodes.len();
        let entry = FrontierEntry {
            idx,
            f_cost: node.f_cost(),
            h_cost: node.h_cost,
        };
        if self.index.insert(node.state.clone(), idx).is_none() {
            self.open_count += 1;
            self.stats.frontier_peak = self.stats.frontier_peak.max(self.open_count);
        }
        self.nodes.push(node);
        self.open_set.push(Reverse(entry));
    }

    /// Pops the best live frontier node.
    fn next_node(&mut self) -> Option<usize> {
        while let Some(Reverse(entry)) = self.open_set.pop() {
            let live = self.index.get(&self.nodes[entry.idx].state) == Some(&entry.idx);
            if live && !self.closed_set.contains(&entry.idx) {
                self.open_count -= 1;
                return Some(entry.idx);
            }
        }
        None
    }

    fn mark_visited(&mut self, node_idx: usize) {
        self.closed_set.insert(node_idx);
        self.stats.expanded += 1;
    }

    /// Queues a child unless an equal state is already explored or queued at no greater cost.
    fn process_successor(
        &mut self,
        parent_idx: usize,
        successor: Successor,
        heuristic: &dyn Heuristic,
        world: &World,
        config: &PlannerConfig,
    ) -> bool {
        self.stats.generated += 1;
        let g_cost = self.nodes[parent_idx]
            .g_cost
            .saturating_add(successor.action.cost());

        if let Some(&existing) = self.index.get(&successor.state) {
            // explored states are never reopened
            if self.closed_set.contains(&existing) || self.nodes[existing].g_cost <= g_cost {
                self.stats.duplicates += 1;
                return false;
            }
        }

        let h_cost = heuristic.estimate(&successor.state, world, config);
        self.push(Node {
            state: successor.state,
            parent: Some(parent_idx),
            action: Some(successor.action),
            g_cost,
            h_cost,
        });
        true
    }

    /// Walks the parent chain back to the start and returns the actions in execution order.
    fn reconstruct_path(&self, node_idx: usize) -> Vec<Action> {
        let mut path = Vec::new();
        let mut current_idx = node_idx;

        while let Some(node) = self.nodes.get(current_idx) {
            if let Some(action) = &node.action {
                path.push(action.clone());
            }

            if let Some(parent_idx) = node.parent {
                current_idx = parent_idx;
            } else {
                break;
            }
        }

        path.reverse();
        path
    }
}

/// Best-first search ordered by `g + h`.
///
/// # Examples
///
/// ```
/// use strips_planner::{AStarSearch, PlannerConfig, SearchOutcome, World, WorldSnapshot};
///
/// let snapshot = WorldSnapshot::from_json(r#"{
///     "width": 8, "height": 8,
///     "town_hall": { "id": 0, "position": { "x": 0, "y": 0 } },
///     "workers": [ { "id": 1, "position": { "x": 1, "y": 1 } } ],
///     "resources": [ { "id": 2, "kind": "gold", "position": { "x": 4, "y": 0 }, "amount": 500 } ]
/// }"#).unwrap();
/// let (world, start) = World::from_snapshot(&snapshot).unwrap();
///
/// let outcome = AStarSearch::default().search(&start, &world, &PlannerConfig::new(100, 0, false));
/// let SearchOutcome::Found(solution) = outcome else { panic!("expected a plan") };
/// let steps: Vec<String> = solution.actions.iter().map(|a| a.to_string()).collect();
/// assert_eq!(steps, ["Move(1, 4, 0)", "Harvest(1, 2)", "Move(1, 0, 0)", "Deposit(1)"]);
/// assert_eq!(solution.cost, 10);
/// ```
pub struct AStarSearch {
    heuristic: Box<dyn Heuristic>,
    limits: SearchLimits,
}

impl AStarSearch {
    /// Creates a search guided by `heuristic`, with no limits.
    pub fn new(heuristic: Box<dyn Heuristic>) -> Self {
        Self {
            heuristic,
            limits: SearchLimits::default(),
        }
    }

    /// Creates a search guided by [`ResourceDeficitHeuristic`].
    pub fn with_default_heuristic() -> Self {
        Self::new(Box::new(ResourceDeficitHeuristic))
    }

    /// Uniform-cost search: A* with a zero heuristic.
    pub fn dijkstra() -> Self {
        Self::new(Box::new(ZeroHeuristic))
    }

    /// Sets the bounds checked on every iteration.
    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The bounds this search stops at.
    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Searches from `start` for a state whose stockpiles meet `config`.
    pub fn search(&self, start: &State, world: &World, config: &PlannerConfig) -> SearchOutcome {
        let started = Instant::now();
        let h_start = self.heuristic.estimate(start, world, config);
        let mut context = SearchContext::new(start.clone(), h_start);
        log::debug!("Starting search with h(start) = {}", h_start);

        while let Some(current_idx) = context.next_node() {
            let node = &context.nodes[current_idx];
            if node.state.is_goal(config) {
                let solution = Solution {
                    actions: context.reconstruct_path(current_idx),
                    cost: node.g_cost,
                    goal: node.state.clone(),
                    stats: context.stats,
                };
                log::info!(
                    "Found plan of {} actions (cost {}) after {} expansions, {} generated, {} duplicates",
                    solution.actions.len(),
                    solution.cost,
                    solution.stats.expanded,
                    solution.stats.generated,
                    solution.stats.duplicates
                );
                return SearchOutcome::Found(solution);
            }

            if self.limit_reached(&context.stats, started) {
                log::warn!(
                    "Search stopped by its limits after {} expansions",
                    context.stats.expanded
                );
                return SearchOutcome::LimitReached(context.stats);
            }

            let successors = node.state.successors(world, config);
            context.mark_visited(current_idx);
            if context.stats.expanded % 10_000 == 0 {
                log::debug!(
                    "{} expansions, {} states queued, best f = {}",
                    context.stats.expanded,
                    context.open_count,
                    context.nodes[current_idx].f_cost()
                );
            }

            for successor in successors {
                context.process_successor(
                    current_idx,
                    successor,
                    self.heuristic.as_ref(),
                    world,
                    config,
                );
            }
        }

        log::info!(
            "Frontier exhausted after {} expansions without reaching the goal",
            context.stats.expanded
        );
        SearchOutcome::Exhausted(context.stats)
    }

    fn limit_reached(&self, stats: &SearchStats, started: Instant) -> bool {
        let expansions = self
            .limits
            .max_expansions
            .is_some_and(|max| stats.expanded >= max);
        let timeout = self
            .limits
            .timeout
            .is_some_and(|timeout| started.elapsed() >= timeout);
        expansions || timeout
    }
}

impl Default for AStarSearch {
    fn default() -> Self {
        Self::with_default_heuristic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{
        Position, ResourceKind, ResourceSnapshot, Rules, TownHallSnapshot, WorkerSnapshot,
        WorldSnapshot,
    };

    fn two_worker_world() -> (World, State) {
        let snapshot = WorldSnapshot {
            width: 12,
            height: 12,
            town_hall: TownHallSnapshot {
                id: 0,
                position: Position::new(5, 5),
            },
            workers: vec![
                WorkerSnapshot {
                    id: 1,
                    position: Position::new(5, 6),
                    cargo: None,
                },
                WorkerSnapshot {
                    id: 2,
                    position: Position::new(10, 10),
                    cargo: None,
                },
            ],
            resources: vec![
                ResourceSnapshot {
                    id: 20,
                    kind: ResourceKind::Gold,
                    position: Position::new(1, 5),
                    amount: 300,
                },
                ResourceSnapshot {
                    id: 21,
                    kind: ResourceKind::Wood,
                    position: Position::new(9, 9),
                    amount: 300,
                },
                ResourceSnapshot {
                    id: 22,
                    kind: ResourceKind::Wood,
                    position: Position::new(5, 11),
                    amount: 300,
                },
            ],
            gold: 0,
            wood: 0,
            rules: Rules::default(),
        };
        World::from_snapshot(&snapshot).unwrap()
    }

    #[test]
    fn test_frontier_order() {
        let a = FrontierEntry {
            idx: 5,
            f_cost: 10,
            h_cost: 4,
        };
        let b = FrontierEntry {
            idx: 1,
            f_cost: 10,
            h_cost: 6,
        };
        let c = FrontierEntry {
            idx: 2,
            f_cost: 10,
            h_cost: 4,
        };
        let d = FrontierEntry {
            idx: 0,
            f_cost: 12,
            h_cost: 0,
        };
        let mut heap: BinaryHeap<Reverse<FrontierEntry>> =
            [a, b, c, d].into_iter().map(Reverse).collect();
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|Reverse(e)| e.idx)).collect();
        assert_eq!(order, [2, 5, 1, 0]);
    }

    #[test]
    fn test_goal_at_start_gives_empty_plan() {
        let (world, start) = two_worker_world();
        let outcome = AStarSearch::default().search(&start, &world, &PlannerConfig::new(0, 0, false));
        let solution = outcome.into_solution().unwrap();
        assert!(solution.actions.is_empty());
        assert_eq!(solution.cost, 0);
        assert_eq!(solution.goal, start);
        assert_eq!(solution.stats.expanded, 0);
    }

    #[test]
    fn test_astar_matches_uniform_cost_optimum() {
        let (world, start) = two_worker_world();
        let config = PlannerConfig::new(200, 200, false);

        let astar = AStarSearch::default()
            .search(&start, &world, &config)
            .into_solution()
            .unwrap();
        let dijkstra = AStarSearch::dijkstra()
            .search(&start, &world, &config)
            .into_solution()
            .unwrap();

        assert_eq!(astar.cost, dijkstra.cost);
        assert!(astar.stats.expanded <= dijkstra.stats.expanded);
    }

    #[test]
    fn test_replaying_parent_chain_reproduces_goal() {
        let (world, start) = two_worker_world();
        let config = PlannerConfig::new(100, 200, false);
        let solution = AStarSearch::default()
            .search(&start, &world, &config)
            .into_solution()
            .unwrap();

        let mut state = start.clone();
        let mut g = 0;
        for action in &solution.actions {
            assert!(action.is_applicable(&state, &world, &config));
            let next = action.apply(&state, &world, &config);
            assert!(action.cost() > 0);
            g += action.cost();
            state = next;
        }
        assert_eq!(state, solution.goal);
        assert_eq!(g, solution.cost);
        assert!(state.is_goal(&config));
    }

    #[test]
    fn test_unreachable_goal_exhausts_frontier() {
        let snapshot = WorldSnapshot {
            width: 6,
            height: 6,
            town_hall: TownHallSnapshot {
                id: 0,
                position: Position::new(0, 0),
            },
            workers: vec![WorkerSnapshot {
                id: 1,
                position: Position::new(0, 1),
                cargo: None,
            }],
            resources: vec![ResourceSnapshot {
                id: 3,
                kind: ResourceKind::Gold,
                position: Position::new(4, 4),
                amount: 300,
            }],
            gold: 0,
            wood: 0,
            rules: Rules::default(),
        };
        let (world, start) = World::from_snapshot(&snapshot).unwrap();
        // only 300 gold exists on the map
        let config = PlannerConfig::new(400, 0, false);
        let outcome = AStarSearch::default().search(&start, &world, &config);
        assert!(matches!(outcome, SearchOutcome::Exhausted(_)));
        assert!(outcome.stats().expanded > 0);
    }

    #[test]
    fn test_expansion_limit() {
        let (world, start) = two_worker_world();
        let config = PlannerConfig::new(300, 300, false);
        let search = AStarSearch::default().with_limits(SearchLimits {
            max_expansions: Some(3),
            timeout: None,
        });
        let outcome = search.search(&start, &world, &config);
        assert!(matches!(outcome, SearchOutcome::LimitReached(_)));
        assert_eq!(outcome.stats().expanded, 3);
    }

    #[test]
    fn test_zero_timeout_stops_immediately() {
        let (world, start) = two_worker_world();
        let search = AStarSearch::default().with_limits(SearchLimits {
            max_expansions: None,
            timeout: Some(Duration::ZERO),
        });
        let outcome = search.search(&start, &world, &PlannerConfig::new(100, 0, false));
        assert!(matches!(outcome, SearchOutcome::LimitReached(_)));
    }

    #[test]
    fn test_duplicate_states_are_not_requeued() {
        let (world, start) = two_worker_world();
        let outcome = AStarSearch::dijkstra().search(&start, &world, &PlannerConfig::new(100, 100, false));
        let stats = *outcome.stats();
        assert!(stats.duplicates > 0);
        assert!(stats.generated >= stats.duplicates);
        assert!(stats.frontier_peak > 0);
    }

    #[test]
    fn test_cheaper_path_replaces_queued_node() {
        let (world, start) = two_worker_world();
        let config = PlannerConfig::new(100, 0, false);
        let child = start.successors(&world, &config).remove(0);

        let mut context = SearchContext::new(start, 5);
        context.push(Node {
            state: child.state.clone(),
            parent: Some(0),
            action: Some(child.action.clone()),
            g_cost: 9,
            h_cost: 1,
        });
        assert_eq!(context.open_count, 2);

        // same state, reached more cheaply
        context.push(Node {
            state: child.state.clone(),
            parent: Some(0),
            action: Some(child.action),
            g_cost: 3,
            h_cost: 1,
        });
        assert_eq!(context.open_count, 2);
        assert_eq!(context.index[&child.state], 2);
        assert_eq!(context.stats.frontier_peak, 2);

        assert_eq!(context.next_node(), Some(2));
        assert_eq!(context.next_node(), Some(0));
        // the superseded entry for node 1 is skipped
        assert_eq!(context.next_node(), None);
        assert_eq!(context.open_count, 0);
    }

    #[test]
    fn test_costlier_path_to_queued_state_is_dropped() {
        let (world, start) = two_worker_world();
        let config = PlannerConfig::new(100, 0, false);
        let child = start.successors(&world, &config).remove(0);
        let heuristic = ZeroHeuristic;

        let mut context = SearchContext::new(start, 0);
        assert!(context.process_successor(0, child.clone(), &heuristic, &world, &config));
        assert!(!context.process_successor(0, child, &heuristic, &world, &config));
        assert_eq!(context.stats.duplicates, 1);
        assert_eq!(context.open_count, 2);
        assert_eq!(context.nodes.len(), 2);
    }
}
