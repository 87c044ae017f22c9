//! Best-first branch-and-bound over reduced cost matrices.
//!
//! The driver owns the frontier, the incumbent tour and the statistics for
//! the duration of one [`BranchAndBound::solve`] call. The time budget is an
//! absolute deadline fixed when the driver is built and is checked once per
//! loop iteration, before popping; a single expansion is never interrupted.
//! Seed heuristics run inside the same budget, see [`BranchAndBound::seed_tour`].

use super::frontier::Frontier;
use super::node::SearchNode;
use super::observer::{LogObserver, NoOpObserver, PruneReason, SearchObserver};
use super::stats::SearchStats;
use crate::error::{SolverError, SolverResult};
use crate::heuristics::construction::{
    ConstructionHeuristic, MultiStartConstruction, NearestNeighborHeuristic, RandomTourHeuristic,
};
use crate::instance::TspInstance;
use crate::solution::Solution;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const ALGORITHM: &str = "BranchAndBound";

/// Source of the current instant. Lets tests drive the time budget.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Heuristic used to obtain the initial incumbent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStrategy {
    None,
    Random,
    Greedy,
    MultiStart,
}

/// Branch-and-bound configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BnbConfig {
    /// Time limit in seconds, measured from driver construction
    pub time_limit: f64,
    /// City every tour starts from
    pub start_city: usize,
    /// How the initial incumbent is obtained
    pub seed_strategy: SeedStrategy,
    /// Random seed for the seed heuristics
    pub random_seed: u64,
}

impl Default for BnbConfig {
    fn default() -> Self {
        BnbConfig {
            time_limit: 60.0,
            start_city: 0,
            seed_strategy: SeedStrategy::Greedy,
            random_seed: 42,
        }
    }
}

impl BnbConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if !self.time_limit.is_finite() || self.time_limit < 0.0 {
            return Err(SolverError::Config(format!(
                "time limit must be a non-negative number of seconds, got {}",
                self.time_limit
            )));
        }
        Ok(())
    }
}

/// Result of a branch-and-bound run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BnbResult {
    /// Cost of the best tour, infinite if none was found
    pub cost: f64,
    /// Elapsed time in seconds
    pub time: f64,
    /// Improving tours found during the search, the seed excluded
    pub solutions_found: u64,
    /// Best tour, empty if none was found
    pub tour: Vec<usize>,
    pub max_frontier_size: usize,
    pub states_created: u64,
    pub states_pruned: u64,
    /// Smallest bound still open when the search stopped, capped by the cost
    pub lower_bound: f64,
    /// Relative gap between cost and lower bound
    pub gap: f64,
    /// The frontier emptied: `cost` is the optimum
    pub optimal: bool,
    pub solution: Solution,
    pub stats: SearchStats,
}

impl std::fmt::Display for BnbResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cost: {:.2}", self.cost)?;
        writeln!(f, "Time: {:.4}s", self.time)?;
        writeln!(f, "Optimal: {}", self.optimal)?;
        writeln!(f, "Lower bound: {:.2} (gap {:.2}%)", self.lower_bound, self.gap * 100.0)?;
        writeln!(f, "Tour: {:?}", self.tour)?;
        write!(f, "{}", self.stats)
    }
}

/// Branch-and-bound solver for one instance.
pub struct BranchAndBound<'a, C: Clock = SystemClock> {
    instance: &'a TspInstance,
    config: BnbConfig,
    clock: C,
    started: Instant,
    deadline: Instant,
    frontier: Frontier,
    incumbent: Solution,
    stats: SearchStats,
}

impl<'a> BranchAndBound<'a, SystemClock> {
    pub fn new(instance: &'a TspInstance, config: BnbConfig) -> SolverResult<Self> {
        Self::with_clock(instance, config, SystemClock)
    }
}

impl<'a, C: Clock> BranchAndBound<'a, C> {
    /// The deadline is `config.time_limit` seconds after the clock's current
    /// instant.
    pub fn with_clock(instance: &'a TspInstance, config: BnbConfig, clock: C) -> SolverResult<Self> {
        config.validate()?;
        let budget = Duration::try_from_secs_f64(config.time_limit)
            .map_err(|e| SolverError::Config(format!("time limit {}: {}", config.time_limit, e)))?;
        let started = clock.now();
        let deadline = started
            .checked_add(budget)
            .ok_or_else(|| SolverError::Config(format!("time limit {} is too large", config.time_limit)))?;

        let n = instance.dimension();
        if n > 0 && config.start_city >= n {
            return Err(SolverError::Config(format!(
                "start city {} out of range for {} cities",
                config.start_city, n
            )));
        }

        Ok(BranchAndBound {
            instance,
            config,
            clock,
            started,
            deadline,
            frontier: Frontier::new(),
            incumbent: Solution::new(),
            stats: SearchStats::default(),
        })
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Budget left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(self.clock.now())
    }

    /// Initial incumbent from the configured strategy, limited to the time
    /// left before the deadline.
    pub fn seed_tour(&self) -> Option<Solution> {
        seed_tour(self.instance, &self.config, self.remaining().as_secs_f64())
    }

    pub fn solve(&mut self, seed: Option<Solution>) -> BnbResult {
        self.solve_with_observer(seed, &mut NoOpObserver)
    }

    /// Search from the configured start city. `seed` becomes the initial
    /// incumbent when it is a feasible tour of this instance. Reported time
    /// runs from driver construction.
    pub fn solve_with_observer<O>(&mut self, seed: Option<Solution>, observer: &mut O) -> BnbResult
    where
        O: SearchObserver + ?Sized,
    {
        let instance = self.instance;
        let n = instance.dimension();

        self.stats = SearchStats::default();
        self.frontier = Frontier::new();
        self.incumbent = self.install_seed(seed);

        if n <= 1 {
            self.incumbent = Solution::from_tour(instance, (0..n).collect(), ALGORITHM);
            return self.finish(observer);
        }

        let root = SearchNode::root(instance, self.config.start_city);
        self.stats.on_state_created();
        self.stats.set_root_lower_bound(root.bound());
        observer.on_enter_search(instance, root.bound(), &self.incumbent);

        if root.bound() < self.incumbent.cost {
            observer.on_push(&root, &self.stats);
            self.frontier.push(root);
            self.stats.on_state_pushed(self.frontier.len());
        } else {
            self.stats.on_state_pruned();
            observer.on_prune(root.bound(), self.incumbent.cost, PruneReason::Bound, &self.stats);
        }

        while !self.frontier.is_empty() {
            if self.clock.now() >= self.deadline {
                log::debug!(
                    "time limit reached with {} open states",
                    self.frontier.len()
                );
                break;
            }

            let node = match self.frontier.pop() {
                Some(node) => node,
                None => break,
            };

            if node.bound() >= self.incumbent.cost {
                self.stats.on_stale_discarded();
                observer.on_prune(node.bound(), self.incumbent.cost, PruneReason::Stale, &self.stats);
                continue;
            }

            self.stats.on_state_expanded();
            observer.on_expand(&node, &self.stats);
            self.expand(node, observer);
        }

        self.finish(observer)
    }

    /// One child per finite edge leaving the node's last city.
    fn expand<O>(&mut self, node: SearchNode, observer: &mut O)
    where
        O: SearchObserver + ?Sized,
    {
        let instance = self.instance;
        let n = instance.dimension();
        let mut open = false;

        for next in node.candidate_edges() {
            self.stats.on_state_created();

            // only the start city can still be reached here
            if node.contains(next) {
                self.stats.on_dead_end();
                continue;
            }
            open = true;

            let child = node.child(instance, next);

            if child.depth() == n {
                let total = child.closing_cost(instance);
                if !total.is_finite() {
                    self.stats.on_dead_end();
                } else if total < self.incumbent.cost {
                    self.incumbent = Solution::from_tour(instance, child.into_route(), ALGORITHM);
                    self.stats.on_solution_found();
                    observer.on_solution_found(&self.incumbent, &self.stats);
                } else {
                    self.stats.on_state_pruned();
                    observer.on_prune(total, self.incumbent.cost, PruneReason::CompletedTour, &self.stats);
                }
            } else if child.bound() < self.incumbent.cost {
                observer.on_push(&child, &self.stats);
                self.frontier.push(child);
                self.stats.on_state_pushed(self.frontier.len());
            } else {
                self.stats.on_state_pruned();
                observer.on_prune(child.bound(), self.incumbent.cost, PruneReason::Bound, &self.stats);
            }
        }

        if !open {
            log::trace!("dead end at {:?}", node.route());
            observer.on_dead_end(&node, &self.stats);
        }
    }

    fn install_seed(&self, seed: Option<Solution>) -> Solution {
        let Some(seed) = seed else {
            return Solution::new();
        };

        // re-evaluate: the seed may come from another instance or be stale
        let checked = Solution::from_tour(self.instance, seed.tour, &seed.algorithm);
        if checked.feasible {
            log::debug!("seeding with {} tour of cost {:.2}", checked.algorithm, checked.cost);
            checked
        } else {
            log::warn!("ignoring infeasible seed tour from {}", seed.algorithm);
            Solution::new()
        }
    }

    fn finish<O>(&mut self, observer: &mut O) -> BnbResult
    where
        O: SearchObserver + ?Sized,
    {
        let elapsed = self.clock.now().saturating_duration_since(self.started);
        self.stats.set_total_time(elapsed);
        self.stats.set_frontier_remaining(self.frontier.len());

        self.incumbent.algorithm = ALGORITHM.to_string();
        self.incumbent.computation_time = elapsed.as_secs_f64();
        self.incumbent.iterations = Some(self.stats.states_expanded as usize);

        observer.on_exit_search(&self.incumbent, &self.stats);

        let cost = self.incumbent.cost;
        let optimal = self.stats.exhausted();
        let lower_bound = match self.frontier.peek_bound() {
            Some(bound) if !optimal => bound.min(cost),
            _ => cost,
        };
        let gap = if cost.is_finite() && cost > 0.0 {
            (cost - lower_bound) / cost
        } else {
            0.0
        };

        BnbResult {
            cost,
            time: elapsed.as_secs_f64(),
            solutions_found: self.stats.solutions_found,
            tour: self.incumbent.tour.clone(),
            max_frontier_size: self.stats.max_frontier_size,
            states_created: self.stats.states_created,
            states_pruned: self.stats.states_pruned,
            lower_bound,
            gap,
            optimal,
            solution: self.incumbent.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Initial incumbent from the configured heuristic, if it finds a finite
/// tour within `time_limit` seconds.
pub fn seed_tour(instance: &TspInstance, config: &BnbConfig, time_limit: f64) -> Option<Solution> {
    let seed = match config.seed_strategy {
        SeedStrategy::None => return None,
        SeedStrategy::Random => RandomTourHeuristic::new(config.random_seed)
            .with_time_limit(time_limit)
            .construct(instance),
        SeedStrategy::Greedy => NearestNeighborHeuristic {
            time_limit,
            ..NearestNeighborHeuristic::new()
        }
        .construct(instance),
        SeedStrategy::MultiStart => {
            MultiStartConstruction::with_all_heuristics(config.random_seed, time_limit).construct(instance)
        }
    };

    if seed.feasible {
        Some(seed)
    } else {
        log::info!("{:?} seed found no finite tour", config.seed_strategy);
        None
    }
}

/// Seed, then search with progress logging. Seeding and search share
/// `config.time_limit`.
pub fn solve(instance: &TspInstance, config: &BnbConfig) -> SolverResult<BnbResult> {
    let mut solver = BranchAndBound::new(instance, config.clone())?;
    let seed = solver.seed_tour();
    let mut observer = LogObserver::default();
    Ok(solver.solve_with_observer(seed, &mut observer))
}
