//! Hooks for watching a branch-and-bound run.
//!
//! Observers only read: they see each event with the statistics as of that
//! moment, and cannot alter the search. Every callback has a no-op default so
//! an observer implements just the events it cares about.

use super::node::SearchNode;
use super::stats::SearchStats;
use crate::instance::TspInstance;
use crate::solution::Solution;
use std::time::{Duration, Instant};

/// Why a state was discarded without being pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    /// The child's bound could not beat the incumbent.
    Bound,
    /// The child completed a tour no cheaper than the incumbent.
    CompletedTour,
    /// The node was popped after the incumbent had already improved past it.
    Stale,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneReason::Bound => write!(f, "Bound"),
            PruneReason::CompletedTour => write!(f, "CompletedTour"),
            PruneReason::Stale => write!(f, "Stale"),
        }
    }
}

pub trait SearchObserver {
    fn name(&self) -> &str;

    /// Called once the root has been built and the seed installed.
    fn on_enter_search(&mut self, _instance: &TspInstance, _root_bound: f64, _incumbent: &Solution) {}

    /// Called for each popped node before it is expanded.
    fn on_expand(&mut self, _node: &SearchNode, _stats: &SearchStats) {}

    /// Called when a child is placed on the frontier.
    fn on_push(&mut self, _node: &SearchNode, _stats: &SearchStats) {}

    /// `value` is the pruned state's bound, or its cycle cost for a completed
    /// tour; `incumbent_cost` is the best cost at the time of pruning.
    fn on_prune(&mut self, _value: f64, _incumbent_cost: f64, _reason: PruneReason, _stats: &SearchStats) {}

    /// Called when a popped node has no edge left to follow.
    fn on_dead_end(&mut self, _node: &SearchNode, _stats: &SearchStats) {}

    /// Called each time the incumbent is replaced by a strictly better tour.
    fn on_solution_found(&mut self, _solution: &Solution, _stats: &SearchStats) {}

    fn on_exit_search(&mut self, _incumbent: &Solution, _stats: &SearchStats) {}
}

impl std::fmt::Debug for dyn SearchObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SearchObserver({})", self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl SearchObserver for NoOpObserver {
    fn name(&self) -> &str {
        "NoOpObserver"
    }
}

/// Logs progress through the `log` facade.
///
/// Improvements are logged at info level; a progress line is logged at debug
/// level at most once per `log_interval`, checked every `check_mask + 1`
/// expansions.
#[derive(Debug, Clone)]
pub struct LogObserver {
    start_time: Instant,
    last_log_time: Instant,
    log_interval: Duration,
    check_mask: u64,
}

impl LogObserver {
    pub fn new(log_interval: Duration, check_mask: u64) -> Self {
        let now = Instant::now();
        LogObserver {
            start_time: now,
            last_log_time: now,
            log_interval,
            check_mask,
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 1023)
    }
}

impl SearchObserver for LogObserver {
    fn name(&self) -> &str {
        "LogObserver"
    }

    fn on_enter_search(&mut self, instance: &TspInstance, root_bound: f64, incumbent: &Solution) {
        self.start_time = Instant::now();
        self.last_log_time = self.start_time;
        log::info!(
            "branch-and-bound on '{}' ({} cities): root bound {:.2}, seed cost {:.2}",
            instance.name,
            instance.dimension(),
            root_bound,
            incumbent.cost
        );
    }

    fn on_expand(&mut self, node: &SearchNode, stats: &SearchStats) {
        if stats.states_expanded & self.check_mask == 0 && self.last_log_time.elapsed() >= self.log_interval {
            log::debug!(
                "{:.1}s | expanded {} | created {} | pruned {} | depth {} | bound {:.2}",
                self.start_time.elapsed().as_secs_f64(),
                stats.states_expanded,
                stats.states_created,
                stats.states_pruned,
                node.depth(),
                node.bound()
            );
            self.last_log_time = Instant::now();
        }
    }

    fn on_solution_found(&mut self, solution: &Solution, stats: &SearchStats) {
        log::info!(
            "{:.1}s | new best {:.2} after {} states",
            self.start_time.elapsed().as_secs_f64(),
            solution.cost,
            stats.states_created
        );
    }

    fn on_exit_search(&mut self, incumbent: &Solution, stats: &SearchStats) {
        let status = if stats.exhausted() { "optimal" } else { "time limit" };
        log::info!(
            "branch-and-bound finished ({}): cost {:.2}, {} solutions, {} states, {} pruned",
            status,
            incumbent.cost,
            stats.solutions_found,
            stats.states_created,
            stats.states_pruned
        );
    }
}
