//! Exact solver: best-first branch-and-bound on reduced cost matrices.

pub mod branch_and_bound;
pub mod frontier;
pub mod node;
pub mod observer;
pub mod stats;

pub use branch_and_bound::{
    seed_tour, solve, BnbConfig, BnbResult, BranchAndBound, Clock, SeedStrategy, SystemClock,
};
pub use frontier::Frontier;
pub use node::SearchNode;
pub use observer::{LogObserver, NoOpObserver, PruneReason, SearchObserver};
pub use stats::SearchStats;
