//! TSP Branch-and-Bound Solver Library
//!
//! Finds minimum-cost Hamiltonian cycles on directed, possibly incomplete
//! cost matrices under a wall-clock budget.
//!
//! # Features
//!
//! - Best-first branch-and-bound with reduced-cost matrix lower bounds,
//!   returning the best tour found so far when time runs out
//! - Seed heuristics (random permutations, nearest neighbor, multi-start)
//! - Genetic refinement of complete tours
//! - Random scenario generator and TSPLIB-style instance files
//! - Benchmarking with CSV export
//!
//! # Example
//!
//! ```no_run
//! use tsp_bnb_solver::exact::{self, BnbConfig};
//! use tsp_bnb_solver::instance::{ScenarioConfig, TspInstance};
//!
//! let instance = TspInstance::generate(&ScenarioConfig::default());
//!
//! let config = BnbConfig {
//!     time_limit: 10.0,
//!     ..Default::default()
//! };
//! let result = exact::solve(&instance, &config).unwrap();
//!
//! println!("Cost: {:.2} (optimal: {})", result.cost, result.optimal);
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod exact;
pub mod heuristics;
pub mod instance;
pub mod matrix;
pub mod solution;

pub use error::{SolverError, SolverResult};
pub use instance::TspInstance;
pub use solution::Solution;
