//! Heuristics module.
//!
//! Construction heuristics provide the initial incumbent for branch-and-bound;
//! the genetic algorithm refines complete tours.

pub mod construction;
pub mod genetic;

pub use construction::*;
pub use genetic::*;
