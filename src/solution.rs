//! Solution representation shared by every algorithm of the crate.

use crate::instance::TspInstance;
use serde::{Deserialize, Serialize};

/// A tour together with its evaluated cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// City indices in visiting order; the return to `tour[0]` is implicit
    pub tour: Vec<usize>,
    /// Total cycle cost, infinite if an edge is missing or no tour was found
    pub cost: f64,
    /// Whether the tour visits every city once with a finite cost
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            tour: Vec::new(),
            cost: f64::INFINITY,
            feasible: false,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Create a solution from a tour, evaluating it against the instance.
    pub fn from_tour(instance: &TspInstance, tour: Vec<usize>, algorithm: &str) -> Self {
        let cost = instance.tour_cost(&tour);
        let feasible = cost.is_finite() && instance.is_permutation(&tour);

        Solution {
            tour,
            cost,
            feasible,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        }
    }

    /// Re-evaluate cost and feasibility after the tour changed.
    pub fn validate(&mut self, instance: &TspInstance) {
        self.cost = instance.tour_cost(&self.tour);
        self.feasible = self.cost.is_finite() && instance.is_permutation(&self.tour);
    }

    /// Strictly better than `other`. Infeasible solutions never improve.
    pub fn improves_on(&self, other: &Solution) -> bool {
        self.feasible && self.cost < other.cost
    }

    /// Names of the visited cities, in order. Unknown indices are skipped.
    pub fn city_names(&self, instance: &TspInstance) -> Vec<String> {
        self.tour
            .iter()
            .filter_map(|&c| instance.cities().get(c))
            .map(|city| city.name.clone())
            .collect()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    fn instance() -> TspInstance {
        TspInstance::from_matrix(
            "triangle",
            vec![vec![INF, 1.0, 2.0], vec![3.0, INF, 4.0], vec![5.0, INF, INF]],
        )
        .unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.tour.is_empty());
        assert!(!sol.feasible);
        assert_eq!(sol.cost, f64::INFINITY);
    }

    #[test]
    fn test_from_tour() {
        let inst = instance();
        let sol = Solution::from_tour(&inst, vec![0, 1, 2], "manual");
        assert!(sol.feasible);
        assert_eq!(sol.cost, 10.0);

        let missing_edge = Solution::from_tour(&inst, vec![0, 2, 1], "manual");
        assert!(!missing_edge.feasible);
        assert!(missing_edge.cost.is_infinite());

        let partial = Solution::from_tour(&inst, vec![0, 1], "manual");
        assert!(!partial.feasible);

        let foreign = Solution::from_tour(&inst, vec![0, 1, 2, 9], "manual");
        assert!(!foreign.feasible);
        assert!(foreign.cost.is_infinite());
        assert_eq!(foreign.city_names(&inst).len(), 3);
    }

    #[test]
    fn test_improves_on() {
        let inst = instance();
        let good = Solution::from_tour(&inst, vec![0, 1, 2], "a");
        assert!(good.improves_on(&Solution::new()));
        assert!(!Solution::new().improves_on(&good));
        assert!(!good.improves_on(&good.clone()));
    }
}
