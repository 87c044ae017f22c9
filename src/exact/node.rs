//! Partial tours expanded by the branch-and-bound search.
//!
//! A node owns its working matrix and route outright: children are built
//! from a copy of the parent, never by sharing it. Nodes are immutable once
//! constructed.

use crate::instance::TspInstance;
use crate::matrix::{CostMatrix, UNREACHABLE};

#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Lower bound on every complete tour reachable from this node
    bound: f64,
    /// Reduced working matrix; departed rows and entered columns are unreachable
    matrix: CostMatrix,
    /// Visited cities in order, starting with the start city
    route: Vec<usize>,
    /// Realized (unreduced) cost of the edges along `route`
    path_cost: f64,
    visited: Vec<bool>,
}

impl SearchNode {
    /// Root node: the full reduced cost matrix with only `start_city` visited.
    pub fn root(instance: &TspInstance, start_city: usize) -> Self {
        let mut matrix = instance.cost_matrix().clone();
        let bound = matrix.reduce();

        let mut visited = vec![false; instance.dimension()];
        visited[start_city] = true;

        SearchNode {
            bound,
            matrix,
            route: vec![start_city],
            path_cost: 0.0,
            visited,
        }
    }

    /// Child committing the edge `last_city -> next`.
    ///
    /// The reduced cost of the edge is added to the bound, the row of the city
    /// being left and the column of the city being entered are forbidden, as
    /// is the immediate back edge `next -> last_city`, and the reduction of
    /// the resulting matrix is added on top.
    pub fn child(&self, instance: &TspInstance, next: usize) -> Self {
        let last = self.last_city();

        let mut bound = self.bound + self.matrix.get(last, next);
        let path_cost = self.path_cost + instance.cost(last, next);

        let mut matrix = self.matrix.clone();
        matrix.block_row(last);
        matrix.block_column(next);
        matrix.set(next, last, UNREACHABLE);
        bound += matrix.reduce();

        let mut route = Vec::with_capacity(self.route.len() + 1);
        route.extend_from_slice(&self.route);
        route.push(next);

        let mut visited = self.visited.clone();
        visited[next] = true;

        SearchNode {
            bound,
            matrix,
            route,
            path_cost,
            visited,
        }
    }

    #[inline]
    pub fn bound(&self) -> f64 {
        self.bound
    }

    #[inline]
    pub fn path_cost(&self) -> f64 {
        self.path_cost
    }

    pub fn matrix(&self) -> &CostMatrix {
        &self.matrix
    }

    pub fn route(&self) -> &[usize] {
        &self.route
    }

    pub fn into_route(self) -> Vec<usize> {
        self.route
    }

    #[inline]
    pub fn start_city(&self) -> usize {
        self.route[0]
    }

    #[inline]
    pub fn last_city(&self) -> usize {
        self.route[self.route.len() - 1]
    }

    /// Number of cities on the route.
    #[inline]
    pub fn depth(&self) -> usize {
        self.route.len()
    }

    #[inline]
    pub fn contains(&self, city: usize) -> bool {
        self.visited[city]
    }

    /// Destinations still reachable from the last city in the working matrix.
    pub fn candidate_edges(&self) -> impl Iterator<Item = usize> + '_ {
        let last = self.last_city();
        (0..self.matrix.size()).filter(move |&c| self.matrix.is_reachable(last, c))
    }

    /// Cost of the cycle obtained by returning from the last city to the start.
    pub fn closing_cost(&self, instance: &TspInstance) -> f64 {
        self.path_cost + instance.cost(self.last_city(), self.start_city())
    }
}
