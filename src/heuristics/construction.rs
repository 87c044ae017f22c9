use crate::instance::TspInstance;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &TspInstance) -> Solution;
    fn name(&self) -> &str;
}

/// Random Tour Heuristic
///
/// Draws uniform random permutations until one has a finite cost, the
/// attempt limit is hit, or the time allowance runs out. The number of
/// permutations tried is reported as the solution's iteration count.
pub struct RandomTourHeuristic {
    pub seed: u64,
    pub time_limit: f64,
    pub max_attempts: usize,
}

impl RandomTourHeuristic {
    pub fn new(seed: u64) -> Self {
        RandomTourHeuristic {
            seed,
            time_limit: 60.0,
            max_attempts: 100_000,
        }
    }

    pub fn with_time_limit(mut self, time_limit: f64) -> Self {
        self.time_limit = time_limit;
        self
    }
}

impl Default for RandomTourHeuristic {
    fn default() -> Self {
        Self::new(42)
    }
}

impl ConstructionHeuristic for RandomTourHeuristic {
    fn construct(&self, instance: &TspInstance) -> Solution {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut perm: Vec<usize> = (0..instance.dimension()).collect();

        let mut best = Solution::new();
        let mut count = 0;

        while count < self.max_attempts && start.elapsed().as_secs_f64() < self.time_limit {
            perm.shuffle(&mut rng);
            count += 1;

            let candidate = Solution::from_tour(instance, perm.clone(), self.name());
            if candidate.feasible {
                best = candidate;
                break;
            }
        }

        if !best.feasible {
            log::debug!("random tour: no finite tour after {} permutations", count);
            best.algorithm = self.name().to_string();
        }

        best.iterations = Some(count);
        best.computation_time = start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        "RandomTour"
    }
}

/// Nearest Neighbor Heuristic
///
/// From a start city, repeatedly moves to the cheapest reachable unvisited
/// city. If the walk gets stuck or its closing edge is missing, the next
/// start city is tried, until a finite tour is found or every start city
/// (or the time allowance) is used up.
pub struct NearestNeighborHeuristic {
    pub randomized: bool,
    pub seed: u64,
    pub time_limit: f64,
}

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic {
            randomized: false,
            seed: 42,
            time_limit: 60.0,
        }
    }

    /// Picks among the three cheapest candidates at random at every step.
    pub fn randomized(seed: u64) -> Self {
        NearestNeighborHeuristic {
            randomized: true,
            seed,
            time_limit: 60.0,
        }
    }

    fn find_nearest(
        &self,
        instance: &TspInstance,
        current: usize,
        visited: &[bool],
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let mut candidates: Vec<(usize, f64)> = (0..instance.dimension())
            .filter(|&c| !visited[c])
            .map(|c| (c, instance.cost(current, c)))
            .filter(|&(_, d)| d.is_finite())
            .collect();

        if candidates.is_empty() {
            return None;
        }

        candidates.sort_by_key(|&(_, d)| OrderedFloat(d));

        if self.randomized && candidates.len() > 1 {
            let top_k = candidates.len().min(3);
            let idx = rng.gen_range(0..top_k);
            Some(candidates[idx].0)
        } else {
            Some(candidates[0].0)
        }
    }

    fn walk_from(&self, instance: &TspInstance, start_city: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n = instance.dimension();
        let mut tour = vec![start_city];
        let mut visited = vec![false; n];
        visited[start_city] = true;

        let mut current = start_city;
        while tour.len() < n {
            match self.find_nearest(instance, current, &visited, rng) {
                Some(next) => {
                    tour.push(next);
                    visited[next] = true;
                    current = next;
                }
                None => break,
            }
        }
        tour
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, instance: &TspInstance) -> Solution {
        let start = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n = instance.dimension();

        if n == 0 {
            let mut solution = Solution::from_tour(instance, Vec::new(), self.name());
            solution.iterations = Some(0);
            return solution;
        }

        let mut best = Solution::new();
        best.algorithm = self.name().to_string();
        let mut count = 0;

        for start_city in 0..n {
            if start.elapsed().as_secs_f64() >= self.time_limit {
                break;
            }

            let tour = self.walk_from(instance, start_city, &mut rng);
            if tour.len() < n {
                continue;
            }
            count += 1;

            let candidate = Solution::from_tour(instance, tour, self.name());
            if candidate.feasible {
                best = candidate;
                break;
            }
        }

        best.iterations = Some(count);
        best.computation_time = start.elapsed().as_secs_f64();
        best
    }

    fn name(&self) -> &str {
        if self.randomized {
            "NearestNeighbor-Randomized"
        } else {
            "NearestNeighbor"
        }
    }
}

/// Multi-Start Construction
///
/// Runs multiple construction heuristics and returns the best result.
pub struct MultiStartConstruction {
    heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>>,
}

impl MultiStartConstruction {
    pub fn new() -> Self {
        MultiStartConstruction {
            heuristics: Vec::new(),
        }
    }

    /// Greedy first, then random tours: the seeds used before branch-and-bound.
    /// The three heuristics split `time_limit` evenly.
    pub fn with_all_heuristics(seed: u64, time_limit: f64) -> Self {
        let time_limit = time_limit / 3.0;
        let heuristics: Vec<Box<dyn ConstructionHeuristic + Send + Sync>> = vec![
            Box::new(NearestNeighborHeuristic {
                time_limit,
                ..NearestNeighborHeuristic::new()
            }),
            Box::new(NearestNeighborHeuristic {
                time_limit,
                ..NearestNeighborHeuristic::randomized(seed)
            }),
            Box::new(RandomTourHeuristic::new(seed).with_time_limit(time_limit)),
        ];

        MultiStartConstruction { heuristics }
    }

    pub fn add_heuristic<H: ConstructionHeuristic + Send + Sync + 'static>(&mut self, h: H) {
        self.heuristics.push(Box::new(h));
    }
}

impl Default for MultiStartConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for MultiStartConstruction {
    fn construct(&self, instance: &TspInstance) -> Solution {
        let start = Instant::now();

        let mut best_solution = Solution::new();
        for heuristic in &self.heuristics {
            let solution = heuristic.construct(instance);
            if solution.improves_on(&best_solution) {
                best_solution = solution;
            }
        }

        best_solution.algorithm = self.name().to_string();
        best_solution.computation_time = start.elapsed().as_secs_f64();
        best_solution
    }

    fn name(&self) -> &str {
        "MultiStart"
    }
}
