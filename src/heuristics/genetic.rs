//! Genetic refinement of complete tours.
//!
//! Tours are plain values: every operator reads its parents and builds a new
//! vector, so no route is shared between individuals. Each generation runs
//! select -> crossover -> mutate -> accept, where only offspring with a
//! finite cost are accepted. The best individuals are carried over
//! unchanged, so the result is never worse than the best seed.

use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic, RandomTourHeuristic};
use crate::instance::TspInstance;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone)]
pub struct Individual {
    pub tour: Vec<usize>,
    /// Cycle cost, infinite when an edge is missing
    pub cost: f64,
}

impl Individual {
    pub fn new(tour: Vec<usize>, instance: &TspInstance) -> Self {
        let cost = instance.tour_cost(&tour);
        Individual { tour, cost }
    }

    pub fn feasible(&self) -> bool {
        self.cost.is_finite()
    }
}

/// Crossover operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverType {
    /// Order Crossover (OX)
    OrderCrossover,
    /// Partially Mapped Crossover (PMX)
    PMX,
}

/// Mutation operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Swap two random cities
    Swap,
    /// Reverse a random segment
    Inversion,
    /// Move a random city to a random position
    Insertion,
}

/// Selection method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionType {
    Tournament,
    RankBased,
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub max_generations: usize,
    /// Maximum generations without improvement
    pub max_no_improve: usize,
    /// Crossover probability
    pub crossover_prob: f64,
    /// Mutation probability
    pub mutation_prob: f64,
    /// Elite count (best individuals preserved)
    pub elite_count: usize,
    /// Tournament size for selection
    pub tournament_size: usize,
    pub crossover_type: CrossoverType,
    pub mutation_type: MutationType,
    pub selection_type: SelectionType,
    /// Random seed
    pub seed: u64,
    /// Time limit in seconds
    pub time_limit: f64,
    /// Double the mutation rate while the search is stuck
    pub adaptive_mutation: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            population_size: 50,
            max_generations: 200,
            max_no_improve: 100,
            crossover_prob: 0.9,
            mutation_prob: 0.1,
            elite_count: 5,
            tournament_size: 5,
            crossover_type: CrossoverType::OrderCrossover,
            mutation_type: MutationType::Inversion,
            selection_type: SelectionType::Tournament,
            seed: 42,
            time_limit: 60.0,
            adaptive_mutation: true,
        }
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm<'a> {
    config: GaConfig,
    instance: &'a TspInstance,
    seeds: Vec<Vec<usize>>,
    population: Vec<Individual>,
    best_individual: Option<Individual>,
    rng: ChaCha8Rng,
    generation: usize,
    no_improve_count: usize,
    current_mutation_prob: f64,
}

impl<'a> GeneticAlgorithm<'a> {
    pub fn new(instance: &'a TspInstance, config: GaConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let current_mutation_prob = config.mutation_prob;

        GeneticAlgorithm {
            config,
            instance,
            seeds: Vec::new(),
            population: Vec::new(),
            best_individual: None,
            rng,
            generation: 0,
            no_improve_count: 0,
            current_mutation_prob,
        }
    }

    /// Tours placed in the first population ahead of the generated ones.
    pub fn with_seeds(mut self, seeds: impl IntoIterator<Item = Solution>) -> Self {
        self.seeds
            .extend(seeds.into_iter().filter(|s| s.feasible).map(|s| s.tour));
        self
    }

    /// Seeds first, then greedy and randomized greedy tours, then random
    /// permutations. Only feasible tours of this instance are kept.
    fn initialize_population(&mut self) {
        self.population.clear();
        let size = self.config.population_size.max(1);

        let mut candidates: Vec<Vec<usize>> = self.seeds.clone();
        candidates.push(NearestNeighborHeuristic::new().construct(self.instance).tour);
        for i in 0..(size / 3).max(1) {
            let nn = NearestNeighborHeuristic::randomized(self.config.seed.wrapping_add(i as u64));
            candidates.push(nn.construct(self.instance).tour);
        }

        for tour in candidates {
            if self.population.len() >= size {
                break;
            }
            let individual = Individual::new(tour, self.instance);
            if individual.feasible() && self.instance.is_permutation(&individual.tour) {
                self.population.push(individual);
            }
        }

        let mut attempt = 0u64;
        while self.population.len() < size && attempt < size as u64 {
            let random = RandomTourHeuristic {
                max_attempts: 200,
                ..RandomTourHeuristic::new(self.config.seed.wrapping_add(1000 + attempt))
            }
            .construct(self.instance);
            if random.feasible {
                self.population.push(Individual::new(random.tour, self.instance));
            }
            attempt += 1;
        }

        self.population.sort_by_key(|ind| OrderedFloat(ind.cost));
        self.best_individual = self.population.first().cloned();
        log::debug!(
            "GA population initialized with {} feasible tours (best {:?})",
            self.population.len(),
            self.best_individual.as_ref().map(|b| b.cost)
        );
    }

    fn tournament_select(&mut self) -> &Individual {
        let mut best_idx = self.rng.gen_range(0..self.population.len());

        for _ in 1..self.config.tournament_size {
            let idx = self.rng.gen_range(0..self.population.len());
            if self.population[idx].cost < self.population[best_idx].cost {
                best_idx = idx;
            }
        }

        &self.population[best_idx]
    }

    /// Population is sorted: lower index, higher weight.
    fn rank_select(&mut self) -> &Individual {
        let n = self.population.len();
        let total_rank: usize = (n * (n + 1)) / 2;
        let pick = self.rng.gen_range(0..total_rank);

        let mut cumulative = 0;
        let mut chosen = n - 1;
        for rank in 0..n {
            cumulative += n - rank;
            if cumulative > pick {
                chosen = rank;
                break;
            }
        }

        &self.population[chosen]
    }

    fn select_parent(&mut self) -> Individual {
        match self.config.selection_type {
            SelectionType::Tournament => self.tournament_select().clone(),
            SelectionType::RankBased => self.rank_select().clone(),
        }
    }

    fn random_segment(&mut self, n: usize) -> (usize, usize) {
        let i = self.rng.gen_range(0..n);
        let j = self.rng.gen_range(0..n);
        (i.min(j), i.max(j))
    }

    /// Order Crossover (OX): copy a slice of `parent1`, fill the remaining
    /// positions with the other cities in `parent2` order.
    fn order_crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> Vec<usize> {
        let n = parent1.len();
        if n < 4 {
            return parent1.to_vec();
        }

        let (start, end) = self.random_segment(n);

        let mut child = vec![usize::MAX; n];
        let mut taken = vec![false; n];
        for i in start..=end {
            child[i] = parent1[i];
            taken[parent1[i]] = true;
        }

        let mut fill = parent2.iter().copied().filter(|&c| !taken[c]);
        for slot in child.iter_mut().filter(|c| **c == usize::MAX) {
            if let Some(city) = fill.next() {
                *slot = city;
            }
        }

        child
    }

    /// Partially Mapped Crossover (PMX)
    fn pmx_crossover(&mut self, parent1: &[usize], parent2: &[usize]) -> Vec<usize> {
        let n = parent1.len();
        if n < 4 {
            return parent1.to_vec();
        }

        let (start, end) = self.random_segment(n);

        let mut child = parent2.to_vec();
        let mut mapping = vec![usize::MAX; n];
        let mut in_segment = vec![false; n];
        for i in start..=end {
            mapping[parent1[i]] = parent2[i];
            in_segment[parent1[i]] = true;
            child[i] = parent1[i];
        }

        for i in (0..start).chain(end + 1..n) {
            let mut city = parent2[i];
            while in_segment[city] {
                city = mapping[city];
            }
            child[i] = city;
        }

        child
    }

    fn crossover(&mut self, parent1: &Individual, parent2: &Individual) -> Vec<usize> {
        if self.rng.gen::<f64>() > self.config.crossover_prob {
            return parent1.tour.clone();
        }

        match self.config.crossover_type {
            CrossoverType::OrderCrossover => self.order_crossover(&parent1.tour, &parent2.tour),
            CrossoverType::PMX => self.pmx_crossover(&parent1.tour, &parent2.tour),
        }
    }

    fn mutate(&mut self, tour: &mut [usize]) {
        let n = tour.len();
        if n < 3 || self.rng.gen::<f64>() > self.current_mutation_prob {
            return;
        }

        match self.config.mutation_type {
            MutationType::Swap => {
                let i = self.rng.gen_range(0..n);
                let j = self.rng.gen_range(0..n);
                tour.swap(i, j);
            }
            MutationType::Inversion => {
                let (i, j) = self.random_segment(n);
                tour[i..=j].reverse();
            }
            MutationType::Insertion => {
                let from = self.rng.gen_range(0..n);
                let to = self.rng.gen_range(0..n);
                if from < to {
                    tour[from..=to].rotate_left(1);
                } else {
                    tour[to..=from].rotate_right(1);
                }
            }
        }
    }

    /// Create new generation
    fn evolve(&mut self) {
        let size = self.config.population_size.max(1);
        let mut new_population = Vec::with_capacity(size);

        new_population.extend(self.population.iter().take(self.config.elite_count.max(1)).cloned());

        let max_attempts = size.saturating_mul(50).max(500);
        let mut rejected = 0usize;

        while new_population.len() < size {
            let parent1 = self.select_parent();
            let parent2 = self.select_parent();

            let mut tour = self.crossover(&parent1, &parent2);
            self.mutate(&mut tour);

            let offspring = Individual::new(tour, self.instance);
            if offspring.feasible() {
                new_population.push(offspring);
                continue;
            }

            rejected += 1;
            if rejected > max_attempts {
                log::debug!(
                    "GA generation {}: {} offspring rejected, refilling from parents",
                    self.generation,
                    rejected
                );
                let mut parents = self.population.iter().cycle();
                while new_population.len() < size {
                    match parents.next() {
                        Some(parent) => new_population.push(parent.clone()),
                        None => break,
                    }
                }
                break;
            }
        }

        new_population.sort_by_key(|ind| OrderedFloat(ind.cost));

        if let Some(best) = new_population.first() {
            match self.best_individual {
                Some(ref current_best) if best.cost >= current_best.cost => {
                    self.no_improve_count += 1;
                }
                _ => {
                    self.best_individual = Some(best.clone());
                    self.no_improve_count = 0;
                }
            }
        }

        if self.config.adaptive_mutation {
            self.current_mutation_prob = if self.no_improve_count > 10 {
                (self.config.mutation_prob * 2.0).min(0.5)
            } else {
                self.config.mutation_prob
            };
        }

        self.population = new_population;
        self.generation += 1;
    }

    /// Run the genetic algorithm
    pub fn run(&mut self) -> Solution {
        let start = Instant::now();
        self.generation = 0;
        self.no_improve_count = 0;
        self.current_mutation_prob = self.config.mutation_prob;

        self.initialize_population();

        if self.population.is_empty() {
            log::info!("GA: no feasible tour to start from");
            let mut solution = Solution::new();
            solution.algorithm = "GeneticAlgorithm".to_string();
            solution.iterations = Some(0);
            solution.computation_time = start.elapsed().as_secs_f64();
            return solution;
        }

        while self.generation < self.config.max_generations
            && self.no_improve_count < self.config.max_no_improve
            && start.elapsed().as_secs_f64() < self.config.time_limit
        {
            self.evolve();

            if let Some(ref best) = self.best_individual {
                log::trace!(
                    "GA gen {} best {:.3} diversity {:.2} elapsed {:.2}s",
                    self.generation,
                    best.cost,
                    self.population_diversity(),
                    start.elapsed().as_secs_f64()
                );
            }
        }

        let mut solution = self.best_solution().unwrap_or_default();
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(self.generation);
        log::debug!(
            "GA finished after {} generations with cost {:.2}",
            self.generation,
            solution.cost
        );

        solution
    }

    pub fn best_solution(&self) -> Option<Solution> {
        self.best_individual
            .as_ref()
            .map(|ind| Solution::from_tour(self.instance, ind.tour.clone(), "GeneticAlgorithm"))
    }

    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// Average number of positions at which two individuals differ, over
    /// the first twenty of the population.
    pub fn population_diversity(&self) -> f64 {
        let sample = &self.population[..self.population.len().min(20)];
        if sample.len() < 2 {
            return 0.0;
        }

        let mut total_diff = 0.0;
        let mut count = 0;
        for i in 0..sample.len() {
            for j in i + 1..sample.len() {
                let diff = sample[i]
                    .tour
                    .iter()
                    .zip(sample[j].tour.iter())
                    .filter(|(a, b)| a != b)
                    .count();
                total_diff += diff as f64;
                count += 1;
            }
        }

        total_diff / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Difficulty, ScenarioConfig};

    const INF: f64 = f64::INFINITY;

    fn scenario(cities: usize, seed: u64, difficulty: Difficulty) -> TspInstance {
        TspInstance::generate(&ScenarioConfig {
            cities,
            seed,
            difficulty,
        })
    }

    fn small_config() -> GaConfig {
        GaConfig {
            population_size: 20,
            max_generations: 30,
            ..Default::default()
        }
    }

    #[test]
    fn test_genetic_algorithm() {
        let instance = scenario(12, 3, Difficulty::Normal);
        let mut ga = GeneticAlgorithm::new(&instance, small_config());
        let solution = ga.run();

        assert!(solution.feasible);
        assert_eq!(solution.tour.len(), 12);
        assert!(instance.is_permutation(&solution.tour));
        assert_eq!(solution.algorithm, "GeneticAlgorithm");
        assert!(ga.current_generation() <= 30);
    }

    #[test]
    fn test_never_worse_than_seed() {
        for seed in 0..4 {
            let instance = scenario(15, seed, Difficulty::Hard);
            let greedy = NearestNeighborHeuristic::new().construct(&instance);
            if !greedy.feasible {
                continue;
            }

            let config = GaConfig {
                seed,
                ..small_config()
            };
            let solution = GeneticAlgorithm::new(&instance, config)
                .with_seeds(vec![greedy.clone()])
                .run();

            assert!(solution.feasible);
            assert!(solution.cost <= greedy.cost);
        }
    }

    #[test]
    fn test_operators_produce_permutations() {
        let instance = scenario(10, 1, Difficulty::Easy);
        for crossover_type in [CrossoverType::OrderCrossover, CrossoverType::PMX] {
            for mutation_type in [MutationType::Swap, MutationType::Inversion, MutationType::Insertion] {
                let config = GaConfig {
                    crossover_type,
                    mutation_type,
                    mutation_prob: 1.0,
                    ..small_config()
                };
                let mut ga = GeneticAlgorithm::new(&instance, config);
                let p1: Vec<usize> = (0..10).collect();
                let p2: Vec<usize> = (0..10).rev().collect();

                for _ in 0..50 {
                    let mut child = match crossover_type {
                        CrossoverType::OrderCrossover => ga.order_crossover(&p1, &p2),
                        CrossoverType::PMX => ga.pmx_crossover(&p1, &p2),
                    };
                    assert!(instance.is_permutation(&child), "{:?}: {:?}", crossover_type, child);
                    ga.mutate(&mut child);
                    assert!(instance.is_permutation(&child), "{:?}: {:?}", mutation_type, child);
                }
            }
        }
    }

    #[test]
    fn test_rank_selection() {
        let instance = scenario(8, 2, Difficulty::Normal);
        let config = GaConfig {
            selection_type: SelectionType::RankBased,
            ..small_config()
        };
        let solution = GeneticAlgorithm::new(&instance, config).run();
        assert!(solution.feasible);
    }

    #[test]
    fn test_infeasible_instance() {
        let instance = TspInstance::from_matrix(
            "dead-end",
            vec![vec![INF, 1.0, 1.0], vec![1.0, INF, 1.0], vec![INF, INF, INF]],
        )
        .unwrap();
        let solution = GeneticAlgorithm::new(&instance, small_config()).run();

        assert!(!solution.feasible);
        assert!(solution.cost.is_infinite());
        assert_eq!(solution.iterations, Some(0));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let instance = scenario(12, 9, Difficulty::Hard);
        let a = GeneticAlgorithm::new(&instance, small_config()).run();
        let b = GeneticAlgorithm::new(&instance, small_config()).run();
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.cost, b.cost);
    }
}
