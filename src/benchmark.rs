//! Benchmarking and experimentation module.
//!
//! Runs the seed heuristics, branch-and-bound and the genetic algorithm on a
//! set of instances, collects per-run results and aggregates them per
//! algorithm.

use crate::error::SolverResult;
use crate::exact::{BnbConfig, BranchAndBound};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic, RandomTourHeuristic};
use crate::heuristics::genetic::{GaConfig, GeneticAlgorithm};
use crate::instance::{Difficulty, ScenarioConfig, TspInstance};
use crate::solution::Solution;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: String,
    pub instance: String,
    pub dimension: usize,
    /// Tour cost, infinite when no tour was found
    pub cost: f64,
    pub feasible: bool,
    /// Computation time in seconds
    pub time: f64,
    pub iterations: Option<usize>,
    /// Percentage above the best known cost of the instance
    pub gap_to_best: Option<f64>,
    /// Lower bound (branch-and-bound only)
    pub lower_bound: Option<f64>,
    /// Whether optimality was proven (branch-and-bound only)
    pub optimal: Option<bool>,
    pub states_created: Option<u64>,
    pub states_pruned: Option<u64>,
    pub max_frontier_size: Option<usize>,
}

impl AlgorithmResult {
    fn from_solution(instance: &TspInstance, solution: &Solution) -> Self {
        AlgorithmResult {
            algorithm: solution.algorithm.clone(),
            instance: instance.name.clone(),
            dimension: instance.dimension(),
            cost: solution.cost,
            feasible: solution.feasible,
            time: solution.computation_time,
            iterations: solution.iterations,
            gap_to_best: None,
            lower_bound: None,
            optimal: None,
            states_created: None,
            states_pruned: None,
            max_frontier_size: None,
        }
    }
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    pub algorithm: String,
    /// Number of runs recorded
    pub num_runs: usize,
    pub num_feasible: usize,
    pub avg_cost: f64,
    pub best_cost: f64,
    pub worst_cost: f64,
    /// Sample standard deviation of the cost, 0 with fewer than two runs
    pub std_cost: f64,
    pub avg_time: f64,
    pub total_time: f64,
    pub avg_gap: Option<f64>,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Sizes of the generated scenarios
    pub sizes: Vec<usize>,
    /// Scenarios generated per size
    pub instances_per_size: usize,
    pub difficulty: Difficulty,
    /// Seed of the first generated scenario
    pub seed: u64,
    /// Number of runs of the stochastic algorithms
    pub num_runs: usize,
    /// Time limit per run in seconds
    pub time_limit: f64,
    /// Solve instances in parallel
    pub parallel: bool,
    pub output_dir: String,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            sizes: vec![5, 8, 10, 12, 15],
            instances_per_size: 3,
            difficulty: Difficulty::Hard,
            seed: 42,
            num_runs: 3,
            time_limit: 60.0,
            parallel: true,
            output_dir: "results".to_string(),
        }
    }
}

impl BenchmarkConfig {
    /// Scenario parameters for every generated instance, smallest first.
    pub fn scenarios(&self) -> Vec<ScenarioConfig> {
        let mut scenarios = Vec::with_capacity(self.sizes.len() * self.instances_per_size);
        for &cities in &self.sizes {
            for k in 0..self.instances_per_size {
                scenarios.push(ScenarioConfig {
                    cities,
                    seed: self.seed.wrapping_add(k as u64),
                    difficulty: self.difficulty,
                });
            }
        }
        scenarios
    }

    pub fn generate_instances(&self) -> Vec<TspInstance> {
        self.scenarios().iter().map(TspInstance::generate).collect()
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    bnb_config: BnbConfig,
    ga_config: GaConfig,
    results: Vec<AlgorithmResult>,
    best_known: HashMap<String, f64>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        let bnb_config = BnbConfig {
            time_limit: config.time_limit,
            ..Default::default()
        };
        let ga_config = GaConfig {
            time_limit: config.time_limit,
            ..Default::default()
        };

        Benchmark {
            config,
            bnb_config,
            ga_config,
            results: Vec::new(),
            best_known: HashMap::new(),
        }
    }

    /// Override the solver settings used for every run. The benchmark's own
    /// time limit still applies.
    pub fn with_solver_configs(mut self, bnb_config: BnbConfig, ga_config: GaConfig) -> Self {
        self.bnb_config = BnbConfig {
            time_limit: self.config.time_limit,
            ..bnb_config
        };
        self.ga_config = GaConfig {
            time_limit: self.config.time_limit,
            ..ga_config
        };
        self
    }

    /// Set best known solution for an instance
    pub fn set_best_known(&mut self, instance_name: &str, cost: f64) {
        self.best_known.insert(instance_name.to_string(), cost);
    }

    /// Every algorithm on one instance. Does not touch the benchmark state,
    /// so instances can be processed in parallel.
    pub fn run_instance(&self, instance: &TspInstance) -> Vec<AlgorithmResult> {
        log::info!("Running benchmark on instance: {}", instance.name);
        let mut results = Vec::new();

        let random = RandomTourHeuristic::new(self.config.seed)
            .with_time_limit(self.config.time_limit)
            .construct(instance);
        results.push(AlgorithmResult::from_solution(instance, &random));

        let greedy = NearestNeighborHeuristic {
            time_limit: self.config.time_limit,
            ..NearestNeighborHeuristic::new()
        }
        .construct(instance);
        results.push(AlgorithmResult::from_solution(instance, &greedy));

        results.push(self.run_branch_and_bound(instance));

        for run in 0..self.config.num_runs {
            let config = GaConfig {
                seed: self.ga_config.seed.wrapping_add(run as u64),
                ..self.ga_config.clone()
            };
            let solution = GeneticAlgorithm::new(instance, config)
                .with_seeds([greedy.clone(), random.clone()])
                .run();
            results.push(AlgorithmResult::from_solution(instance, &solution));
        }

        results
    }

    /// Seeds come from the solver itself so seeding counts against its time limit.
    fn run_branch_and_bound(&self, instance: &TspInstance) -> AlgorithmResult {
        match BranchAndBound::new(instance, self.bnb_config.clone()) {
            Ok(mut solver) => {
                let seed = solver.seed_tour();
                let result = solver.solve(seed);
                let mut record = AlgorithmResult::from_solution(instance, &result.solution);
                record.lower_bound = Some(result.lower_bound);
                record.optimal = Some(result.optimal);
                record.states_created = Some(result.states_created);
                record.states_pruned = Some(result.states_pruned);
                record.max_frontier_size = Some(result.max_frontier_size);
                record
            }
            Err(e) => {
                log::error!("branch-and-bound could not start on {}: {}", instance.name, e);
                let mut failed = Solution::new();
                failed.algorithm = "BranchAndBound".to_string();
                AlgorithmResult::from_solution(instance, &failed)
            }
        }
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[TspInstance], progress: Option<&ProgressBar>) {
        let run = |instance: &TspInstance| {
            let results = self.run_instance(instance);
            if let Some(pb) = progress {
                pb.set_message(instance.name.clone());
                pb.inc(1);
            }
            results
        };

        let batches: Vec<Vec<AlgorithmResult>> = if self.config.parallel {
            instances.par_iter().map(run).collect()
        } else {
            instances.iter().map(run).collect()
        };

        for result in batches.into_iter().flatten() {
            self.record_result(result);
        }
        self.update_gaps();
    }

    /// Best feasible cost of each instance becomes its best known value.
    fn record_result(&mut self, result: AlgorithmResult) {
        if result.feasible {
            let best = self.best_known.entry(result.instance.clone()).or_insert(f64::INFINITY);
            if result.cost < *best {
                *best = result.cost;
            }
        }
        self.results.push(result);
    }

    fn update_gaps(&mut self) {
        for result in &mut self.results {
            result.gap_to_best = match self.best_known.get(&result.instance) {
                Some(&best) if result.feasible && best > 0.0 => Some((result.cost - best) / best * 100.0),
                _ => None,
            };
        }
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut stats_map: HashMap<&str, Vec<&AlgorithmResult>> = HashMap::new();
        for result in &self.results {
            stats_map.entry(result.algorithm.as_str()).or_default().push(result);
        }

        let mut statistics = Vec::new();

        for (algo, results) in stats_map {
            let feasible_results: Vec<_> = results.iter().filter(|r| r.feasible).collect();
            if feasible_results.is_empty() {
                continue;
            }

            let costs: Vec<f64> = feasible_results.iter().map(|r| r.cost).collect();
            let times: Vec<f64> = feasible_results.iter().map(|r| r.time).collect();
            let gaps: Vec<f64> = feasible_results.iter().filter_map(|r| r.gap_to_best).collect();

            let std_cost = if costs.len() > 1 { costs.iter().std_dev() } else { 0.0 };

            statistics.push(AlgorithmStatistics {
                algorithm: algo.to_string(),
                num_runs: results.len(),
                num_feasible: feasible_results.len(),
                avg_cost: costs.iter().mean(),
                best_cost: costs.iter().cloned().fold(f64::INFINITY, f64::min),
                worst_cost: costs.iter().cloned().fold(0.0, f64::max),
                std_cost,
                avg_time: times.iter().mean(),
                total_time: times.iter().sum(),
                avg_gap: if gaps.is_empty() { None } else { Some(gaps.iter().mean()) },
            });
        }

        statistics.sort_by(|a, b| a.avg_cost.total_cmp(&b.avg_cost).then_with(|| a.algorithm.cmp(&b.algorithm)));

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("         TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<25} {:>10} {:>12} {:>12} {:>12} {:>10}\n",
            "Algorithm", "Feasible", "Avg Cost", "Best Cost", "Avg Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in &self.compute_statistics() {
            let gap_str = stat
                .avg_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());

            report.push_str(&format!(
                "{:<25} {:>10} {:>12.2} {:>12.2} {:>12} {:>10.4}\n",
                stat.algorithm,
                format!("{}/{}", stat.num_feasible, stat.num_runs),
                stat.avg_cost,
                stat.best_cost,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        let proven: Vec<&AlgorithmResult> = self.results.iter().filter(|r| r.optimal == Some(true)).collect();
        report.push_str(&format!(
            "\nBranch-and-bound proved optimality on {} instance(s)\n",
            proven.len()
        ));

        report.push_str("\nBest Solutions per Instance:\n");
        let mut names: Vec<&String> = self.best_known.keys().collect();
        names.sort();
        for name in names {
            let best = self.best_known[name];
            let by = self
                .results
                .iter()
                .find(|r| &r.instance == name && r.feasible && r.cost == best)
                .map(|r| r.algorithm.as_str())
                .unwrap_or("-");
            report.push_str(&format!("  {}: {:.2} ({})\n", name, best, by));
        }

        report
    }

    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }

    pub fn best_known(&self) -> &HashMap<String, f64> {
        &self.best_known
    }
}

/// Load every `.tsp` file of a directory, smallest first. Unreadable files
/// are skipped with a warning.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> SolverResult<Vec<TspInstance>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "tsp").unwrap_or(false) {
            match TspInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
    }

    instances.sort_by(|a, b| a.dimension().cmp(&b.dimension()).then_with(|| a.name.cmp(&b.name)));

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BenchmarkConfig {
        BenchmarkConfig {
            sizes: vec![5, 7],
            instances_per_size: 2,
            num_runs: 2,
            time_limit: 10.0,
            ..Default::default()
        }
    }

    fn fast_benchmark(config: BenchmarkConfig) -> Benchmark {
        let ga = GaConfig {
            population_size: 10,
            max_generations: 10,
            ..Default::default()
        };
        Benchmark::new(config).with_solver_configs(BnbConfig::default(), ga)
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 3);
        assert!(config.parallel);
    }

    #[test]
    fn test_scenarios() {
        let scenarios = small_config().scenarios();
        assert_eq!(scenarios.len(), 4);
        assert_eq!(scenarios[0].cities, 5);
        assert_eq!(scenarios[1].seed, 43);
        assert_eq!(scenarios[3].cities, 7);
    }

    #[test]
    fn test_run_instance() {
        let instance = TspInstance::generate(&ScenarioConfig {
            cities: 6,
            seed: 1,
            difficulty: Difficulty::Normal,
        });
        let benchmark = fast_benchmark(small_config());
        let results = benchmark.run_instance(&instance);

        // random, greedy, branch-and-bound, two GA runs
        assert_eq!(results.len(), 5);
        let bnb = results.iter().find(|r| r.algorithm == "BranchAndBound").unwrap();
        assert_eq!(bnb.optimal, Some(true));
        for result in &results {
            assert!(result.feasible);
            assert!(result.cost >= bnb.cost - 1e-9, "{} beat the optimum", result.algorithm);
        }
    }

    #[test]
    fn test_branch_and_bound_uses_its_own_seed() {
        let instance = TspInstance::generate(&ScenarioConfig {
            cities: 7,
            seed: 4,
            difficulty: Difficulty::Normal,
        });
        let bnb_config = BnbConfig {
            seed_strategy: crate::exact::SeedStrategy::MultiStart,
            time_limit: 10.0,
            ..Default::default()
        };
        let expected = crate::exact::solve(&instance, &bnb_config).unwrap();

        let benchmark = Benchmark::new(small_config()).with_solver_configs(bnb_config, GaConfig::default());
        let bnb = benchmark.run_branch_and_bound(&instance);

        assert_eq!(bnb.optimal, Some(true));
        assert!((bnb.cost - expected.cost).abs() < 1e-9);
        assert_eq!(bnb.states_created, Some(expected.states_created));
    }

    #[test]
    fn test_run_on_instances_and_statistics() {
        for parallel in [true, false] {
            let config = BenchmarkConfig {
                parallel,
                ..small_config()
            };
            let instances = config.generate_instances();
            let mut benchmark = fast_benchmark(config);
            benchmark.run_on_instances(&instances, None);

            assert_eq!(benchmark.results().len(), 4 * 5);
            assert_eq!(benchmark.best_known().len(), 4);

            let stats = benchmark.compute_statistics();
            let bnb = stats.iter().find(|s| s.algorithm == "BranchAndBound").unwrap();
            assert_eq!(bnb.num_runs, 4);
            assert!(bnb.avg_gap.unwrap().abs() < 1e-6);
            let ga = stats.iter().find(|s| s.algorithm == "GeneticAlgorithm").unwrap();
            assert_eq!(ga.num_runs, 8);
            assert!(ga.std_cost >= 0.0);

            let report = benchmark.generate_report();
            assert!(report.contains("TSP Benchmark Report"));
            assert!(report.contains("BranchAndBound"));
        }
    }

    #[test]
    fn test_gap_against_preset_best_known() {
        let config = BenchmarkConfig {
            sizes: vec![6],
            instances_per_size: 1,
            num_runs: 1,
            difficulty: Difficulty::Easy,
            parallel: false,
            ..small_config()
        };
        let instances = config.generate_instances();
        let optimum = crate::exact::solve(&instances[0], &BnbConfig::default()).unwrap().cost;

        let mut benchmark = fast_benchmark(config);
        benchmark.set_best_known(&instances[0].name, optimum / 2.0);
        benchmark.run_on_instances(&instances, None);

        let bnb = benchmark
            .results()
            .iter()
            .find(|r| r.algorithm == "BranchAndBound")
            .unwrap();
        assert!((bnb.gap_to_best.unwrap() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_export_csv() {
        let config = BenchmarkConfig {
            sizes: vec![5],
            instances_per_size: 1,
            num_runs: 1,
            ..small_config()
        };
        let instances = config.generate_instances();
        let mut benchmark = fast_benchmark(config);
        benchmark.run_on_instances(&instances, None);

        let dir = std::env::temp_dir().join(format!("tsp-bnb-bench-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let results_path = dir.join("results.csv");
        let stats_path = dir.join("statistics.csv");
        benchmark.export_to_csv(&results_path).unwrap();
        benchmark.export_statistics_csv(&stats_path).unwrap();

        let mut reader = csv::Reader::from_path(&results_path).unwrap();
        let rows: Vec<AlgorithmResult> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(std::fs::read_to_string(&stats_path).unwrap().contains("avg_cost"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
