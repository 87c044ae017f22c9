//! TSP Branch-and-Bound Solver - Command Line Interface

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tsp_bnb_solver::benchmark::{load_instances_from_dir, Benchmark};
use tsp_bnb_solver::config::SolverConfig;
use tsp_bnb_solver::error::SolverResult;
use tsp_bnb_solver::exact::{BranchAndBound, LogObserver, SeedStrategy};
use tsp_bnb_solver::heuristics::construction::*;
use tsp_bnb_solver::heuristics::genetic::GeneticAlgorithm;
use tsp_bnb_solver::instance::{ScenarioConfig, TspInstance};
use tsp_bnb_solver::solution::Solution;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tsp-bnb-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Branch-and-bound solver for the asymmetric TSP")]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance, loaded from a file or generated
    Solve {
        /// Instance file; a random scenario is generated when omitted
        #[arg(short, long)]
        instance: Option<PathBuf>,

        /// Algorithm to use
        #[arg(short, long, value_enum, default_value = "bnb")]
        algorithm: Algorithm,

        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Random seed of the heuristics
        #[arg(short, long)]
        seed: Option<u64>,

        /// Initial incumbent for branch-and-bound
        #[arg(long, value_enum)]
        seed_strategy: Option<SeedArg>,

        /// City every tour starts from
        #[arg(long)]
        start_city: Option<usize>,

        /// Output solution to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run every algorithm on generated scenarios or a directory of instances
    Benchmark {
        /// Directory containing instance files; scenarios are generated when omitted
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Scenario sizes to generate
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Scenarios per size
        #[arg(long)]
        per_size: Option<usize>,

        #[arg(long, value_enum)]
        difficulty: Option<DifficultyArg>,

        /// Output directory for results
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of genetic algorithm runs per instance
        #[arg(short, long)]
        runs: Option<usize>,

        /// Time limit per run
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Process instances one at a time
        #[arg(long)]
        sequential: bool,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Generate a random scenario and write it as an instance file
    Generate {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Output file; printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct ScenarioArgs {
    /// Number of cities
    #[arg(short = 'n', long)]
    cities: Option<usize>,

    /// Scenario seed
    #[arg(long)]
    scenario_seed: Option<u64>,

    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,
}

impl ScenarioArgs {
    fn apply(&self, mut scenario: ScenarioConfig) -> ScenarioConfig {
        if let Some(cities) = self.cities {
            scenario.cities = cities;
        }
        if let Some(seed) = self.scenario_seed {
            scenario.seed = seed;
        }
        if let Some(difficulty) = self.difficulty {
            scenario.difficulty = difficulty.into();
        }
        scenario
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Algorithm {
    /// Random permutations until one is finite
    Random,
    /// Nearest neighbor from successive start cities
    Greedy,
    /// Best of the construction heuristics
    MultiStart,
    /// Branch-and-bound
    Bnb,
    /// Genetic Algorithm seeded with the construction heuristics
    Ga,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for tsp_bnb_solver::instance::Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum SeedArg {
    None,
    Random,
    Greedy,
    MultiStart,
}

impl From<SeedArg> for SeedStrategy {
    fn from(arg: SeedArg) -> Self {
        match arg {
            SeedArg::None => SeedStrategy::None,
            SeedArg::Random => SeedStrategy::Random,
            SeedArg::Greedy => SeedStrategy::Greedy,
            SeedArg::MultiStart => SeedStrategy::MultiStart,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> SolverResult<()> {
    let mut config = match &cli.config {
        Some(path) => SolverConfig::from_file(path)?,
        None => SolverConfig::default(),
    };

    match cli.command {
        Commands::Solve {
            instance,
            algorithm,
            scenario,
            time_limit,
            seed,
            seed_strategy,
            start_city,
            output,
            verbose,
        } => {
            if let Some(t) = time_limit {
                config.bnb.time_limit = t;
                config.ga.time_limit = t;
            }
            if let Some(s) = seed {
                config.bnb.random_seed = s;
                config.ga.seed = s;
            }
            if let Some(strategy) = seed_strategy {
                config.bnb.seed_strategy = strategy.into();
            }
            if let Some(city) = start_city {
                config.bnb.start_city = city;
            }
            config.scenario = scenario.apply(config.scenario);
            config.validate()?;

            let instance = match instance {
                Some(path) => {
                    println!("Loading instance from {:?}...", path);
                    TspInstance::from_file(&path)?
                }
                None => TspInstance::generate(&config.scenario),
            };
            solve_instance(&instance, algorithm, &config, output, verbose)
        }

        Commands::Benchmark {
            dir,
            sizes,
            per_size,
            difficulty,
            output,
            runs,
            time_limit,
            sequential,
            max_size,
        } => {
            let bench = &mut config.benchmark;
            if let Some(sizes) = sizes {
                bench.sizes = sizes;
            }
            if let Some(k) = per_size {
                bench.instances_per_size = k;
            }
            if let Some(d) = difficulty {
                bench.difficulty = d.into();
            }
            if let Some(out) = output {
                bench.output_dir = out.to_string_lossy().to_string();
            }
            if let Some(r) = runs {
                bench.num_runs = r;
            }
            if let Some(t) = time_limit {
                bench.time_limit = t;
            }
            if sequential {
                bench.parallel = false;
            }
            config.validate()?;
            run_benchmark(&config, dir.as_deref(), max_size)
        }

        Commands::Analyze { instance } => analyze_instance(&instance),

        Commands::Generate { scenario, output } => {
            config.scenario = scenario.apply(config.scenario);
            config.validate()?;
            let instance = TspInstance::generate(&config.scenario);
            let text = instance.to_tsplib_string();
            match output {
                Some(path) => {
                    std::fs::write(&path, text)?;
                    println!("Instance {} written to {:?}", instance.name, path);
                }
                None => print!("{}", text),
            }
            Ok(())
        }
    }
}

fn solve_instance(
    instance: &TspInstance,
    algorithm: Algorithm,
    config: &SolverConfig,
    output: Option<PathBuf>,
    verbose: bool,
) -> SolverResult<()> {
    if verbose {
        println!("{}", instance.statistics());
    }

    println!("Solving {} with {:?} algorithm...", instance.name, algorithm);
    let start = Instant::now();
    let time_limit = config.bnb.time_limit;

    let solution = match algorithm {
        Algorithm::Random => RandomTourHeuristic::new(config.bnb.random_seed)
            .with_time_limit(time_limit)
            .construct(instance),

        Algorithm::Greedy => NearestNeighborHeuristic {
            time_limit,
            ..NearestNeighborHeuristic::new()
        }
        .construct(instance),

        Algorithm::MultiStart => {
            MultiStartConstruction::with_all_heuristics(config.bnb.random_seed, time_limit).construct(instance)
        }

        Algorithm::Bnb => {
            let mut solver = BranchAndBound::new(instance, config.bnb.clone())?;
            let seed = solver.seed_tour();
            let mut observer = LogObserver::default();
            let result = solver.solve_with_observer(seed, &mut observer);

            println!("Status: {}", if result.optimal { "optimal" } else { "time limit" });
            println!("Lower bound: {:.2}", result.lower_bound);
            println!("Gap: {:.4}%", result.gap * 100.0);
            println!("Solutions found: {}", result.solutions_found);
            println!("States created: {}", result.states_created);
            println!("States pruned: {}", result.states_pruned);
            println!("Max frontier size: {}", result.max_frontier_size);
            if verbose {
                println!("\n{}", result.stats);
            }
            result.solution
        }

        Algorithm::Ga => {
            let seed = MultiStartConstruction::with_all_heuristics(config.ga.seed, time_limit).construct(instance);
            GeneticAlgorithm::new(instance, config.ga.clone())
                .with_seeds([seed])
                .run()
        }
    };

    let elapsed = start.elapsed();

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Cost: {:.2}", solution.cost);
    println!("Feasible: {}", solution.feasible);
    println!("Time: {:.4}s", elapsed.as_secs_f64());
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }
    if verbose || solution.tour.len() <= 20 {
        println!("Tour: {:?}", solution.city_names(instance));
    }

    if let Some(out_path) = output {
        write_solution(&solution, &out_path)?;
        println!("\nSolution saved to {:?}", out_path);
    }

    Ok(())
}

fn write_solution(solution: &Solution, path: &Path) -> SolverResult<()> {
    let json = serde_json::to_string_pretty(solution)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn run_benchmark(config: &SolverConfig, dir: Option<&Path>, max_size: Option<usize>) -> SolverResult<()> {
    let mut instances = match dir {
        Some(dir) => {
            println!("Loading instances from {:?}...", dir);
            load_instances_from_dir(dir)?
        }
        None => config.benchmark.generate_instances(),
    };

    if let Some(max) = max_size {
        instances.retain(|i| i.dimension() <= max);
    }

    println!("Found {} instances", instances.len());

    if instances.is_empty() {
        log::warn!("No instances to benchmark");
        return Ok(());
    }

    let output = PathBuf::from(&config.benchmark.output_dir);
    std::fs::create_dir_all(&output)?;

    let progress = ProgressBar::new(instances.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut benchmark = Benchmark::new(config.benchmark.clone()).with_solver_configs(config.bnb.clone(), config.ga.clone());
    benchmark.run_on_instances(&instances, Some(&progress));
    progress.finish_with_message("done");

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &Path) -> SolverResult<()> {
    let instance = TspInstance::from_file(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let nn_sol = NearestNeighborHeuristic::new().construct(&instance);
    let random_sol = RandomTourHeuristic::new(42).with_time_limit(5.0).construct(&instance);

    println!("\nQuick Solution Estimates:");
    println!("  Nearest Neighbor: {:.2} (feasible: {})", nn_sol.cost, nn_sol.feasible);
    println!(
        "  Random tour: {:.2} (feasible: {}, {} permutations)",
        random_sol.cost,
        random_sol.feasible,
        random_sol.iterations.unwrap_or(0)
    );

    Ok(())
}
