//! JSON configuration file bundling the settings of every component.
//!
//! Every section is optional; missing sections and fields take their
//! defaults. Command-line flags override what the file sets.

use crate::benchmark::BenchmarkConfig;
use crate::error::{SolverError, SolverResult};
use crate::exact::BnbConfig;
use crate::heuristics::genetic::GaConfig;
use crate::instance::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub bnb: BnbConfig,
    pub ga: GaConfig,
    pub benchmark: BenchmarkConfig,
    pub scenario: ScenarioConfig,
}

impl SolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> SolverResult<Self> {
        let config: SolverConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SolverResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> SolverResult<()> {
        self.bnb.validate()?;

        let ga = &self.ga;
        if ga.population_size == 0 {
            return Err(SolverError::Config("ga.population_size must be positive".to_string()));
        }
        for (name, p) in [("ga.crossover_prob", ga.crossover_prob), ("ga.mutation_prob", ga.mutation_prob)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SolverError::Config(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        check_time_limit("ga.time_limit", ga.time_limit)?;

        check_time_limit("benchmark.time_limit", self.benchmark.time_limit)?;
        if self.benchmark.sizes.is_empty() {
            return Err(SolverError::Config("benchmark.sizes must not be empty".to_string()));
        }

        if self.scenario.cities == 0 {
            return Err(SolverError::Config("scenario.cities must be positive".to_string()));
        }

        Ok(())
    }
}

fn check_time_limit(name: &str, value: f64) -> SolverResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SolverError::Config(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::SeedStrategy;
    use crate::instance::Difficulty;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = SolverConfig::from_json(
            r#"{
                "bnb": { "time_limit": 5.0, "seed_strategy": "multi_start" },
                "scenario": { "cities": 8, "seed": 3, "difficulty": "Normal" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.bnb.time_limit, 5.0);
        assert_eq!(config.bnb.seed_strategy, SeedStrategy::MultiStart);
        assert_eq!(config.bnb.start_city, 0);
        assert_eq!(config.scenario.difficulty, Difficulty::Normal);
        assert_eq!(config.ga.population_size, GaConfig::default().population_size);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SolverConfig::default();
        let back = SolverConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back.benchmark.sizes, config.benchmark.sizes);
        assert_eq!(back.bnb.seed_strategy, config.bnb.seed_strategy);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = SolverConfig::from_json(r#"{ "bnb": { "time_limit": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));

        let err = SolverConfig::from_json(r#"{ "ga": { "mutation_prob": 1.5 } }"#).unwrap_err();
        assert!(err.to_string().contains("ga.mutation_prob"));

        let err = SolverConfig::from_json(r#"{ "benchmark": { "sizes": [] } }"#).unwrap_err();
        assert!(matches!(err, SolverError::Config(_)));

        assert!(matches!(SolverConfig::from_json("{ not json"), Err(SolverError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("tsp-bnb-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "ga": { "seed": 9 } }"#).unwrap();
        let config = SolverConfig::from_file(&path).unwrap();
        assert_eq!(config.ga.seed, 9);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            SolverConfig::from_file("/nonexistent/tsp-config.json"),
            Err(SolverError::Io(_))
        ));
    }
}
