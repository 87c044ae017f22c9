//! Module for building and representing TSP scenarios.
//!
//! A scenario is a list of cities plus a (possibly asymmetric) cost matrix in
//! which missing edges are unreachable. Scenarios come from three places:
//! explicit matrices, TSPLIB-style text files (`EUC_2D` coordinates or an
//! `EXPLICIT` full matrix) and the seeded random generator.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};
use crate::matrix::{CostMatrix, UNREACHABLE};

/// Side length of the square the generator places cities in.
const MAP_SIZE: f64 = 1000.0;
/// Extra cost factor per unit of elevation climbed (asymmetric scenarios).
const UPHILL_PENALTY: f64 = 1.0;
/// Fraction of edges removed in `Hard` scenarios.
const REMOVED_EDGE_FRACTION: f64 = 0.2;

/// A city of the scenario. Equality is by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    /// Row/column of this city in the cost matrix (0-indexed)
    pub index: usize,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Elevation in [0, 1]; only used by the generator to skew costs
    pub elevation: f64,
}

impl City {
    pub fn new(index: usize, x: f64, y: f64) -> Self {
        City {
            index,
            name: format!("C{}", index),
            x,
            y,
            elevation: 0.0,
        }
    }

    pub fn distance_to(&self, other: &City) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl PartialEq for City {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for City {}

impl std::hash::Hash for City {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

/// How the random generator shapes edge costs.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Difficulty {
    /// Symmetric Euclidean distances, every edge present
    Easy,
    /// Asymmetric: climbing to a higher city costs more than descending
    Normal,
    /// Asymmetric and a fraction of edges removed
    Hard,
}

/// Parameters of the random scenario generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub cities: usize,
    pub seed: u64,
    pub difficulty: Difficulty,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            cities: 15,
            seed: 42,
            difficulty: Difficulty::Hard,
        }
    }
}

/// A complete TSP instance.
#[derive(Debug, Clone)]
pub struct TspInstance {
    pub name: String,
    pub comment: String,
    cities: Vec<City>,
    costs: CostMatrix,
}

impl TspInstance {
    /// Build an instance from explicit cost rows. Cities get dummy coordinates.
    pub fn from_matrix(name: &str, rows: Vec<Vec<f64>>) -> SolverResult<Self> {
        let costs = CostMatrix::from_rows(rows)?;
        let cities = (0..costs.size()).map(|i| City::new(i, 0.0, 0.0)).collect();

        Ok(TspInstance {
            name: name.to_string(),
            comment: String::new(),
            cities,
            costs,
        })
    }

    /// Build a symmetric Euclidean instance from city coordinates.
    pub fn from_cities(name: &str, cities: Vec<City>) -> Self {
        let costs = CostMatrix::from_fn(cities.len(), |i, j| cities[i].distance_to(&cities[j]));

        TspInstance {
            name: name.to_string(),
            comment: String::new(),
            cities,
            costs,
        }
    }

    /// Generate a random scenario. Deterministic for a given seed.
    pub fn generate(config: &ScenarioConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let n = config.cities;

        let cities: Vec<City> = (0..n)
            .map(|i| {
                let mut city = City::new(i, rng.gen::<f64>() * MAP_SIZE, rng.gen::<f64>() * MAP_SIZE);
                city.elevation = rng.gen::<f64>();
                city
            })
            .collect();

        let mut costs = CostMatrix::from_fn(n, |i, j| {
            let distance = cities[i].distance_to(&cities[j]);
            match config.difficulty {
                Difficulty::Easy => distance,
                Difficulty::Normal | Difficulty::Hard => {
                    let climb = (cities[j].elevation - cities[i].elevation).max(0.0);
                    distance * (1.0 + UPHILL_PENALTY * climb)
                }
            }
        });

        if config.difficulty == Difficulty::Hard && n > 2 {
            // Keep one random Hamiltonian cycle intact so the scenario stays solvable.
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(&mut rng);
            let protected: HashSet<(usize, usize)> =
                (0..n).map(|k| (order[k], order[(k + 1) % n])).collect();

            let mut candidates: Vec<(usize, usize)> = (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter(|&(i, j)| i != j && !protected.contains(&(i, j)))
                .collect();
            candidates.shuffle(&mut rng);

            let to_remove = (REMOVED_EDGE_FRACTION * (n * (n - 1)) as f64) as usize;
            for &(i, j) in candidates.iter().take(to_remove) {
                costs.set(i, j, UNREACHABLE);
            }
        }

        TspInstance {
            name: format!("random-{}-{:?}-{}", n, config.difficulty, config.seed).to_lowercase(),
            comment: format!("generated with seed {}", config.seed),
            cities,
            costs,
        }
    }

    /// Parse an instance from a TSPLIB-style file.
    ///
    /// Supported: `EDGE_WEIGHT_TYPE: EUC_2D` with a `NODE_COORD_SECTION`, and
    /// `EDGE_WEIGHT_TYPE: EXPLICIT` with `EDGE_WEIGHT_FORMAT: FULL_MATRIX` and an
    /// `EDGE_WEIGHT_SECTION`. In explicit matrices `-1`, `inf` or `-` mark an
    /// unreachable edge. An optional coordinate section is kept for display.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let file = File::open(&path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> SolverResult<Self> {
        let mut name = String::new();
        let mut comment = String::new();
        let mut dimension: Option<usize> = None;
        let mut explicit = false;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();

        let mut section = "";

        for (line_no, line) in reader.lines().enumerate() {
            let line_no = line_no + 1;
            let line = line?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "NAME" => {
                        name = value.to_string();
                        continue;
                    }
                    "COMMENT" => {
                        comment = value.to_string();
                        continue;
                    }
                    "TYPE" => continue,
                    "DIMENSION" => {
                        let d = value
                            .parse()
                            .map_err(|_| SolverError::parse(line_no, "Invalid dimension"))?;
                        dimension = Some(d);
                        continue;
                    }
                    "EDGE_WEIGHT_TYPE" => {
                        explicit = match value {
                            "EXPLICIT" => true,
                            "EUC_2D" => false,
                            other => {
                                return Err(SolverError::parse(
                                    line_no,
                                    format!("Unsupported edge weight type {}", other),
                                ))
                            }
                        };
                        continue;
                    }
                    "EDGE_WEIGHT_FORMAT" => {
                        if value != "FULL_MATRIX" {
                            return Err(SolverError::parse(
                                line_no,
                                format!("Unsupported edge weight format {}", value),
                            ));
                        }
                        continue;
                    }
                    // unknown header keys (CAPACITY, ...) are ignored
                    _ if section.is_empty() => continue,
                    _ => {}
                }
            }

            if line.starts_with("NODE_COORD_SECTION") || line.starts_with("DISPLAY_DATA_SECTION") {
                section = "coords";
                continue;
            }
            if line.starts_with("EDGE_WEIGHT_SECTION") {
                section = "weights";
                continue;
            }

            match section {
                "coords" => {
                    let parts: Vec<&str> = line.split_whitespace().collect();
                    if parts.len() < 3 {
                        return Err(SolverError::parse(line_no, "Expected `id x y`"));
                    }
                    let id: usize = parts[0]
                        .parse()
                        .map_err(|_| SolverError::parse(line_no, "Invalid node id"))?;
                    let x: f64 = parts[1]
                        .parse()
                        .map_err(|_| SolverError::parse(line_no, "Invalid x coordinate"))?;
                    let y: f64 = parts[2]
                        .parse()
                        .map_err(|_| SolverError::parse(line_no, "Invalid y coordinate"))?;
                    coords.push((id, x, y));
                }
                "weights" => {
                    for token in line.split_whitespace() {
                        weights.push(parse_weight(token).ok_or_else(|| {
                            SolverError::parse(line_no, format!("Invalid edge weight {}", token))
                        })?);
                    }
                }
                _ => {
                    return Err(SolverError::parse(line_no, format!("Unexpected line `{}`", line)));
                }
            }
        }

        let dimension = dimension
            .or_else(|| (!coords.is_empty()).then_some(coords.len()))
            .ok_or_else(|| SolverError::InvalidInstance("missing DIMENSION".to_string()))?;

        if !coords.is_empty() && coords.len() != dimension {
            return Err(SolverError::InvalidInstance(format!(
                "{} coordinates for dimension {}",
                coords.len(),
                dimension
            )));
        }

        // Node ids are 1-indexed in files.
        let cities: Vec<City> = if coords.is_empty() {
            (0..dimension).map(|i| City::new(i, 0.0, 0.0)).collect()
        } else {
            coords
                .iter()
                .enumerate()
                .map(|(i, &(id, x, y))| {
                    let mut city = City::new(i, x, y);
                    city.name = format!("{}", id);
                    city
                })
                .collect()
        };

        let costs = if explicit {
            if weights.len() != dimension * dimension {
                return Err(SolverError::InvalidInstance(format!(
                    "{} edge weights for a {}x{} matrix",
                    weights.len(),
                    dimension,
                    dimension
                )));
            }
            let rows = weights.chunks(dimension).map(|r| r.to_vec()).collect();
            CostMatrix::from_rows(rows)?
        } else {
            if coords.is_empty() && dimension > 0 {
                return Err(SolverError::InvalidInstance(
                    "EUC_2D instance without NODE_COORD_SECTION".to_string(),
                ));
            }
            CostMatrix::from_fn(dimension, |i, j| cities[i].distance_to(&cities[j]))
        };

        Ok(TspInstance {
            name,
            comment,
            cities,
            costs,
        })
    }

    /// Render the instance in the explicit full-matrix format `from_reader` reads.
    pub fn to_tsplib_string(&self) -> String {
        let n = self.dimension();
        let mut out = String::new();
        out.push_str(&format!("NAME: {}\n", self.name));
        if !self.comment.is_empty() {
            out.push_str(&format!("COMMENT: {}\n", self.comment));
        }
        out.push_str("TYPE: ATSP\n");
        out.push_str(&format!("DIMENSION: {}\n", n));
        out.push_str("EDGE_WEIGHT_TYPE: EXPLICIT\n");
        out.push_str("EDGE_WEIGHT_FORMAT: FULL_MATRIX\n");
        out.push_str("NODE_COORD_SECTION\n");
        for city in &self.cities {
            out.push_str(&format!("{} {:.3} {:.3}\n", city.index + 1, city.x, city.y));
        }
        out.push_str("EDGE_WEIGHT_SECTION\n");
        for i in 0..n {
            let row: Vec<String> = self
                .costs
                .row(i)
                .iter()
                .map(|c| if c.is_finite() { format!("{:.3}", c) } else { "-1".to_string() })
                .collect();
            out.push_str(&row.join(" "));
            out.push('\n');
        }
        out.push_str("EOF\n");
        out
    }

    /// Number of cities.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.cities.len()
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn cost_matrix(&self) -> &CostMatrix {
        &self.costs
    }

    /// Cost of the directed edge `from -> to`, infinite when unreachable.
    #[inline]
    pub fn cost(&self, from: usize, to: usize) -> f64 {
        self.costs.get(from, to)
    }

    /// Total cost of the cycle visiting `tour` in order and returning to its
    /// first city. Infinite if any edge is missing or any index is not a
    /// city of this instance. Tours of fewer than two cities cost nothing.
    pub fn tour_cost(&self, tour: &[usize]) -> f64 {
        if tour.iter().any(|&c| c >= self.dimension()) {
            return f64::INFINITY;
        }
        if tour.len() < 2 {
            return 0.0;
        }

        let mut cost = 0.0;
        for pair in tour.windows(2) {
            cost += self.cost(pair[0], pair[1]);
        }
        cost += self.cost(tour[tour.len() - 1], tour[0]);

        cost
    }

    /// Check that `tour` visits every city exactly once.
    pub fn is_permutation(&self, tour: &[usize]) -> bool {
        if tour.len() != self.dimension() {
            return false;
        }
        let mut seen = vec![false; self.dimension()];
        for &c in tour {
            if c >= seen.len() || seen[c] {
                return false;
            }
            seen[c] = true;
        }
        true
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension();
        let finite: Vec<f64> = (0..n)
            .flat_map(|i| self.costs.row(i).iter().cloned())
            .filter(|c| c.is_finite())
            .collect();

        let possible_edges = n * n.saturating_sub(1);
        let edge_density = if possible_edges > 0 {
            finite.len() as f64 / possible_edges as f64
        } else {
            0.0
        };
        let avg_cost = if finite.is_empty() {
            0.0
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        let max_cost = finite.iter().cloned().fold(0.0, f64::max);
        let min_cost = finite.iter().cloned().fold(f64::INFINITY, f64::min);

        let symmetric = (0..n).all(|i| (i + 1..n).all(|j| self.cost(i, j) == self.cost(j, i)));
        let dead_end_cities = (0..n)
            .filter(|&i| self.costs.row(i).iter().all(|c| c.is_infinite()))
            .count();

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            edges: finite.len(),
            edge_density,
            symmetric,
            dead_end_cities,
            avg_cost,
            min_cost: if min_cost.is_finite() { min_cost } else { 0.0 },
            max_cost,
        }
    }
}

fn parse_weight(token: &str) -> Option<f64> {
    match token {
        "-" | "-1" | "inf" | "INF" => Some(UNREACHABLE),
        _ => token.parse::<f64>().ok().filter(|c| *c >= 0.0),
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    /// Number of reachable directed edges
    pub edges: usize,
    pub edge_density: f64,
    pub symmetric: bool,
    /// Cities without any outgoing edge
    pub dead_end_cities: usize,
    pub avg_cost: f64,
    pub min_cost: f64,
    pub max_cost: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Edges: {} ({:.1}% of all directed pairs)", self.edges, self.edge_density * 100.0)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)?;
        writeln!(f, "  Cities without outgoing edge: {}", self.dead_end_cities)?;
        writeln!(f, "  Avg cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Min cost: {:.2}", self.min_cost)?;
        writeln!(f, "  Max cost: {:.2}", self.max_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn test_city_equality_by_index() {
        let a = City::new(1, 0.0, 0.0);
        let mut b = City::new(1, 5.0, 5.0);
        b.name = "other".to_string();
        assert_eq!(a, b);
        assert_ne!(a, City::new(2, 0.0, 0.0));
    }

    #[test]
    fn test_tour_cost() {
        let instance = TspInstance::from_matrix(
            "example",
            vec![
                vec![INF, 10.0, 15.0, 20.0],
                vec![5.0, INF, 9.0, 10.0],
                vec![6.0, 13.0, INF, 12.0],
                vec![8.0, 8.0, 9.0, INF],
            ],
        )
        .unwrap();

        assert_eq!(instance.tour_cost(&[0, 1, 3, 2]), 35.0);
        assert_eq!(instance.tour_cost(&[0]), 0.0);
        assert_eq!(instance.tour_cost(&[]), 0.0);
    }

    #[test]
    fn test_tour_cost_unreachable() {
        let instance = TspInstance::from_matrix(
            "broken",
            vec![vec![INF, 1.0, 1.0], vec![1.0, INF, 1.0], vec![INF, INF, INF]],
        )
        .unwrap();
        assert!(instance.tour_cost(&[0, 1, 2]).is_infinite());
        assert!(instance.tour_cost(&[0, 1, 7]).is_infinite());
        assert!(instance.tour_cost(&[5]).is_infinite());
    }

    #[test]
    fn test_is_permutation() {
        let instance = TspInstance::from_cities(
            "square",
            vec![City::new(0, 0.0, 0.0), City::new(1, 1.0, 0.0), City::new(2, 1.0, 1.0)],
        );
        assert!(instance.is_permutation(&[2, 0, 1]));
        assert!(!instance.is_permutation(&[0, 0, 1]));
        assert!(!instance.is_permutation(&[0, 1]));
        assert!(!instance.is_permutation(&[0, 1, 3]));
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = ScenarioConfig {
            cities: 8,
            seed: 7,
            difficulty: Difficulty::Hard,
        };
        let a = TspInstance::generate(&config);
        let b = TspInstance::generate(&config);
        assert_eq!(a.cost_matrix(), b.cost_matrix());
        assert_eq!(a.dimension(), 8);
    }

    #[test]
    fn test_generate_difficulties() {
        let easy = TspInstance::generate(&ScenarioConfig {
            cities: 6,
            seed: 1,
            difficulty: Difficulty::Easy,
        });
        assert!(easy.statistics().symmetric);
        assert_eq!(easy.statistics().edges, 30);

        let hard = TspInstance::generate(&ScenarioConfig {
            cities: 10,
            seed: 1,
            difficulty: Difficulty::Hard,
        });
        let stats = hard.statistics();
        assert!(!stats.symmetric);
        assert_eq!(stats.edges, 90 - 18);
        assert_eq!(stats.dead_end_cities, 0);
    }

    #[test]
    fn test_parse_euclidean() {
        let text = "NAME: tri\nTYPE: TSP\nDIMENSION: 3\nEDGE_WEIGHT_TYPE: EUC_2D\n\
                    NODE_COORD_SECTION\n1 0 0\n2 3 4\n3 0 4\nEOF\n";
        let instance = TspInstance::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(instance.name, "tri");
        assert_eq!(instance.dimension(), 3);
        assert!((instance.cost(0, 1) - 5.0).abs() < 1e-10);
        assert!((instance.cost(2, 1) - 3.0).abs() < 1e-10);
        assert!(instance.cost(1, 1).is_infinite());
    }

    #[test]
    fn test_parse_explicit_with_unreachable() {
        let text = "NAME: asym\nDIMENSION: 3\nEDGE_WEIGHT_TYPE: EXPLICIT\n\
                    EDGE_WEIGHT_FORMAT: FULL_MATRIX\nEDGE_WEIGHT_SECTION\n\
                    0 1 -1\n2 0 3\ninf 4 0\nEOF\n";
        let instance = TspInstance::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(instance.cost(0, 1), 1.0);
        assert!(instance.cost(0, 2).is_infinite());
        assert!(instance.cost(2, 0).is_infinite());
        assert_eq!(instance.cost(2, 1), 4.0);
    }

    #[test]
    fn test_parse_reports_line() {
        let text = "NAME: bad\nDIMENSION: 2\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 x 0\n";
        match TspInstance::from_reader(Cursor::new(text)) {
            Err(SolverError::Parse { line, .. }) => assert_eq!(line, 6),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_short_matrix() {
        let text = "DIMENSION: 2\nEDGE_WEIGHT_TYPE: EXPLICIT\nEDGE_WEIGHT_SECTION\n0 1 2\n";
        assert!(matches!(
            TspInstance::from_reader(Cursor::new(text)),
            Err(SolverError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_tsplib_round_trip_keeps_costs() {
        let original = TspInstance::generate(&ScenarioConfig {
            cities: 5,
            seed: 3,
            difficulty: Difficulty::Hard,
        });
        let text = original.to_tsplib_string();
        let parsed = TspInstance::from_reader(Cursor::new(text)).unwrap();
        for i in 0..5 {
            for j in 0..5 {
                let (a, b) = (original.cost(i, j), parsed.cost(i, j));
                assert_eq!(a.is_finite(), b.is_finite());
                if a.is_finite() {
                    assert!((a - b).abs() < 1e-3);
                }
            }
        }
    }
}
