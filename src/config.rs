use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top level run configuration, read once from `config.toml` and then only borrowed.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub ga: GaConfig,
    pub arena: ArenaConfig,
    pub simulation: SimulationConfig,
}

/// Parameters of the genetic programming loop and of the program trees it breeds.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GaConfig {
    /// Seed of the master random stream, a run is reproducible given this value
    pub seed: u64,
    pub population_size: usize,
    pub num_generations: usize,
    /// Probability that a selected parent pair is recombined
    pub crossover_rate: f64,
    /// Probability that an offspring gets mutated
    pub mutation_rate: f64,
    /// Share of mutations that shrink a function node to one of its children instead of
    /// growing a fresh subtree
    pub shrink_rate: f64,
    pub tournament_size: usize,
    /// Hard bound on tree depth, a lone terminal has depth 0
    pub max_tree_depth: usize,
    /// Hard bound on the number of nodes in a tree
    pub max_tree_nodes: usize,
    /// Smallest depth drawn for the initial ramped population
    pub init_min_depth: usize,
    /// Largest depth drawn for the initial ramped population
    pub init_max_depth: usize,
    /// Depth of the subtrees grown by mutation
    pub mutation_max_depth: usize,
    /// How many times generation and the operators retry before falling back
    pub max_operator_attempts: usize,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            population_size: 500,
            num_generations: 51,
            crossover_rate: 0.7,
            mutation_rate: 0.1,
            shrink_rate: 0.0,
            tournament_size: 5,
            max_tree_depth: 17,
            max_tree_nodes: 100,
            init_min_depth: 1,
            init_max_depth: 4,
            mutation_max_depth: 2,
            max_operator_attempts: 16,
        }
    }
}

/// A square block of wall cells stamped into the arena on every reset.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub row: usize,
    pub col: usize,
    pub size: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    pub height: usize,
    pub width: usize,
    /// An `[arena]` table without this key means an open arena
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl ArenaConfig {
    /// Border walls only, no interior obstacles.
    pub fn open(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            obstacles: Vec::new(),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        const BLOCK_SIZE: usize = 16;
        const BLOCK_OFFSETS: [usize; 3] = [25, 91, 160];

        let obstacles = BLOCK_OFFSETS
            .iter()
            .flat_map(|&row| {
                BLOCK_OFFSETS.iter().map(move |&col| Obstacle {
                    row,
                    col,
                    size: BLOCK_SIZE,
                })
            })
            .collect();

        Self {
            height: 200,
            width: 200,
            obstacles,
        }
    }
}

/// Episode parameters shared by every fitness evaluation.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    /// Independent episodes per individual, fitness is their mean
    pub runs: usize,
    /// Program executions per episode
    pub steps: usize,
    /// Degrees turned by a single left/right command
    pub turn_angle: i32,
    /// Half-width, in degrees, of the robot's vision cone
    pub view_angle: i32,
    /// Robot-ball distance at or below which a hit is scored
    pub hit_distance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            steps: 2000,
            turn_angle: 5,
            view_angle: 30,
            hit_distance: 1.0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Rejects every combination of parameters that evolution cannot honour.
    /// Called once before the run starts, nothing downstream re-checks these bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ga.validate()?;
        self.arena.validate()?;
        self.simulation.validate()
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(invalid("population_size must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(invalid(format!(
                "crossover_rate must lie in [0, 1], got {}",
                self.crossover_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid(format!(
                "mutation_rate must lie in [0, 1], got {}",
                self.mutation_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.shrink_rate) {
            return Err(invalid(format!(
                "shrink_rate must lie in [0, 1], got {}",
                self.shrink_rate
            )));
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(invalid(format!(
                "tournament_size must lie in [1, population_size={}], got {}",
                self.population_size, self.tournament_size
            )));
        }
        if self.max_tree_nodes == 0 {
            return Err(invalid("max_tree_nodes must be greater than zero"));
        }
        if self.init_min_depth > self.init_max_depth {
            return Err(invalid(format!(
                "init_min_depth ({}) exceeds init_max_depth ({})",
                self.init_min_depth, self.init_max_depth
            )));
        }
        if self.init_max_depth > self.max_tree_depth {
            return Err(invalid(format!(
                "init_max_depth ({}) exceeds max_tree_depth ({})",
                self.init_max_depth, self.max_tree_depth
            )));
        }
        if self.mutation_max_depth > self.max_tree_depth {
            return Err(invalid(format!(
                "mutation_max_depth ({}) exceeds max_tree_depth ({})",
                self.mutation_max_depth, self.max_tree_depth
            )));
        }
        if self.max_operator_attempts == 0 {
            return Err(invalid("max_operator_attempts must be greater than zero"));
        }
        Ok(())
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.height < 3 || self.width < 3 {
            return Err(invalid(format!(
                "arena must be at least 3x3 to have an interior, got {}x{}",
                self.height, self.width
            )));
        }
        // Robot and ball each need their own free interior cell.
        let free_cells = (1..self.height - 1)
            .flat_map(|row| (1..self.width - 1).map(move |col| (row, col)))
            .filter(|&(row, col)| !self.is_obstacle(row, col))
            .take(2)
            .count();
        if free_cells < 2 {
            return Err(invalid(
                "arena needs at least two free interior cells for the robot and the ball",
            ));
        }
        Ok(())
    }

    /// True if `(row, col)` falls inside one of the configured obstacle blocks.
    pub fn is_obstacle(&self, row: usize, col: usize) -> bool {
        self.obstacles.iter().any(|o| {
            (o.row..o.row + o.size).contains(&row) && (o.col..o.col + o.size).contains(&col)
        })
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs == 0 {
            return Err(invalid("runs must be greater than zero"));
        }
        if self.turn_angle <= 0 || 360 % self.turn_angle != 0 {
            return Err(invalid(format!(
                "turn_angle must be a positive divisor of 360, got {}",
                self.turn_angle
            )));
        }
        if !(0..=180).contains(&self.view_angle) {
            return Err(invalid(format!(
                "view_angle must lie in [0, 180], got {}",
                self.view_angle
            )));
        }
        if !self.hit_distance.is_finite() || self.hit_distance < 0.0 {
            return Err(invalid(format!(
                "hit_distance must be a non-negative number, got {}",
                self.hit_distance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.arena.obstacles.len(), 9);
        assert!(config.arena.is_obstacle(25, 25));
        assert!(config.arena.is_obstacle(175, 175));
        assert!(!config.arena.is_obstacle(176, 176));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.toml");
        let mut file = File::create(&file_path).unwrap();
        write!(
            file,
            "[ga]\npopulation_size = 20\nseed = 7\n\n[arena]\nheight = 10\nwidth = 12\n"
        )
        .unwrap();

        let config = Config::load(&file_path).unwrap();
        assert_eq!(config.ga.population_size, 20);
        assert_eq!(config.ga.seed, 7);
        assert_eq!(config.ga.tournament_size, 5);
        assert_eq!(config.arena.height, 10);
        assert_eq!(config.arena.width, 12);
        assert!(config.arena.obstacles.is_empty());
        assert_eq!(config.simulation.steps, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::load(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::FileReadError(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "[ga]\npopulation_size = \"many\"\n").unwrap();
        assert!(matches!(
            Config::load(&file_path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_min_depth_above_max_depth_rejected() {
        let mut config = Config::default();
        config.ga.init_min_depth = 5;
        config.ga.init_max_depth = 3;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_init_depth_above_tree_limit_rejected() {
        let mut config = Config::default();
        config.ga.init_max_depth = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rates_out_of_range_rejected() {
        let mut config = Config::default();
        config.ga.crossover_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ga.mutation_rate = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ga.shrink_rate = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tournament_bounds() {
        let mut config = Config::default();
        config.ga.tournament_size = 0;
        assert!(config.validate().is_err());

        config.ga.tournament_size = config.ga.population_size + 1;
        assert!(config.validate().is_err());

        config.ga.tournament_size = config.ga.population_size;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_arena_without_room_rejected() {
        let mut config = Config::default();
        config.arena = ArenaConfig::open(2, 10);
        assert!(config.validate().is_err());

        // 3x3 has a single interior cell, not enough for two actors
        config.arena = ArenaConfig::open(3, 3);
        assert!(config.validate().is_err());

        config.arena = ArenaConfig::open(3, 4);
        assert!(config.validate().is_ok());

        config.arena = ArenaConfig {
            height: 5,
            width: 5,
            obstacles: vec![Obstacle {
                row: 1,
                col: 1,
                size: 3,
            }],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_turn_angle_must_divide_circle() {
        let mut config = Config::default();
        config.simulation.turn_angle = 7;
        assert!(config.validate().is_err());
        config.simulation.turn_angle = 0;
        assert!(config.validate().is_err());
        config.simulation.turn_angle = 90;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_arena_configs_compare_by_layout() {
        assert_eq!(ArenaConfig::open(10, 12), ArenaConfig::open(10, 12));
        assert_ne!(ArenaConfig::open(10, 12), ArenaConfig::open(12, 10));
        assert_ne!(ArenaConfig::default(), ArenaConfig::open(200, 200));
    }
}
