use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::arena::WORD_SIZE;
use crate::error::{NnError, Result};
use crate::network::network::Network;

fn default_activation() -> ActivationFunction {
    ActivationFunction::Sigmoid
}

fn default_arena_capacity() -> usize {
    1024 * 1024
}

fn default_init_low() -> f64 {
    -1.0
}

fn default_init_high() -> f64 {
    1.0
}

/// Everything a training run needs besides the table itself.
///
/// Fields:
/// - `architecture`   — layer widths, input first
/// - `activation`     — nonlinearity shared by every layer
/// - `epochs`         — full passes over the table
/// - `learning_rate`  — gradient descent step size
/// - `batch_size`     — rows per gradient step; `None` uses the whole table
/// - `arena_capacity` — bytes of scratch arena for gradient networks
/// - `init_low`, `init_high` — range parameters are drawn from
/// - `shuffle`        — shuffle table rows before each epoch
/// - `seed`           — fixed RNG seed for reproducible runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub architecture: Vec<usize>,
    #[serde(default = "default_activation")]
    pub activation: ActivationFunction,
    pub epochs: usize,
    pub learning_rate: f64,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default = "default_arena_capacity")]
    pub arena_capacity: usize,
    #[serde(default = "default_init_low")]
    pub init_low: f64,
    #[serde(default = "default_init_high")]
    pub init_high: f64,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainConfig {
    /// Creates a full-batch Sigmoid config with default arena and init range.
    pub fn new(architecture: Vec<usize>, epochs: usize, learning_rate: f64) -> Self {
        TrainConfig {
            architecture,
            activation: default_activation(),
            epochs,
            learning_rate,
            batch_size: None,
            arena_capacity: default_arena_capacity(),
            init_low: default_init_low(),
            init_high: default_init_high(),
            shuffle: false,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.architecture.len() < 2 || self.architecture.contains(&0) {
            return Err(NnError::InvalidConfig(format!(
                "architecture {:?} needs at least two non-empty layers",
                self.architecture
            )));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(NnError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == Some(0) {
            return Err(NnError::InvalidConfig("batch_size must be at least 1".to_string()));
        }
        if !(self.init_low < self.init_high) {
            return Err(NnError::InvalidConfig(format!(
                "init range [{}, {}) is empty",
                self.init_low, self.init_high
            )));
        }
        let needed = self.gradient_bytes();
        if self.arena_capacity < needed {
            return Err(NnError::InvalidConfig(format!(
                "arena_capacity {} cannot hold one gradient network ({needed} bytes)",
                self.arena_capacity
            )));
        }
        Ok(())
    }

    /// Arena bytes taken by one gradient network for this architecture.
    pub fn gradient_bytes(&self) -> usize {
        let params: usize = self
            .architecture
            .windows(2)
            .map(|pair| pair[0] * pair[1] + pair[1])
            .sum();
        let activations: usize = self.architecture.iter().sum();
        (params + activations) * WORD_SIZE
    }

    /// RNG seeded from `seed`, or from OS entropy when unset.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Heap-allocated network with parameters drawn from the init range.
    pub fn build_network<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network<'static>> {
        let mut network = Network::new(None, &self.architecture, self.activation)?;
        network.randomize(rng, self.init_low, self.init_high);
        Ok(network)
    }

    /// Parses and validates a JSON config.
    pub fn from_json_str(json: &str) -> Result<TrainConfig> {
        let config: TrainConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON config file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: TrainConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
