//! Configuration loading and typed config structures for the Entropy Civ
//! simulation.
//!
//! The canonical configuration lives in `civ-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Model selection is configured separately from the environment (see
//! [`civ_llm::LlmConfig`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use civ_db::{
    DEFAULT_ACQUIRE_TIMEOUT_MS, DEFAULT_DATABASE_URL, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_MAX_CONNECTIONS, PostgresConfig,
};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `civ-config.yaml`. Every section is optional and
/// falls back to the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Population and turn loop parameters.
    #[serde(default)]
    pub simulation: SimulationSection,

    /// Epoch and chronicle cadences.
    #[serde(default)]
    pub detectors: DetectorsConfig,

    /// Memory distortion and local embedding settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Database and output locations.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DATABASE_URL` overrides `infrastructure.postgres_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.infrastructure.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the turn loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            (
                "simulation.consolidation_interval",
                self.simulation.consolidation_interval,
            ),
            ("detectors.epoch_interval", self.detectors.epoch_interval),
            (
                "detectors.chronicle_interval",
                self.detectors.chronicle_interval,
            ),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_owned(),
                });
            }
        }

        let probabilities = [
            ("simulation.entropy_factor", self.simulation.entropy_factor),
            ("memory.embellish_chance", self.memory.embellish_chance),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is not a probability"),
                });
            }
        }

        if !self.simulation.walk_step.is_finite() || self.simulation.walk_step < 0.0 {
            return Err(ConfigError::Invalid {
                field: "simulation.walk_step",
                reason: "must be a finite, non-negative distance".to_owned(),
            });
        }
        let pool = [
            (
                "infrastructure.max_connections",
                u64::from(self.infrastructure.max_connections),
            ),
            (
                "infrastructure.acquire_timeout_ms",
                self.infrastructure.acquire_timeout_ms,
            ),
        ];
        for (field, value) in pool {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be at least 1".to_owned(),
                });
            }
        }
        if self.memory.embedding_dimensions == 0 {
            return Err(ConfigError::Invalid {
                field: "memory.embedding_dimensions",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Population and turn loop parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationSection {
    /// Number of agents spawned on a fresh start.
    #[serde(default = "default_num_agents")]
    pub num_agents: u32,

    /// Personality tag given to every spawned agent.
    #[serde(default = "default_personality")]
    pub personality: String,

    /// Real-time milliseconds between turns.
    #[serde(default = "default_turn_interval_ms")]
    pub turn_interval_ms: u64,

    /// Stop after this many turns have run in this process (0 = unlimited).
    #[serde(default)]
    pub max_turns: u64,

    /// Consolidate memories and reflect every this many turns.
    #[serde(default = "default_consolidation_interval")]
    pub consolidation_interval: u64,

    /// Probability that a reflection is told as myth rather than fact.
    #[serde(default = "default_entropy_factor")]
    pub entropy_factor: f64,

    /// Largest per-axis displacement of the random walk.
    #[serde(default = "default_walk_step")]
    pub walk_step: f64,

    /// Seed for the simulation RNG. Unset means seeded from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            num_agents: default_num_agents(),
            personality: default_personality(),
            turn_interval_ms: default_turn_interval_ms(),
            max_turns: 0,
            consolidation_interval: default_consolidation_interval(),
            entropy_factor: default_entropy_factor(),
            walk_step: default_walk_step(),
            seed: None,
        }
    }
}

/// Detector cadences, in turns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DetectorsConfig {
    /// Check for a new epoch every this many turns.
    #[serde(default = "default_epoch_interval")]
    pub epoch_interval: u64,

    /// Write a chronicle every this many turns.
    #[serde(default = "default_chronicle_interval")]
    pub chronicle_interval: u64,
}

impl Default for DetectorsConfig {
    fn default() -> Self {
        Self {
            epoch_interval: default_epoch_interval(),
            chronicle_interval: default_chronicle_interval(),
        }
    }
}

/// Which embedder backs the long-term vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local feature hashing; needs no model server.
    #[default]
    Hashing,
    /// The embedding model served by the LLM backend.
    Model,
}

/// Memory settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemoryConfig {
    /// Embedder used for long-term memory.
    #[serde(default)]
    pub embedder: EmbedderKind,

    /// Per-word probability that consolidation exaggerates a memory.
    /// `0.0` leaves memories untouched.
    #[serde(default)]
    pub embellish_chance: f64,

    /// Vector width of the local hashing embedder.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            embedder: EmbedderKind::Hashing,
            embellish_chance: 0.0,
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

/// Database and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// `PostgreSQL` connection URL.
    #[serde(default = "default_postgres_url")]
    pub postgres_url: String,

    /// Database pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a free database connection.
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// How long an idle database connection stays open (0 = forever).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Where the sandbox snapshot JSON is written after every turn.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl InfrastructureConfig {
    /// Replace the database URL with `DATABASE_URL` when it is set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres_url = url;
        }
    }

    /// Pool settings for [`civ_db::PostgresPool::connect`].
    pub fn postgres(&self) -> PostgresConfig {
        PostgresConfig {
            url: self.postgres_url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            idle_timeout: (self.idle_timeout_secs > 0)
                .then_some(Duration::from_secs(self.idle_timeout_secs)),
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            postgres_url: default_postgres_url(),
            max_connections: default_max_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            snapshot_path: default_snapshot_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

const fn default_num_agents() -> u32 {
    5
}

fn default_personality() -> String {
    "Curious pioneer".to_owned()
}

const fn default_turn_interval_ms() -> u64 {
    2000
}

const fn default_consolidation_interval() -> u64 {
    5
}

const fn default_entropy_factor() -> f64 {
    0.3
}

const fn default_walk_step() -> f64 {
    5.0
}

const fn default_epoch_interval() -> u64 {
    50
}

const fn default_chronicle_interval() -> u64 {
    100
}

const fn default_embedding_dimensions() -> usize {
    64
}

fn default_postgres_url() -> String {
    DEFAULT_DATABASE_URL.to_owned()
}

const fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

const fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

const fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("sandbox_state.json")
}

fn default_log_level() -> String {
    "info".to_owned()
}
