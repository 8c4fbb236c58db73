//! Configuration system for cpforge.
//!
//! Load solver parameters from TOML or YAML to control trail compression,
//! propagation tracing and search limits without code changes.
//!
//! # Examples
//!
//! Load configuration from a TOML string:
//!
//! ```
//! use cpforge_config::{SolverConfig, TrailCompression};
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     compress_trail = "compress_with_zlib"
//!     trail_block_size = 1024
//!     random_seed = 7
//!
//!     [limits]
//!     time_limit_ms = 2500
//!     solutions = 10
//! "#).unwrap();
//!
//! assert_eq!(config.compress_trail, TrailCompression::CompressWithZlib);
//! assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use cpforge_config::SolverConfig;
//!
//! let config = SolverConfig::load("solver.toml").unwrap_or_default();
//! assert_eq!(config.trail_block_size, 8000);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of cells per trail block.
pub const DEFAULT_TRAIL_BLOCK_SIZE: usize = 8000;

/// Default number of demon runs between two periodic limit checks.
pub const DEFAULT_TEST_PERIOD: u64 = 10_000;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main solver configuration.
///
/// A solver copies its configuration at construction; changing a config
/// afterwards has no effect on existing solvers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    /// How full trail blocks are stored.
    #[serde(default)]
    pub compress_trail: TrailCompression,

    /// Cells per trail block.
    #[serde(default = "default_trail_block_size")]
    pub trail_block_size: usize,

    /// Demon runs between two periodic checks of the search limits.
    #[serde(default = "default_test_period")]
    pub test_period: u64,

    /// Log every demon run at trace level.
    #[serde(default)]
    pub trace_propagation: bool,

    /// Install a search trace monitor on top-level searches.
    #[serde(default)]
    pub trace_search: bool,

    /// Count demon runs per demon name.
    #[serde(default)]
    pub profile_propagation: bool,

    /// Fail immediately during root propagation.
    #[serde(default)]
    pub disable_solve: bool,

    /// Random seed for reproducible results.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Search limits installed on every top-level search.
    #[serde(default)]
    pub limits: Option<LimitConfig>,
}

fn default_trail_block_size() -> usize {
    DEFAULT_TRAIL_BLOCK_SIZE
}

fn default_test_period() -> u64 {
    DEFAULT_TEST_PERIOD
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            compress_trail: TrailCompression::default(),
            trail_block_size: DEFAULT_TRAIL_BLOCK_SIZE,
            test_period: DEFAULT_TEST_PERIOD,
            trace_propagation: false,
            trace_search: false,
            profile_propagation: false,
            disable_solve: false,
            random_seed: None,
            limits: None,
        }
    }
}

impl SolverConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot drive a solver.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trail_block_size == 0 {
            return Err(ConfigError::Invalid(
                "trail_block_size must be positive".to_string(),
            ));
        }
        if self.test_period == 0 {
            return Err(ConfigError::Invalid(
                "test_period must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the trail compression scheme.
    pub fn with_compress_trail(mut self, compression: TrailCompression) -> Self {
        self.compress_trail = compression;
        self
    }

    /// Sets the number of cells per trail block.
    pub fn with_trail_block_size(mut self, cells: usize) -> Self {
        self.trail_block_size = cells;
        self
    }

    /// Sets the number of demon runs between periodic checks.
    pub fn with_test_period(mut self, runs: u64) -> Self {
        self.test_period = runs;
        self
    }

    pub fn with_trace_propagation(mut self, enabled: bool) -> Self {
        self.trace_propagation = enabled;
        self
    }

    pub fn with_trace_search(mut self, enabled: bool) -> Self {
        self.trace_search = enabled;
        self
    }

    pub fn with_profile_propagation(mut self, enabled: bool) -> Self {
        self.profile_propagation = enabled;
        self
    }

    pub fn with_disable_solve(mut self, disabled: bool) -> Self {
        self.disable_solve = disabled;
        self
    }

    /// Sets the random seed.
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit_ms(mut self, millis: u64) -> Self {
        self.limits = Some(LimitConfig {
            time_limit_ms: Some(millis),
            ..self.limits.unwrap_or_default()
        });
        self
    }

    /// Replaces the search limits.
    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Returns the time limit, if configured.
    ///
    /// Convenience method that delegates to `limits.time_limit()`.
    pub fn time_limit(&self) -> Option<Duration> {
        self.limits.as_ref().and_then(LimitConfig::time_limit)
    }
}

/// Storage of full trail blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailCompression {
    /// Blocks are kept as plain copies.
    #[default]
    NoCompression,

    /// Blocks are compressed with zlib.
    CompressWithZlib,
}

/// Search limit configuration.
///
/// Every field is optional; a search stops as soon as any configured limit
/// is crossed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitConfig {
    /// Maximum wall time in milliseconds.
    #[serde(default)]
    pub time_limit_ms: Option<u64>,

    /// Maximum number of branches.
    #[serde(default)]
    pub branches: Option<u64>,

    /// Maximum number of failures.
    #[serde(default)]
    pub failures: Option<u64>,

    /// Maximum number of solutions.
    #[serde(default)]
    pub solutions: Option<u64>,

    /// Count from solver creation instead of search entry.
    #[serde(default)]
    pub cumulative: bool,
}

impl LimitConfig {
    /// Returns the time limit as a Duration, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// Returns true if no limit is configured.
    pub fn is_unbounded(&self) -> bool {
        self.time_limit_ms.is_none()
            && self.branches.is_none()
            && self.failures.is_none()
            && self.solutions.is_none()
    }
}
