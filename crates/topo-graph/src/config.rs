//! Configuration
//!
//! TOML configuration for the entity graph. Every section is optional; a
//! missing section or key takes its default.
//!
//! ```toml
//! [graph]
//! name = "entity_graph"
//! root_id = "openstack.cluster"
//!
//! [matching]
//! max_steps = 100000
//! injective = false
//! seed_unanchored = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::graph::{GraphError, Result};

/// Log levels accepted by [`LoggingConfig::level`]
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graph settings
    pub graph: GraphSettings,

    /// Template matching settings
    pub matching: MatchingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GraphError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| GraphError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GraphError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.graph.name.is_empty() {
            return Err(GraphError::Config("Graph name cannot be empty".to_string()));
        }

        if self.graph.root_id.as_deref() == Some("") {
            return Err(GraphError::Config("Root id cannot be empty".to_string()));
        }

        if self.matching.max_steps == Some(0) {
            return Err(GraphError::Config(
                "Matching max_steps cannot be 0".to_string(),
            ));
        }

        self.logging.validate()
    }
}

/// Graph settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Graph name
    pub name: String,

    /// Designated root vertex (e.g. the cluster vertex)
    pub root_id: Option<String>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            name: "entity_graph".to_string(),
            root_id: None,
        }
    }
}

/// Template matching settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum number of candidates processed per matching call
    pub max_steps: Option<u64>,

    /// A live vertex may be mapped by at most one pattern vertex
    pub injective: bool,

    /// Pin unanchored pattern components by scanning live vertices
    pub seed_unanchored: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Validate the level. Plain levels are checked against
    /// [`LOG_LEVELS`]; directives such as `topo_graph=debug` are accepted
    /// when their level part is known.
    pub fn validate(&self) -> Result<()> {
        for directive in self.level.split(',').map(str::trim) {
            let level = directive.rsplit('=').next().unwrap_or(directive);
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(GraphError::Config(format!(
                    "Invalid log level: {}. Expected one of: {}",
                    self.level,
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,

    /// JSON format
    Json,
}
