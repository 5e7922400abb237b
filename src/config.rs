//! Configuration System
//!
//! Layered engine configuration: built-in defaults, then `<root>/projtree.toml`,
//! then `<root>/config/{PROJTREE_ENV}.toml`, then `PROJTREE__SECTION__KEY`
//! environment variables. Tests included.

use crate::concurrency::gate::{init_traversal_gate, DEFAULT_TRAVERSAL_GATE};
use crate::error::{Result, TreeError};
use crate::logging::LoggingConfig;
use crate::traverse::traverser::{TraversalOrder, DEFAULT_MAX_CONCURRENCY};
use crate::tree::walker::WalkerConfig;
use config::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

mod sources {
    pub(super) mod environment;
    pub(super) mod workspace_file;
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Worker pool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Concurrent work units; 0 means one per logical CPU
    #[serde(default)]
    pub workers: usize,
}

/// Traversal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalConfig {
    #[serde(default)]
    pub order: TraversalOrder,

    /// Per-traversal ceiling on in-flight visitor calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Time budget for one traversal, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub continue_on_error: bool,

    /// Size of the process-wide traversal gate
    #[serde(default = "default_gate_permits")]
    pub gate_permits: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_gate_permits() -> usize {
    DEFAULT_TRAVERSAL_GATE
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            order: TraversalOrder::default(),
            max_concurrency: default_max_concurrency(),
            timeout_ms: None,
            continue_on_error: false,
            gate_permits: default_gate_permits(),
        }
    }
}

impl TraversalConfig {
    /// Size the process-wide gate from this config
    ///
    /// Only effective before the first parallel traversal; returns false otherwise.
    pub fn install_gate(&self) -> bool {
        init_traversal_gate(self.gate_permits)
    }
}

/// Filesystem sync settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Entry names skipped during sync, with everything below them
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub follow_symlinks: bool,

    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl From<&SyncConfig> for WalkerConfig {
    fn from(config: &SyncConfig) -> Self {
        WalkerConfig {
            follow_symlinks: config.follow_symlinks,
            ignore_patterns: config.ignore_patterns.clone(),
            max_depth: config.max_depth,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Traversal(String),
    Sync(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Traversal(msg) => write!(f, "Traversal: {}", msg),
            ValidationError::Sync(msg) => write!(f, "Sync: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EngineConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.traversal.max_concurrency == 0 {
            errors.push(ValidationError::Traversal(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.traversal.gate_permits == 0 {
            errors.push(ValidationError::Traversal(
                "gate_permits must be at least 1".to_string(),
            ));
        }
        if self.traversal.timeout_ms == Some(0) {
            errors.push(ValidationError::Traversal(
                "timeout_ms must be positive when set".to_string(),
            ));
        }

        for pattern in &self.sync.ignore_patterns {
            if pattern.is_empty() || pattern.contains('/') {
                errors.push(ValidationError::Sync(format!(
                    "ignore pattern '{}' must be a single entry name",
                    pattern
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads `EngineConfig` from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration for the project rooted at `root`
    pub fn load(root: &Path) -> Result<EngineConfig> {
        let builder = Config::builder();
        let builder = sources::workspace_file::add_to_builder(builder, root)?;
        let builder = sources::environment::add_to_builder(builder);

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Load and validate configuration from a single file, without other layers
    pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
        let config: EngineConfig = Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Self::validated(config)
    }

    fn validated(config: EngineConfig) -> Result<EngineConfig> {
        config.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            TreeError::Config(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })?;
        debug!(?config, "Loaded engine configuration");
        Ok(config)
    }
}
