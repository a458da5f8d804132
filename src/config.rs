use crate::application::{DEFAULT_CACHE_TTL_MS, DEFAULT_COOLDOWN_MS};
use crate::domains::assignment::DEFAULT_KIND_QUALIFIED_STAGES;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `ASSIGN__CACHE__TTL_MS=5000`.
pub const ENV_PREFIX: &str = "ASSIGN";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub notifications: NotificationConfig,
    pub collections: CollectionNames,
    pub stages: StageConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_CACHE_TTL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub cooldown_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
        }
    }
}

/// Names of the three collections the assignment core keeps in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CollectionNames {
    pub workers: String,
    pub orders: String,
    pub activities: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            workers: "funcionarios".to_string(),
            orders: "ordens_servico".to_string(),
            activities: "atividades_funcionarios".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StageConfig {
    pub kind_qualified: Vec<String>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            kind_qualified: DEFAULT_KIND_QUALIFIED_STAGES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// When set, the multi-worker assign path also marks workers busy and opens activity records.
    pub unify_assign_many: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub level: String,
    pub buffer_capacity: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            buffer_capacity: 256,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing the file store. In-memory store when unset.
    pub data_file: Option<PathBuf>,
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, then the optional TOML file, then `ASSIGN__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
