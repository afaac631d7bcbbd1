use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;

use crate::keys::DEFAULT_TTL;

pub const ENV_PREFIX: &str = "STUAPI";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Deployment name, e.g. "local" or "prod"
    pub env: String,
    pub http_server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpServerConfig {
    pub address: String,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Sqlite,
            url: "sqlite://students.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Local,
    Redis,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub kind: CacheKind,
    pub redis_url: String,
    /// Time to live of every cache entry, in milliseconds
    #[serde(with = "serde_millis")]
    pub ttl: Duration,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            ttl: DEFAULT_TTL,
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

impl Config {
    /// Read the file at `path`, then let `STUAPI__SECTION__KEY` variables
    /// override it. A bare `REDIS_ADDR` (host:port) wins over the redis url.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("config file does not exist: {}", path.display());
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut cfg: Config = settings.try_deserialize()?;
        if let Ok(addr) = env::var("REDIS_ADDR") {
            if !addr.is_empty() {
                cfg.cache.redis_url = format!("redis://{addr}");
            }
        }
        Ok(cfg)
    }
}

/// Config path from `CONFIG_PATH`, else from a `--config <path>` argument
pub fn resolve_path<I>(env_path: Option<String>, args: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return Ok(PathBuf::from(path));
        }
        if arg == "--config" {
            return args
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| anyhow!("--config needs a path"));
        }
    }

    Err(anyhow!("config path is required"))
}
