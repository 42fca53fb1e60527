//! Importer configuration.
//!
//! Values are plain data so the binary can layer them: defaults, then an optional
//! JSON file, then CLI flags / environment variables.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level importer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImporterConfig {
    /// The network this importer mirrors.
    pub network: NetworkConfig,

    /// Entity id cache bounds.
    pub cache: CacheConfig,
}

impl ImporterConfig {
    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(
            target: "mirror::config",
            path = %path.display(),
            shard = config.network.shard,
            realm = config.network.realm,
            "Loaded importer configuration"
        );

        Ok(config)
    }
}

/// Shard and realm of the local network.
///
/// EVM addresses that encode a `shard.realm.num` are only trusted when they point into
/// this shard and realm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub shard: u64,
    pub realm: u64,
}

/// Bounds for the entity id cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached identities. Zero disables caching.
    pub max_entries: usize,

    /// Time-to-live of a cache entry, in seconds.
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500_000,
            ttl_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImporterConfig::default();
        assert_eq!(config.network, NetworkConfig { shard: 0, realm: 0 });
        assert_eq!(config.cache.max_entries, 500_000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "network": {{ "shard": 1 }}, "cache": {{ "ttl_secs": 60 }} }}"#).unwrap();

        let config = ImporterConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.network.shard, 1);
        assert_eq!(config.network.realm, 0);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 500_000);
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = ImporterConfig::from_json_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
