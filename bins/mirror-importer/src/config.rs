//! Configuration for the mirror importer

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mirror::{EntityType, ImporterConfig, StreamType};

/// Mirror node importer tooling
///
/// Inspects stream filenames and node stream directories, and resolves entity
/// references the way the importer does during ingestion.
#[derive(Parser, Debug)]
#[command(name = "mirror-importer")]
#[command(about = "Inspect stream files and resolve entity ids", long_about = None)]
pub struct Config {
    /// Optional JSON configuration file
    ///
    /// Flags and environment variables below override values from this file.
    #[arg(long, env = "MIRROR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Shard of the local network
    #[arg(long, env = "MIRROR_SHARD", global = true)]
    pub shard: Option<u64>,

    /// Realm of the local network
    #[arg(long, env = "MIRROR_REALM", global = true)]
    pub realm: Option<u64>,

    /// Maximum number of cached entity ids (0 disables the cache)
    #[arg(long, env = "MIRROR_CACHE_MAX_ENTRIES", global = true)]
    pub cache_max_entries: Option<usize>,

    /// Time-to-live of cached entity ids, in seconds
    #[arg(long, env = "MIRROR_CACHE_TTL_SECS", global = true)]
    pub cache_ttl_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse stream filenames and print their components
    Parse {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List a node's stream files from a local copy of the bucket
    List {
        /// Bucket root containing `accountBalances`, `eventsStreams`, `recordstreams`
        #[arg(long)]
        root: PathBuf,

        /// Stream to list (balance, event, record)
        #[arg(long)]
        stream_type: StreamType,

        /// Node account id, e.g. 0.0.3
        #[arg(long)]
        node: String,

        /// Only print files after this filename's timestamp
        #[arg(long)]
        after: Option<String>,

        /// Include record sidecar files
        #[arg(long)]
        sidecars: bool,
    },

    /// Resolve entity references against a JSON entity file
    ///
    /// References are `shard.realm.num`, a `0x`-prefixed 20-byte EVM address or `alias:<hex>`.
    Resolve {
        /// JSON array of entities backing the lookup
        #[arg(long)]
        entities: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "account")]
        entity_type: EntityKind,

        /// Resolve all references as candidates and print the first match
        #[arg(long)]
        first: bool,

        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Entity types that carry alias or EVM address references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    Account,
    Contract,
}

impl From<EntityKind> for EntityType {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Account => EntityType::Account,
            EntityKind::Contract => EntityType::Contract,
        }
    }
}

impl Config {
    /// Layer the optional config file with CLI flags and environment variables.
    pub fn importer_config(&self) -> Result<ImporterConfig> {
        let mut config = match &self.config {
            Some(path) => ImporterConfig::from_json_file(path)?,
            None => ImporterConfig::default(),
        };

        if let Some(shard) = self.shard {
            config.network.shard = shard;
        }
        if let Some(realm) = self.realm {
            config.network.realm = realm;
        }
        if let Some(max_entries) = self.cache_max_entries {
            config.cache.max_entries = max_entries;
        }
        if let Some(ttl_secs) = self.cache_ttl_secs {
            config.cache.ttl_secs = ttl_secs;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"network": {{"shard": 1, "realm": 2}}, "cache": {{"max_entries": 10}}}}"#
        )
        .unwrap();

        let config = Config::parse_from([
            "mirror-importer",
            "--config",
            file.path().to_str().unwrap(),
            "--realm",
            "7",
            "parse",
            "2020-06-03T16_45_00.1Z.rcd",
        ]);
        let importer = config.importer_config().unwrap();

        assert_eq!(importer.network.shard, 1);
        assert_eq!(importer.network.realm, 7);
        assert_eq!(importer.cache.max_entries, 10);
        assert_eq!(importer.cache.ttl_secs, 3600);
    }

    #[test]
    fn test_list_arguments() {
        let config = Config::parse_from([
            "mirror-importer",
            "list",
            "--root",
            "/data",
            "--stream-type",
            "record",
            "--node",
            "0.0.3",
            "--sidecars",
        ]);

        match config.command {
            Command::List {
                stream_type,
                sidecars,
                after,
                ..
            } => {
                assert_eq!(stream_type, StreamType::Record);
                assert!(sidecars);
                assert!(after.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_stream_type_is_rejected() {
        let result = Config::try_parse_from([
            "mirror-importer",
            "list",
            "--root",
            "/data",
            "--stream-type",
            "blocks",
            "--node",
            "0.0.3",
        ]);
        assert!(result.is_err());
    }
}
