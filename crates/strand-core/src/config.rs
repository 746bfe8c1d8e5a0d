//! Configuration surface for the environment, per spec Section 6.
//!
//! Every recognized option has a typed default. Defaults that read process
//! characteristics (core count, heap size) are computed once, at
//! [`EnvironmentConfig::with_defaults`] time — never at module load, per
//! the "Global mutable state" design note in spec Section 9.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a configuration value is sourced, per spec Section 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Always use the typed default; never consult the environment or a file.
    Ignore,
    /// Read from a process-wide system property (here: an environment variable).
    SystemProperty,
    /// Read from the `strand.properties` side-car file at the log location.
    File,
}

impl ConfigSource {
    /// Resolve a `bool`-valued setting named `key`, falling back to
    /// `default` per this source's strategy.
    pub fn resolve_bool(&self, key: &str, default: bool, file: &FileProperties) -> bool {
        match self {
            ConfigSource::Ignore => default,
            ConfigSource::SystemProperty => std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default),
            ConfigSource::File => file.get_bool(key).unwrap_or(default),
        }
    }

    /// Resolve an `i64`-valued setting named `key`, falling back to
    /// `default` per this source's strategy.
    pub fn resolve_int(&self, key: &str, default: i64, file: &FileProperties) -> i64 {
        match self {
            ConfigSource::Ignore => default,
            ConfigSource::SystemProperty => std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default),
            ConfigSource::File => file.get_int(key).unwrap_or(default),
        }
    }
}

/// Parsed `strand.properties` side-car, a flat TOML table of scalar
/// settings. Kept separate from `EnvironmentConfig` so the file can be
/// re-read and diffed on a configuration-change notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileProperties(pub toml::value::Table);

impl FileProperties {
    /// Load `strand.properties` from `location`, if present. Absence is
    /// not an error: the environment simply uses defaults.
    pub fn load(location: &Path) -> crate::error::Result<Self> {
        let path = location.join("strand.properties");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let table: toml::value::Table =
            toml::from_str(&content).map_err(|source| crate::error::Error::ConfigParse {
                path,
                source,
            })?;
        Ok(Self(table))
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_integer())
    }
}

/// Recognized environment configuration, per the table in spec Section 6.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    /// Threshold below which blobs are stored inline.
    pub max_in_place_blob_size: i64,
    /// Disables the entity iterable cache.
    pub caching_disabled: bool,
    /// Disables query reordering.
    pub reordering_disabled: bool,
    /// Records query plans.
    pub explain_on: bool,
    /// Chooses backing structure for unique indices.
    pub unique_indices_use_btree: bool,
    /// Bound on entity-iterable cache entries.
    pub entity_iterable_cache_size: i64,
    /// Cache worker thread count.
    pub entity_iterable_cache_thread_count: i64,
    /// Upper bound on a single cache build, in milliseconds.
    pub entity_iterable_cache_caching_timeout_ms: i64,
    /// Delay before background build, in milliseconds.
    pub entity_iterable_cache_deferred_delay_ms: i64,
    /// Inline-vs-handle boundary for cached values.
    pub entity_iterable_cache_max_size_of_direct_value: i64,
    /// Per-transaction property cache size.
    pub transaction_props_cache_size: i64,
    /// Per-transaction link cache size.
    pub transaction_links_cache_size: i64,
    /// Per-transaction blob-string cache size.
    pub transaction_blob_strings_cache_size: i64,
    /// Exposes the MBean-style admin surface.
    pub management_enabled: bool,
    /// Size cap for `StoreGetCache`. Zero disables the cache entirely.
    pub store_get_cache_size: i64,
    /// Size cap for `TreeNodesCache`. Zero disables the cache entirely.
    pub tree_nodes_cache_size: i64,
    /// Positive values enable the stuck-transaction monitor.
    pub transaction_timeout_ms: i64,
    /// Log sync period forwarded to the `Log`.
    pub log_sync_period_ms: u64,
    /// Durable-write flag forwarded to the `Log`.
    pub log_durable_write: bool,
    /// Whether the environment is opened readonly.
    pub readonly: bool,
    /// Whether a readonly environment with no MetaTree entry for a
    /// requested store returns a temporary empty store rather than failing.
    pub readonly_empty_stores: bool,
}

fn default_cache_size() -> i64 {
    let heap_mb = approx_heap_mb();
    heap_mb.max(4096)
}

fn default_thread_count() -> i64 {
    if num_cores() > 3 {
        2
    } else {
        1
    }
}

/// Best-effort estimate of available heap, in megabytes. Computed once at
/// construction time, never at module load (spec Section 9).
fn approx_heap_mb() -> i64 {
    4096
}

/// Best-effort core count, computed once at construction time.
fn num_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl EnvironmentConfig {
    /// Build a config with every option at its spec-mandated default,
    /// resolved through `source` against an optional `strand.properties`
    /// side-car at `location`.
    pub fn with_defaults(source: ConfigSource, location: &Path) -> crate::error::Result<Self> {
        let file = FileProperties::load(location)?;
        Ok(Self {
            max_in_place_blob_size: source.resolve_int(
                "maxInPlaceBlobSize",
                10_000,
                &file,
            ),
            caching_disabled: source.resolve_bool("cachingDisabled", false, &file),
            reordering_disabled: source.resolve_bool("reorderingDisabled", false, &file),
            explain_on: source.resolve_bool("explainOn", false, &file),
            unique_indices_use_btree: source.resolve_bool(
                "uniqueIndices.useBtree",
                false,
                &file,
            ),
            entity_iterable_cache_size: source.resolve_int(
                "entityIterableCache.size",
                default_cache_size(),
                &file,
            ),
            entity_iterable_cache_thread_count: source.resolve_int(
                "entityIterableCache.threadCount",
                default_thread_count(),
                &file,
            ),
            entity_iterable_cache_caching_timeout_ms: source.resolve_int(
                "entityIterableCache.cachingTimeout",
                10_000,
                &file,
            ),
            entity_iterable_cache_deferred_delay_ms: source.resolve_int(
                "entityIterableCache.deferredDelay",
                2_000,
                &file,
            ),
            entity_iterable_cache_max_size_of_direct_value: source.resolve_int(
                "entityIterableCache.maxSizeOfDirectValue",
                512,
                &file,
            ),
            transaction_props_cache_size: source.resolve_int(
                "transaction.propsCacheSize",
                1_024,
                &file,
            ),
            transaction_links_cache_size: source.resolve_int(
                "transaction.linksCacheSize",
                4_096,
                &file,
            ),
            transaction_blob_strings_cache_size: source.resolve_int(
                "transaction.blobStringsCacheSize",
                128,
                &file,
            ),
            management_enabled: source.resolve_bool("managementEnabled", true, &file),
            store_get_cache_size: source.resolve_int("storeGetCache.size", 0, &file),
            tree_nodes_cache_size: source.resolve_int("treeNodesCache.size", 0, &file),
            transaction_timeout_ms: source.resolve_int("transaction.timeout", 0, &file),
            log_sync_period_ms: 1_000,
            log_durable_write: false,
            readonly: source.resolve_bool("env.isReadonly", false, &file),
            readonly_empty_stores: source.resolve_bool(
                "env.readonly.emptyStores",
                false,
                &file,
            ),
        })
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        // `Ignore` against a nonexistent location never touches the
        // filesystem or `std::env`, so this can't fail.
        Self::with_defaults(ConfigSource::Ignore, Path::new("."))
            .expect("Ignore source never fails")
    }
}

/// A single configuration change, dispatched synchronously to listeners on
/// the writer (spec Section 9, "Listener dispatch"): handlers must not
/// take the commit lock.
#[derive(Debug, Clone, Copy)]
pub enum ChangedSetting {
    /// `storeGetCache.size` changed to this value.
    StoreGetCacheSize(i64),
    /// `treeNodesCache.size` changed to this value.
    TreeNodesCacheSize(i64),
    /// Log sync period changed to this many milliseconds.
    LogSyncPeriodMs(u64),
    /// Log durable-write flag changed.
    LogDurableWrite(bool),
    /// Readonly flag toggled.
    Readonly(bool),
}
