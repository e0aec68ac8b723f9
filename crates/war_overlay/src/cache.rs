//! Registry persistence for incremental assembly.
//!
//! After a successful run the [`PathRegistry`] is serialized to the cache file
//! (by default `target/war/work/webapp-cache.json`). The next run loads it and
//! passes it to the applier as the previous registry: files owned by the same
//! overlay last time are only refreshed, and files whose owner stopped
//! contributing them are removed from the output directory.
//!
//! A cache written by another schema version is treated as missing.

use crate::error::Result;
use crate::overlay::OverlayId;
use crate::registry::{PathRegistry, RelativePath};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current cache schema version.
pub const CACHE_VERSION: u32 = 1;

/// Snapshot of the path registry of the last run.
///
/// # JSON format
///
/// ```json
/// {
///   "version": 1,
///   "overlays": ["currentBuild", "org.sample:shell"],
///   "entries": {
///     "WEB-INF/web.xml": "currentBuild",
///     "css/shell.css": "org.sample:shell"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCache {
    pub version: u32,

    /// Overlay ids of the last run, in priority order.
    pub overlays: Vec<OverlayId>,

    /// Path to owner mapping.
    pub entries: BTreeMap<RelativePath, OverlayId>,
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            overlays: Vec::new(),
            entries: BTreeMap::new(),
        }
    }
}

impl RegistryCache {
    pub fn new(overlays: Vec<OverlayId>, registry: &PathRegistry) -> Self {
        Self {
            version: CACHE_VERSION,
            overlays,
            entries: registry.entries().clone(),
        }
    }

    /// Load the cache from a file.
    ///
    /// Returns `Ok(None)` if the file doesn't exist or was written with another
    /// schema version. Returns `Err` if the file exists but cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path.as_std_path())?;
        let cache: Self = serde_json::from_str(&contents)?;
        if cache.version != CACHE_VERSION {
            tracing::info!(
                "Ignoring registry cache {} with version {} (expected {})",
                path,
                cache.version,
                CACHE_VERSION
            );
            return Ok(None);
        }
        Ok(Some(cache))
    }

    /// Save the cache to a file, creating parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_std_path(), contents)?;
        Ok(())
    }

    pub fn into_registry(self) -> PathRegistry {
        PathRegistry::from_entries(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn example_registry() -> PathRegistry {
        let mut registry = PathRegistry::new();
        registry.register_if_absent(
            &OverlayId::current_build(),
            &RelativePath::new("WEB-INF/web.xml").unwrap(),
        );
        registry
    }

    #[test]
    fn test_default_cache() {
        let cache = RegistryCache::default();
        assert_eq!(cache.version, CACHE_VERSION);
        assert!(cache.overlays.is_empty());
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp = NamedTempFile::new().unwrap();
        let path = Utf8Path::from_path(temp.path()).unwrap();

        let registry = example_registry();
        let cache = RegistryCache::new(vec![OverlayId::current_build()], &registry);

        cache.save(path).unwrap();

        let loaded = RegistryCache::load(path).unwrap().unwrap();
        assert_eq!(loaded, cache);
        assert_eq!(loaded.into_registry(), registry);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp = NamedTempFile::new().unwrap();
        let std_path = temp.path().with_extension("nonexistent");
        let path = Utf8Path::from_path(&std_path).unwrap();

        assert!(RegistryCache::load(path).unwrap().is_none());
    }

    #[test]
    fn test_load_invalid_json() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"{ invalid json }").unwrap();
        temp.flush().unwrap();

        let path = Utf8Path::from_path(temp.path()).unwrap();
        assert!(RegistryCache::load(path).is_err());
    }

    #[test]
    fn test_load_other_version_is_ignored() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(br#"{"version": 99, "overlays": [], "entries": {}}"#)
            .unwrap();
        temp.flush().unwrap();

        let path = Utf8Path::from_path(temp.path()).unwrap();
        assert!(RegistryCache::load(path).unwrap().is_none());
    }

    #[test]
    fn test_serialization_format() {
        let cache = RegistryCache::new(vec![OverlayId::current_build()], &example_registry());
        let json = serde_json::to_string(&cache).unwrap();

        assert!(json.contains("\"version\":1"));
        assert!(json.contains("\"overlays\":[\"currentBuild\"]"));
        assert!(json.contains("\"WEB-INF/web.xml\":\"currentBuild\""));
    }
}
