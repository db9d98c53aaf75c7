//! Display metadata for sources and locations
//!
//! The snapshot archive ships a metadata file mapping machine ids to
//! human-readable names. The engine never reads it; callers use it to
//! decorate reports. Lookups default to `None` for unknown ids instead of
//! failing, matching the archive's loosely-populated file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Metadata of one location within a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMeta {
    /// Human-readable location name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Metadata of one snapshot source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    /// Human-readable source name.
    #[serde(default)]
    pub name: Option<String>,
    /// Per-location metadata, keyed by location id.
    #[serde(default)]
    pub locations: BTreeMap<String, LocationMeta>,
}

/// The full metadata lookup, keyed by source id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataStore {
    sources: BTreeMap<String, SourceMeta>,
}

impl MetadataStore {
    /// An empty store; every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the archive's metadata JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Metadata of a source, if present.
    pub fn source(&self, source_id: &str) -> Option<&SourceMeta> {
        self.sources.get(source_id)
    }

    /// Human-readable name of a source.
    pub fn source_name(&self, source_id: &str) -> Option<&str> {
        self.sources.get(source_id)?.name.as_deref()
    }

    /// Human-readable name of a location within a source.
    pub fn location_name(&self, source_id: &str, location_id: &str) -> Option<&str> {
        self.sources.get(source_id)?.locations.get(location_id)?.name.as_deref()
    }

    /// Human-readable name for a `source_id/location_id` key, if both parts
    /// are known.
    pub fn display_name(&self, location_key: &str) -> Option<String> {
        let (source_id, location_id) = location_key.split_once('/')?;
        let source = self.source_name(source_id)?;
        let location = self.location_name(source_id, location_id)?;
        Some(format!("{source} {location}"))
    }

    /// Insert or replace a source's display name.
    pub fn set_source_name(&mut self, source_id: &str, name: &str) {
        self.sources.entry(source_id.to_string()).or_default().name = Some(name.to_string());
    }

    /// Insert or replace a location's display name.
    pub fn set_location_name(&mut self, source_id: &str, location_id: &str, name: &str) {
        self.sources
            .entry(source_id.to_string())
            .or_default()
            .locations
            .entry(location_id.to_string())
            .or_default()
            .name = Some(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_default_to_none() {
        let store = MetadataStore::new();
        assert!(store.source_name("bonn").is_none());
        assert!(store.location_name("bonn", "meldewesen").is_none());
        assert!(store.display_name("bonn/meldewesen").is_none());
    }

    #[test]
    fn test_nested_lookup() {
        let mut store = MetadataStore::new();
        store.set_source_name("bonn", "Bonn");
        store.set_location_name("bonn", "meldewesen", "Meldewesen");

        assert_eq!(store.source_name("bonn"), Some("Bonn"));
        assert_eq!(store.location_name("bonn", "meldewesen"), Some("Meldewesen"));
        assert_eq!(store.display_name("bonn/meldewesen").as_deref(), Some("Bonn Meldewesen"));
        // Known source, unknown location
        assert!(store.location_name("bonn", "kfz-zulassungswesen").is_none());
    }

    #[test]
    fn test_from_json_tolerates_sparse_entries() {
        let store = MetadataStore::from_json(
            r#"{
                "bonn": {
                    "name": "Bonn",
                    "locations": {"meldewesen": {"name": "Meldewesen"}}
                },
                "jena": {}
            }"#,
        )
        .unwrap();

        assert_eq!(store.source_name("bonn"), Some("Bonn"));
        assert!(store.source_name("jena").is_none());
        assert!(store.source("jena").is_some());
    }
}
