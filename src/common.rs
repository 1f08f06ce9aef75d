use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PoolError, Result};

/// Default worker count for per-repository and per-tag registry requests.
pub const MAX_CONCURRENT_REQUESTS: u32 = 8;

/// Default worker count for per-subscription management requests.
pub const MAX_CONCURRENT_SUBSCRIPTION_REQUESTS: u32 = 5;

/// Page size requested when listing tags.
pub const PAGE_SIZE: u32 = 100;

/// Body of `GET /v2/_catalog`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Catalog {
    #[serde(default)]
    pub repositories: Vec<String>,
}

/// Body of `GET /v2/<name>/tags/list`.
///
/// Registries answer `"tags": null` for a repository with no tags left.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TagList {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// A schema 1 image manifest, reduced to the fields we read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Layer history, newest entry first.
    #[serde(default)]
    pub history: Vec<ManifestHistory>,
}

/// One entry of a manifest's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestHistory {
    /// Embedded JSON document describing the layer's image config.
    #[serde(rename = "v1Compatibility")]
    pub v1_compatibility: String,
}

#[derive(Debug, Deserialize)]
struct V1Compatibility {
    created: DateTime<Utc>,
}

impl Manifest {
    /// Returns the build time recorded in the newest history entry.
    pub fn created(&self) -> Result<DateTime<Utc>> {
        let newest = self
            .history
            .first()
            .ok_or_else(|| PoolError::Registry("manifest has no history".to_owned()))?;
        let compat: V1Compatibility = serde_json::from_str(&newest.v1_compatibility)?;
        Ok(compat.created)
    }
}
