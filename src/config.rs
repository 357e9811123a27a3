use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for [`crate::CachingPersistentCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryCachingConfig {
    /// Name of the store whose file acts as the expiration marker for every store created
    /// through the caching wrapper. Without it each store is its own marker.
    pub master_cache_name: Option<String>,

    /// Capacity hint for each store's in-memory mapping.
    pub initial_capacity: usize,
}

impl MemoryCachingConfig {
    pub fn with_master_cache(mut self, name: impl Into<String>) -> Self {
        self.master_cache_name = Some(name.into());
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
