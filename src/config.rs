use crate::errors::DbError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard cap of the underlying bulk-write mechanism.
pub const MAX_BATCH_SIZE: usize = 500;

/// Configuration shared by the compiler, the batch updater and the collection facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub id_field: String,
    pub uid_field: String,
    pub created_at_field: String,
    pub updated_at_field: String,
    pub deleted_at_field: String,
    pub default_per_page: u32,
    pub batch_size: usize,
    /// `field:direction`, used when pagination params carry no sort.
    pub default_order_by: String,
    /// Trace compiled queries through the dev6 channel.
    pub debug: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            uid_field: "uid".to_string(),
            created_at_field: "createdAt".to_string(),
            updated_at_field: "updatedAt".to_string(),
            deleted_at_field: "deletedAt".to_string(),
            default_per_page: 25,
            batch_size: MAX_BATCH_SIZE,
            default_order_by: "createdAt:desc".to_string(),
            debug: false,
        }
    }
}

impl CollectionConfig {
    /// # Errors
    /// Returns an error if the TOML text does not describe a config.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))
    }

    /// Reads a TOML file, then applies environment overrides.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| DbError::Io(format!("{}: {e}", path.display())))?;
        let mut cfg = Self::from_toml_str(&s)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Overrides from `NEXUSDOC_PER_PAGE`, `NEXUSDOC_BATCH_SIZE` and `NEXUSDOC_DEBUG`.
    pub fn apply_env(&mut self) {
        if let Some(n) = std::env::var("NEXUSDOC_PER_PAGE").ok().and_then(|s| s.parse().ok()) {
            self.default_per_page = n;
        }
        if let Some(n) = std::env::var("NEXUSDOC_BATCH_SIZE").ok().and_then(|s| s.parse().ok()) {
            self.batch_size = n;
        }
        if let Ok(s) = std::env::var("NEXUSDOC_DEBUG") {
            self.debug = matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Group size actually used for bulk writes, never above `MAX_BATCH_SIZE` and never zero.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }

    /// Page size actually used when a caller passes `0`.
    #[must_use]
    pub fn effective_per_page(&self) -> u32 {
        self.default_per_page.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = CollectionConfig::from_toml_str("default_per_page = 10\ndebug = true\n").unwrap();
        assert_eq!(cfg.default_per_page, 10);
        assert!(cfg.debug);
        assert_eq!(cfg.deleted_at_field, "deletedAt");
        assert_eq!(cfg.batch_size, 500);
    }

    #[test]
    fn batch_size_is_capped() {
        let cfg = CollectionConfig { batch_size: 5000, ..CollectionConfig::default() };
        assert_eq!(cfg.effective_batch_size(), MAX_BATCH_SIZE);
        let cfg = CollectionConfig { batch_size: 0, ..CollectionConfig::default() };
        assert_eq!(cfg.effective_batch_size(), 1);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = CollectionConfig::from_toml_str("batch_size = \"many\"").unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nexusdoc.toml");
        std::fs::write(&p, "id_field = \"key\"\n").unwrap();
        let cfg = CollectionConfig::load(&p).unwrap();
        assert_eq!(cfg.id_field, "key");
    }
}
