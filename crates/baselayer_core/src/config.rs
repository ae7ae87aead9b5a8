//! # Configuration
//!
//! Sizing knobs for the allocators and tables, loaded once at startup from
//! TOML. Every section is optional; missing values fall back to the
//! built-in defaults.
//!
//! ```toml
//! [arena]
//! reserve_bytes = 1073741824
//! commit_chunk = 16384
//!
//! [pool]
//! min_block_size = 64
//!
//! [map]
//! default_slots = 1023
//!
//! [dict]
//! default_slots = 1023
//! mix_hash = true
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::memory::{ARENA_COMMIT_CHUNK, ARENA_RESERVE_SIZE, MIN_BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Arena sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Address space reserved by a growable arena.
    pub reserve_bytes: usize,
    /// Commit granularity of a growable arena.
    pub commit_chunk: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            reserve_bytes: ARENA_RESERVE_SIZE,
            commit_chunk: ARENA_COMMIT_CHUNK,
        }
    }
}

/// Pool sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Block size granularity.
    pub min_block_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_block_size: MIN_BLOCK_SIZE,
        }
    }
}

/// Address map sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Slot count used when the caller does not pick one.
    pub default_slots: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_slots: 1023,
        }
    }
}

/// String dictionary sizing and hashing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictConfig {
    /// Slot count used when the caller does not pick one.
    pub default_slots: usize,
    /// Run the DJB2 hash through the avalanche mixer before reducing it.
    pub mix_hash: bool,
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            default_slots: 1023,
            mix_hash: true,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselayerConfig {
    /// Arena section.
    pub arena: ArenaConfig,
    /// Pool section.
    pub pool: PoolConfig,
    /// Address map section.
    pub map: MapConfig,
    /// String dictionary section.
    pub dict: DictConfig,
}

impl BaselayerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        let arena = &self.arena;
        if arena.commit_chunk == 0 {
            return Err(ConfigError::Invalid("arena.commit_chunk must be non-zero".into()));
        }
        if arena.reserve_bytes < arena.commit_chunk {
            return Err(ConfigError::Invalid(format!(
                "arena.reserve_bytes ({}) is smaller than arena.commit_chunk ({})",
                arena.reserve_bytes, arena.commit_chunk
            )));
        }
        if arena.reserve_bytes % arena.commit_chunk != 0 {
            return Err(ConfigError::Invalid(format!(
                "arena.reserve_bytes ({}) is not a multiple of arena.commit_chunk ({})",
                arena.reserve_bytes, arena.commit_chunk
            )));
        }
        if !self.pool.min_block_size.is_power_of_two() || self.pool.min_block_size < 8 {
            return Err(ConfigError::Invalid(format!(
                "pool.min_block_size ({}) must be a power of two of at least 8",
                self.pool.min_block_size
            )));
        }
        if self.map.default_slots == 0 {
            return Err(ConfigError::Invalid("map.default_slots must be non-zero".into()));
        }
        if self.dict.default_slots == 0 {
            return Err(ConfigError::Invalid("dict.default_slots must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = BaselayerConfig::from_toml_str("").unwrap();
        assert_eq!(config, BaselayerConfig::default());
        assert_eq!(config.arena.reserve_bytes, 1024 * 1024 * 1024);
        assert_eq!(config.arena.commit_chunk, 16 * 1024);
        assert_eq!(config.map.default_slots, 1023);
        assert!(config.dict.mix_hash);
    }

    #[test]
    fn test_partial_sections() {
        let config = BaselayerConfig::from_toml_str(
            r#"
            [arena]
            commit_chunk = 4096

            [dict]
            mix_hash = false
            "#,
        )
        .unwrap();
        assert_eq!(config.arena.commit_chunk, 4096);
        assert_eq!(config.arena.reserve_bytes, ARENA_RESERVE_SIZE);
        assert!(!config.dict.mix_hash);
        assert_eq!(config.dict.default_slots, 1023);
    }

    #[test]
    fn test_rejects_misaligned_reserve() {
        let err = BaselayerConfig::from_toml_str(
            r#"
            [arena]
            reserve_bytes = 10000
            commit_chunk = 4096
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_slots() {
        let err = BaselayerConfig::from_toml_str("[map]\ndefault_slots = 0\n").unwrap_err();
        assert!(err.to_string().contains("map.default_slots"));
    }

    #[test]
    fn test_rejects_bad_toml() {
        let err = BaselayerConfig::from_toml_str("[arena\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = BaselayerConfig::load("/nonexistent/baselayer.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
