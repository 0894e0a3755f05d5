//! Engine configuration.
//!
//! Every session and every whole-object operation receives a [`CodecConfig`]
//! explicitly; nothing is read from process-wide state.  Tests shrink the
//! chunk sizes to force chunk-boundary conditions with small inputs.
//!
//! The on-disk form is JSON with every field optional:
//!
//! ```json
//! { "level": 3, "chunk_size": 16384, "read_chunk_size": 32768, "checksum": true }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Working chunk: codec output staging and memory-source slicing (16 KiB).
pub const DEFAULT_CHUNK_SIZE:        usize = 16 * 1024;
/// Bulk chunk for reading file sources (32 KiB).
pub const DEFAULT_READ_CHUNK_SIZE:   usize = 32 * 1024;
/// Default Zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32   = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Zstd level used for every compression session.
    pub level:           i32,
    /// Size of the codec output chunk and of memory-source slices.
    pub chunk_size:      usize,
    /// Size of each bulk read from a file source.
    pub read_chunk_size: usize,
    /// Write the zstd frame checksum.  Part of the object bytes, so it
    /// changes every object name when toggled.
    pub checksum:        bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            level:           DEFAULT_COMPRESSION_LEVEL,
            chunk_size:      DEFAULT_CHUNK_SIZE,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            checksum:        true,
        }
    }
}

impl CodecConfig {
    /// Same defaults with both chunk sizes replaced.
    pub fn with_chunk_sizes(chunk_size: usize, read_chunk_size: usize) -> Self {
        Self { chunk_size, read_chunk_size, ..Self::default() }
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if self.chunk_size == 0 {
            return Err(CodecError::Config("chunk_size must be at least 1".into()));
        }
        if self.read_chunk_size == 0 {
            return Err(CodecError::Config("read_chunk_size must be at least 1".into()));
        }
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.level) {
            return Err(CodecError::Config(format!(
                "level {} outside supported range {}..={}",
                self.level,
                levels.start(),
                levels.end(),
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, CodecError> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| CodecError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        CodecConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CodecConfig::from_json(r#"{ "chunk_size": 64 }"#).unwrap();
        assert_eq!(cfg.chunk_size, 64);
        assert_eq!(cfg.read_chunk_size, DEFAULT_READ_CHUNK_SIZE);
        assert_eq!(cfg.level, DEFAULT_COMPRESSION_LEVEL);
        assert!(cfg.checksum);
    }

    #[test]
    fn zero_chunk_rejected() {
        let err = CodecConfig::from_json(r#"{ "read_chunk_size": 0 }"#).unwrap_err();
        assert!(matches!(err, CodecError::Config(_)));
    }

    #[test]
    fn out_of_range_level_rejected() {
        let cfg = CodecConfig { level: 1000, ..CodecConfig::default() };
        assert!(matches!(cfg.validate(), Err(CodecError::Config(_))));
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(CodecConfig::from_json(r#"{ "codec": "lz4" }"#).is_err());
    }
}
