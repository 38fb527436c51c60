//! Packer configuration.
//!
//! Loaded once at process start from `wallpack.toml` (or the file named with
//! `--config`) and passed explicitly to the pipeline, validator and catalog.
//! A missing file means stock defaults; CLI flags override file values.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source = "assets/wallpapers"      # One subdirectory per pack
//! output = "static/wallpapers"      # packs/, previews/, thumbs/, manifest.json
//! base_url = "/static/wallpapers"   # Prefix for download_url / preview_url
//! force = false                     # Rebuild archives and previews that exist
//!
//! [preview]
//! width = 300                       # Preview bounding box
//! height = 200
//! quality = 85                      # JPEG quality (1-100)
//!
//! [archive]
//! compression_level = 6             # Deflate level (0-9)
//!
//! [processing]
//! max_processes = 4                 # Parallel pack workers (omit for auto)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "wallpack.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackerConfig {
    /// Source asset tree, one subdirectory per pack.
    pub source: PathBuf,
    /// Output root for archives, previews and the manifest.
    pub output: PathBuf,
    /// URL prefix the serving layer mounts `output` under.
    pub base_url: String,
    /// Rebuild archives and previews even when they already exist.
    pub force: bool,
    pub preview: PreviewConfig,
    pub archive: ArchiveConfig,
    pub processing: ProcessingConfig,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("assets/wallpapers"),
            output: PathBuf::from("static/wallpapers"),
            base_url: "/static/wallpapers".to_string(),
            force: false,
            preview: PreviewConfig::default(),
            archive: ArchiveConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl PackerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ConfigError::Validation(
                "preview.width and preview.height must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.preview.quality) {
            return Err(ConfigError::Validation(
                "preview.quality must be 1-100".into(),
            ));
        }
        if self.archive.compression_level > 9 {
            return Err(ConfigError::Validation(
                "archive.compression_level must be 0-9".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// `base_url` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Preview thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 200,
            quality: 85,
        }
    }
}

/// Archive compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub compression_level: u8,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of packs processed at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load config from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<PackerConfig, ConfigError> {
    if !path.exists() {
        return Ok(PackerConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config: PackerConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// A documented stock config, printed by `wallpack gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# wallpack configuration
# All options are optional; values below are the defaults.

# Source asset tree: one subdirectory per pack, each holding images and an
# optional pack_info.json.
source = "assets/wallpapers"

# Output root. Receives packs/, previews/, thumbs/ and manifest.json.
output = "static/wallpapers"

# URL prefix the web layer serves the output root under.
base_url = "/static/wallpapers"

# Rebuild archives and previews even when they already exist.
force = false

[preview]
# Previews are scaled down to fit this box, keeping their aspect ratio.
width = 300
height = 200
# JPEG quality (1-100).
quality = 85

[archive]
# Deflate compression level (0-9).
compression_level = 6

[processing]
# Maximum packs processed in parallel. Omit to use every CPU core.
# max_processes = 4
"#
}
