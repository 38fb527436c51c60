//! Shared test utilities for the wallpack test suite.
//!
//! Builds source trees on disk with real, decodable images so tests exercise
//! the same code paths as a production run.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_scenario(&tmp.path().join("src"));
//! let config = test_config(tmp.path());   // src/ → out/
//! ```

use crate::config::PackerConfig;
use image::{Rgb, RgbImage};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Config reading `<root>/src` and writing `<root>/out`.
pub fn test_config(root: &Path) -> PackerConfig {
    PackerConfig {
        source: root.join("src"),
        output: root.join("out"),
        ..PackerConfig::default()
    }
}

/// Write a small gradient PNG, creating parent directories.
pub fn write_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    gradient(width, height).save(path).unwrap();
}

/// Write a small gradient JPEG, creating parent directories.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 96])
    })
}

/// Write `pack_info.json` into a pack directory.
pub fn write_pack_info(pack_dir: &Path, value: &Value) {
    fs::create_dir_all(pack_dir).unwrap();
    fs::write(
        pack_dir.join("pack_info.json"),
        serde_json::to_string_pretty(value).unwrap(),
    )
    .unwrap();
}

/// Fully authored metadata for the `Nature` scenario pack.
pub fn nature_pack_info() -> Value {
    json!({
        "pack_name": "Nature",
        "version": "1.2.0",
        "author": "Field Studio",
        "description": "Forests, lakes and mountains",
        "category": "Landscape",
        "created_date": "2024-06-01",
        "shuffle_enabled": true,
        "shuffle_on_new_tab": true,
        "wallpapers": [
            {"filename": "001-forest.jpg", "name": "Forest", "tags": ["trees", "green"]},
            {"filename": "002-lake.png", "name": "Lake", "description": "Still water", "tags": ["water"]},
            {"filename": "003-peak.jpg", "name": "Peak", "tags": ["mountain"]}
        ],
        "settings": {"shuffle_interval": "hourly", "transition_duration": 800},
        "colors": {"accent": "#2e7d32"},
        "recommended_for": ["desktop"],
        "min_resolution": "2560x1440",
        "license": "CC-BY-4.0"
    })
}

/// Two packs under `src`:
///
/// - `Nature`: three images and full metadata
/// - `Abstract`: two images and no `pack_info.json`
pub fn write_scenario(src: &Path) {
    let nature = src.join("Nature");
    write_jpeg(&nature.join("001-forest.jpg"), 64, 40);
    write_png(&nature.join("002-lake.png"), 48, 32);
    write_jpeg(&nature.join("003-peak.jpg"), 40, 64);
    write_pack_info(&nature, &nature_pack_info());

    let abstract_dir = src.join("Abstract");
    write_png(&abstract_dir.join("shapes.png"), 32, 32);
    write_png(&abstract_dir.join("waves.png"), 50, 20);
}
