//! Shared fixtures for the integration tests.
//!
//! Builds a throwaway source tree with real, decodable images and runs the
//! pipeline against it with a pinned clock.

use chrono::{NaiveDate, TimeZone, Utc};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wallpack::config::PackerConfig;
use wallpack::pipeline::Pipeline;

/// A temporary workspace with `src/` and `out/`.
pub struct Workspace {
    pub tmp: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        Self { tmp }
    }

    pub fn src(&self) -> PathBuf {
        self.tmp.path().join("src")
    }

    pub fn out(&self) -> PathBuf {
        self.tmp.path().join("out")
    }

    pub fn config(&self) -> PackerConfig {
        PackerConfig {
            source: self.src(),
            output: self.out(),
            ..PackerConfig::default()
        }
    }

    /// Pipeline with the production backend and a fixed clock.
    pub fn pipeline(&self, force: bool) -> Pipeline {
        self.pipeline_on(force, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap())
    }

    /// Pipeline whose clock reads 09:30 UTC on `day`.
    pub fn pipeline_on(&self, force: bool, day: NaiveDate) -> Pipeline {
        let mut config = self.config();
        config.force = force;
        let now = Utc.from_utc_datetime(&day.and_hms_opt(9, 30, 0).unwrap());
        Pipeline::new(config).at(now, day)
    }

    pub fn manifest_json(&self) -> Value {
        let content = fs::read_to_string(self.out().join("manifest.json")).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}

/// Gradient PNG with parent directories created.
#[allow(dead_code)]
pub fn write_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 128]))
        .save(path)
        .unwrap();
}

/// Half-transparent PNG, for exercising alpha flattening.
#[allow(dead_code)]
pub fn write_rgba_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 200, 128]))
        .save(path)
        .unwrap();
}

/// Gradient JPEG with parent directories created.
#[allow(dead_code)]
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(width, height, |x, y| Rgb([(y * 2) as u8, (x * 2) as u8, 40]))
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

#[allow(dead_code)]
pub fn write_pack_info(pack_dir: &Path, value: &Value) {
    fs::create_dir_all(pack_dir).unwrap();
    fs::write(
        pack_dir.join("pack_info.json"),
        serde_json::to_string_pretty(value).unwrap(),
    )
    .unwrap();
}

#[allow(dead_code)]
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
        "license": "CC-BY-4.0",
        "curator_notes": "kept verbatim"
    })
}

/// `Nature` (three images, full metadata) and `Abstract` (two images, none).
#[allow(dead_code)]
pub fn write_scenario(src: &Path) {
    let nature = src.join("Nature");
    write_jpeg(&nature.join("001-forest.jpg"), 96, 64);
    write_png(&nature.join("002-lake.png"), 64, 48);
    write_jpeg(&nature.join("003-peak.jpg"), 48, 80);
    write_pack_info(&nature, &nature_pack_info());

    let abstract_dir = src.join("Abstract");
    write_rgba_png(&abstract_dir.join("shapes.png"), 40, 40);
    write_png(&abstract_dir.join("waves.png"), 80, 20);
}
