//! The published `manifest.json`.
//!
//! The manifest is regenerated in full on every run from the per-pack records
//! the pipeline produces. It is the only thing the web layer reads to discover
//! packs.
//!
//! ## Shape
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "generated": "2025-03-14T09:30:00Z",
//!   "total_packs": 2,
//!   "total_wallpapers": 5,
//!   "total_size_mb": 12.4,
//!   "packs": [ { "id": "nature", "name": "Nature", "pack_name": "Nature", ... } ],
//!   "categories": ["General", "Landscape"],
//!   "licenses": ["CC-BY-4.0", "MIT"],
//!   "resolutions": ["1920x1080"],
//!   "api_version": "1.0",
//!   "base_url": "/static/wallpapers",
//!   "features": { "shuffle_supported": true, ... },
//!   "statistics": { "packs_with_shuffle": 1, ... }
//! }
//! ```
//!
//! Each pack record carries every resolved [`PackInfo`] field (defaults from
//! [`manifest_defaults`](crate::metadata::manifest_defaults)) flattened next
//! to the fields the build derives: `id`, `count`, sizes, URLs, hash and
//! `packed_date`.
//!
//! ## Invariants
//!
//! - `total_wallpapers` is the sum of every pack's `count`
//! - `total_size_mb` is the rounded sum of `size_bytes`, not of `size_mb`
//! - `categories`, `licenses` and `resolutions` are sorted and deduplicated

use crate::archive::PACKS_DIR;
use crate::imaging::PREVIEWS_DIR;
use crate::types::PackInfo;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: &str = "1.0.0";
pub const API_VERSION: &str = "1.0";

/// Keys the pack record owns. Authored keys with these names are dropped
/// from `extra` so the record never serializes a key twice.
const RECORD_KEYS: &[&str] = &[
    "id",
    "name",
    "source_dir",
    "count",
    "size_bytes",
    "size_mb",
    "download_url",
    "preview_url",
    "hash",
    "packed_date",
];

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    /// RFC 3339, UTC.
    pub generated: String,
    pub total_packs: usize,
    pub total_wallpapers: usize,
    pub total_size_mb: f64,
    pub packs: Vec<ManifestPack>,
    pub categories: Vec<String>,
    pub licenses: Vec<String>,
    pub resolutions: Vec<String>,
    pub api_version: String,
    pub base_url: String,
    pub features: Features,
    pub statistics: Statistics,
}

impl Manifest {
    pub fn pack(&self, id: &str) -> Option<&ManifestPack> {
        self.packs.iter().find(|p| p.id == id)
    }
}

/// One published pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPack {
    pub id: String,
    /// Display name; same as `pack_name`.
    pub name: String,
    /// Directory name under the source root.
    pub source_dir: String,
    #[serde(flatten)]
    pub info: PackInfo,
    pub count: usize,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub download_url: String,
    /// `null` when no preview could be generated.
    pub preview_url: Option<String>,
    pub hash: String,
    pub packed_date: String,
}

/// Build-derived facts about one pack, joined with its metadata by
/// [`pack_record`].
#[derive(Debug, Clone)]
pub struct PackArtifacts {
    pub id: String,
    pub source_dir: String,
    pub count: usize,
    pub size_bytes: u64,
    pub hash: String,
    pub has_preview: bool,
    pub packed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub shuffle_supported: bool,
    pub new_tab_shuffle: bool,
    pub color_themes: bool,
    pub multi_resolution: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub packs_with_shuffle: usize,
    pub average_pack_size_mb: f64,
    pub total_unique_tags: usize,
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bytes to mebibytes, unrounded.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Join a pack's manifest-defaulted metadata with its build artifacts.
pub fn pack_record(mut info: PackInfo, artifacts: PackArtifacts, base_url: &str) -> ManifestPack {
    let base_url = base_url.trim_end_matches('/');
    info.extra.retain(|k, _| !RECORD_KEYS.contains(&k.as_str()));
    let id = artifacts.id;

    ManifestPack {
        name: info.pack_name.clone(),
        source_dir: artifacts.source_dir,
        count: artifacts.count,
        size_bytes: artifacts.size_bytes,
        size_mb: round2(bytes_to_mb(artifacts.size_bytes)),
        download_url: format!("{base_url}/{PACKS_DIR}/{id}.zip"),
        preview_url: artifacts
            .has_preview
            .then(|| format!("{base_url}/{PREVIEWS_DIR}/{id}.jpg")),
        hash: artifacts.hash,
        packed_date: timestamp(artifacts.packed_date),
        info,
        id,
    }
}

/// Assemble the manifest from finished pack records.
pub fn build_manifest(packs: Vec<ManifestPack>, base_url: &str, generated: DateTime<Utc>) -> Manifest {
    let categories = sorted_set(packs.iter().map(|p| &p.info.category));
    let licenses = sorted_set(packs.iter().map(|p| &p.info.license));
    let resolutions = sorted_set(packs.iter().map(|p| &p.info.min_resolution));

    let total_bytes: u64 = packs.iter().map(|p| p.size_bytes).sum();
    let packs_with_shuffle = packs.iter().filter(|p| p.info.shuffle_enabled).count();
    let average_pack_size_mb = if packs.is_empty() {
        0.0
    } else {
        round2(packs.iter().map(|p| p.size_mb).sum::<f64>() / packs.len() as f64)
    };
    let unique_tags: BTreeSet<&str> = packs
        .iter()
        .flat_map(|p| &p.info.wallpapers)
        .flat_map(|w| &w.tags)
        .map(String::as_str)
        .collect();

    let features = Features {
        shuffle_supported: packs_with_shuffle > 0,
        new_tab_shuffle: packs.iter().any(|p| p.info.shuffle_on_new_tab),
        color_themes: packs.iter().any(|p| !p.info.colors.is_empty()),
        multi_resolution: resolutions.len() > 1,
    };
    let statistics = Statistics {
        packs_with_shuffle,
        average_pack_size_mb,
        total_unique_tags: unique_tags.len(),
    };

    Manifest {
        version: MANIFEST_VERSION.to_string(),
        generated: timestamp(generated),
        total_packs: packs.len(),
        total_wallpapers: packs.iter().map(|p| p.count).sum(),
        total_size_mb: round2(bytes_to_mb(total_bytes)),
        categories,
        licenses,
        resolutions,
        api_version: API_VERSION.to_string(),
        base_url: base_url.trim_end_matches('/').to_string(),
        features,
        statistics,
        packs,
    }
}

fn sorted_set<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Write `manifest.json` under `output_root`, staged then renamed.
pub fn write_manifest(manifest: &Manifest, output_root: &Path) -> Result<PathBuf, ManifestError> {
    fs::create_dir_all(output_root)?;
    let path = output_root.join(MANIFEST_FILE);
    let staging = output_root.join(format!("{MANIFEST_FILE}.tmp"));
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(&staging, json)?;
    fs::rename(&staging, &path)?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
