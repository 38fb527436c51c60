//! Pack metadata loading and resolution.
//!
//! Each pack may carry a hand-authored `pack_info.json`. Authors tend to fill
//! in only the fields they care about, so the file is treated as a sparse
//! override: [`merge`] lays the document over a complete default record, one
//! field at a time. A file holding only `{"description": "..."}` is valid input.
//!
//! ## Two default records
//!
//! The same authored document is resolved twice, against different defaults:
//!
//! | Field | [`loader_defaults`] (archive contents) | [`manifest_defaults`] (published manifest) |
//! |---|---|---|
//! | `author` | `"Wallpack"` | `"Unknown"` |
//! | `shuffle_enabled` | `true` | `false` |
//! | `shuffle_on_new_tab` | `true` | `false` |
//!
//! Every other field has the same default in both. A missing `created_date`
//! becomes the date of the pack's newest source file ([`source_created_date`]),
//! so rebuilding unchanged sources on a later day resolves to the same record.
//!
//! An archive for a pack with
//! no metadata ships with shuffling on, which is what a user installing loose
//! images expects. The manifest only advertises shuffle for packs that ask
//! for it.
//!
//! ## Failure handling
//!
//! [`read_pack_info`] reports problems as errors. [`load_pack_info`] is the
//! soft wrapper the pipeline uses: a missing file is normal, and an unreadable
//! or malformed file is logged and replaced by the default record. Neither
//! stops the build.

use crate::archive;
use crate::naming;
use crate::scan::PackSource;
use crate::types::{PackInfo, PackInfoDoc, Settings, SettingsDoc, Wallpaper, WallpaperDoc};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Name of the authored metadata file inside a pack directory.
pub const PACK_INFO_FILE: &str = "pack_info.json";

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_MIN_RESOLUTION: &str = "1920x1080";
pub const DEFAULT_LICENSE: &str = "MIT";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed pack_info.json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where a loaded record came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOrigin {
    Authored,
    Missing,
    /// The file exists but could not be read or parsed.
    Malformed(String),
}

/// A pack's metadata as the pipeline sees it.
#[derive(Debug, Clone)]
pub struct LoadedPackInfo {
    /// Resolved against [`loader_defaults`].
    pub info: PackInfo,
    /// The authored document; empty when the file was missing or malformed.
    pub doc: PackInfoDoc,
    pub origin: MetadataOrigin,
}

/// Read and parse `pack_info.json` from a pack directory.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_pack_info(pack_dir: &Path) -> Result<Option<PackInfoDoc>, MetadataError> {
    let path = pack_dir.join(PACK_INFO_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let doc = serde_json::from_str(&content)?;
    Ok(Some(doc))
}

/// Default `created_date` for a pack: the UTC date of its newest source
/// file. `fallback` is used when the sources cannot be stat'ed.
pub fn source_created_date(pack: &PackSource, fallback: NaiveDate) -> NaiveDate {
    match archive::newest_source_mtime(pack) {
        Ok(newest) => newest.date_naive(),
        Err(e) => {
            warn!(pack = %pack.dir_name, error = %e, "cannot read source times, dating pack today");
            fallback
        }
    }
}

/// Load a pack's metadata, never failing.
pub fn load_pack_info(pack_dir: &Path, created: NaiveDate) -> LoadedPackInfo {
    let dir_name = pack_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (doc, origin) = match read_pack_info(pack_dir) {
        Ok(Some(doc)) => (doc, MetadataOrigin::Authored),
        Ok(None) => (PackInfoDoc::default(), MetadataOrigin::Missing),
        Err(e) => {
            warn!(pack = %dir_name, error = %e, "failed to load pack_info.json, using defaults");
            (PackInfoDoc::default(), MetadataOrigin::Malformed(e.to_string()))
        }
    };

    let info = merge(loader_defaults(&dir_name, created), doc.clone());
    LoadedPackInfo { info, doc, origin }
}

/// Default record used for archive contents.
pub fn loader_defaults(dir_name: &str, created: NaiveDate) -> PackInfo {
    PackInfo {
        pack_name: dir_name.to_string(),
        version: DEFAULT_VERSION.to_string(),
        author: "Wallpack".to_string(),
        description: format!("{dir_name} wallpaper pack"),
        category: DEFAULT_CATEGORY.to_string(),
        created_date: created.format("%Y-%m-%d").to_string(),
        shuffle_enabled: true,
        shuffle_on_new_tab: true,
        wallpapers: Vec::new(),
        settings: Settings::default(),
        colors: BTreeMap::new(),
        recommended_for: Vec::new(),
        min_resolution: DEFAULT_MIN_RESOLUTION.to_string(),
        license: DEFAULT_LICENSE.to_string(),
        extra: BTreeMap::new(),
    }
}

/// Default record used for published manifest entries.
pub fn manifest_defaults(dir_name: &str, created: NaiveDate) -> PackInfo {
    PackInfo {
        author: "Unknown".to_string(),
        shuffle_enabled: false,
        shuffle_on_new_tab: false,
        ..loader_defaults(dir_name, created)
    }
}

/// Lay an authored document over a default record, field by field.
pub fn merge(defaults: PackInfo, doc: PackInfoDoc) -> PackInfo {
    let mut extra = defaults.extra;
    extra.extend(doc.extra);

    PackInfo {
        pack_name: doc.pack_name.unwrap_or(defaults.pack_name),
        version: doc.version.unwrap_or(defaults.version),
        author: doc.author.unwrap_or(defaults.author),
        description: doc.description.unwrap_or(defaults.description),
        category: doc.category.unwrap_or(defaults.category),
        created_date: doc.created_date.unwrap_or(defaults.created_date),
        shuffle_enabled: doc.shuffle_enabled.unwrap_or(defaults.shuffle_enabled),
        shuffle_on_new_tab: doc.shuffle_on_new_tab.unwrap_or(defaults.shuffle_on_new_tab),
        wallpapers: doc
            .wallpapers
            .map(|ws| ws.into_iter().map(resolve_wallpaper).collect())
            .unwrap_or(defaults.wallpapers),
        settings: match doc.settings {
            Some(s) => merge_settings(defaults.settings, s),
            None => defaults.settings,
        },
        colors: doc.colors.unwrap_or(defaults.colors),
        recommended_for: doc.recommended_for.unwrap_or(defaults.recommended_for),
        min_resolution: doc.min_resolution.unwrap_or(defaults.min_resolution),
        license: doc.license.unwrap_or(defaults.license),
        extra,
    }
}

fn merge_settings(defaults: Settings, doc: SettingsDoc) -> Settings {
    Settings {
        shuffle_interval: doc.shuffle_interval.unwrap_or(defaults.shuffle_interval),
        transition_effect: doc.transition_effect.unwrap_or(defaults.transition_effect),
        transition_duration: doc
            .transition_duration
            .unwrap_or(defaults.transition_duration),
        allow_user_shuffle: doc.allow_user_shuffle.unwrap_or(defaults.allow_user_shuffle),
        remember_last_wallpaper: doc
            .remember_last_wallpaper
            .unwrap_or(defaults.remember_last_wallpaper),
    }
}

/// Fill an authored wallpaper entry. The name falls back to a title derived
/// from the filename.
fn resolve_wallpaper(doc: WallpaperDoc) -> Wallpaper {
    let name = doc
        .name
        .unwrap_or_else(|| naming::display_title(&doc.filename));
    Wallpaper {
        filename: doc.filename,
        name,
        description: doc.description,
        tags: doc.tags.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn doc(value: Value) -> PackInfoDoc {
        serde_json::from_value(value).unwrap()
    }

    // =========================================================================
    // merge() tests
    // =========================================================================

    #[test]
    fn empty_doc_yields_defaults() {
        let info = merge(loader_defaults("Nature", today()), PackInfoDoc::default());
        assert_eq!(info, loader_defaults("Nature", today()));
        assert_eq!(info.pack_name, "Nature");
        assert_eq!(info.created_date, "2025-03-14");
        assert!(info.shuffle_enabled);
        assert!(info.shuffle_on_new_tab);
    }

    #[test]
    fn authored_fields_win_and_rest_filled() {
        let info = merge(
            loader_defaults("Nature", today()),
            doc(json!({"description": "Forests and lakes", "shuffle_enabled": false})),
        );
        assert_eq!(info.description, "Forests and lakes");
        assert!(!info.shuffle_enabled);
        assert!(info.shuffle_on_new_tab);
        assert_eq!(info.version, DEFAULT_VERSION);
        assert_eq!(info.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn every_single_field_subset_resolves_completely() {
        let full = json!({
            "pack_name": "Nature",
            "version": "2.1.0",
            "author": "Ada",
            "description": "Forests",
            "category": "Landscape",
            "created_date": "2024-01-02",
            "shuffle_enabled": false,
            "shuffle_on_new_tab": false,
            "wallpapers": [{"filename": "a.png", "name": "A"}],
            "settings": {"transition_duration": 250},
            "colors": {"accent": "#00ff00"},
            "recommended_for": ["desktop"],
            "min_resolution": "3840x2160",
            "license": "CC-BY-4.0"
        });
        let defaults_json = serde_json::to_value(loader_defaults("Dir", today())).unwrap();

        for key in full.as_object().unwrap().keys() {
            let mut partial = serde_json::Map::new();
            partial.insert(key.clone(), full[key].clone());
            let info = merge(loader_defaults("Dir", today()), doc(Value::Object(partial)));
            let resolved = serde_json::to_value(&info).unwrap();

            for (field, default_value) in defaults_json.as_object().unwrap() {
                let value = resolved.get(field).unwrap_or_else(|| {
                    panic!("field {field} missing after merging only {key}")
                });
                if field != key {
                    assert_eq!(value, default_value, "{field} changed by merging {key}");
                }
            }
        }
    }

    #[test]
    fn settings_merged_per_field() {
        let info = merge(
            loader_defaults("P", today()),
            doc(json!({"settings": {"transition_effect": "slide"}})),
        );
        assert_eq!(info.settings.transition_effect, "slide");
        assert_eq!(info.settings.transition_duration, 500);
        assert_eq!(info.settings.shuffle_interval, "new_tab");
        assert!(info.settings.allow_user_shuffle);
    }

    #[test]
    fn wallpaper_name_defaults_from_filename() {
        let info = merge(
            loader_defaults("P", today()),
            doc(json!({"wallpapers": [
                {"filename": "001-misty-forest.jpg"},
                {"filename": "lake.png", "name": "Still Lake", "tags": ["water"]}
            ]})),
        );
        assert_eq!(info.wallpapers[0].name, "misty forest");
        assert!(info.wallpapers[0].tags.is_empty());
        assert_eq!(info.wallpapers[1].name, "Still Lake");
        assert_eq!(info.wallpapers[1].tags, vec!["water"]);
    }

    #[test]
    fn unknown_keys_survive_merge() {
        let info = merge(
            loader_defaults("P", today()),
            doc(json!({"homepage": "https://example.test"})),
        );
        assert_eq!(
            info.extra.get("homepage"),
            Some(&Value::from("https://example.test"))
        );
    }

    #[test]
    fn manifest_defaults_differ_only_in_author_and_shuffle() {
        let loader = loader_defaults("P", today());
        let manifest = manifest_defaults("P", today());
        assert_eq!(manifest.author, "Unknown");
        assert!(!manifest.shuffle_enabled);
        assert!(!manifest.shuffle_on_new_tab);
        assert_eq!(
            PackInfo {
                author: loader.author.clone(),
                shuffle_enabled: true,
                shuffle_on_new_tab: true,
                ..manifest
            },
            loader
        );
    }

    // =========================================================================
    // source_created_date() tests
    // =========================================================================

    fn set_mtime(path: &Path, secs: u64) {
        let time = std::time::UNIX_EPOCH + std::time::Duration::from_secs(secs);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn created_date_follows_newest_source() {
        let tmp = TempDir::new().unwrap();
        let pack_dir = tmp.path().join("src/Abstract");
        fs::create_dir_all(&pack_dir).unwrap();
        fs::write(pack_dir.join("a.png"), b"a").unwrap();
        fs::write(pack_dir.join("b.png"), b"b").unwrap();
        // 2024-01-01T00:00:00Z and 2024-11-02T12:00:00Z
        set_mtime(&pack_dir.join("a.png"), 1_704_067_200);
        set_mtime(&pack_dir.join("b.png"), 1_730_548_800);

        let pack = crate::scan::scan(&tmp.path().join("src")).unwrap().packs.remove(0);
        let created = source_created_date(&pack, today());
        assert_eq!(created, NaiveDate::from_ymd_opt(2024, 11, 2).unwrap());
        assert_eq!(load_pack_info(&pack.path, created).info.created_date, "2024-11-02");
    }

    #[test]
    fn created_date_falls_back_when_sources_vanish() {
        let tmp = TempDir::new().unwrap();
        let pack_dir = tmp.path().join("src/Gone");
        fs::create_dir_all(&pack_dir).unwrap();
        fs::write(pack_dir.join("a.png"), b"a").unwrap();

        let pack = crate::scan::scan(&tmp.path().join("src")).unwrap().packs.remove(0);
        fs::remove_file(pack_dir.join("a.png")).unwrap();
        assert_eq!(source_created_date(&pack, today()), today());
    }

    // =========================================================================
    // load_pack_info() tests
    // =========================================================================

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let pack = tmp.path().join("Abstract");
        fs::create_dir_all(&pack).unwrap();

        let loaded = load_pack_info(&pack, today());
        assert_eq!(loaded.origin, MetadataOrigin::Missing);
        assert_eq!(loaded.info, loader_defaults("Abstract", today()));
        assert_eq!(loaded.doc, PackInfoDoc::default());
    }

    #[test]
    fn malformed_file_degrades_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let pack = tmp.path().join("Broken");
        fs::create_dir_all(&pack).unwrap();
        fs::write(pack.join(PACK_INFO_FILE), "{ not json").unwrap();

        let loaded = load_pack_info(&pack, today());
        assert!(matches!(loaded.origin, MetadataOrigin::Malformed(_)));
        assert_eq!(loaded.info, loader_defaults("Broken", today()));
    }

    #[test]
    fn wrongly_typed_field_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let pack = tmp.path().join("Typed");
        fs::create_dir_all(&pack).unwrap();
        fs::write(pack.join(PACK_INFO_FILE), r#"{"shuffle_enabled": "yes"}"#).unwrap();

        assert!(read_pack_info(&pack).is_err());
        let loaded = load_pack_info(&pack, today());
        assert!(matches!(loaded.origin, MetadataOrigin::Malformed(_)));
    }

    #[test]
    fn authored_file_is_merged() {
        let tmp = TempDir::new().unwrap();
        let pack = tmp.path().join("Nature");
        fs::create_dir_all(&pack).unwrap();
        fs::write(
            pack.join(PACK_INFO_FILE),
            r#"{"pack_name": "Nature Pack", "category": "Landscape"}"#,
        )
        .unwrap();

        let loaded = load_pack_info(&pack, today());
        assert_eq!(loaded.origin, MetadataOrigin::Authored);
        assert_eq!(loaded.info.pack_name, "Nature Pack");
        assert_eq!(loaded.info.category, "Landscape");
        assert_eq!(loaded.info.description, "Nature wallpaper pack");
        assert_eq!(loaded.doc.category.as_deref(), Some("Landscape"));
    }
}
