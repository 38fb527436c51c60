//! Pack metadata records shared by the loader, archiver, manifest and validator.
//!
//! Two shapes exist for every record:
//!
//! - The **authored** shape (`*Doc`) mirrors `pack_info.json` exactly as written.
//!   Every field is optional; `null` reads the same as an absent key.
//! - The **resolved** shape ([`PackInfo`], [`Wallpaper`], [`Settings`]) has every
//!   field filled, either from the document or from a default record. See
//!   [`metadata::merge`](crate::metadata::merge).
//!
//! Keys the pipeline does not recognize are kept in `extra` and written back
//! out unchanged, so hand-authored additions survive a round trip.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fully resolved metadata for one pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackInfo {
    pub pack_name: String,
    pub version: String,
    pub author: String,
    pub description: String,
    pub category: String,
    /// `YYYY-MM-DD`
    pub created_date: String,
    pub shuffle_enabled: bool,
    pub shuffle_on_new_tab: bool,
    pub wallpapers: Vec<Wallpaper>,
    pub settings: Settings,
    /// Named theme colors, e.g. `{"accent": "#ff8800"}`.
    pub colors: BTreeMap<String, String>,
    pub recommended_for: Vec<String>,
    pub min_resolution: String,
    pub license: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PackInfo {
    /// Authored wallpaper entry for a file, looked up by filename.
    pub fn wallpaper(&self, filename: &str) -> Option<&Wallpaper> {
        self.wallpapers.iter().find(|w| w.filename == filename)
    }
}

/// One wallpaper entry. `filename` is relative to the pack directory and
/// uses `/` separators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallpaper {
    pub filename: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-pack shuffle and transition behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// `"new_tab"`, `"hourly"`, `"daily"`, ... Kept as a string so packs
    /// authored for newer clients still load.
    pub shuffle_interval: String,
    pub transition_effect: String,
    /// Milliseconds.
    pub transition_duration: u32,
    pub allow_user_shuffle: bool,
    pub remember_last_wallpaper: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shuffle_interval: "new_tab".to_string(),
            transition_effect: "fade".to_string(),
            transition_duration: 500,
            allow_user_shuffle: true,
            remember_last_wallpaper: false,
        }
    }
}

/// `pack_info.json` as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackInfoDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pack_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_on_new_tab: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallpapers: Option<Vec<WallpaperDoc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_for: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A wallpaper entry as authored. Only `filename` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallpaperDoc {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// `settings` as authored; merged per field over [`Settings::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_effect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_user_shuffle: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_last_wallpaper: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fields_read_as_absent() {
        let doc: PackInfoDoc =
            serde_json::from_str(r#"{"version": null, "author": "Ada"}"#).unwrap();
        assert_eq!(doc.version, None);
        assert_eq!(doc.author.as_deref(), Some("Ada"));
    }

    #[test]
    fn unknown_keys_kept_in_extra() {
        let doc: PackInfoDoc =
            serde_json::from_str(r#"{"pack_name": "Nature", "homepage": "https://x.test"}"#)
                .unwrap();
        assert_eq!(doc.extra.get("homepage"), Some(&Value::from("https://x.test")));
        assert!(!doc.extra.contains_key("pack_name"));
    }

    #[test]
    fn authored_doc_serializes_only_present_fields() {
        let doc = PackInfoDoc {
            description: Some("Forests".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["description"]);
    }

    #[test]
    fn wallpaper_lookup_is_by_filename() {
        let info_wallpapers = vec![
            Wallpaper {
                filename: "b.png".into(),
                name: "B".into(),
                description: None,
                tags: vec![],
            },
            Wallpaper {
                filename: "a.png".into(),
                name: "A".into(),
                description: None,
                tags: vec![],
            },
        ];
        let info = PackInfo {
            pack_name: "P".into(),
            version: "1.0.0".into(),
            author: "x".into(),
            description: "x".into(),
            category: "x".into(),
            created_date: "2024-01-01".into(),
            shuffle_enabled: true,
            shuffle_on_new_tab: true,
            wallpapers: info_wallpapers,
            settings: Settings::default(),
            colors: BTreeMap::new(),
            recommended_for: vec![],
            min_resolution: "1920x1080".into(),
            license: "MIT".into(),
            extra: BTreeMap::new(),
        };
        assert_eq!(info.wallpaper("b.png").map(|w| w.name.as_str()), Some("B"));
        assert!(info.wallpaper("c.png").is_none());
    }
}
