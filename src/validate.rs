//! Manifest validation.
//!
//! Checks a published `manifest.json` against the hand-authored
//! `pack_info.json` files it was built from. The validator never writes
//! anything: it reads both sides, accumulates [`Finding`]s, and hands back a
//! [`ValidationReport`]. A report with zero errors passes.
//!
//! The manifest is read as raw JSON rather than through
//! [`Manifest`](crate::manifest::Manifest), so that a manifest with missing
//! or mistyped fields still produces findings instead of a single parse error.
//!
//! ## Checks
//!
//! | Check | Severity |
//! |---|---|
//! | Manifest unreadable, not an object | error |
//! | Required top-level field missing, `packs` not an array | error |
//! | `features` / `statistics` malformed or missing keys | warning |
//! | Source pack with `pack_info.json` absent from manifest | error |
//! | Manifest pack with no source directory | error |
//! | Two manifest packs with the same `id` or `source_dir` | error |
//! | Manifest pack whose directory has no `pack_info.json` | info |
//! | Authored field differs from manifest | error |
//! | Authored wallpaper absent from manifest | error |
//! | Manifest wallpaper not authored | warning |
//! | Build-derived field (`id`, `hash`, ...) missing | warning |
//!
//! Only fields present (and non-null) in the authored document are compared;
//! anything else in the manifest is a default and cannot disagree with the
//! author. `settings` is compared per authored key, wallpapers by filename.

use crate::config::PackerConfig;
use crate::manifest::MANIFEST_FILE;
use crate::metadata::PACK_INFO_FILE;
use crate::scan;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Top-level manifest fields that must exist.
pub const REQUIRED_FIELDS: &[&str] = &[
    "version",
    "generated",
    "total_packs",
    "total_wallpapers",
    "total_size_mb",
    "packs",
];

const FEATURE_FLAGS: &[&str] = &[
    "shuffle_supported",
    "new_tab_shuffle",
    "color_themes",
    "multi_resolution",
];

const STATISTICS_KEYS: &[&str] = &[
    "packs_with_shuffle",
    "average_pack_size_mb",
    "total_unique_tags",
];

/// Authored fields compared verbatim against the manifest record.
const COMPARED_FIELDS: &[&str] = &[
    "pack_name",
    "version",
    "author",
    "description",
    "category",
    "created_date",
    "shuffle_enabled",
    "shuffle_on_new_tab",
    "colors",
    "recommended_for",
    "min_resolution",
    "license",
];

const WALLPAPER_FIELDS: &[&str] = &["name", "description", "tags"];

/// Fields only the build can produce.
pub const DERIVED_FIELDS: &[&str] = &[
    "id",
    "count",
    "size_bytes",
    "size_mb",
    "download_url",
    "preview_url",
    "hash",
    "packed_date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FindingKind {
    ManifestUnreadable(String),
    MissingTopLevelField(String),
    PacksNotArray,
    FeaturesNotObject,
    MissingFeatureFlag(String),
    StatisticsNotObject,
    MissingStatistic(String),
    SourceUnreadable(PathBuf),
    PackMissingFromManifest,
    PackMissingFromSource,
    /// A second entry repeating an `id` or `source_dir`.
    DuplicateEntry {
        field: &'static str,
        value: String,
    },
    NoAuthoredMetadata,
    MetadataUnreadable(String),
    FieldMismatch {
        field: String,
        source: Value,
        manifest: Value,
    },
    WallpaperMissingFromManifest(String),
    ExtraWallpaperInManifest(String),
    MissingDerivedField(String),
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        use FindingKind::*;
        match self {
            FeaturesNotObject
            | MissingFeatureFlag(_)
            | StatisticsNotObject
            | MissingStatistic(_)
            | ExtraWallpaperInManifest(_)
            | MissingDerivedField(_) => Severity::Warning,
            NoAuthoredMetadata => Severity::Info,
            _ => Severity::Error,
        }
    }
}

/// One problem (or note) found while validating.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// Pack the finding is about; `None` for manifest-level findings.
    pub pack: Option<String>,
    pub kind: FindingKind,
}

impl Finding {
    fn manifest(kind: FindingKind) -> Self {
        Self { pack: None, kind }
    }

    fn pack(pack: &str, kind: FindingKind) -> Self {
        Self {
            pack: Some(pack.to_string()),
            kind,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// The field a mismatch is about.
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            FindingKind::FieldMismatch { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pack) = &self.pack {
            write!(f, "Pack '{pack}': ")?;
        }
        match &self.kind {
            FindingKind::ManifestUnreadable(reason) => {
                write!(f, "cannot read manifest: {reason}")
            }
            FindingKind::MissingTopLevelField(field) => {
                write!(f, "missing required manifest field '{field}'")
            }
            FindingKind::PacksNotArray => write!(f, "manifest 'packs' must be an array"),
            FindingKind::FeaturesNotObject => write!(f, "manifest 'features' should be an object"),
            FindingKind::MissingFeatureFlag(flag) => write!(f, "missing feature flag '{flag}'"),
            FindingKind::StatisticsNotObject => {
                write!(f, "manifest 'statistics' should be an object")
            }
            FindingKind::MissingStatistic(key) => write!(f, "missing statistic '{key}'"),
            FindingKind::SourceUnreadable(path) => {
                write!(f, "source directory not found: {}", path.display())
            }
            FindingKind::PackMissingFromManifest => {
                write!(f, "exists in source but missing from manifest")
            }
            FindingKind::PackMissingFromSource => {
                write!(f, "listed in manifest but has no source directory")
            }
            FindingKind::DuplicateEntry { field, value } => {
                write!(f, "{field} {value:?} is listed more than once")
            }
            FindingKind::NoAuthoredMetadata => {
                write!(f, "no pack_info.json, manifest values are defaults")
            }
            FindingKind::MetadataUnreadable(reason) => {
                write!(f, "cannot read pack_info.json: {reason}")
            }
            FindingKind::FieldMismatch {
                field,
                source,
                manifest,
            } => write!(
                f,
                "mismatch in field '{field}': pack_info {source}, manifest {manifest}"
            ),
            FindingKind::WallpaperMissingFromManifest(file) => {
                write!(f, "wallpaper '{file}' missing from manifest")
            }
            FindingKind::ExtraWallpaperInManifest(file) => {
                write!(f, "extra wallpaper '{file}' in manifest")
            }
            FindingKind::MissingDerivedField(field) => {
                write!(f, "missing manifest field '{field}'")
            }
        }
    }
}

/// Everything a validation run found.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    /// Manifest entries that were field-compared against authored metadata.
    pub packs_compared: usize,
}

impl ValidationReport {
    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.severity() == severity)
    }

    pub fn errors(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Warning).collect()
    }

    pub fn infos(&self) -> Vec<&Finding> {
        self.with_severity(Severity::Info).collect()
    }

    pub fn passed(&self) -> bool {
        self.with_severity(Severity::Error).next().is_none()
    }

    /// Field mismatches grouped by pack, packs in name order.
    pub fn mismatches_by_pack(&self) -> BTreeMap<&str, Vec<&Finding>> {
        let mut grouped: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            if let (Some(pack), FindingKind::FieldMismatch { .. }) = (&finding.pack, &finding.kind)
            {
                grouped.entry(pack.as_str()).or_default().push(finding);
            }
        }
        grouped
    }
}

/// Where to find the two sides being compared.
#[derive(Debug, Clone)]
pub struct ValidateConfig {
    pub source_dir: PathBuf,
    pub manifest_path: PathBuf,
}

impl ValidateConfig {
    pub fn from_packer(config: &PackerConfig) -> Self {
        Self {
            source_dir: config.source.clone(),
            manifest_path: config.output.join(MANIFEST_FILE),
        }
    }
}

pub struct Validator {
    config: ValidateConfig,
}

impl Validator {
    pub fn new(config: ValidateConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let findings = &mut report.findings;

        let manifest = match self.load_manifest() {
            Ok(manifest) => manifest,
            Err(reason) => {
                findings.push(Finding::manifest(FindingKind::ManifestUnreadable(reason)));
                return report;
            }
        };
        info!(path = %self.config.manifest_path.display(), "validating manifest");

        check_structure(&manifest, findings);
        let Some(packs) = manifest.get("packs").and_then(Value::as_array) else {
            return report;
        };

        if !self.config.source_dir.is_dir() {
            findings.push(Finding::manifest(FindingKind::SourceUnreadable(
                self.config.source_dir.clone(),
            )));
            return report;
        }

        self.check_completeness(packs, findings);
        let mut seen: BTreeSet<(&'static str, &str)> = BTreeSet::new();
        for entry in packs {
            if let Some(kind) = duplicate_of(entry, &mut seen) {
                findings.push(Finding::pack(&pack_label(entry), kind));
                continue;
            }
            if self.check_pack(entry, findings) {
                report.packs_compared += 1;
            }
        }
        report
    }

    fn load_manifest(&self) -> Result<Map<String, Value>, String> {
        let content = fs::read_to_string(&self.config.manifest_path)
            .map_err(|e| format!("{}: {e}", self.config.manifest_path.display()))?;
        match serde_json::from_str(&content).map_err(|e| e.to_string())? {
            Value::Object(map) => Ok(map),
            _ => Err("manifest is not a JSON object".to_string()),
        }
    }

    /// Source directories holding a `pack_info.json`, by directory name.
    fn authored_packs(&self) -> BTreeSet<String> {
        scan::pack_directories(&self.config.source_dir)
            .unwrap_or_default()
            .into_iter()
            .filter(|dir| dir.join(PACK_INFO_FILE).is_file())
            .filter_map(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    fn check_completeness(&self, packs: &[Value], findings: &mut Vec<Finding>) {
        let listed: BTreeSet<&str> = packs.iter().filter_map(source_dir_of).collect();
        for dir in self.authored_packs() {
            if !listed.contains(dir.as_str()) {
                findings.push(Finding::pack(&dir, FindingKind::PackMissingFromManifest));
            }
        }
    }

    /// Compare one manifest entry with its source. Returns whether fields
    /// were compared.
    fn check_pack(&self, entry: &Value, findings: &mut Vec<Finding>) -> bool {
        let label = pack_label(entry);
        check_derived_fields(&label, entry, findings);

        let Some(dir_name) = source_dir_of(entry).filter(|d| is_pack_dir_name(d)) else {
            findings.push(Finding::pack(&label, FindingKind::PackMissingFromSource));
            return false;
        };
        let pack_dir = self.config.source_dir.join(dir_name);
        if !pack_dir.is_dir() {
            findings.push(Finding::pack(&label, FindingKind::PackMissingFromSource));
            return false;
        }

        let info_path = pack_dir.join(PACK_INFO_FILE);
        if !info_path.exists() {
            findings.push(Finding::pack(&label, FindingKind::NoAuthoredMetadata));
            return false;
        }
        let authored = match read_authored(&info_path) {
            Ok(authored) => authored,
            Err(reason) => {
                findings.push(Finding::pack(&label, FindingKind::MetadataUnreadable(reason)));
                return false;
            }
        };

        debug!(pack = %label, "comparing fields");
        compare_fields(&label, &authored, entry, findings);
        true
    }
}

fn read_authored(path: &Path) -> Result<Map<String, Value>, String> {
    let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
    match serde_json::from_str(&content).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        _ => Err("not a JSON object".to_string()),
    }
}

/// The source directory a manifest entry was built from: `source_dir`,
/// falling back to `pack_name`, then `name`.
fn source_dir_of(entry: &Value) -> Option<&str> {
    ["source_dir", "pack_name", "name"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
}

/// A pack directory is one plain component directly under the source root.
fn is_pack_dir_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Record the entry's `id` and `source_dir`; a repeat of either is returned
/// as a finding.
fn duplicate_of<'a>(
    entry: &'a Value,
    seen: &mut BTreeSet<(&'static str, &'a str)>,
) -> Option<FindingKind> {
    let id = entry.get("id").and_then(Value::as_str);
    let mut repeated = None;
    for (field, value) in [("id", id), ("source_dir", source_dir_of(entry))] {
        let Some(value) = value else { continue };
        if !seen.insert((field, value)) && repeated.is_none() {
            repeated = Some(FindingKind::DuplicateEntry {
                field,
                value: value.to_string(),
            });
        }
    }
    repeated
}

fn pack_label(entry: &Value) -> String {
    ["pack_name", "name", "id"]
        .iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .unwrap_or("Unknown")
        .to_string()
}

fn check_structure(manifest: &Map<String, Value>, findings: &mut Vec<Finding>) {
    for field in REQUIRED_FIELDS {
        if !manifest.contains_key(*field) {
            findings.push(Finding::manifest(FindingKind::MissingTopLevelField(
                field.to_string(),
            )));
        }
    }
    if let Some(packs) = manifest.get("packs")
        && !packs.is_array()
    {
        findings.push(Finding::manifest(FindingKind::PacksNotArray));
    }

    match manifest.get("features") {
        Some(Value::Object(features)) => {
            for flag in FEATURE_FLAGS {
                if !features.contains_key(*flag) {
                    findings.push(Finding::manifest(FindingKind::MissingFeatureFlag(
                        flag.to_string(),
                    )));
                }
            }
        }
        Some(_) => findings.push(Finding::manifest(FindingKind::FeaturesNotObject)),
        None => {}
    }

    match manifest.get("statistics") {
        Some(Value::Object(stats)) => {
            for key in STATISTICS_KEYS {
                if !stats.contains_key(*key) {
                    findings.push(Finding::manifest(FindingKind::MissingStatistic(
                        key.to_string(),
                    )));
                }
            }
        }
        Some(_) => findings.push(Finding::manifest(FindingKind::StatisticsNotObject)),
        None => {}
    }
}

fn check_derived_fields(label: &str, entry: &Value, findings: &mut Vec<Finding>) {
    for field in DERIVED_FIELDS {
        if entry.get(*field).is_none() {
            findings.push(Finding::pack(
                label,
                FindingKind::MissingDerivedField(field.to_string()),
            ));
        }
    }
}

/// Present and not `null`.
fn authored_value<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn mismatch(label: &str, field: String, source: &Value, manifest: Option<&Value>) -> Finding {
    Finding::pack(
        label,
        FindingKind::FieldMismatch {
            field,
            source: source.clone(),
            manifest: manifest.cloned().unwrap_or(Value::Null),
        },
    )
}

fn compare_fields(
    label: &str,
    authored: &Map<String, Value>,
    entry: &Value,
    findings: &mut Vec<Finding>,
) {
    for field in COMPARED_FIELDS {
        let Some(source) = authored_value(authored, field) else {
            continue;
        };
        let manifest = match *field {
            "pack_name" => entry.get("pack_name").or_else(|| entry.get("name")),
            _ => entry.get(*field),
        };
        if manifest != Some(source) {
            findings.push(mismatch(label, field.to_string(), source, manifest));
        }
    }

    match authored_value(authored, "settings") {
        Some(Value::Object(settings)) => {
            let manifest_settings = entry.get("settings");
            for (key, source) in settings.iter().filter(|(_, v)| !v.is_null()) {
                let manifest = manifest_settings.and_then(|s| s.get(key));
                if manifest != Some(source) {
                    findings.push(mismatch(label, format!("settings.{key}"), source, manifest));
                }
            }
        }
        Some(other) => {
            let manifest = entry.get("settings");
            if manifest != Some(other) {
                findings.push(mismatch(label, "settings".to_string(), other, manifest));
            }
        }
        None => {}
    }

    if let Some(Value::Array(wallpapers)) = authored_value(authored, "wallpapers") {
        compare_wallpapers(label, wallpapers, entry, findings);
    }
}

/// Wallpaper entries keyed by `filename`; entries without one are ignored.
fn by_filename(list: &[Value]) -> BTreeMap<String, Map<String, Value>> {
    list.iter()
        .filter_map(|w| {
            let map = w.as_object()?;
            let filename = map.get("filename")?.as_str()?;
            Some((filename.to_string(), map.clone()))
        })
        .collect()
}

fn compare_wallpapers(
    label: &str,
    authored: &[Value],
    entry: &Value,
    findings: &mut Vec<Finding>,
) {
    let source = by_filename(authored);
    let manifest = entry
        .get("wallpapers")
        .and_then(Value::as_array)
        .map(|list| by_filename(list))
        .unwrap_or_default();

    for (filename, source_wp) in &source {
        let Some(manifest_wp) = manifest.get(filename) else {
            findings.push(Finding::pack(
                label,
                FindingKind::WallpaperMissingFromManifest(filename.clone()),
            ));
            continue;
        };
        for field in WALLPAPER_FIELDS {
            let Some(value) = authored_value(source_wp, field) else {
                continue;
            };
            let published = manifest_wp.get(*field);
            if published != Some(value) {
                findings.push(mismatch(
                    label,
                    format!("wallpapers[{filename}].{field}"),
                    value,
                    published,
                ));
            }
        }
    }

    for filename in manifest.keys() {
        if !source.contains_key(filename) {
            findings.push(Finding::pack(
                label,
                FindingKind::ExtraWallpaperInManifest(filename.clone()),
            ));
        }
    }
}
