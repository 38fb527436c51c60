//! End-to-end runs of `pack` followed by `validate`, using the production
//! image backend on small generated images.

mod common;

use chrono::{DateTime, NaiveDate, Utc};
use common::*;
use serde_json::{Value, json};
use std::fs;
use wallpack::manifest;
use wallpack::pipeline::{PackError, PipelineError};
use wallpack::validate::{FindingKind, ValidateConfig, Validator};

fn validate(ws: &Workspace) -> wallpack::validate::ValidationReport {
    Validator::new(ValidateConfig::from_packer(&ws.config())).run()
}

fn pack<'a>(manifest: &'a Value, id: &str) -> &'a Value {
    manifest["packs"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .unwrap_or_else(|| panic!("pack {id} not in manifest"))
}

/// `YYYY-MM-DD` of the newest file in a pack directory.
fn newest_source_date(ws: &Workspace, pack_dir: &str) -> String {
    let newest = fs::read_dir(ws.src().join(pack_dir))
        .unwrap()
        .map(|e| e.unwrap().metadata().unwrap().modified().unwrap())
        .max()
        .unwrap();
    DateTime::<Utc>::from(newest).format("%Y-%m-%d").to_string()
}

#[test]
fn scenario_builds_two_packs() {
    let ws = Workspace::new();
    write_scenario(&ws.src());

    let report = ws.pipeline(false).run(None).unwrap();
    assert!(report.failures.is_empty());

    let m = ws.manifest_json();
    assert_eq!(m["total_packs"], 2);
    assert_eq!(m["total_wallpapers"], 5);
    assert_eq!(m["version"], "1.0.0");
    assert_eq!(m["api_version"], "1.0");

    let nature = pack(&m, "nature");
    let authored = nature_pack_info();
    for field in [
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
        "curator_notes",
    ] {
        assert_eq!(nature[field], authored[field], "field {field}");
    }
    assert_eq!(nature["name"], "Nature");
    assert_eq!(nature["count"], 3);
    assert_eq!(nature["settings"]["shuffle_interval"], "hourly");
    assert_eq!(nature["settings"]["transition_duration"], 800);
    assert_eq!(nature["settings"]["transition_effect"], "fade");
    assert_eq!(nature["download_url"], "/static/wallpapers/packs/nature.zip");
    assert_eq!(nature["preview_url"], "/static/wallpapers/previews/nature.jpg");

    let abstract_pack = pack(&m, "abstract");
    assert_eq!(abstract_pack["pack_name"], "Abstract");
    assert_eq!(abstract_pack["category"], "General");
    assert_eq!(abstract_pack["author"], "Unknown");
    assert_eq!(abstract_pack["shuffle_enabled"], false);
    assert_eq!(abstract_pack["shuffle_on_new_tab"], false);
    assert_eq!(abstract_pack["created_date"], newest_source_date(&ws, "Abstract"));
    assert_eq!(abstract_pack["count"], 2);
    assert_eq!(abstract_pack["wallpapers"], json!([]));

    assert_eq!(m["categories"], json!(["General", "Landscape"]));
    assert_eq!(m["features"]["shuffle_supported"], true);
    assert_eq!(m["features"]["multi_resolution"], true);
    assert_eq!(m["statistics"]["packs_with_shuffle"], 1);
    assert_eq!(m["statistics"]["total_unique_tags"], 4);
}

#[test]
fn totals_match_pack_records() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    write_png(&ws.src().join("Space/night/010-stars.png"), 30, 30);

    let report = ws.pipeline(false).run(None).unwrap();
    let m = &report.manifest;
    assert_eq!(m.total_wallpapers, m.packs.iter().map(|p| p.count).sum::<usize>());
    let space = m.pack("space").unwrap();
    assert_eq!(space.count, 1);

    for p in &m.packs {
        let zip_path = ws.out().join(format!("packs/{}.zip", p.id));
        assert_eq!(p.size_bytes, fs::metadata(&zip_path).unwrap().len());
        assert_eq!(p.hash, wallpack::archive::hash_file(&zip_path).unwrap());
        assert_eq!(p.hash.len(), 64);
    }
}

#[test]
fn rerun_without_force_is_idempotent() {
    let ws = Workspace::new();
    write_scenario(&ws.src());

    ws.pipeline(false).run(None).unwrap();
    let first_zip = fs::read(ws.out().join("packs/nature.zip")).unwrap();
    let first = ws.manifest_json();

    let report = ws.pipeline(false).run(None).unwrap();
    assert_eq!(report.stats.archives_reused, 2);
    assert_eq!(report.stats.previews_reused, 2);
    assert_eq!(fs::read(ws.out().join("packs/nature.zip")).unwrap(), first_zip);

    let strip = |mut v: Value| {
        for p in v["packs"].as_array_mut().unwrap() {
            p.as_object_mut().unwrap().remove("packed_date");
        }
        v["packs"].clone()
    };
    assert_eq!(strip(first), strip(ws.manifest_json()));
}

#[test]
fn forced_rebuild_keeps_hashes() {
    let ws = Workspace::new();
    write_scenario(&ws.src());

    let first = ws.pipeline(false).run(None).unwrap();
    let forced = ws.pipeline(true).run(None).unwrap();
    assert_eq!(forced.stats.archives_built, 2);
    for p in &first.manifest.packs {
        assert_eq!(forced.manifest.pack(&p.id).unwrap().hash, p.hash, "pack {}", p.id);
    }
}

#[test]
fn forced_rebuild_on_a_later_day_keeps_hashes() {
    let ws = Workspace::new();
    write_scenario(&ws.src());

    let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let first = ws.pipeline_on(false, day).run(None).unwrap();
    let later = ws
        .pipeline_on(true, day.succ_opt().unwrap())
        .run(None)
        .unwrap();

    assert_eq!(later.stats.archives_built, 2);
    for p in &first.manifest.packs {
        let rebuilt = later.manifest.pack(&p.id).unwrap();
        assert_eq!(rebuilt.hash, p.hash, "pack {}", p.id);
        assert_eq!(rebuilt.info.created_date, p.info.created_date, "pack {}", p.id);
    }
}

#[test]
fn partial_metadata_merges_over_defaults() {
    let ws = Workspace::new();
    let dir = ws.src().join("Minimal");
    write_png(&dir.join("a.png"), 20, 20);
    write_png(&dir.join("b.png"), 20, 20);
    write_pack_info(
        &dir,
        &json!({
            "description": "Just a description",
            "settings": {"allow_user_shuffle": false},
            "wallpapers": [{"filename": "b.png", "tags": ["one"]}]
        }),
    );

    ws.pipeline(false).run(None).unwrap();
    let m = ws.manifest_json();
    let p = pack(&m, "minimal");
    assert_eq!(p["description"], "Just a description");
    assert_eq!(p["pack_name"], "Minimal");
    assert_eq!(p["version"], "1.0.0");
    assert_eq!(p["license"], "MIT");
    assert_eq!(p["min_resolution"], "1920x1080");
    assert_eq!(p["settings"]["allow_user_shuffle"], false);
    assert_eq!(p["settings"]["shuffle_interval"], "new_tab");
    assert_eq!(p["settings"]["transition_duration"], 500);
    assert_eq!(p["wallpapers"][0]["filename"], "b.png");
    assert_eq!(p["wallpapers"][0]["name"], "b");
    assert_eq!(p["wallpapers"][0]["tags"], json!(["one"]));
}

#[test]
fn archive_carries_loader_defaults() {
    use std::io::Read;

    let ws = Workspace::new();
    write_scenario(&ws.src());
    ws.pipeline(false).run(None).unwrap();

    let file = fs::File::open(ws.out().join("packs/abstract.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut content = String::new();
    archive
        .by_name("Abstract/pack_info.json")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    let info: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(info["author"], "Wallpack");
    assert_eq!(info["shuffle_enabled"], true);
    assert_eq!(info["count"], 2);
}

#[test]
fn previews_fit_the_bounding_box() {
    let ws = Workspace::new();
    let dir = ws.src().join("Wide");
    write_png(&dir.join("wide.png"), 900, 300);
    ws.pipeline(false).run(None).unwrap();

    let preview = image::open(ws.out().join("previews/wide.jpg")).unwrap();
    assert_eq!((preview.width(), preview.height()), (300, 100));
    assert!(ws.out().join("thumbs/wide.jpg").exists());
}

#[test]
fn empty_pack_does_not_stop_the_run() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    fs::create_dir_all(ws.src().join("Empty")).unwrap();
    fs::write(ws.src().join("Empty/readme.txt"), "no images").unwrap();

    let report = ws.pipeline(false).run(None).unwrap();
    assert_eq!(report.manifest.total_packs, 2);
    assert_eq!(report.skipped, vec![ws.src().join("Empty")]);
}

#[test]
fn undecodable_preview_source_publishes_without_preview() {
    let ws = Workspace::new();
    let dir = ws.src().join("Broken");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("000-corrupt.jpg"), b"not a jpeg").unwrap();
    write_png(&dir.join("001-fine.png"), 20, 20);

    let report = ws.pipeline(false).run(None).unwrap();
    let broken = report.manifest.pack("broken").unwrap();
    assert_eq!(broken.preview_url, None);
    assert_eq!(broken.count, 2);
    assert_eq!(report.stats.previews_failed, 1);
    assert_eq!(pack(&ws.manifest_json(), "broken")["preview_url"], Value::Null);
}

#[test]
fn colliding_identifiers_keep_first_pack() {
    let ws = Workspace::new();
    write_png(&ws.src().join("Deep Space/a.png"), 20, 20);
    write_png(&ws.src().join("deep space/b.png"), 20, 20);

    let report = ws.pipeline(false).run(None).unwrap();
    assert_eq!(report.manifest.total_packs, 1);
    assert_eq!(report.manifest.packs[0].source_dir, "Deep Space");
    assert!(matches!(
        report.failures[0].error,
        PackError::IdentifierCollision { .. }
    ));
}

#[test]
fn failed_run_replaces_stale_manifest() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    ws.pipeline(false).run(None).unwrap();

    fs::remove_dir_all(ws.src()).unwrap();
    let result = ws.pipeline(false).run(None);
    assert!(matches!(result, Err(PipelineError::Scan(_))));

    let m = manifest::read_manifest(&ws.out().join("manifest.json")).unwrap();
    assert_eq!(m.total_packs, 0);
    assert!(m.packs.is_empty());
}

#[test]
fn fresh_manifest_validates_cleanly() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    ws.pipeline(false).run(None).unwrap();

    let report = validate(&ws);
    assert!(report.passed(), "{:?}", report.errors());
    assert!(report.warnings().is_empty(), "{:?}", report.warnings());
    assert!(!report.findings.iter().any(|f| matches!(
        f.kind,
        FindingKind::PackMissingFromManifest | FindingKind::PackMissingFromSource
    )));
    // Abstract has no pack_info.json.
    assert_eq!(report.infos().len(), 1);
    assert_eq!(report.packs_compared, 1);
}

#[test]
fn edited_description_is_one_mismatch() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    ws.pipeline(false).run(None).unwrap();

    let mut edited = nature_pack_info();
    edited["description"] = json!("Edited after packing");
    write_pack_info(&ws.src().join("Nature"), &edited);

    let report = validate(&ws);
    let errors = report.errors();
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert_eq!(errors[0].pack.as_deref(), Some("Nature"));
    assert_eq!(errors[0].field(), Some("description"));
}

#[test]
fn new_authored_pack_is_missing_from_manifest() {
    let ws = Workspace::new();
    write_scenario(&ws.src());
    ws.pipeline(false).run(None).unwrap();

    write_png(&ws.src().join("Space/a.png"), 10, 10);
    write_pack_info(&ws.src().join("Space"), &json!({"pack_name": "Space"}));

    let report = validate(&ws);
    assert_eq!(report.errors().len(), 1);
    assert_eq!(report.errors()[0].kind, FindingKind::PackMissingFromManifest);
}
