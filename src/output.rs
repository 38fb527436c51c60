//! CLI output formatting.
//!
//! Each command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes the lines to stdout. Format functions are
//! pure, so tests assert on exact lines.
//!
//! Entities follow one two-level pattern: a header line naming the pack (or
//! manifest), then indented context lines.
//!
//! ## Pack
//!
//! ```text
//! Found 2 packs (1 skipped)
//! nature: packing 3 wallpapers
//! Nature → packs/nature.zip
//!     Archive: built, 0.04 MB
//!     Preview: built
//! FAILED Deep space: identifier "deep_space" is already used by pack "Deep Space"
//!
//! Packed 2 packs, 5 wallpapers (0.07 MB)
//!     Archives: 2 built, 0 reused
//!     Previews: 2 built, 0 reused, 0 failed
//!     Manifest: static/wallpapers/manifest.json
//! ```
//!
//! ## Validate
//!
//! ```text
//! ERROR   Pack 'Nature': mismatch in field 'description': pack_info "Edited", manifest "Forests"
//!
//! 1 error, 0 warnings, 1 info (1 pack compared)
//! Validation failed
//! ```
//!
//! ## Diff
//!
//! ```text
//! Nature
//!     description
//!         - "Edited"
//!         + "Forests"
//! ```

use crate::catalog::WallpaperPick;
use crate::manifest::ManifestPack;
use crate::pipeline::{ArtifactStatus, PackEvent, PackReport};
use crate::validate::{Finding, FindingKind, Severity, ValidationReport};
use serde_json::Value;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn status_label(status: ArtifactStatus) -> &'static str {
    match status {
        ArtifactStatus::Built => "built",
        ArtifactStatus::Reused => "reused",
        ArtifactStatus::Failed => "failed",
    }
}

fn mb(bytes: u64) -> String {
    format!("{:.2} MB", crate::manifest::bytes_to_mb(bytes))
}

// ============================================================================
// Pack
// ============================================================================

pub fn format_pack_event(event: &PackEvent) -> Vec<String> {
    match event {
        PackEvent::Discovered { packs, skipped } => {
            if *skipped == 0 {
                vec![format!("Found {}", plural(*packs, "pack"))]
            } else {
                vec![format!("Found {} ({skipped} skipped)", plural(*packs, "pack"))]
            }
        }
        PackEvent::PackStarted { id, images, .. } => {
            vec![format!("{id}: packing {}", plural(*images, "wallpaper"))]
        }
        PackEvent::PackFinished {
            id,
            name,
            size_bytes,
            archive,
            preview,
            ..
        } => vec![
            format!("{name} → packs/{id}.zip"),
            format!("{}Archive: {}, {}", indent(1), status_label(*archive), mb(*size_bytes)),
            format!("{}Preview: {}", indent(1), status_label(*preview)),
        ],
        PackEvent::PackFailed { name, error } => vec![format!("FAILED {name}: {error}")],
    }
}

pub fn format_pack_summary(report: &PackReport) -> Vec<String> {
    let manifest = &report.manifest;
    let stats = &report.stats;
    let mut lines = vec![
        String::new(),
        format!(
            "Packed {}, {} ({:.2} MB)",
            plural(manifest.total_packs, "pack"),
            plural(manifest.total_wallpapers, "wallpaper"),
            manifest.total_size_mb
        ),
        format!(
            "{}Archives: {} built, {} reused",
            indent(1),
            stats.archives_built,
            stats.archives_reused
        ),
        format!(
            "{}Previews: {} built, {} reused, {} failed",
            indent(1),
            stats.previews_built,
            stats.previews_reused,
            stats.previews_failed
        ),
        format!("{}Manifest: {}", indent(1), report.manifest_path.display()),
    ];
    if stats.unmatched_wallpapers > 0 {
        lines.push(format!(
            "{}Unmatched: {} authored without a file",
            indent(1),
            plural(stats.unmatched_wallpapers, "wallpaper")
        ));
    }
    for dir in &report.skipped {
        lines.push(format!("Skipped: {} (no images)", dir.display()));
    }
    for failure in &report.failures {
        lines.push(format!("Failed: {}: {}", failure.pack, failure.error));
    }
    lines
}

/// One line per published pack.
pub fn format_pack_list(packs: &[ManifestPack]) -> Vec<String> {
    let mut lines = Vec::new();
    for pack in packs {
        lines.push(format!(
            "{} ({}, {} MB)",
            pack.name,
            plural(pack.count, "wallpaper"),
            pack.size_mb
        ));
        lines.push(format!("{}Id: {}", indent(1), pack.id));
        lines.push(format!(
            "{}Shuffle: {} | New tab: {}",
            indent(1),
            yes_no(pack.info.shuffle_enabled),
            yes_no(pack.info.shuffle_on_new_tab)
        ));
    }
    lines
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

// ============================================================================
// Validate
// ============================================================================

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "ERROR  ",
        Severity::Warning => "WARNING",
        Severity::Info => "INFO   ",
    }
}

fn finding_line(finding: &Finding) -> String {
    format!("{} {}", severity_label(finding.severity()), finding)
}

/// Errors always; warnings and infos only when `verbose`.
pub fn format_validation_report(report: &ValidationReport, verbose: bool) -> Vec<String> {
    let errors = report.errors();
    let warnings = report.warnings();
    let infos = report.infos();

    let mut lines: Vec<String> = errors.iter().map(|f| finding_line(f)).collect();
    if verbose {
        lines.extend(warnings.iter().map(|f| finding_line(f)));
        lines.extend(infos.iter().map(|f| finding_line(f)));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    lines.push(format!(
        "{}, {}, {} ({} compared)",
        plural(errors.len(), "error"),
        plural(warnings.len(), "warning"),
        plural(infos.len(), "info"),
        plural(report.packs_compared, "pack")
    ));
    if report.passed() {
        lines.push("Validation passed".to_string());
        return lines;
    }

    lines.push("Validation failed".to_string());
    lines.push("Recommendations:".to_string());
    let has = |pred: fn(&FindingKind) -> bool| errors.iter().any(|f| pred(&f.kind));
    if has(|k: &FindingKind| matches!(k, FindingKind::FieldMismatch { .. })) {
        lines.push(format!(
            "{}Re-run `wallpack pack --force` so the manifest picks up pack_info.json changes",
            indent(1)
        ));
    }
    if has(|k: &FindingKind| {
        matches!(
            k,
            FindingKind::PackMissingFromManifest | FindingKind::PackMissingFromSource
        )
    }) {
        lines.push(format!(
            "{}Check that every pack directory has images and a unique pack_name",
            indent(1)
        ));
    }
    lines.push(format!("{}Run with --diff to see values side by side", indent(1)));
    lines
}

fn value_lines(value: &Value) -> Vec<String> {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| value.to_string())
        .lines()
        .map(String::from)
        .collect()
}

/// Field mismatches grouped by pack, authored value (`-`) over manifest
/// value (`+`).
pub fn format_diff_report(report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (pack, findings) in report.mismatches_by_pack() {
        lines.push(pack.to_string());
        for finding in findings {
            let FindingKind::FieldMismatch {
                field,
                source,
                manifest,
            } = &finding.kind
            else {
                continue;
            };
            lines.push(format!("{}{field}", indent(1)));
            for line in value_lines(source) {
                lines.push(format!("{}- {line}", indent(2)));
            }
            for line in value_lines(manifest) {
                lines.push(format!("{}+ {line}", indent(2)));
            }
        }
    }
    if lines.is_empty() {
        lines.push("No differences".to_string());
    }
    lines
}

// ============================================================================
// Shuffle
// ============================================================================

pub fn format_wallpaper(pick: &WallpaperPick) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", pick.name, pick.pack_name),
        format!("{}File: {}", indent(1), pick.filename),
    ];
    if let Some(description) = &pick.description {
        lines.push(format!("{}Description: {description}", indent(1)));
    }
    if !pick.tags.is_empty() {
        lines.push(format!("{}Tags: {}", indent(1), pick.tags.join(", ")));
    }
    lines
}

// ============================================================================
// Print wrappers
// ============================================================================

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

pub fn print_pack_summary(report: &PackReport) {
    print_lines(format_pack_summary(report));
}

pub fn print_pack_list(packs: &[ManifestPack]) {
    print_lines(format_pack_list(packs));
}

pub fn print_validation_report(report: &ValidationReport, verbose: bool) {
    print_lines(format_validation_report(report, verbose));
}

pub fn print_diff_report(report: &ValidationReport) {
    print_lines(format_diff_report(report));
}

pub fn print_wallpaper(pick: &WallpaperPick) {
    print_lines(format_wallpaper(pick));
}
