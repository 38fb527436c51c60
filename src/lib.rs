//! # Wallpack
//!
//! Builds downloadable wallpaper packs from a directory of images and
//! publishes a JSON manifest describing them. Each subdirectory of the
//! source root is one pack; an optional hand-written `pack_info.json`
//! describes it.
//!
//! # Architecture
//!
//! ```text
//! assets/wallpapers/            static/wallpapers/
//! ├── Nature/                   ├── packs/nature.zip
//! │   ├── pack_info.json   →    ├── previews/nature.jpg
//! │   ├── 001-forest.jpg        ├── thumbs/nature.jpg
//! │   └── 002-lake.png          └── manifest.json
//! └── Abstract/
//!     └── shapes.png
//! ```
//!
//! `wallpack pack` runs the [`pipeline`]: scan, load metadata, build each
//! pack's archive and preview in parallel, then write the manifest.
//! `wallpack validate` runs the [`validate`] checks, comparing the published
//! manifest with the authored metadata. The [`catalog`] serves the result.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Finds pack directories and their images |
//! | [`metadata`] | Loads `pack_info.json` and merges it over defaults |
//! | [`types`] | Authored and resolved metadata records |
//! | [`naming`] | Pack identifiers and wallpaper display names |
//! | [`imaging`] | Preview generation behind the `ImageBackend` trait |
//! | [`archive`] | Deterministic ZIP archives and their SHA-256 |
//! | [`manifest`] | Manifest records, aggregates and atomic writes |
//! | [`pipeline`] | Orchestrates a build, isolating per-pack failures |
//! | [`validate`] | Manifest vs. `pack_info.json` consistency checks |
//! | [`catalog`] | Read-side lookups, downloads and random picks |
//! | [`config`] | `wallpack.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Two Default Records
//!
//! A pack without metadata is described one way inside its archive and
//! another way in the manifest: the archive copy credits "Wallpack" and
//! enables shuffle, the manifest credits "Unknown" and disables it. Clients
//! reading the manifest already depend on these values, so both records are
//! kept; see [`metadata::loader_defaults`] and [`metadata::manifest_defaults`].
//!
//! ## Reproducible Archives
//!
//! An unchanged pack rebuilds to the same bytes. Archive entries carry a
//! fixed timestamp and mode, and the embedded `packed_date` and any defaulted
//! `created_date` come from the source files. The manifest hash then only
//! changes when content does.
//!
//! ## Failures Stay Local
//!
//! One broken pack never takes the build down. Archive failures and
//! identifier collisions drop the pack from the manifest and are reported;
//! a failed preview only nulls `preview_url`.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
