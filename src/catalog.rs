//! Read-side access to a finished build.
//!
//! A [`Catalog`] opens the `manifest.json` a previous `pack` run wrote and
//! answers the questions a wallpaper server needs: which packs exist, where
//! a pack's archive and preview live, and a random wallpaper from a pack.
//!
//! The catalog never rewrites the manifest. If a published archive has gone
//! missing from the output directory, [`Catalog::download`] rebuilds it from
//! the pack's source directory using the same archiver as the build.

use crate::archive::{self, ArchiveError, ArchiveRequest};
use crate::config::PackerConfig;
use crate::imaging::preview_path;
use crate::manifest::{self, MANIFEST_FILE, Manifest, ManifestError, ManifestPack};
use crate::metadata;
use crate::naming;
use crate::scan::{self, PackSource, ScanError};
use chrono::{Local, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Unknown pack: {0}")]
    UnknownPack(String),
    #[error("Pack {0} has no preview")]
    NoPreview(String),
    #[error("Pack {id} has no images in {dir}")]
    NoImages { id: String, dir: PathBuf },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to build archive: {0}")]
    Archive(#[from] ArchiveError),
}

/// One wallpaper picked from a pack, with its authored metadata when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallpaperPick {
    pub pack_id: String,
    pub pack_name: String,
    /// Relative to the pack directory, `/` separated.
    pub filename: String,
    pub path: PathBuf,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
}

pub struct Catalog {
    config: PackerConfig,
    manifest: Manifest,
    today: NaiveDate,
}

impl Catalog {
    /// Open the manifest in the configured output directory.
    pub fn open(config: PackerConfig) -> Result<Self, CatalogError> {
        let manifest = manifest::read_manifest(&config.output.join(MANIFEST_FILE))?;
        Ok(Self {
            config,
            manifest,
            today: Local::now().date_naive(),
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn list_packs(&self) -> &[ManifestPack] {
        &self.manifest.packs
    }

    pub fn find(&self, id: &str) -> Result<&ManifestPack, CatalogError> {
        self.manifest
            .pack(id)
            .ok_or_else(|| CatalogError::UnknownPack(id.to_string()))
    }

    /// Path of a pack's archive, rebuilding it from source if it is missing.
    pub fn download(&self, id: &str) -> Result<PathBuf, CatalogError> {
        let pack = self.find(id)?;
        let path = archive::archive_path(&self.config.output, &pack.id);
        if path.is_file() {
            return Ok(path);
        }

        info!(pack = %pack.id, "archive missing, building from source");
        let source = self.source_of(pack)?;
        let created = metadata::source_created_date(&source, self.today);
        let loaded = metadata::load_pack_info(&source.path, created);
        let built = archive::build_archive(
            &ArchiveRequest {
                output_root: &self.config.output,
                id: &pack.id,
                pack: &source,
                info: &loaded.info,
                compression_level: self.config.archive.compression_level,
            },
            false,
        )?;
        Ok(built.path)
    }

    /// Path of a pack's preview image.
    pub fn preview(&self, id: &str) -> Result<PathBuf, CatalogError> {
        let pack = self.find(id)?;
        let path = preview_path(&self.config.output, &pack.id);
        if pack.preview_url.is_none() || !path.is_file() {
            return Err(CatalogError::NoPreview(pack.id.clone()));
        }
        Ok(path)
    }

    /// Pick one of the pack's images uniformly at random.
    pub fn random_wallpaper<R: Rng + ?Sized>(
        &self,
        id: &str,
        rng: &mut R,
    ) -> Result<WallpaperPick, CatalogError> {
        let pack = self.find(id)?;
        let source = self.source_of(pack)?;
        let image = source
            .images
            .choose(rng)
            .ok_or_else(|| CatalogError::NoImages {
                id: pack.id.clone(),
                dir: source.path.clone(),
            })?;

        let authored = pack.info.wallpaper(&image.rel_path);
        Ok(WallpaperPick {
            pack_id: pack.id.clone(),
            pack_name: pack.name.clone(),
            filename: image.rel_path.clone(),
            path: image.path.clone(),
            name: authored
                .map(|w| w.name.clone())
                .unwrap_or_else(|| naming::display_title(&image.rel_path)),
            description: authored.and_then(|w| w.description.clone()),
            tags: authored.map(|w| w.tags.clone()).unwrap_or_default(),
        })
    }

    fn source_of(&self, pack: &ManifestPack) -> Result<PackSource, CatalogError> {
        let path = self.config.source.join(&pack.source_dir);
        let images = scan::discover_images(&path)?;
        if images.is_empty() {
            return Err(CatalogError::NoImages {
                id: pack.id.clone(),
                dir: path,
            });
        }
        Ok(PackSource {
            dir_name: pack.source_dir.clone(),
            path,
            images,
        })
    }
}
