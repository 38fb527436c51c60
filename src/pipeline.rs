//! Pack build orchestration.
//!
//! Runs the whole build for one source tree:
//!
//! 1. **Scan** the source root for pack directories ([`scan`](crate::scan)).
//! 2. **Load** each pack's `pack_info.json` and resolve it
//!    ([`metadata`](crate::metadata)).
//! 3. **Assign identifiers** sequentially, in directory order, so collisions
//!    are decided the same way on every run ([`IdRegistry`]).
//! 4. **Build** each pack's archive and preview in parallel on the rayon pool.
//! 5. **Join** and write `manifest.json` ([`manifest`](crate::manifest)).
//!
//! ## Failure Isolation
//!
//! | Problem | Effect |
//! |---|---|
//! | Missing or malformed `pack_info.json` | Defaults used, warning |
//! | Pack directory without images | Pack skipped, warning |
//! | Authored wallpaper with no matching file | Warning |
//! | Preview generation fails | Pack published with `preview_url: null` |
//! | Archive fails, identifier collides or is invalid | Pack excluded, error |
//! | Source root missing, or no pack survives | Run fails |
//!
//! When the run fails and the output directory exists, an empty manifest is
//! written over the previous one so the site never advertises packs from an
//! older build.
//!
//! ## Progress Events
//!
//! [`Pipeline::run`] optionally takes a channel sender. Workers send a
//! [`PackEvent`] as each pack starts and finishes; the CLI prints them from a
//! separate thread.

use crate::archive::{self, ArchiveError, ArchiveRequest};
use crate::config::PackerConfig;
use crate::imaging::{self, ImageBackend, RustBackend};
use crate::manifest::{self, Manifest, ManifestError, PackArtifacts};
use crate::metadata::{self, LoadedPackInfo, MetadataOrigin};
use crate::naming::{IdError, IdRegistry};
use crate::scan::{self, PackSource, ScanError};
use chrono::{DateTime, Local, NaiveDate, Utc};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to write manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("No packs were built from {0}")]
    NoPacks(PathBuf),
}

/// Why a single pack was left out of the manifest.
#[derive(Error, Debug)]
pub enum PackError {
    #[error("identifier {id:?} is already used by pack {claimed_by:?}")]
    IdentifierCollision { id: String, claimed_by: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(IdError),
    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),
}

impl From<IdError> for PackError {
    fn from(e: IdError) -> Self {
        match e {
            IdError::Collision { id, claimed_by, .. } => {
                PackError::IdentifierCollision { id, claimed_by }
            }
            other => PackError::InvalidIdentifier(other),
        }
    }
}

/// Progress events sent while packs are built.
#[derive(Debug, Clone, PartialEq)]
pub enum PackEvent {
    Discovered {
        packs: usize,
        skipped: usize,
    },
    PackStarted {
        id: String,
        name: String,
        images: usize,
    },
    PackFinished {
        id: String,
        name: String,
        count: usize,
        size_bytes: u64,
        archive: ArtifactStatus,
        preview: ArtifactStatus,
    },
    PackFailed {
        name: String,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    Built,
    Reused,
    Failed,
}

/// A pack that did not make it into the manifest.
#[derive(Debug)]
pub struct PackFailure {
    /// Source directory name.
    pub pack: String,
    pub error: PackError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackStats {
    pub archives_built: usize,
    pub archives_reused: usize,
    pub previews_built: usize,
    pub previews_reused: usize,
    pub previews_failed: usize,
    /// Authored wallpaper entries with no matching image file.
    pub unmatched_wallpapers: usize,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct PackReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub failures: Vec<PackFailure>,
    /// Pack directories skipped for having no images.
    pub skipped: Vec<PathBuf>,
    pub stats: PackStats,
}

/// One pack ready for the parallel phase.
struct PackJob {
    id: String,
    source: PackSource,
    loaded: LoadedPackInfo,
    /// Default `created_date`, from the newest source file.
    created: NaiveDate,
}

/// What a worker hands back for one pack.
struct PackOutcome {
    record: manifest::ManifestPack,
    archive: ArtifactStatus,
    preview: ArtifactStatus,
}

/// The pack build, configured once and run against the source tree.
pub struct Pipeline<B: ImageBackend = RustBackend> {
    config: PackerConfig,
    backend: B,
    now: DateTime<Utc>,
    today: NaiveDate,
}

impl Pipeline<RustBackend> {
    pub fn new(config: PackerConfig) -> Self {
        Self::with_backend(config, RustBackend::new())
    }
}

impl<B: ImageBackend> Pipeline<B> {
    pub fn with_backend(config: PackerConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            now: Utc::now(),
            today: Local::now().date_naive(),
        }
    }

    /// Pin the run clock. `now` stamps the manifest; `today` dates a pack
    /// whose source times cannot be read.
    pub fn at(mut self, now: DateTime<Utc>, today: NaiveDate) -> Self {
        self.now = now;
        self.today = today;
        self
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    pub fn run(&self, events: Option<Sender<PackEvent>>) -> Result<PackReport, PipelineError> {
        info!(source = %self.config.source.display(), "scanning for packs");
        let scanned = match scan::scan(&self.config.source) {
            Ok(scanned) => scanned,
            Err(e) => {
                self.publish_empty();
                return Err(e.into());
            }
        };
        send(
            &events,
            PackEvent::Discovered {
                packs: scanned.packs.len(),
                skipped: scanned.empty.len(),
            },
        );

        let mut stats = PackStats::default();
        let mut failures = Vec::new();
        let mut jobs = Vec::new();
        let mut ids = IdRegistry::new();

        for source in scanned.packs {
            let created = metadata::source_created_date(&source, self.today);
            let loaded = metadata::load_pack_info(&source.path, created);
            if loaded.origin == MetadataOrigin::Missing {
                debug!(pack = %source.dir_name, "no pack_info.json, using defaults");
            }
            stats.unmatched_wallpapers += warn_unmatched_wallpapers(&source, &loaded);

            match ids.claim(&loaded.info.pack_name) {
                Ok(id) => jobs.push(PackJob {
                    id,
                    source,
                    loaded,
                    created,
                }),
                Err(e) => {
                    let error = PackError::from(e);
                    error!(pack = %source.dir_name, error = %error, "pack excluded");
                    send(
                        &events,
                        PackEvent::PackFailed {
                            name: loaded.info.pack_name.clone(),
                            error: error.to_string(),
                        },
                    );
                    failures.push(PackFailure {
                        pack: source.dir_name,
                        error,
                    });
                }
            }
        }

        let results: Vec<(String, Result<PackOutcome, PackError>)> = jobs
            .par_iter()
            .map_with(events.clone(), |tx, job| {
                (job.source.dir_name.clone(), self.build_pack(job, tx))
            })
            .collect();

        let mut records = Vec::new();
        for (dir_name, result) in results {
            match result {
                Ok(outcome) => {
                    match outcome.archive {
                        ArtifactStatus::Reused => stats.archives_reused += 1,
                        _ => stats.archives_built += 1,
                    }
                    match outcome.preview {
                        ArtifactStatus::Built => stats.previews_built += 1,
                        ArtifactStatus::Reused => stats.previews_reused += 1,
                        ArtifactStatus::Failed => stats.previews_failed += 1,
                    }
                    records.push(outcome.record);
                }
                Err(error) => {
                    error!(pack = %dir_name, error = %error, "pack excluded");
                    failures.push(PackFailure {
                        pack: dir_name,
                        error,
                    });
                }
            }
        }

        if records.is_empty() {
            self.publish_empty();
            return Err(PipelineError::NoPacks(self.config.source.clone()));
        }

        let manifest = manifest::build_manifest(records, self.config.base_url(), self.now);
        let manifest_path = manifest::write_manifest(&manifest, &self.config.output)?;
        info!(
            packs = manifest.total_packs,
            wallpapers = manifest.total_wallpapers,
            path = %manifest_path.display(),
            "manifest written"
        );

        Ok(PackReport {
            manifest,
            manifest_path,
            failures,
            skipped: scanned.empty,
            stats,
        })
    }

    /// Archive and preview one pack, then build its manifest record.
    fn build_pack(
        &self,
        job: &PackJob,
        events: &Option<Sender<PackEvent>>,
    ) -> Result<PackOutcome, PackError> {
        let name = job.loaded.info.pack_name.clone();
        send(
            events,
            PackEvent::PackStarted {
                id: job.id.clone(),
                name: name.clone(),
                images: job.source.images.len(),
            },
        );

        let built = archive::build_archive(
            &ArchiveRequest {
                output_root: &self.config.output,
                id: &job.id,
                pack: &job.source,
                info: &job.loaded.info,
                compression_level: self.config.archive.compression_level,
            },
            self.config.force,
        );
        let built = match built {
            Ok(built) => built,
            Err(e) => {
                let error = PackError::from(e);
                send(
                    events,
                    PackEvent::PackFailed {
                        name,
                        error: error.to_string(),
                    },
                );
                return Err(error);
            }
        };

        let preview = match job.source.representative_image() {
            Some(image) => match imaging::create_preview(
                &self.backend,
                &image.path,
                &self.config.output,
                &job.id,
                &self.config.preview,
                self.config.force,
            ) {
                Ok(outcome) => {
                    debug!(
                        pack = %name,
                        width = outcome.dimensions.width,
                        height = outcome.dimensions.height,
                        "preview ready"
                    );
                    if outcome.reused {
                        ArtifactStatus::Reused
                    } else {
                        ArtifactStatus::Built
                    }
                }
                Err(e) => {
                    warn!(pack = %name, error = %e, "preview failed, publishing without one");
                    ArtifactStatus::Failed
                }
            },
            None => ArtifactStatus::Failed,
        };

        let info = metadata::merge(
            metadata::manifest_defaults(&job.source.dir_name, job.created),
            job.loaded.doc.clone(),
        );
        let count = job.source.images.len();
        let record = manifest::pack_record(
            info,
            PackArtifacts {
                id: job.id.clone(),
                source_dir: job.source.dir_name.clone(),
                count,
                size_bytes: built.size_bytes,
                hash: built.hash,
                has_preview: preview != ArtifactStatus::Failed,
                packed_date: self.now,
            },
            self.config.base_url(),
        );

        let archive = if built.reused {
            ArtifactStatus::Reused
        } else {
            ArtifactStatus::Built
        };
        send(
            events,
            PackEvent::PackFinished {
                id: job.id.clone(),
                name,
                count,
                size_bytes: built.size_bytes,
                archive,
                preview,
            },
        );
        Ok(PackOutcome {
            record,
            archive,
            preview,
        })
    }

    /// Replace any previous manifest with an empty one, if there is an
    /// output directory to write into.
    fn publish_empty(&self) {
        if !self.config.output.is_dir() {
            return;
        }
        let empty = manifest::build_manifest(Vec::new(), self.config.base_url(), self.now);
        match manifest::write_manifest(&empty, &self.config.output) {
            Ok(path) => warn!(path = %path.display(), "wrote empty manifest"),
            Err(e) => error!(error = %e, "failed to write empty manifest"),
        }
    }
}

fn send(events: &Option<Sender<PackEvent>>, event: PackEvent) {
    if let Some(tx) = events {
        tx.send(event).ok();
    }
}

/// Warn about authored wallpaper entries whose file was not discovered.
fn warn_unmatched_wallpapers(source: &PackSource, loaded: &LoadedPackInfo) -> usize {
    let mut unmatched = 0;
    for wallpaper in &loaded.info.wallpapers {
        if !source.images.iter().any(|i| i.rel_path == wallpaper.filename) {
            warn!(
                pack = %source.dir_name,
                file = %wallpaper.filename,
                "wallpaper listed in pack_info.json has no matching image"
            );
            unmatched += 1;
        }
    }
    unmatched
}
