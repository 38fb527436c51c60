//! High-level image operations.
//!
//! These functions decide where preview files live and call the backend.
//!
//! ## Output Files
//!
//! For a pack with identifier `nature`:
//!
//! ```text
//! <output>/thumbs/nature.jpg      # written by the backend
//! <output>/previews/nature.jpg    # copy served as preview_url
//! ```
//!
//! Both are written under a `.tmp` name first and renamed into place.
//! An existing preview is kept unless forced, provided it still decodes.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{PreviewParams, Quality};
use crate::config::PreviewConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

pub const PREVIEWS_DIR: &str = "previews";
pub const THUMBS_DIR: &str = "thumbs";

pub fn preview_path(output_root: &Path, id: &str) -> PathBuf {
    output_root.join(PREVIEWS_DIR).join(format!("{id}.jpg"))
}

pub fn thumb_path(output_root: &Path, id: &str) -> PathBuf {
    output_root.join(THUMBS_DIR).join(format!("{id}.jpg"))
}

/// What [`create_preview`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewOutcome {
    pub preview: PathBuf,
    pub thumb: PathBuf,
    pub dimensions: Dimensions,
    /// True when an existing preview was kept instead of regenerated.
    pub reused: bool,
}

/// Build the preview params for a pack without executing them.
pub fn plan_preview(source: &Path, output: &Path, config: &PreviewConfig) -> PreviewParams {
    PreviewParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        max_width: config.width,
        max_height: config.height,
        quality: Quality::new(config.quality),
    }
}

/// Create the preview for pack `id` from its representative image.
pub fn create_preview(
    backend: &impl ImageBackend,
    source: &Path,
    output_root: &Path,
    id: &str,
    config: &PreviewConfig,
    force: bool,
) -> Result<PreviewOutcome> {
    let preview = preview_path(output_root, id);
    let thumb = thumb_path(output_root, id);

    if !force && preview.exists() {
        match backend.identify(&preview) {
            Ok(dimensions) => {
                if !thumb.exists() {
                    copy_staged(&preview, &thumb)?;
                }
                debug!(pack = id, "reusing existing preview");
                return Ok(PreviewOutcome {
                    preview,
                    thumb,
                    dimensions,
                    reused: true,
                });
            }
            Err(e) => debug!(pack = id, error = %e, "existing preview unreadable, regenerating"),
        }
    }

    let staging = staging_path(&thumb);
    if let Some(parent) = thumb.parent() {
        fs::create_dir_all(parent)?;
    }
    let params = plan_preview(source, &staging, config);
    let dimensions = match backend.preview(&params) {
        Ok(dimensions) => dimensions,
        Err(e) => {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
    };
    fs::rename(&staging, &thumb)?;
    copy_staged(&thumb, &preview)?;

    Ok(PreviewOutcome {
        preview,
        thumb,
        dimensions,
        reused: false,
    })
}

/// Copy `from` to `to` through a `.tmp` sibling.
fn copy_staged(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(to);
    fs::copy(from, &staging)?;
    fs::rename(&staging, to)?;
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
