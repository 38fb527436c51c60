//! Asset tree scanning.
//!
//! Stage 1 of the pack pipeline. Walks the source directory and finds the
//! candidate packs and their image files.
//!
//! ## Directory Structure
//!
//! ```text
//! assets/wallpapers/               # Source root
//! ├── Nature/                      # Pack (directory name = default pack name)
//! │   ├── pack_info.json           # Optional authored metadata
//! │   ├── 001-forest.jpg
//! │   ├── 002-lake.png
//! │   └── extras/                  # Nested directories are searched too
//! │       └── 010-meadow.webp
//! ├── Abstract/
//! │   ├── shapes.png
//! │   └── waves.jpg
//! └── Drafts/                      # No images: skipped with a warning
//!     └── notes.txt
//! ```
//!
//! ## Rules
//!
//! - Only immediate subdirectories of the root are packs; files at the root
//!   are ignored.
//! - Hidden entries (leading `.`) are skipped at every level.
//! - Images are matched by extension, case-insensitively, against
//!   [`IMAGE_EXTENSIONS`].
//! - Images are returned sorted by path. Everything downstream, including
//!   the order of entries inside the archive, relies on this order being
//!   stable across runs.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory does not exist: {0}")]
    SourceNotFound(PathBuf),
}

/// File extensions (lowercase) recognized as wallpaper images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tiff"];

/// One image file inside a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    /// Path relative to the pack directory, `/`-separated. This is the
    /// `filename` used to look up authored wallpaper metadata.
    pub rel_path: String,
}

/// A pack directory with at least one image.
#[derive(Debug, Clone)]
pub struct PackSource {
    /// Directory name under the source root.
    pub dir_name: String,
    pub path: PathBuf,
    pub images: Vec<SourceImage>,
}

impl PackSource {
    /// The image used for the pack preview: first in sorted order.
    pub fn representative_image(&self) -> Option<&SourceImage> {
        self.images.first()
    }
}

/// Output of [`scan`].
#[derive(Debug, Default)]
pub struct ScanResult {
    pub packs: Vec<PackSource>,
    /// Pack directories that held no images.
    pub empty: Vec<PathBuf>,
}

/// Scan the source root for packs.
pub fn scan(root: &Path) -> Result<ScanResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::SourceNotFound(root.to_path_buf()));
    }

    let mut result = ScanResult::default();
    for dir in pack_directories(root)? {
        let images = discover_images(&dir)?;
        let dir_name = file_name_of(&dir);
        if images.is_empty() {
            warn!(pack = %dir_name, "no image files found, skipping");
            result.empty.push(dir);
            continue;
        }
        debug!(pack = %dir_name, images = images.len(), "discovered pack");
        result.packs.push(PackSource {
            dir_name,
            path: dir,
            images,
        });
    }
    Ok(result)
}

/// Immediate, non-hidden subdirectories of `root`, sorted by name.
pub fn pack_directories(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && !is_hidden(p))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Recursively find image files under `dir`, sorted by path.
pub fn discover_images(dir: &Path) -> Result<Vec<SourceImage>, ScanError> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let rel_path = relative_name(&path, dir);
            SourceImage { path, rel_path }
        })
        .collect())
}

/// Whether `path` has an image extension from [`IMAGE_EXTENSIONS`].
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `path` relative to `base`, joined with `/` regardless of platform.
fn relative_name(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
