//! Pack archives.
//!
//! One deflate ZIP per pack at `<output>/packs/<id>.zip`:
//!
//! ```text
//! Nature/001-forest.jpg        # every discovered image, scanner order
//! Nature/extras/010-meadow.webp
//! Nature/pack_info.json        # resolved metadata + count + packed_date
//! Nature/README.md
//! ```
//!
//! The top-level folder is the resolved `pack_name`, so unzipping into a
//! wallpapers directory yields one folder per pack.
//!
//! ## Determinism
//!
//! Rebuilding an unchanged pack produces the same bytes, and therefore the
//! same hash:
//!
//! - every entry carries the DOS epoch (1980-01-01) as its timestamp
//! - every entry has mode `0644`
//! - the embedded `packed_date` is the newest modification time among the
//!   pack's source files, not the wall clock
//! - a defaulted `created_date` is that same time's date
//!
//! ## Atomicity
//!
//! Archives are written to `<id>.zip.tmp` and renamed over the final path
//! once complete. A crash mid-write leaves the previous archive untouched.

use crate::metadata::PACK_INFO_FILE;
use crate::scan::PackSource;
use crate::types::PackInfo;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PACKS_DIR: &str = "packs";

const HASH_CHUNK: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything needed to build one pack's archive.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRequest<'a> {
    pub output_root: &'a Path,
    pub id: &'a str,
    pub pack: &'a PackSource,
    /// Resolved against the loader defaults.
    pub info: &'a PackInfo,
    /// Deflate level, 0-9.
    pub compression_level: u8,
}

/// A finished (or reused) archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the whole file.
    pub hash: String,
    /// Modification time of the archive file.
    pub created: DateTime<Utc>,
    /// True when an existing archive was kept instead of rewritten.
    pub reused: bool,
}

/// `<output_root>/packs/<id>.zip`
pub fn archive_path(output_root: &Path, id: &str) -> PathBuf {
    output_root.join(PACKS_DIR).join(format!("{id}.zip"))
}

/// Build the archive for a pack, or reuse the existing one unless `force`.
pub fn build_archive(request: &ArchiveRequest, force: bool) -> Result<ArchiveInfo, ArchiveError> {
    let path = archive_path(request.output_root, request.id);

    let reused = path.exists() && !force;
    if reused {
        debug!(pack = request.id, "reusing existing archive");
    } else {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(&path);
        let written = write_archive(request, &staging);
        if let Err(e) = written {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
        fs::rename(&staging, &path)?;
    }

    let meta = fs::metadata(&path)?;
    Ok(ArchiveInfo {
        size_bytes: meta.len(),
        hash: hash_file(&path)?,
        created: meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now()),
        path,
        reused,
    })
}

fn write_archive(request: &ArchiveRequest, dest: &Path) -> Result<(), ArchiveError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(request.compression_level as i64))
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let root = &request.info.pack_name;
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));

    for image in &request.pack.images {
        zip.start_file(format!("{root}/{}", image.rel_path), options)?;
        let mut source = BufReader::new(File::open(&image.path)?);
        io::copy(&mut source, &mut zip)?;
    }

    let count = request.pack.images.len();
    let packed_date = newest_source_mtime(request.pack)?;
    let pack_info = archived_pack_info(request.info, count, packed_date)?;
    zip.start_file(format!("{root}/{PACK_INFO_FILE}"), options)?;
    zip.write_all(serde_json::to_string_pretty(&pack_info)?.as_bytes())?;

    zip.start_file(format!("{root}/README.md"), options)?;
    zip.write_all(render_readme(request.info, count).as_bytes())?;

    zip.finish()?.flush()?;
    Ok(())
}

/// The `pack_info.json` shipped inside the archive.
pub fn archived_pack_info(
    info: &PackInfo,
    count: usize,
    packed_date: DateTime<Utc>,
) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(info)?;
    if let Value::Object(map) = &mut value {
        map.insert("count".into(), Value::from(count));
        map.insert(
            "packed_date".into(),
            Value::from(packed_date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
    }
    Ok(value)
}

/// Newest modification time among the pack's images and its `pack_info.json`.
pub fn newest_source_mtime(pack: &PackSource) -> io::Result<DateTime<Utc>> {
    let mut newest = SystemTime::UNIX_EPOCH;
    let info_path = pack.path.join(PACK_INFO_FILE);
    let paths = pack
        .images
        .iter()
        .map(|i| i.path.as_path())
        .chain(info_path.exists().then_some(info_path.as_path()));
    for path in paths {
        let modified = fs::metadata(path)?.modified()?;
        newest = newest.max(modified);
    }
    Ok(DateTime::<Utc>::from(newest))
}

/// The README shipped inside the archive.
pub fn render_readme(info: &PackInfo, count: usize) -> String {
    let yes_no = |b: bool| if b { "Yes" } else { "No" };
    format!(
        "# {name} Wallpaper Pack\n\
         \n\
         {description}\n\
         \n\
         ## Contents\n\
         - {count} wallpapers\n\
         - Shuffle enabled: {shuffle}\n\
         - New tab shuffle: {new_tab}\n\
         \n\
         ## Installation\n\
         1. Extract this zip file into your wallpapers directory\n\
         2. Restart the browser to see the new wallpapers\n\
         3. Enable shuffle in wallpaper settings if desired\n\
         \n\
         ## Credits\n\
         Created by {author}. Licensed under the {license} license.\n",
        name = info.pack_name,
        description = info.description,
        shuffle = yes_no(info.shuffle_enabled),
        new_tab = yes_no(info.shuffle_on_new_tab),
        author = info.author,
        license = info.license,
    )
}

/// SHA-256 of a file's contents as lowercase hex, read in 64 KiB chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
