//! Name handling for packs and wallpapers.
//!
//! ## Pack identifiers
//!
//! Every pack is published under an identifier derived from its name:
//! lowercase, with each whitespace character replaced by `_`.
//!
//! - `"Nature"` → `nature`
//! - `"Deep Space"` → `deep_space`
//! - `"Deep  Space"` → `deep__space` (runs are not collapsed)
//!
//! The identifier names the archive (`packs/<id>.zip`) and preview
//! (`previews/<id>.jpg`), so it must be unique within a build and must be
//! usable as a single path component. [`IdRegistry`] enforces both.
//!
//! ## Wallpaper display names
//!
//! Wallpapers without an authored `name` get one from their filename stem,
//! following the `NNN-name` convention: the numeric prefix is dropped and
//! dashes and underscores become spaces.
//!
//! - `001-misty-forest.jpg` → "misty forest"
//! - `sunset_beach.png` → "sunset beach"
//! - `007.png` → "007" (number-only stems keep the number)

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("pack name {0:?} produces an empty identifier")]
    Empty(String),
    #[error("pack name {0:?} produces identifier {1:?}, which is not a valid file name")]
    NotAFileName(String, String),
    #[error("identifier {id:?} from pack {pack:?} is already used by pack {claimed_by:?}")]
    Collision {
        id: String,
        pack: String,
        claimed_by: String,
    },
}

/// Derive the published identifier for a pack name.
pub fn pack_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Hands out pack identifiers for one build, rejecting duplicates.
///
/// The first pack to claim an identifier keeps it; any later pack whose name
/// normalizes to the same identifier is refused rather than overwriting the
/// first pack's artifacts.
#[derive(Debug, Default)]
pub struct IdRegistry {
    claimed: HashMap<String, String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the identifier for `pack_name`, returning it on success.
    pub fn claim(&mut self, pack_name: &str) -> Result<String, IdError> {
        let id = pack_id(pack_name);
        if id.trim_matches('_').is_empty() {
            return Err(IdError::Empty(pack_name.to_string()));
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            return Err(IdError::NotAFileName(pack_name.to_string(), id));
        }
        if let Some(existing) = self.claimed.get(&id) {
            return Err(IdError::Collision {
                id,
                pack: pack_name.to_string(),
                claimed_by: existing.clone(),
            });
        }
        self.claimed.insert(id.clone(), pack_name.to_string());
        Ok(id)
    }
}

/// Result of parsing a filename stem like `001-misty-forest`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `1` from `001-misty-forest`)
    pub number: Option<u32>,
    /// Display title: name part with dashes and underscores as spaces.
    pub display_title: String,
}

/// Parse a stem following the optional `NNN-name` convention.
pub fn parse_entry_name(stem: &str) -> ParsedName {
    let humanize = |s: &str| s.replace(['-', '_'], " ").trim().to_string();

    if let Some(dash_pos) = stem.find('-')
        && let Ok(num) = stem[..dash_pos].parse::<u32>()
    {
        let title = humanize(&stem[dash_pos + 1..]);
        return ParsedName {
            number: Some(num),
            display_title: if title.is_empty() {
                stem[..dash_pos].to_string()
            } else {
                title
            },
        };
    }
    ParsedName {
        number: stem.parse::<u32>().ok(),
        display_title: humanize(stem),
    }
}

/// Display name for a wallpaper file (`rel_path` may contain directories).
pub fn display_title(rel_path: &str) -> String {
    let stem = Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string());
    parse_entry_name(&stem).display_title
}
