//! Directory snapshots and the recursive scanner that builds them.
//!
//! A snapshot maps every regular file below the root to its modification
//! time in whole seconds since the Unix epoch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use super::WatchError;

/// Modification time in seconds since the Unix epoch.
pub type Mtime = i64;

/// Point-in-time map of file paths to modification times.
///
/// Immutable once built; the ordered map keeps diff output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<PathBuf, Mtime>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Modification time recorded for `path`, if present.
    pub fn get(&self, path: &Path) -> Option<Mtime> {
        self.files.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, Mtime)> {
        self.files.iter().map(|(p, m)| (p.as_path(), *m))
    }
}

impl FromIterator<(PathBuf, Mtime)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (PathBuf, Mtime)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Walk `root` depth-first and record every regular file.
///
/// Fails only when the root itself cannot be opened or enumerated.
/// Unreadable entries below the root are skipped.
pub fn scan(root: &Path) -> Result<Snapshot, WatchError> {
    let metadata = std::fs::metadata(root).map_err(|e| WatchError::ScanFailed {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(WatchError::ScanFailed {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(WatchError::ScanFailed {
                    path: root.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                crate::debug_event!("scanner", "skipped entry", "{e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let modified = entry
            .metadata()
            .map_err(|e| e.to_string())
            .and_then(|m| m.modified().map_err(|e| e.to_string()));

        match modified {
            Ok(modified) => {
                files.insert(entry.into_path(), to_seconds(modified));
            }
            Err(e) => {
                crate::debug_event!("scanner", "no mtime", "{}: {e}", entry.path().display());
            }
        }
    }

    Ok(Snapshot { files })
}

fn to_seconds(time: SystemTime) -> Mtime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as Mtime,
        Err(e) => -(e.duration().as_secs() as Mtime),
    }
}
