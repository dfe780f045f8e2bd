//! ZIP extraction.
//!
//! Extracts an archive into a sibling directory named after it, then
//! deletes the archive. Both the directory and the archive are marked in
//! the ledger so neither the extraction nor the removal is re-dispatched.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use zip::ZipArchive;

use crate::watcher::{ChangeKind, FileHandler, HandlerError, HandlerId, SuppressionLedger};

pub struct ZipHandler {
    ledger: SuppressionLedger,
}

impl ZipHandler {
    pub fn new(ledger: SuppressionLedger) -> Self {
        Self { ledger }
    }
}

/// Directory an archive extracts into.
///
/// Only a real extension is stripped (`data.zip` → `data`, `a.zip.zip` →
/// `a.zip`). Archives without an extension get an `_extracted` suffix so
/// the directory never collides with the archive itself.
pub fn extraction_dir(archive: &Path) -> PathBuf {
    if archive.extension().is_some() {
        archive.with_extension("")
    } else {
        let mut name = archive.as_os_str().to_os_string();
        name.push("_extracted");
        PathBuf::from(name)
    }
}

#[async_trait]
impl FileHandler for ZipHandler {
    fn id(&self) -> HandlerId {
        HandlerId::ZIP
    }

    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
        if !kind.is_write() {
            super::skip("zip", path);
            return Ok(());
        }

        let archive = path.to_path_buf();
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || extract(&archive, &ledger))
            .await
            .map_err(|e| HandlerError::Archive {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
    }
}

fn extract(archive_path: &Path, ledger: &SuppressionLedger) -> Result<(), HandlerError> {
    let archive_error = |reason: String| HandlerError::Archive {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| HandlerError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let target = extraction_dir(archive_path);
    ledger.mark(&target);

    archive
        .extract(&target)
        .map_err(|e| archive_error(e.to_string()))?;
    crate::log_event!(
        "zip",
        "extracted",
        "'{}' into '{}'",
        archive_path.display(),
        target.display()
    );

    // The removal shows up as a deletion on the next scan
    ledger.mark(archive_path);

    if archive_path.exists() {
        std::fs::remove_file(archive_path).map_err(|e| HandlerError::io(archive_path, e))?;
        crate::log_event!("zip", "deleted original", "{}", archive_path.display());
    } else {
        tracing::warn!(
            "[zip] original archive not found for deletion: {}",
            archive_path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{FileOptions, ZipWriter};

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extraction_dir_strips_real_extension() {
        assert_eq!(extraction_dir(Path::new("/w/data.zip")), PathBuf::from("/w/data"));
        assert_eq!(extraction_dir(Path::new("/w/zipper.zip")), PathBuf::from("/w/zipper"));
        assert_eq!(extraction_dir(Path::new("/w/a.zip.zip")), PathBuf::from("/w/a.zip"));
        assert_eq!(
            extraction_dir(Path::new("/w/archive")),
            PathBuf::from("/w/archive_extracted")
        );
    }

    #[tokio::test]
    async fn test_extracts_and_removes_archive() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("b.zip");
        write_archive(&archive, &[("inner/hello.txt", "hi"), ("top.json", "{}")]);

        let ledger = SuppressionLedger::new();
        ZipHandler::new(ledger.clone())
            .handle(ChangeKind::Created, &archive)
            .await
            .unwrap();

        let dir = temp_dir.path().join("b");
        assert_eq!(std::fs::read_to_string(dir.join("inner/hello.txt")).unwrap(), "hi");
        assert!(dir.join("top.json").exists());
        assert!(!archive.exists());
        assert!(ledger.contains(&dir));
        assert!(ledger.contains(&archive));
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("broken.zip");
        std::fs::write(&archive, b"PK\x03\x04 truncated").unwrap();

        let ledger = SuppressionLedger::new();
        let err = ZipHandler::new(ledger.clone())
            .handle(ChangeKind::Created, &archive)
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::Archive { .. }));
        assert!(archive.exists());
        assert!(ledger.is_empty());
    }
}
