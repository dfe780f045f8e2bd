//! JPEG recompression.
//!
//! Writes a re-encoded copy next to the source as `optimized_<name>`.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;

use crate::watcher::{ChangeKind, FileHandler, HandlerError, HandlerId, SuppressionLedger};

const PREFIX: &str = "optimized_";

pub struct JpegHandler {
    ledger: SuppressionLedger,
    quality: u8,
}

impl JpegHandler {
    pub fn new(ledger: SuppressionLedger, quality: u8) -> Self {
        Self { ledger, quality }
    }
}

/// Where the optimized copy of `source` goes, or `None` if `source` is
/// already a derivative.
pub fn optimized_path(source: &Path) -> Option<PathBuf> {
    let name = source.file_name()?.to_str()?;
    if name.starts_with(PREFIX) {
        return None;
    }
    Some(source.with_file_name(format!("{PREFIX}{name}")))
}

#[async_trait]
impl FileHandler for JpegHandler {
    fn id(&self) -> HandlerId {
        HandlerId::JPEG
    }

    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
        if !kind.is_write() {
            super::skip("jpeg", path);
            return Ok(());
        }

        let Some(target) = optimized_path(path) else {
            crate::debug_event!("jpeg", "already optimized", "{}", path.display());
            return Ok(());
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| HandlerError::io(path, e))?;

        self.ledger.mark(&target);

        let source = path.to_path_buf();
        let output = target.clone();
        let quality = self.quality;
        tokio::task::spawn_blocking(move || recompress(&source, &bytes, &output, quality))
            .await
            .map_err(|e| HandlerError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })??;

        crate::log_event!(
            "jpeg",
            "optimized",
            "'{}' to '{}'",
            path.display(),
            target.display()
        );
        Ok(())
    }
}

fn recompress(source: &Path, bytes: &[u8], target: &Path, quality: u8) -> Result<(), HandlerError> {
    let decode_error = |reason: String| HandlerError::Decode {
        path: source.to_path_buf(),
        reason,
    };

    let image = image::load_from_memory(bytes).map_err(|e| decode_error(e.to_string()))?;
    let rgb = image.to_rgb8();

    let file = File::create(target).map_err(|e| HandlerError::io(target, e))?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| decode_error(e.to_string()))
}
