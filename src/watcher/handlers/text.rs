//! Appends a random paragraph from a remote text source.

use std::path::Path;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use tokio::io::AsyncWriteExt;

use crate::watcher::{ChangeKind, FileHandler, HandlerError, HandlerId, SuppressionLedger};

pub struct TextHandler {
    http: reqwest::Client,
    source_url: String,
    ledger: SuppressionLedger,
}

impl TextHandler {
    pub fn new(
        http: reqwest::Client,
        source_url: impl Into<String>,
        ledger: SuppressionLedger,
    ) -> Self {
        Self {
            http,
            source_url: source_url.into(),
            ledger,
        }
    }

    async fn fetch_paragraphs(&self) -> Result<Vec<String>, HandlerError> {
        let response = self
            .http
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| HandlerError::remote(&self.source_url, e))?;

        if !response.status().is_success() {
            return Err(HandlerError::remote(
                &self.source_url,
                format!("status {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| HandlerError::remote(&self.source_url, e))
    }
}

#[async_trait]
impl FileHandler for TextHandler {
    fn id(&self) -> HandlerId {
        HandlerId::TEXT
    }

    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
        if !kind.is_write() {
            super::skip("text", path);
            return Ok(());
        }

        let paragraphs = self.fetch_paragraphs().await?;
        let paragraph = paragraphs
            .choose(&mut rand::rng())
            .ok_or_else(|| HandlerError::remote(&self.source_url, "empty paragraph list"))?;

        // Our own append must not come back as a modification
        self.ledger.mark(path);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(|e| HandlerError::io(path, e))?;
        file.write_all(paragraph.as_bytes())
            .await
            .map_err(|e| HandlerError::io(path, e))?;
        file.flush().await.map_err(|e| HandlerError::io(path, e))?;

        crate::log_event!("text", "appended", "{} bytes to {}", paragraph.len(), path.display());
        Ok(())
    }
}
