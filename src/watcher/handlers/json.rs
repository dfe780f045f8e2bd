//! Forwards JSON documents to a remote sink.

use std::path::Path;

use async_trait::async_trait;

use crate::watcher::{ChangeKind, FileHandler, HandlerError, HandlerId};

pub struct JsonHandler {
    http: reqwest::Client,
    sink_url: String,
}

impl JsonHandler {
    pub fn new(http: reqwest::Client, sink_url: impl Into<String>) -> Self {
        Self {
            http,
            sink_url: sink_url.into(),
        }
    }
}

#[async_trait]
impl FileHandler for JsonHandler {
    fn id(&self) -> HandlerId {
        HandlerId::JSON
    }

    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
        if !kind.is_write() {
            super::skip("json", path);
            return Ok(());
        }

        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| HandlerError::io(path, e))?;
        let document: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|e| HandlerError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let response = self
            .http
            .post(&self.sink_url)
            .json(&document)
            .send()
            .await
            .map_err(|e| HandlerError::remote(&self.sink_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HandlerError::remote(
                &self.sink_url,
                format!("status {status}: {body}"),
            ));
        }

        crate::log_event!("json", "sent", "{} to {}", path.display(), self.sink_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let handler = JsonHandler::new(reqwest::Client::new(), "http://127.0.0.1:9/sink");
        let err = handler.handle(ChangeKind::Created, &path).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let handler = JsonHandler::new(reqwest::Client::new(), "http://127.0.0.1:9/sink");
        let err = handler
            .handle(ChangeKind::Modified, &temp_dir.path().join("gone.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Io { .. }));
    }
}
