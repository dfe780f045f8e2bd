//! Deletion reaction.
//!
//! When a watched file disappears, a placeholder image is fetched and saved
//! next to where the file used to be as `meme_<name>.<ext>`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::watcher::{ChangeKind, FileHandler, HandlerError, HandlerId, SuppressionLedger};

const PREFIX: &str = "meme_";

/// Body of the placeholder API response. Only `url` is used.
#[derive(Debug, Deserialize)]
struct Placeholder {
    url: Option<String>,
}

pub struct DeletionHandler {
    http: reqwest::Client,
    api_url: String,
    ledger: SuppressionLedger,
}

impl DeletionHandler {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        ledger: SuppressionLedger,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            ledger,
        }
    }

    async fn fetch_placeholder_url(&self) -> Result<String, HandlerError> {
        let response = self
            .http
            .get(&self.api_url)
            .send()
            .await
            .map_err(|e| HandlerError::remote(&self.api_url, e))?;

        if !response.status().is_success() {
            return Err(HandlerError::remote(
                &self.api_url,
                format!("status {}", response.status()),
            ));
        }

        let body: Placeholder = response
            .json()
            .await
            .map_err(|e| HandlerError::remote(&self.api_url, e))?;

        body.url
            .ok_or_else(|| HandlerError::remote(&self.api_url, "no placeholder url in response"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, HandlerError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| HandlerError::remote(url, e))?;

        if !response.status().is_success() {
            return Err(HandlerError::remote(
                url,
                format!("status {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HandlerError::remote(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// Where the placeholder for `deleted` is written.
///
/// The extension is taken from the last path segment of `url`; query
/// strings are ignored. Without one, the file gets no extension.
pub fn placeholder_path(deleted: &Path, url: &str) -> PathBuf {
    let basename = deleted
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let extension = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|segment| {
            Path::new(&segment)
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
        });

    let name = match extension {
        Some(ext) => format!("{PREFIX}{basename}.{ext}"),
        None => format!("{PREFIX}{basename}"),
    };

    deleted.with_file_name(name)
}

#[async_trait]
impl FileHandler for DeletionHandler {
    fn id(&self) -> HandlerId {
        HandlerId::DELETION
    }

    async fn handle(&self, kind: ChangeKind, path: &Path) -> Result<(), HandlerError> {
        if kind != ChangeKind::Deleted {
            crate::debug_event!("deletion", "skipping", "{} was not deleted", path.display());
            return Ok(());
        }

        let url = self.fetch_placeholder_url().await?;
        crate::log_event!("deletion", "downloading placeholder", "{url}");

        let body = self.download(&url).await?;

        let target = placeholder_path(path, &url);
        self.ledger.mark(&target);
        tokio::fs::write(&target, body)
            .await
            .map_err(|e| HandlerError::io(&target, e))?;

        crate::log_event!("deletion", "placeholder saved", "{}", target.display());
        Ok(())
    }
}
