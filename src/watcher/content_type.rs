//! Content-type resolution.
//!
//! Files are sniffed by their leading bytes first. When sniffing is empty
//! or inconclusive, the extension is mapped through a fixed table.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Bytes read from the head of a file for sniffing.
const SNIFF_LIMIT: u64 = 64 * 1024;

/// Normalized media-type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContentType(String);

impl ContentType {
    pub const JPEG: &'static str = "image/jpeg";
    pub const JSON: &'static str = "application/json";
    pub const JSON_LD: &'static str = "application/ld+json";
    pub const TEXT: &'static str = "text/plain";
    pub const ZIP: &'static str = "application/zip";
    pub const ZIP_COMPRESSED: &'static str = "application/x-zip-compressed";
    pub const EMPTY: &'static str = "application/x-empty";

    /// Tags the dispatcher knows how to route.
    pub const SUPPORTED: [&'static str; 6] = [
        Self::JPEG,
        Self::JSON,
        Self::JSON_LD,
        Self::TEXT,
        Self::ZIP,
        Self::ZIP_COMPRESSED,
    ];

    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_ascii_lowercase())
    }

    /// The unknown/empty marker.
    pub fn empty() -> Self {
        Self(Self::EMPTY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty_marker(&self) -> bool {
        self.0 == Self::EMPTY
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(&self.0.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for ContentType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<ContentType> for String {
    fn from(tag: ContentType) -> Self {
        tag.0
    }
}

/// Maps file paths to content-type tags.
#[derive(Debug, Clone, Default)]
pub struct TypeResolver;

impl TypeResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the content type of the file at `path`.
    ///
    /// Never fails: unreadable or unrecognized files resolve to the
    /// empty marker unless their extension is in the table.
    pub fn resolve(&self, path: &Path) -> ContentType {
        let by_extension = extension_tag(path);

        match read_head(path).map(|head| sniff(&head)) {
            Ok(Sniffed::Type(tag)) => {
                // A JSON payload in a .jsonld file keeps the more specific tag
                if tag == ContentType::JSON && by_extension == Some(ContentType::JSON_LD) {
                    ContentType::new(ContentType::JSON_LD)
                } else {
                    ContentType::new(tag)
                }
            }
            Ok(Sniffed::Empty | Sniffed::Inconclusive) => fallback(by_extension),
            Err(e) => {
                crate::debug_event!("resolver", "unreadable", "{}: {e}", path.display());
                fallback(by_extension)
            }
        }
    }
}

fn fallback(by_extension: Option<&'static str>) -> ContentType {
    by_extension.map_or_else(ContentType::empty, ContentType::new)
}

/// Case-insensitive extension table.
fn extension_tag(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let tag = match ext.as_str() {
        "jpeg" | "jpg" => ContentType::JPEG,
        "json" => ContentType::JSON,
        "jsonld" => ContentType::JSON_LD,
        "txt" => ContentType::TEXT,
        "zip" => ContentType::ZIP,
        _ => return None,
    };
    Some(tag)
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::new();
    File::open(path)?.take(SNIFF_LIMIT).read_to_end(&mut head)?;
    Ok(head)
}

#[derive(Debug, PartialEq, Eq)]
enum Sniffed {
    Type(&'static str),
    Empty,
    Inconclusive,
}

fn sniff(head: &[u8]) -> Sniffed {
    if head.is_empty() {
        return Sniffed::Empty;
    }

    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Sniffed::Type(ContentType::JPEG);
    }

    if [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"]
        .iter()
        .any(|magic| head.starts_with(*magic))
    {
        return Sniffed::Type(ContentType::ZIP);
    }

    let Ok(text) = std::str::from_utf8(head) else {
        return Sniffed::Inconclusive;
    };

    if text.contains('\0') {
        return Sniffed::Inconclusive;
    }

    let trimmed = text.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(text).is_ok()
    {
        return Sniffed::Type(ContentType::JSON);
    }

    Sniffed::Type(ContentType::TEXT)
}
