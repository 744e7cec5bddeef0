use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::TransportError;

pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT_XML: &str = "text/xml";
pub const CONTENT_TYPE_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_PDF: &str = "application/pdf";
pub const CONTENT_TYPE_JPG: &str = "image/jpeg";
pub const CONTENT_TYPE_GIF: &str = "image/gif";
pub const CONTENT_TYPE_BMP: &str = "image/bmp";
pub const CONTENT_TYPE_PNG: &str = "image/png";

/// Name prefix of files written for binary responses.
pub const DOWNLOAD_FILE_PREFIX: &str = "download";

const DOCUMENT_START: &str = "<api:document id=\"";

/// Result of a signed API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    /// Body of a textual (XML, plain text, HTML) response.
    Text(String),
    /// Location of the file a binary response was streamed into.
    Downloaded(PathBuf),
}

impl CallOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CallOutput::Text(text) => Some(text),
            CallOutput::Downloaded(_) => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            CallOutput::Text(_) => None,
            CallOutput::Downloaded(path) => Some(path),
        }
    }
}

/// `type/subtype` without parameters, lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a response of this type is handed back as text.
///
/// A missing content type counts as text.
pub fn is_textual(content_type: Option<&str>) -> bool {
    let essence = match content_type {
        Some(content_type) => essence(content_type),
        None => return true,
    };
    match essence.as_str() {
        CONTENT_TYPE_XML | CONTENT_TYPE_TEXT_XML | CONTENT_TYPE_PLAIN | CONTENT_TYPE_HTML => true,
        other => other.ends_with("+xml"),
    }
}

/// File extension for a downloaded body: the media subtype, e.g. `png`.
pub fn download_extension(content_type: &str) -> String {
    let essence = essence(content_type);
    let subtype = essence.splitn(2, '/').nth(1).unwrap_or_default();
    let cleaned: String = subtype
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "bin".to_string()
    } else {
        cleaned
    }
}

/// Streams `body` into `download<millis>.<subtype>` inside `dir`.
///
/// The file is created exclusively; on a name clash the timestamp is bumped
/// until a free name is found. The handle is closed on every path, and a
/// partially written file is removed when streaming fails.
pub(crate) fn download<R: Read + ?Sized>(
    body: &mut R,
    dir: &Path,
    content_type: &str,
) -> Result<PathBuf, TransportError> {
    let extension = download_extension(content_type);
    let mut stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let (path, mut file) = loop {
        let path = dir.join(format!("{}{}.{}", DOWNLOAD_FILE_PREFIX, stamp, extension));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
            Err(err) => return Err(err.into()),
        }
    };

    let copied = io::copy(body, &mut file).and_then(|n| file.sync_all().map(|_| n));
    drop(file);
    let written = match copied {
        Ok(n) => n,
        Err(err) => {
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %remove_err, "partial download left behind");
            }
            return Err(err.into());
        }
    };
    info!(path = %path.display(), bytes = written, "response downloaded");
    Ok(path)
}

/// Id of the first `<api:document id="...">` element in an API response.
pub fn extract_document_id(text: &str) -> Option<&str> {
    let start = text.find(DOCUMENT_START)? + DOCUMENT_START.len();
    let rest = &text[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}
