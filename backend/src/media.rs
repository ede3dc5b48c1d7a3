use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// URL prefix under which disk-stored uploads are served.
pub const UPLOADS_URL_PREFIX: &str = "uploads";

/// How an uploaded file is turned into the reference written to the documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaStrategy {
    /// Inline the bytes as a `data:` URI.
    #[default]
    Inline,
    /// Write the bytes under the uploads directory and store a relative path.
    Disk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.content_type)
    }

    pub fn require(&self, kind: MediaKind) -> ApiResult<()> {
        if self.kind() == kind {
            return Ok(());
        }
        let expected = match kind {
            MediaKind::Image => "an image",
            MediaKind::Video => "a video",
            MediaKind::Other => "a file",
        };
        Err(ApiError::InvalidInput(format!(
            "'{}' ({}) is not {}",
            self.filename, self.content_type, expected
        )))
    }
}

pub struct MediaStore {
    strategy: MediaStrategy,
    uploads_dir: PathBuf,
}

impl MediaStore {
    pub fn new(strategy: MediaStrategy, uploads_dir: impl Into<PathBuf>) -> Self {
        MediaStore {
            strategy,
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn strategy(&self) -> MediaStrategy {
        self.strategy
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Persists `file` according to the strategy and returns its reference.
    pub async fn store(&self, file: &UploadedFile) -> ApiResult<String> {
        match self.strategy {
            MediaStrategy::Inline => Ok(data_uri(&file.content_type, &file.bytes)),
            MediaStrategy::Disk => {
                fs::create_dir_all(&self.uploads_dir).await?;
                let name = stored_name(&file.filename);
                fs::write(self.uploads_dir.join(&name), &file.bytes).await?;
                debug!(field = %file.field, file = %name, bytes = file.bytes.len(), "upload written to disk");
                Ok(format!("{}/{}", UPLOADS_URL_PREFIX, name))
            }
        }
    }
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, general_purpose::STANDARD.encode(bytes))
}

fn stored_name(original: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        &token[..8],
        sanitize_filename(original)
    )
}

/// Keeps the last path component and replaces anything outside `[A-Za-z0-9._-]`.
pub fn sanitize_filename(original: &str) -> String {
    let base = original.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
