use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::StreamExt;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::media::UploadedFile;

const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Text fields plus at most one uploaded file from a `multipart/form-data` body.
///
/// The first part carrying a non-empty filename is the upload, whatever its
/// field name (`file`, `productImage`, `heroVideo`). Browsers send an empty
/// file part when nothing was picked; those are skipped.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut payload: Multipart, max_file_bytes: usize) -> ApiResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(item) = payload.next().await {
            let mut field = item?;
            let disposition = field.content_disposition().clone();
            let name = disposition.get_name().unwrap_or_default().to_string();
            let filename = disposition.get_filename().map(str::to_string);
            let content_type = field
                .content_type()
                .map(|mime| mime.essence_str().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let limit = if filename.is_some() {
                max_file_bytes
            } else {
                MAX_TEXT_FIELD_BYTES
            };
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if bytes.len() + chunk.len() > limit {
                    return Err(ApiError::InvalidInput(format!(
                        "field '{}' exceeds the {} byte limit",
                        name, limit
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }

            match filename {
                Some(filename) if filename.is_empty() && bytes.is_empty() => {}
                Some(filename) => {
                    if form.file.is_some() {
                        debug!(field = %name, "ignoring additional file part");
                        continue;
                    }
                    form.file = Some(UploadedFile {
                        field: name,
                        filename,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let value = String::from_utf8(bytes).map_err(|_| {
                        ApiError::InvalidInput(format!("field '{}' is not valid UTF-8", name))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed value of a text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn take_file(&mut self) -> Option<UploadedFile> {
        self.file.take()
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}
