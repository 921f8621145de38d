use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::ApiError;

/// Name of the multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "image";

pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// A fully-read `multipart/form-data` upload: at most one file under
/// [`FILE_FIELD`] plus plain text fields.
#[derive(Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == FILE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                // Browsers send an empty part when no file was chosen
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile { filename, data });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// A text field, trimmed; `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The optional `user_id` field some clients still send.
    pub fn user_id(&self) -> Result<Option<i64>, ApiError> {
        self.text("user_id")
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid user_id: {}", raw)))
            })
            .transpose()
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("No image".into()))
    }
}
