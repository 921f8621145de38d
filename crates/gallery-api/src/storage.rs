use std::path::PathBuf;

use tokio::fs;
use tracing::{info, warn};

use crate::error::ApiError;

/// Upload extensions accepted for images and profile pictures.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Manages uploaded files on disk.
///
/// Every upload is a flat file at `{dir}/{filename}`; `filename` is always
/// a sanitized name, so nothing can escape `dir`.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    pub async fn save(&self, filename: &str, data: &[u8]) -> std::io::Result<()> {
        fs::write(self.file_path(filename), data).await?;
        info!("Stored upload {} ({} bytes)", filename, data.len());
        Ok(())
    }

    /// Opens a stored file for streaming. `None` if it does not exist.
    pub async fn open(&self, filename: &str) -> std::io::Result<Option<fs::File>> {
        match fs::File::open(self.file_path(filename)).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deletes a stored file. An already-missing file is only a warning.
    pub async fn delete(&self, filename: &str) -> std::io::Result<()> {
        match fs::remove_file(self.file_path(filename)).await {
            Ok(()) => {
                info!("Deleted upload {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Reduce a client-supplied filename to `[A-Za-z0-9._-]`.
///
/// Path separators and whitespace become `_`, other characters are
/// dropped, and leading/trailing dots and underscores are stripped, so
/// `../../etc/passwd` becomes `etc_passwd`. May return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    spaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Sanitize an uploaded filename and check its extension.
pub fn checked_filename(original: &str) -> Result<String, ApiError> {
    let sanitized = sanitize_filename(original);
    if sanitized.is_empty() {
        return Err(ApiError::BadRequest("Invalid filename".into()));
    }
    if !allowed_file(&sanitized) {
        return Err(ApiError::BadRequest(format!(
            "File type not allowed (expected one of: {})",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(sanitized)
}
