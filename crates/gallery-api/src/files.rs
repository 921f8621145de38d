use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, PathParam};
use crate::state::AppState;
use crate::storage::sanitize_filename;

/// GET /static/uploads/{filename}: streams a stored upload back.
pub async fn serve_upload(
    State(state): State<AppState>,
    WithRejection(Path(filename), _): PathParam<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Stored names are always sanitized; anything else cannot exist
    if filename.is_empty() || sanitize_filename(&filename) != filename {
        return Err(not_found(&filename));
    }

    let file = state
        .storage
        .open(&filename)
        .await?
        .ok_or_else(|| not_found(&filename))?;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(file));

    Ok(([(header::CONTENT_TYPE, mime.as_ref().to_string())], body))
}

fn not_found(filename: &str) -> ApiError {
    ApiError::NotFound(format!("File {} not found", filename))
}
