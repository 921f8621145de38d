use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use gallery_db::models::CommentRow;
use gallery_types::api::{AddCommentRequest, Claims, CommentResponse};

use crate::error::{ApiError, JsonBody, PathParam};
use crate::images::image_not_found;
use crate::middleware::acting_user;
use crate::state::AppState;

const MAX_COMMENT_LEN: usize = 500;

/// POST /comment/{image_id}: returns the stored comment with its author so
/// the client can render it immediately.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(image_id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = acting_user(&claims, req.user_id)?;

    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Comment text is required".into()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::BadRequest(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }

    let row = state
        .with_db(move |db| db.insert_comment(user_id, image_id, &text))
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => image_not_found(image_id),
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(comment_response(row))))
}

pub(crate) fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        created_at: parse_timestamp(&row.created_at).unwrap_or_else(|| {
            warn!("Corrupt created_at '{}' on comment {}", row.created_at, row.id);
            DateTime::default()
        }),
        id: row.id,
        text: row.text,
        username: row.username,
        profile_pic: row.profile_pic,
    }
}

/// SQLite's `datetime('now')` yields "YYYY-MM-DD HH:MM:SS" without a zone;
/// treat it as UTC. RFC 3339 is accepted as well.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_and_rfc3339_timestamps() {
        let ts = parse_timestamp("2024-03-01 12:30:45").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 1));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (12, 30, 45));

        assert!(parse_timestamp("2024-03-01T12:30:45Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
