use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use gallery_types::api::{Claims, ToggleLikeRequest, ToggleLikeResponse};
use gallery_types::models::LikeStatus;

use crate::error::{ApiError, PathParam};
use crate::images::image_not_found;
use crate::middleware::acting_user;
use crate::state::AppState;

/// POST /like/{image_id}: flips the caller's like on the image.
///
/// The JSON body (`{"user_id": ..}`) is optional; a request without a JSON
/// content type is treated as an empty one.
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(image_id), _): PathParam<i64>,
    WithRejection(body, _): WithRejection<Option<Json<ToggleLikeRequest>>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let user_id = acting_user(&claims, req.user_id)?;

    let (liked, likes_count) = state
        .with_db(move |db| db.toggle_like(user_id, image_id))
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => image_not_found(image_id),
            other => other,
        })?;

    let status = LikeStatus::from_liked(liked);
    Ok(Json(ToggleLikeResponse {
        message: status.message().into(),
        status,
        likes_count,
    }))
}
