use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use rand::seq::SliceRandom;
use tracing::{error, info};
use uuid::Uuid;

use gallery_types::api::{
    Claims, CommentResponse, ExploreImage, ExploreQuery, ImageSummary, MessageResponse,
    UpdateImageRequest, UploadResponse,
};

use crate::comments::comment_response;
use crate::error::{ApiError, JsonBody, PathParam, QueryParams};
use crate::form::UploadForm;
use crate::middleware::{acting_user, optional_claims};
use crate::state::AppState;
use crate::storage::checked_filename;

const MAX_TITLE_LEN: usize = 100;

/// POST /upload: multipart `image` + `title`; writes the file, then the row.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let user_id = acting_user(&claims, form.user_id()?)?;
    let title = validate_title(form.text("title"))?;
    let file = form.take_file()?;

    let sanitized = checked_filename(&file.filename)?;
    let filename = format!("{}_{}", Uuid::new_v4().simple(), sanitized);

    state.storage.save(&filename, &file.data).await?;

    let stored = filename.clone();
    let inserted = state
        .with_db(move |db| db.insert_image(user_id, &title, &stored))
        .await;

    let image_id = match inserted {
        Ok(id) => id,
        Err(e) => {
            // Don't leave an orphaned upload behind
            if let Err(rm) = state.storage.delete(&filename).await {
                error!("Failed to remove {} after insert error: {}", filename, rm);
            }
            return Err(e);
        }
    };

    info!("User {} uploaded image {} ({})", user_id, image_id, filename);

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Uploaded".into(),
            id: image_id,
            filename,
        }),
    ))
}

/// GET /explore?q=&user_id=
///
/// With `q`, a case-insensitive title search; without it, every image in a
/// fresh random order. `is_liked` is relative to the bearer token's user,
/// falling back to the `user_id` query parameter.
pub async fn explore(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Query(query), _): QueryParams<ExploreQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = optional_claims(&headers, &state.jwt_secret)?
        .map(|c| c.sub)
        .or_else(|| query.viewer_hint());

    let search = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    let shuffle = search.is_none();

    let (mut rows, liked, comment_rows) = state
        .with_db(move |db| {
            let rows = db.explore_images(search.as_deref())?;
            let liked = match viewer {
                Some(uid) => db.liked_image_ids(uid)?,
                None => Default::default(),
            };
            let comments = db.feed_comments(search.as_deref())?;
            Ok((rows, liked, comments))
        })
        .await?;

    if shuffle {
        rows.shuffle(&mut rand::rng());
    }

    let mut comments: HashMap<i64, Vec<CommentResponse>> = HashMap::new();
    for row in comment_rows {
        comments
            .entry(row.image_id)
            .or_default()
            .push(comment_response(row));
    }

    let images: Vec<ExploreImage> = rows
        .into_iter()
        .map(|row| ExploreImage {
            is_liked: liked.contains(&row.id),
            comments: comments.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            filename: row.filename,
            username: row.username,
            likes_count: row.likes_count,
        })
        .collect();

    Ok(Json(images))
}

/// GET /my_images/{user_id}
pub async fn my_images(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .with_db(move |db| db.list_images_by_user(user_id))
        .await?;

    let images: Vec<ImageSummary> = rows
        .into_iter()
        .map(|row| ImageSummary {
            id: row.id,
            title: row.title,
            filename: row.filename,
        })
        .collect();

    Ok(Json(images))
}

/// PUT /update_image/{image_id}: owner-only title change.
pub async fn update_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(image_id), _): PathParam<i64>,
    WithRejection(Json(req), _): JsonBody<UpdateImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = acting_user(&claims, req.user_id)?;
    let title = validate_title(Some(&req.title))?;

    let image = state
        .with_db(move |db| db.get_image(image_id))
        .await?
        .ok_or_else(|| image_not_found(image_id))?;

    if image.user_id != user_id {
        return Err(ApiError::Forbidden("Unauthorized".into()));
    }

    let updated = state
        .with_db(move |db| db.update_image_title(image_id, &title))
        .await?;
    if !updated {
        return Err(image_not_found(image_id));
    }

    Ok(Json(MessageResponse::new("Updated")))
}

/// DELETE /delete/{image_id}: owner-only. The file goes first so a
/// filesystem failure leaves the row (and the listing) intact.
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(image_id), _): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state
        .with_db(move |db| db.get_image(image_id))
        .await?
        .ok_or_else(|| image_not_found(image_id))?;

    if image.user_id != claims.sub {
        return Err(ApiError::Forbidden("Unauthorized".into()));
    }

    state.storage.delete(&image.filename).await.map_err(|e| {
        error!("Failed to delete file {} for image {}: {}", image.filename, image_id, e);
        ApiError::from(e)
    })?;

    state
        .with_db(move |db| db.delete_image(image_id))
        .await?
        .ok_or_else(|| image_not_found(image_id))?;

    info!("User {} deleted image {}", claims.sub, image_id);

    Ok(Json(MessageResponse::new("Deleted")))
}

fn validate_title(title: Option<&str>) -> Result<String, ApiError> {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

pub(crate) fn image_not_found(image_id: i64) -> ApiError {
    ApiError::NotFound(format!("Image {} not found", image_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(validate_title(Some("  Sunset ")).unwrap(), "Sunset");
        assert!(validate_title(None).is_err());
        assert!(validate_title(Some("   ")).is_err());
        assert!(validate_title(Some(&"x".repeat(MAX_TITLE_LEN))).is_ok());
        assert!(validate_title(Some(&"x".repeat(MAX_TITLE_LEN + 1))).is_err());
    }
}
