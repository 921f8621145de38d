use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{error, info, warn};

use gallery_types::api::{Claims, ImageSummary, ProfilePicResponse, PublicProfile, UserDetails};

use crate::error::{ApiError, PathParam};
use crate::form::UploadForm;
use crate::middleware::acting_user;
use crate::state::AppState;
use crate::storage::checked_filename;

/// GET /user_details/{user_id}
pub async fn user_details(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): PathParam<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .with_db(move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(UserDetails {
        id: user.id,
        username: user.username,
        email: user.email,
        profile_pic: user.profile_pic,
    }))
}

/// GET /profile/{username}: public profile with the user's images.
pub async fn profile(
    State(state): State<AppState>,
    WithRejection(Path(username), _): PathParam<String>,
) -> Result<impl IntoResponse, ApiError> {
    let found = state
        .with_db(move |db| {
            let Some(user) = db.get_user_by_username(&username)? else {
                return Ok(None);
            };
            let images = db.list_images_by_user(user.id)?;
            Ok(Some((user, images)))
        })
        .await?;

    let (user, images) = found.ok_or_else(|| ApiError::NotFound("Not found".into()))?;

    Ok(Json(PublicProfile {
        username: user.username,
        profile_pic: user.profile_pic,
        images: images
            .into_iter()
            .map(|i| ImageSummary {
                id: i.id,
                title: i.title,
                filename: i.filename,
            })
            .collect(),
    }))
}

/// POST /upload_profile_pic: multipart `image`; stored as
/// `profile_{user_id}_{name}` and recorded on the user. The previous
/// picture is removed once the new one is in place.
pub async fn upload_profile_pic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = UploadForm::read(multipart).await?;
    let user_id = acting_user(&claims, form.user_id()?)?;
    let file = form.take_file()?;

    let sanitized = checked_filename(&file.filename)?;
    let filename = format!("profile_{}_{}", user_id, sanitized);

    let previous = state
        .with_db(move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(user_not_found)?
        .profile_pic;

    state.storage.save(&filename, &file.data).await?;

    let stored = filename.clone();
    let updated = state
        .with_db(move |db| db.set_profile_pic(user_id, &stored))
        .await;

    let outcome = match updated {
        Ok(true) => Ok(()),
        Ok(false) => Err(user_not_found()),
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        if let Err(rm) = state.storage.delete(&filename).await {
            error!("Failed to remove {} after failed update: {}", filename, rm);
        }
        return Err(e);
    }

    // Same name means the file was overwritten in place
    if let Some(old) = previous.filter(|old| *old != filename) {
        if let Err(e) = state.storage.delete(&old).await {
            warn!("Failed to remove old profile picture {}: {}", old, e);
        }
    }

    info!("User {} set profile picture {}", user_id, filename);

    Ok(Json(ProfilePicResponse {
        message: "Updated".into(),
        profile_pic: filename,
    }))
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}
