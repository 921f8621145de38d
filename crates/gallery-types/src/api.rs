use serde::{Deserialize, Serialize};

use crate::ids::{optional_id, parse_id};
use crate::models::LikeStatus;

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user_id: i64,
    pub username: String,
    pub profile_pic: Option<String>,
    pub token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicProfile {
    pub username: String,
    pub profile_pic: Option<String>,
    pub images: Vec<ImageSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilePicResponse {
    pub message: String,
    pub profile_pic: String,
}

// -- Images --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: i64,
    pub title: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub id: i64,
    pub filename: String,
}

/// One entry of the explore feed.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExploreImage {
    pub id: i64,
    pub title: String,
    pub filename: String,
    pub username: String,
    pub likes_count: i64,
    pub is_liked: bool,
    pub comments: Vec<CommentResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExploreQuery {
    pub q: Option<String>,
    /// Only a hint for `is_liked`; blank or malformed values are ignored.
    pub user_id: Option<String>,
}

impl ExploreQuery {
    pub fn viewer_hint(&self) -> Option<i64> {
        self.user_id
            .as_deref()
            .and_then(|raw| parse_id(raw).ok().flatten())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateImageRequest {
    pub title: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<i64>,
}

// -- Likes --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleLikeRequest {
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleLikeResponse {
    pub message: String,
    pub status: LikeStatus,
    pub likes_count: i64,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCommentRequest {
    pub text: String,
    #[serde(default, deserialize_with = "optional_id")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
