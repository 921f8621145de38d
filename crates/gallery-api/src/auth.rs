use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use gallery_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

use crate::error::{ApiError, JsonBody};
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 80;
const MAX_EMAIL_LEN: usize = 120;

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    // Validate input
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Username must be 1-{} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !email.contains('@') || email.chars().count() > MAX_EMAIL_LEN {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&req.password))
        .await
        .map_err(|e| ApiError::Internal(format!("task join error: {}", e)))??;

    // The unique indexes decide; no read-before-write
    let (name, mail) = (username.clone(), email);
    let user_id = state
        .with_db(move |db| db.create_user(&name, &mail, &password_hash))
        .await
        .map_err(|e| match e {
            ApiError::Conflict(_) => ApiError::Conflict("User already exists".into()),
            other => other,
        })?;

    info!("User {} signed up as {}", user_id, username);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created!".into(),
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    let user = state
        .with_db(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid_credentials)?;

    let stored = user.password.clone();
    let password = req.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("task join error: {}", e)))??;

    if !valid {
        warn!("Failed login for user {}", user.id);
        return Err(invalid_credentials());
    }

    let token = create_token(&state.jwt_secret, user.id, &user.username, state.token_ttl_hours)?;

    Ok(Json(LoginResponse {
        message: "Success".into(),
        user_id: user.id,
        username: user.username,
        profile_pic: user.profile_pic,
        token,
    }))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".into())
}

/// Hash a password with Argon2id and a fresh random salt (PHC string).
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

/// `Ok(false)` on mismatch; `Err` only if the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    username: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
