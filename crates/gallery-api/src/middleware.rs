use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use gallery_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the JWT from the Authorization header, then hand
/// the claims to the handler as an `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = optional_claims(req.headers(), &state.jwt_secret)?
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Claims from a bearer token if one was sent. A token that is present but
/// invalid is still an error.
pub fn optional_claims(headers: &HeaderMap, secret: &str) -> Result<Option<Claims>, ApiError> {
    match headers.typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) => decode_token(secret, bearer.token()).map(Some),
        None => Ok(None),
    }
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))
}

/// The acting user for a mutating request. Clients may still send a
/// `user_id`; it has to match the token.
pub fn acting_user(claims: &Claims, claimed: Option<i64>) -> Result<i64, ApiError> {
    match claimed {
        Some(id) if id != claims.sub => Err(ApiError::Forbidden(
            "user_id does not match the authenticated user".into(),
        )),
        _ => Ok(claims.sub),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: i64) -> Claims {
        Claims {
            sub,
            username: "alice".into(),
            exp: usize::MAX,
        }
    }

    #[test]
    fn acting_user_accepts_matching_or_missing_id() {
        assert_eq!(acting_user(&claims(3), None).unwrap(), 3);
        assert_eq!(acting_user(&claims(3), Some(3)).unwrap(), 3);
    }

    #[test]
    fn acting_user_rejects_spoofed_id() {
        assert!(matches!(
            acting_user(&claims(3), Some(4)),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn optional_claims_without_header_is_none() {
        let headers = HeaderMap::new();
        assert!(optional_claims(&headers, "s").unwrap().is_none());
    }

    #[test]
    fn optional_claims_with_garbage_token_fails() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer not.a.jwt".parse().unwrap());
        assert!(optional_claims(&headers, "s").is_err());
    }
}
