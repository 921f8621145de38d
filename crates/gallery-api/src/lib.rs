//! HTTP layer of the gallery: request handlers, auth middleware, upload
//! storage and the router that ties them to a [`state::AppState`].

pub mod auth;
pub mod comments;
pub mod error;
pub mod files;
pub mod form;
pub mod frontend;
pub mod images;
pub mod likes;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;

/// Builds the full application router.
///
/// Reads are public. Every mutating route sits behind `require_auth`, and
/// anything unmatched falls through to the frontend bundle.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/user_details/{user_id}", get(users::user_details))
        .route("/profile/{username}", get(users::profile))
        .route("/explore", get(images::explore))
        .route("/images", get(images::explore))
        .route("/my_images/{user_id}", get(images::my_images))
        .route("/static/uploads/{filename}", get(files::serve_upload));

    let protected_routes = Router::new()
        .route("/upload", post(images::upload_image))
        .route("/upload_profile_pic", post(users::upload_profile_pic))
        .route("/update_image/{image_id}", put(images::update_image))
        .route("/delete/{image_id}", delete(images::delete_image))
        .route("/like/{image_id}", post(likes::toggle_like))
        .route("/comment/{image_id}", post(comments::add_comment))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback_service(frontend::spa_service(&state.frontend_dir))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
