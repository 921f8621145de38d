use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use gallery_db::Database;

use crate::error::ApiError;
use crate::storage::Storage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Root of the pre-built frontend bundle (contains `index.html`).
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppStateInner {
    /// Run a database closure off the async runtime.
    pub async fn with_db<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> gallery_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&state.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(format!("task join error: {}", e))
            })?
            .map_err(ApiError::from)
    }
}
