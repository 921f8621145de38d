use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

/// Serves the pre-built frontend bundle. Any path that is not a file in
/// the bundle gets `index.html` with a 200 so the client-side router can
/// take over.
pub fn spa_service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(dir.join("index.html")))
}
