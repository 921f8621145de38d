/// Database row types. These map directly to SQLite rows and stay
/// independent of the wire types in gallery-types.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_pic: Option<String>,
    pub created_at: String,
}

pub struct ImageRow {
    pub id: i64,
    pub title: String,
    pub filename: String,
    pub user_id: i64,
    pub created_at: String,
}

/// An image joined with its uploader and like count, as shown in the feed.
pub struct FeedImageRow {
    pub id: i64,
    pub title: String,
    pub filename: String,
    pub username: String,
    pub likes_count: i64,
}

pub struct CommentRow {
    pub id: i64,
    pub image_id: i64,
    pub text: String,
    pub username: String,
    pub profile_pic: Option<String>,
    pub created_at: String,
}
