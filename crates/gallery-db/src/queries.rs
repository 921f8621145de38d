use crate::models::{CommentRow, FeedImageRow, ImageRow, UserRow};
use crate::{Database, Result};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;

const USER_COLUMNS: &str = "id, username, email, password, profile_pic, created_at";
const IMAGE_COLUMNS: &str = "id, title, filename, user_id, created_at";

impl Database {
    // -- Users --

    /// Inserts a user and returns its id. A taken username or email surfaces
    /// as `DbError::Conflict` straight from the unique index.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", &email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", &username))
    }

    /// Returns false when no such user exists.
    pub fn set_profile_pic(&self, user_id: i64, filename: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET profile_pic = ?1 WHERE id = ?2",
                params![filename, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Images --

    pub fn insert_image(&self, user_id: i64, title: &str, filename: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (title, filename, user_id) VALUES (?1, ?2, ?3)",
                params![title, filename, user_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1");
            let row = conn.query_row(&sql, [id], map_image).optional()?;
            Ok(row)
        })
    }

    pub fn list_images_by_user(&self, user_id: i64) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE user_id = ?1 ORDER BY id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_image)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Feed rows with uploader name and like count. With `search`, only
    /// images whose title contains it (case-insensitive); otherwise all of
    /// them, ordered by id.
    pub fn explore_images(&self, search: Option<&str>) -> Result<Vec<FeedImageRow>> {
        self.with_conn(|conn| query_feed(conn, search))
    }

    /// Returns false when the image does not exist.
    pub fn update_image_title(&self, image_id: i64, title: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE images SET title = ?1 WHERE id = ?2",
                params![title, image_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the image (likes and comments cascade) and returns the stored
    /// filename, or `None` when there was nothing to delete.
    pub fn delete_image(&self, image_id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let filename = conn
                .query_row(
                    "DELETE FROM images WHERE id = ?1 RETURNING filename",
                    [image_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(filename)
        })
    }

    // -- Likes --

    /// Flip the like state for (user, image) atomically.
    /// Returns (liked, like_count) as seen after the flip.
    pub fn toggle_like(&self, user_id: i64, image_id: i64) -> Result<(bool, i64)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND image_id = ?2",
                params![user_id, image_id],
            )?;

            let liked = if removed > 0 {
                false
            } else {
                tx.execute(
                    "INSERT INTO likes (user_id, image_id) VALUES (?1, ?2)
                     ON CONFLICT(user_id, image_id) DO NOTHING",
                    params![user_id, image_id],
                )?;
                true
            };

            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM likes WHERE image_id = ?1",
                [image_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok((liked, count))
        })
    }

    /// Ids of every image the user has liked.
    pub fn liked_image_ids(&self, user_id: i64) -> Result<HashSet<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT image_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<i64>, _>>()?;
            Ok(ids)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, user_id: i64, image_id: i64, text: &str) -> Result<CommentRow> {
        self.with_conn(|conn| {
            let (id, created_at): (i64, String) = conn.query_row(
                "INSERT INTO comments (text, user_id, image_id) VALUES (?1, ?2, ?3)
                 RETURNING id, created_at",
                params![text, user_id, image_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let (username, profile_pic): (String, Option<String>) = conn.query_row(
                "SELECT username, profile_pic FROM users WHERE id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(CommentRow {
                id,
                image_id,
                text: text.to_string(),
                username,
                profile_pic,
                created_at,
            })
        })
    }

    /// Comments on every image the feed would return for `search`, oldest
    /// first.
    pub fn feed_comments(&self, search: Option<&str>) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author in the same query
            let base = "SELECT c.id, c.image_id, c.text, u.username, u.profile_pic, c.created_at
                        FROM comments c
                        JOIN users u ON c.user_id = u.id
                        JOIN images i ON c.image_id = i.id";

            query_filtered(conn, base, "c.created_at, c.id", search, |row| {
                Ok(CommentRow {
                    id: row.get(0)?,
                    image_id: row.get(1)?,
                    text: row.get(2)?,
                    username: row.get(3)?,
                    profile_pic: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &dyn ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn
        .query_row(&sql, params![value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                profile_pic: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_feed(conn: &Connection, search: Option<&str>) -> Result<Vec<FeedImageRow>> {
    let base = "SELECT i.id, i.title, i.filename, u.username,
                       (SELECT COUNT(*) FROM likes l WHERE l.image_id = i.id)
                FROM images i
                JOIN users u ON i.user_id = u.id";

    query_filtered(conn, base, "i.id", search, |row| {
        Ok(FeedImageRow {
            id: row.get(0)?,
            title: row.get(1)?,
            filename: row.get(2)?,
            username: row.get(3)?,
            likes_count: row.get(4)?,
        })
    })
}

/// Runs `base` (which must alias images as `i`), narrowed to titles
/// containing `search` when given. At most one bound parameter, whatever
/// the size of the gallery.
fn query_filtered<T, F>(
    conn: &Connection,
    base: &str,
    order_by: &str,
    search: Option<&str>,
    map: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let rows = match search {
        Some(term) => {
            let sql = format!(
                "{base} WHERE lower(i.title) LIKE '%' || lower(?1) || '%' ESCAPE '\\' ORDER BY {order_by}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([escape_like(term)], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let sql = format!("{base} ORDER BY {order_by}");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(rows)
}

fn map_image(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        title: row.get(1)?,
        filename: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Escape LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;

    fn db_with_user() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let uid = db.create_user("alice", "alice@example.com", "hash").unwrap();
        (db, uid)
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let (db, _) = db_with_user();

        let same_name = db.create_user("alice", "other@example.com", "hash");
        assert!(matches!(same_name, Err(DbError::Conflict(_))));

        let same_email = db.create_user("bob", "alice@example.com", "hash");
        assert!(matches!(same_email, Err(DbError::Conflict(_))));

        let count: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn user_lookups() {
        let (db, uid) = db_with_user();
        assert_eq!(db.get_user_by_email("alice@example.com").unwrap().unwrap().id, uid);
        assert_eq!(db.get_user_by_id(uid).unwrap().unwrap().username, "alice");
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
        assert!(db.get_user_by_id(999).unwrap().is_none());
    }

    #[test]
    fn set_profile_pic_reports_missing_user() {
        let (db, uid) = db_with_user();
        assert!(db.set_profile_pic(uid, "profile_1_me.png").unwrap());
        assert!(!db.set_profile_pic(999, "x.png").unwrap());
        assert_eq!(
            db.get_user_by_id(uid).unwrap().unwrap().profile_pic.as_deref(),
            Some("profile_1_me.png")
        );
    }

    #[test]
    fn image_for_unknown_user_is_missing_reference() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_image(42, "Sunset", "sunset.png");
        assert!(matches!(result, Err(DbError::MissingReference(_))));
    }

    #[test]
    fn toggle_like_twice_restores_state() {
        let (db, uid) = db_with_user();
        let img = db.insert_image(uid, "Sunset", "sunset.png").unwrap();

        assert_eq!(db.toggle_like(uid, img).unwrap(), (true, 1));
        assert_eq!(db.toggle_like(uid, img).unwrap(), (false, 0));
        assert_eq!(db.toggle_like(uid, img).unwrap(), (true, 1));
    }

    #[test]
    fn toggle_like_on_missing_image_fails() {
        let (db, uid) = db_with_user();
        let result = db.toggle_like(uid, 77);
        assert!(matches!(result, Err(DbError::MissingReference(_))));
    }

    #[test]
    fn liked_image_ids_only_returns_likes_of_that_user() {
        let (db, alice) = db_with_user();
        let bob = db.create_user("bob", "bob@example.com", "hash").unwrap();
        let a = db.insert_image(alice, "A", "a.png").unwrap();
        let b = db.insert_image(alice, "B", "b.png").unwrap();
        db.toggle_like(alice, a).unwrap();
        db.toggle_like(bob, b).unwrap();

        let liked = db.liked_image_ids(alice).unwrap();
        assert!(liked.contains(&a));
        assert!(!liked.contains(&b));

        let carol = db.create_user("carol", "carol@example.com", "hash").unwrap();
        assert!(db.liked_image_ids(carol).unwrap().is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let (db, uid) = db_with_user();
        db.insert_image(uid, "Mountain Sunset", "m.png").unwrap();
        db.insert_image(uid, "City at night", "c.png").unwrap();

        let hits = db.explore_images(Some("sUnSeT")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Mountain Sunset");
        assert_eq!(hits[0].username, "alice");

        assert_eq!(db.explore_images(None).unwrap().len(), 2);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let (db, uid) = db_with_user();
        db.insert_image(uid, "100% cotton", "a.png").unwrap();
        db.insert_image(uid, "plain", "b.png").unwrap();

        let hits = db.explore_images(Some("%")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% cotton");
        assert!(db.explore_images(Some("_")).unwrap().is_empty());
    }

    #[test]
    fn delete_image_cascades_to_likes_and_comments() {
        let (db, uid) = db_with_user();
        let img = db.insert_image(uid, "Sunset", "sunset.png").unwrap();
        db.toggle_like(uid, img).unwrap();
        db.insert_comment(uid, img, "nice").unwrap();

        assert_eq!(db.delete_image(img).unwrap().as_deref(), Some("sunset.png"));
        assert!(db.get_image(img).unwrap().is_none());
        assert!(db.delete_image(img).unwrap().is_none());

        let (likes, comments): (i64, i64) = db
            .with_conn(|c| {
                let likes = c.query_row("SELECT COUNT(*) FROM likes", [], |r| r.get(0))?;
                let comments = c.query_row("SELECT COUNT(*) FROM comments", [], |r| r.get(0))?;
                Ok((likes, comments))
            })
            .unwrap();
        assert_eq!((likes, comments), (0, 0));
    }

    #[test]
    fn update_title_reports_missing_image() {
        let (db, uid) = db_with_user();
        let img = db.insert_image(uid, "Old", "o.png").unwrap();
        assert!(db.update_image_title(img, "New").unwrap());
        assert!(!db.update_image_title(img + 1, "New").unwrap());
        assert_eq!(db.get_image(img).unwrap().unwrap().title, "New");
    }

    #[test]
    fn comments_carry_author_and_group_by_image() {
        let (db, uid) = db_with_user();
        db.set_profile_pic(uid, "me.png").unwrap();
        let a = db.insert_image(uid, "A", "a.png").unwrap();
        let b = db.insert_image(uid, "B", "b.png").unwrap();

        let first = db.insert_comment(uid, a, "first").unwrap();
        assert_eq!(first.username, "alice");
        assert_eq!(first.profile_pic.as_deref(), Some("me.png"));
        assert!(!first.created_at.is_empty());
        db.insert_comment(uid, a, "second").unwrap();
        db.insert_comment(uid, b, "other").unwrap();

        let rows = db.feed_comments(Some("a")).unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert!(rows.iter().all(|r| r.image_id == a));

        let all = db.feed_comments(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|r| r.image_id == b).count(), 1);
    }

    #[test]
    fn feed_queries_scale_past_the_bind_variable_limit() {
        let (db, uid) = db_with_user();
        db.with_conn(|c| {
            c.execute(
                "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 33000)
                 INSERT INTO images (title, filename, user_id)
                 SELECT 'img ' || x, 'img' || x || '.png', ?1 FROM n",
                [uid],
            )?;
            Ok(())
        })
        .unwrap();
        let last = db.insert_image(uid, "last", "last.png").unwrap();
        db.toggle_like(uid, last).unwrap();
        db.insert_comment(uid, last, "hi").unwrap();

        assert_eq!(db.explore_images(None).unwrap().len(), 33001);
        assert_eq!(db.liked_image_ids(uid).unwrap().len(), 1);
        assert_eq!(db.feed_comments(None).unwrap().len(), 1);
        assert_eq!(db.feed_comments(Some("img")).unwrap().len(), 0);
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like(r"50%_a\b"), r"50\%\_a\\b");
    }
}
