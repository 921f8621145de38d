use rusqlite::ffi;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    #[error("Constraint conflict: {0}")]
    Conflict(String),

    /// A FOREIGN KEY constraint rejected the write.
    #[error("Referenced row does not exist: {0}")]
    MissingReference(String),

    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DB lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = err {
            let detail = msg.clone().unwrap_or_else(|| code.to_string());
            match code.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return DbError::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return DbError::MissingReference(detail);
                }
                _ => {}
            }
        }
        DbError::Sqlite(err)
    }
}
