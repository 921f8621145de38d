//! Server configuration, read from `GALLERY_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Where uploads are written; kept apart from the frontend bundle.
    pub upload_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GALLERY_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let jwt_secret = lookup("GALLERY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let max_upload_mb: usize = parse(&lookup, "GALLERY_MAX_UPLOAD_MB", 32)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::Invalid {
                name: "GALLERY_MAX_UPLOAD_MB",
                value: max_upload_mb.to_string(),
            })?;

        Ok(Self {
            host: var("GALLERY_HOST", "0.0.0.0"),
            port: parse(&lookup, "GALLERY_PORT", 5000)?,
            db_path: var("GALLERY_DB_PATH", "database.db").into(),
            upload_dir: var("GALLERY_UPLOAD_DIR", "static/uploads").into(),
            frontend_dir: var("GALLERY_FRONTEND_DIR", "build").into(),
            jwt_secret,
            token_ttl_hours: parse(&lookup, "GALLERY_TOKEN_TTL_HOURS", 720)?,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "GALLERY_HOST",
            value: raw,
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
