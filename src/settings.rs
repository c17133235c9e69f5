use anyhow::{bail, Context};
use std::path::PathBuf;

pub const MIN_SECRET_LEN: usize = 32;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// In-memory snapshot directory; `None` keeps the store purely in memory.
    pub data_dir: Option<PathBuf>,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. The JWT secret is only checked here;
    /// the `Auth` extractor reads it from the environment per request.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        match get("JWT_SECRET") {
            None => bail!("JWT_SECRET must be set"),
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long")
            }
            Some(_) => {}
        }

        let port = match get("FOROHUB_PORT") {
            Some(v) => v.parse().with_context(|| format!("FOROHUB_PORT is not a port number: {v}"))?,
            None => 8080,
        };
        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 5,
        };

        Ok(Self {
            host: get("FOROHUB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL"),
            db_max_connections,
            data_dir: get("FOROHUB_DATA_DIR").map(PathBuf::from),
            frontend_url: get("FRONTEND_URL"),
            enable_hsts: get("ENABLE_HSTS").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        })
    }
}
