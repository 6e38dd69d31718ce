use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbMode {
    /// Process-local maps; nothing survives a restart
    Memory,
    Sqlite,
}

impl DbMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(DbMode::Memory),
            "sqlite" => Some(DbMode::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub mode: DbMode,
    pub sqlite: SqliteConfig,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbConfigError> {
        let mode = match std::env::var("DB_MODE") {
            Ok(raw) if !raw.trim().is_empty() => {
                DbMode::parse(&raw).ok_or(DbConfigError::Invalid { key: "DB_MODE", value: raw })?
            }
            _ => DbMode::Sqlite,
        };

        Ok(Self {
            mode,
            sqlite: SqliteConfig::from_env()?,
        })
    }

    pub fn memory() -> Self {
        Self {
            mode: DbMode::Memory,
            sqlite: SqliteConfig::at(default_sqlite_path()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }

    fn from_env() -> Result<Self, DbConfigError> {
        let path = std::env::var("SQLITE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|raw| resolve_path(&raw))
            .unwrap_or_else(default_sqlite_path);

        let max_connections = env_parse("SQLITE_MAX_CONNECTIONS", 5u32)?;
        if max_connections == 0 {
            return Err(DbConfigError::Invalid {
                key: "SQLITE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }
        let busy_timeout_secs = env_parse("SQLITE_BUSY_TIMEOUT_SECS", 30u64)?;

        Ok(Self {
            path,
            max_connections,
            busy_timeout: Duration::from_secs(busy_timeout_secs),
        })
    }
}

#[derive(Debug, Error)]
pub enum DbConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

pub fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pathway")
        .join("progress.db")
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, DbConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| DbConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn resolve_path(value: &str) -> PathBuf {
    let raw = Path::new(value.trim());
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(raw))
        .unwrap_or_else(|_| raw.to_path_buf())
}
