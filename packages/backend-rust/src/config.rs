use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::services::review::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub practice_batch_size: usize,
    /// Refuse to seed a catalog whose prerequisite graph can strand steps
    pub strict_catalog: bool,
    pub catalog_seed_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let practice_batch_size = std::env::var("PRACTICE_BATCH_SIZE")
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
            .map(|size| size.clamp(1, MAX_BATCH_SIZE))
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let catalog_seed_path = std::env::var("CATALOG_SEED_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            log_level,
            practice_batch_size,
            strict_catalog: env_bool("STRICT_CATALOG").unwrap_or(false),
            catalog_seed_path,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            log_level: "info".to_string(),
            practice_batch_size: DEFAULT_BATCH_SIZE,
            strict_catalog: false,
            catalog_seed_path: None,
        }
    }
}

pub fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return None;
    }
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
