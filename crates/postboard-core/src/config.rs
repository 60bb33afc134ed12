use home::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};

use crate::{
    constant::{
        CONFIG_DIR, CONFIG_ENV, CONFIG_FILE, DEFAULT_MAX_VISIBLE_PAGES, DEFAULT_PAGE_SIZE,
        DEFAULT_USERS_STALE_SECS,
    },
    PostboardError, PostboardResult,
};

const DB_NAME: &str = "postboard.db";

/// Settings for both binaries. Every field has a default, so an empty (or
/// missing) config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PostboardConfig {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address used to serve. Should be <ip>:<port>
    /// Example: 127.0.0.1:3001
    pub socket: SocketAddr,
    /// Path to sqlite Db.
    pub db: PathBuf,
    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base url of the postboard server.
    pub api_url: String,
    pub page_size: u32,
    pub max_visible_pages: u32,
    /// How long a users page or the users count is served without refetching.
    pub users_stale_secs: u64,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 3001),
            db: config_dir().join(DB_NAME),
            log_level: "info".into(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_visible_pages: DEFAULT_MAX_VISIBLE_PAGES,
            users_stale_secs: DEFAULT_USERS_STALE_SECS,
            request_timeout_secs: 10,
            log_level: "warn".into(),
        }
    }
}

impl ClientConfig {
    pub fn users_stale_time(&self) -> Duration {
        Duration::from_secs(self.users_stale_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `~/.postboard`, or `./.postboard` when there is no home directory.
pub fn config_dir() -> PathBuf {
    home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join(CONFIG_DIR)
}

impl PostboardConfig {
    /// Where the config is looked up: the explicit path, then the
    /// `POSTBOARDCONF` env var, then `~/.postboard/postboard.toml`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| config_dir().join(CONFIG_FILE))
    }

    /// Load the config. A missing file at the default location yields the
    /// defaults; a missing file that was asked for explicitly is an error.
    pub fn load(explicit: Option<PathBuf>) -> PostboardResult<Self> {
        let was_explicit = explicit.is_some() || std::env::var_os(CONFIG_ENV).is_some();
        let path = Self::resolve_path(explicit);
        if !path.try_exists()? {
            if was_explicit {
                return Err(PostboardError::config_error(format!(
                    "config file {} does not exist",
                    path.display()
                ))
                .into());
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let config = Self::from_file(&path)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PostboardResult<Self> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> PostboardResult<Self> {
        toml::from_str(buf)
            .map_err(|err| PostboardError::config_error(err.message().to_string()).into())
    }

    /// Write the config to path
    pub fn save(&self, path: &Path) -> PostboardResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PostboardConfig::parse("").unwrap();
        assert_eq!(config, PostboardConfig::default());
        assert_eq!(config.client.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.server.socket.port(), 3001);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PostboardConfig::parse(
            r#"
            [server]
            socket = "0.0.0.0:8080"

            [client]
            page_size = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.socket.port(), 8080);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.client.page_size, 10);
        assert_eq!(config.client.max_visible_pages, DEFAULT_MAX_VISIBLE_PAGES);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = PostboardConfig::parse("[client]\npage_size = \"ten\"").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PostboardError>(),
            Some(PostboardError::ConfigError { .. })
        ));
    }

    #[test]
    fn save_then_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = PostboardConfig::default();
        config.client.api_url = "http://example.test:9000".into();
        config.save(&path).unwrap();

        let loaded = PostboardConfig::load(Some(path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PostboardConfig::load(Some(dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
