// Copyright 2026 PromptHub Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Three-tier configuration: TOML file, then `PROMPTHUB_*` environment
//! variables (env wins), then hard defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub server: HttpServerConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Reserved for a future persistent backend; the in-memory stores ignore
    /// it today.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,

    #[serde(default = "default_call_log_capacity")]
    pub call_log_channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// `key:caller_id:project_id` entries. An empty list disables auth
    /// entirely (development mode).
    #[serde(default)]
    pub api_keys: Vec<String>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8089".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_enable_cors() -> bool {
    true
}
fn default_max_page_size() -> u32 {
    prompthub_core::model::MAX_PAGE_SIZE
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./prompthub-data")
}
fn default_cache_ttl_secs() -> u64 {
    prompthub_engine::DEFAULT_CACHE_TTL.as_secs()
}
fn default_cache_capacity() -> u64 {
    10_000
}
fn default_call_log_capacity() -> usize {
    1_024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig {
                listen_addr: default_listen_addr(),
                request_timeout_secs: default_request_timeout(),
                enable_cors: default_enable_cors(),
                cors_origins: vec![],
                max_page_size: default_max_page_size(),
            },
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            cache: CacheConfig {
                ttl_secs: default_cache_ttl_secs(),
                capacity: default_cache_capacity(),
                call_log_channel_capacity: default_call_log_capacity(),
            },
            auth: AuthConfig { api_keys: vec![] },
        }
    }
}

impl ServerConfig {
    /// Loads a config file if given, then layers `PROMPTHUB_*` env vars over
    /// it, then falls back to defaults for anything still unset.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Supported environment variables:
    /// - `PROMPTHUB_HTTP_ADDR`
    /// - `PROMPTHUB_DATA_DIR`
    /// - `PROMPTHUB_REQUEST_TIMEOUT`
    /// - `PROMPTHUB_ENABLE_CORS`
    /// - `PROMPTHUB_CACHE_TTL_SECS`
    /// - `PROMPTHUB_MAX_PAGE_SIZE`
    /// - `PROMPTHUB_API_KEYS` (comma-separated `key:caller_id:project_id`)
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("PROMPTHUB_HTTP_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Ok(timeout) = std::env::var("PROMPTHUB_REQUEST_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                self.server.request_timeout_secs = val;
            }
        }
        if let Ok(cors) = std::env::var("PROMPTHUB_ENABLE_CORS") {
            self.server.enable_cors = cors.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(data_dir) = std::env::var("PROMPTHUB_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(ttl) = std::env::var("PROMPTHUB_CACHE_TTL_SECS") {
            if let Ok(val) = ttl.parse() {
                self.cache.ttl_secs = val;
            }
        }
        if let Ok(max_page) = std::env::var("PROMPTHUB_MAX_PAGE_SIZE") {
            if let Ok(val) = max_page.parse() {
                self.server.max_page_size = val;
            }
        }
        if let Ok(keys) = std::env::var("PROMPTHUB_API_KEYS") {
            self.auth.api_keys = keys.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
    }

    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ServerConfig::default();
        assert!(config.socket_addr().is_ok());
        assert!(config.auth.api_keys.is_empty());
    }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("PROMPTHUB_HTTP_ADDR", "0.0.0.0:9999");
        let mut config = ServerConfig::default();
        config.apply_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9999");
        std::env::remove_var("PROMPTHUB_HTTP_ADDR");
    }

    #[test]
    fn file_overrides_defaults_then_env_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompthub.toml");
        std::fs::write(
            &path,
            r#"
            [server]
            listen_addr = "127.0.0.1:1234"
            [storage]
            [cache]
            [auth]
            api_keys = ["secret:caller-1:00000000-0000-0000-0000-000000000000"]
            "#,
        )
        .unwrap();

        std::env::set_var("PROMPTHUB_HTTP_ADDR", "127.0.0.1:4321");
        let config = ServerConfig::load(Some(path)).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:4321");
        assert_eq!(config.auth.api_keys.len(), 1);
        std::env::remove_var("PROMPTHUB_HTTP_ADDR");
    }
}
