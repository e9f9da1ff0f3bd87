use std::{path::PathBuf, time::Duration};

use crate::{gemini::GeminiConfig, generator::DEFAULT_PROVIDER_TIMEOUT};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ASSETS_DIR: &str = "assets/references";
/// Base64 user images inflate by a third; leave room for ~10 MiB uploads.
const DEFAULT_MAX_BODY_BYTES: usize = 15 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub assets_dir: PathBuf,
    pub max_body_bytes: usize,
    pub provider_timeout: Duration,
    pub gemini: GeminiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            gemini: GeminiConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_value("HOST").unwrap_or(defaults.host),
            port: env_parsed("PORT").unwrap_or(defaults.port),
            assets_dir: env_value("REFERENCE_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            max_body_bytes: env_parsed("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            provider_timeout: env_parsed::<u64>("GEMINI_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            gemini: GeminiConfig::from_env(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}

pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env");
    let _ = dotenvy::from_filename("../.env");
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_value(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bundled_assets() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.assets_dir, PathBuf::from("assets/references"));
        assert_eq!(config.provider_timeout, Duration::from_secs(120));
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ServerConfig::default()
            .with_host("127.0.0.1")
            .with_port(8080)
            .with_assets_dir("/srv/refs");
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.assets_dir, PathBuf::from("/srv/refs"));
    }
}
