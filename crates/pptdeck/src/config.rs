use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::client::DEFAULT_API_BASE_URL;
use crate::model::{DEFAULT_GROUP, is_valid_group_name};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "pptdeck";

pub const DEFAULT_SITE_URL: &str = "http://localhost:5173";
pub const DEFAULT_PORT: u16 = 5173;
pub const DEFAULT_HOST: &str = "127.0.0.1";

const VALID_KEYS: &str = "api.base_url, site.url, site.base_path, site.default_group, \
    server.port, server.host, server.root";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin the presentations are fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Project root holding `presentations/` and `public/templates/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl Config {
    /// Directory holding `config.yaml` and the saved session.
    pub fn dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn path() -> Result<PathBuf> {
        Ok(Self::dir()?.join(FILENAME))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `pptdeck config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default config: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# pptdeck configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    // --- resolved values ---

    pub fn api_base_url(&self) -> String {
        self.api
            .as_ref()
            .and_then(|a| a.base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn site_url(&self) -> String {
        self.site
            .as_ref()
            .and_then(|s| s.url.clone())
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
    }

    /// Configured base path, else the one derived from the build environment.
    pub fn site_base_path(&self) -> String {
        self.site
            .as_ref()
            .and_then(|s| s.base_path.clone())
            .unwrap_or_else(crate::nav::site_base_path_from_env)
    }

    pub fn default_group(&self) -> String {
        self.site
            .as_ref()
            .and_then(|s| s.default_group.clone())
            .unwrap_or_else(|| DEFAULT_GROUP.to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn server_host(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn server_root(&self) -> PathBuf {
        self.server
            .as_ref()
            .and_then(|s| s.root.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" | "site.url" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| anyhow::anyhow!("Invalid URL for {key}: {value} ({e})"))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    anyhow::bail!("Invalid URL for {key}: {value}. Must use http or https.");
                }
                let value = value.trim_end_matches('/').to_string();
                if key == "api.base_url" {
                    self.api.get_or_insert_with(ApiConfig::default).base_url = Some(value);
                } else {
                    self.site.get_or_insert_with(SiteConfig::default).url = Some(value);
                }
            }
            "site.base_path" => {
                if !value.starts_with('/') {
                    anyhow::bail!("Invalid base path: {value}. Must start with '/'.");
                }
                self.site.get_or_insert_with(SiteConfig::default).base_path =
                    Some(value.to_string());
            }
            "site.default_group" => {
                if !is_valid_group_name(value) {
                    anyhow::bail!(
                        "Invalid group name: {value}. Use letters, digits, '-' and '_' only."
                    );
                }
                self.site.get_or_insert_with(SiteConfig::default).default_group =
                    Some(value.to_string());
            }
            "server.port" => {
                let port: u16 = value
                    .parse()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(|| anyhow::anyhow!("Invalid port: {value}. Must be 1-65535."))?;
                self.server.get_or_insert_with(ServerConfig::default).port = Some(port);
            }
            "server.host" => {
                if value.parse::<std::net::IpAddr>().is_err() && value != "localhost" {
                    anyhow::bail!("Invalid host: {value}. Must be an IP address or 'localhost'.");
                }
                self.server.get_or_insert_with(ServerConfig::default).host =
                    Some(value.to_string());
            }
            "server.root" => {
                self.server.get_or_insert_with(ServerConfig::default).root =
                    Some(PathBuf::from(value));
            }
            _ => anyhow::bail!("Unknown config key: {key}. Valid keys: {VALID_KEYS}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.site_url(), DEFAULT_SITE_URL);
        assert_eq!(config.default_group(), "example");
        assert_eq!(config.server_port(), 5173);
        assert_eq!(config.server_host(), "127.0.0.1");
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        config.set("api.base_url", "https://api.example.com/api/v1/").unwrap();
        assert_eq!(config.api_base_url(), "https://api.example.com/api/v1");

        assert!(config.set("site.url", "ftp://example.com").is_err());
        assert!(config.set("site.url", "not a url").is_err());
        assert!(config.set("site.base_path", "repo/").is_err());
        assert!(config.set("site.default_group", "../x").is_err());
        assert!(config.set("server.port", "0").is_err());
        assert!(config.set("server.port", "70000").is_err());
        assert!(config.set("server.host", "my host").is_err());
        assert!(config.set("unknown.key", "x").is_err());

        config.set("site.base_path", "/repo/").unwrap();
        config.set("server.port", "8081").unwrap();
        assert_eq!(config.site_base_path(), "/repo/");
        assert_eq!(config.server_port(), 8081);
    }

    #[test]
    fn test_yaml_round_trip_skips_unset_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.set("site.default_group", "q3-review").unwrap();
        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# pptdeck configuration"));
        assert!(!contents.contains("api:"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_group(), "q3-review");
    }

    #[test]
    fn test_missing_file_message() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("pptdeck config show"));
    }
}
