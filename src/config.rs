use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CATALOG_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=stations&FORMAT=tle";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0} must be greater than zero")]
    Duration(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "humantime_duration")]
    pub refresh_interval: Duration,
    pub catalog_url: String,
    #[serde(deserialize_with = "humantime_duration")]
    pub catalog_stale_after: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub pass_search_window: Duration,
    pub notifications: bool,
    pub default_object: DefaultObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultObject {
    pub name: String,
    pub nickname: String,
}

impl Default for DefaultObject {
    fn default() -> Self {
        Self {
            name: "ISS (ZARYA)".to_string(),
            nickname: "ISS".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_stale_after: Duration::from_secs(3 * 24 * 3600),
            pass_search_window: Duration::from_secs(2 * 24 * 3600),
            notifications: true,
            default_object: DefaultObject::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// A missing file means defaults; a broken one is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Duration("refresh_interval"));
        }
        if self.pass_search_window.is_zero() {
            return Err(ConfigError::Duration("pass_search_window"));
        }
        Ok(())
    }
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
