use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::metadata::DEFAULT_OEMBED_URL;
use crate::transcript::DEFAULT_YOUTUBE_URL;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CAPTION_LANG: &str = "en";

/// How summaries and chat replies are produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Provider when its API key is set, templates otherwise
    #[default]
    Auto,
    /// Fixed templates only, no AI provider
    Template,
    /// Always use the AI provider
    Provider,
}

/// On-disk configuration; every field is optional
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bind: Option<String>,
    pub strategy: Option<Strategy>,
    pub model: Option<String>,
    pub oembed_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub captions: Option<bool>,
    pub caption_lang: Option<String>,
    pub youtube_url: Option<String>,
    pub fallback_on_error: Option<bool>,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind: String,
    pub strategy: Strategy,
    pub model: String,
    pub oembed_url: String,
    pub timeout: Duration,
    pub captions: bool,
    pub caption_lang: String,
    pub youtube_url: String,
    pub fallback_on_error: bool,
}

impl Config {
    /// Load config from `path`, or from ~/.config/ytbrief/config.toml if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !explicit && !path.exists() {
            debug!("No config file found at {}", path.display());
            return Ok(Config::default());
        }

        debug!("Loading config from {}", path.display());
        let content =
            std::fs::read_to_string(&path).wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Fields set in `other` take priority over those in `self`
    pub fn overlay(self, other: Config) -> Config {
        Config {
            bind: other.bind.or(self.bind),
            strategy: other.strategy.or(self.strategy),
            model: other.model.or(self.model),
            oembed_url: other.oembed_url.or(self.oembed_url),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            captions: other.captions.or(self.captions),
            caption_lang: other.caption_lang.or(self.caption_lang),
            youtube_url: other.youtube_url.or(self.youtube_url),
            fallback_on_error: other.fallback_on_error.or(self.fallback_on_error),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            bind: self.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            strategy: self.strategy.unwrap_or_default(),
            model: self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            oembed_url: self.oembed_url.clone().unwrap_or_else(|| DEFAULT_OEMBED_URL.to_string()),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            captions: self.captions.unwrap_or(false),
            caption_lang: self.caption_lang.clone().unwrap_or_else(|| DEFAULT_CAPTION_LANG.to_string()),
            youtube_url: self.youtube_url.clone().unwrap_or_else(|| DEFAULT_YOUTUBE_URL.to_string()),
            fallback_on_error: self.fallback_on_error.unwrap_or(false),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("ytbrief")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
bind = "0.0.0.0:8080"
strategy = "provider"
model = "gpt-4o"
oembed_url = "http://localhost:9999/oembed"
timeout_secs = 5
captions = true
caption_lang = "es"
youtube_url = "http://localhost:9998"
fallback_on_error = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(config.strategy, Some(Strategy::Provider));
        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.captions, Some(true));
        assert_eq!(config.youtube_url.as_deref(), Some("http://localhost:9998"));
        assert_eq!(config.fallback_on_error, Some(true));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.bind.is_none());
        assert!(config.strategy.is_none());
    }

    #[test]
    fn test_parse_bad_strategy() {
        assert!(toml::from_str::<Config>(r#"strategy = "magic""#).is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Config::default().settings();
        assert_eq!(settings.bind, DEFAULT_BIND);
        assert_eq!(settings.strategy, Strategy::Auto);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.oembed_url, DEFAULT_OEMBED_URL);
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!settings.captions);
        assert_eq!(settings.youtube_url, DEFAULT_YOUTUBE_URL);
        assert!(!settings.fallback_on_error);
    }

    #[test]
    fn test_overlay_prefers_other() {
        let file: Config = toml::from_str(
            r#"
bind = "0.0.0.0:8080"
model = "gpt-4o"
captions = true
"#,
        )
        .unwrap();
        let cli = Config {
            model: Some("gemini-2.0-flash".to_string()),
            strategy: Some(Strategy::Template),
            ..Config::default()
        };

        let settings = file.overlay(cli).settings();
        assert_eq!(settings.bind, "0.0.0.0:8080");
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.strategy, Strategy::Template);
        assert!(settings.captions);
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let path = std::env::temp_dir().join("ytbrief-test-does-not-exist.toml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let path = std::env::temp_dir().join(format!("ytbrief-test-{}.toml", std::process::id()));
        std::fs::write(&path, "timeout_secs = 7\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.settings().timeout, Duration::from_secs(7));
    }
}
