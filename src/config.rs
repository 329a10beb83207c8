use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{DEFAULT_API_ENDPOINT, DEFAULT_TIMEOUT};
use crate::cost::Pricing;
use crate::invoker::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

pub const API_KEY_ENV: &str = "CRO_VISION_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const API_ENDPOINT_ENV: &str = "CRO_VISION_API_ENDPOINT";
pub const MODEL_ENV: &str = "CRO_VISION_MODEL";

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vision: VisionSettings,
    pub retry: RetrySettings,
    pub pricing: Pricing,
    pub images: ImageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionSettings {
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub max_output_tokens: u32,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for VisionSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            model: None,
            max_output_tokens: 1500,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.base_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Screenshots whose longest side exceeds this are downscaled before upload.
    pub max_dimension: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Toml(#[from] toml::de::Error),
}

impl Config {
    /// `~/.config/cro/config.toml`, when a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".config").join("cro").join("config.toml"))
    }

    /// Explicit path, then the central config file if it exists, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::central_config_path() {
            Some(central) if central.is_file() => Self::from_file(&central),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".into());
        }
        if self.vision.max_output_tokens == 0 {
            return Err("vision.max_output_tokens must be greater than zero".into());
        }
        if self.vision.timeout.is_zero() {
            return Err("vision.timeout must be greater than zero".into());
        }
        if let Some(endpoint) = &self.vision.api_endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| format!("vision.api_endpoint '{endpoint}' is not a valid URL: {e}"))?;
        }
        for (name, price) in [
            ("pricing.input_per_1k", self.pricing.input_per_1k),
            ("pricing.output_per_1k", self.pricing.output_per_1k),
        ] {
            if !price.is_finite() || price < 0.0 {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        if self.images.max_dimension == 0 {
            return Err("images.max_dimension must be greater than zero".into());
        }
        Ok(())
    }

    /// Config file value, then `CRO_VISION_API_KEY`, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        non_blank(self.vision.api_key.clone())
            .or_else(|| non_blank(env(API_KEY_ENV)))
            .or_else(|| non_blank(env(FALLBACK_API_KEY_ENV)))
    }

    pub fn resolve_endpoint(&self) -> String {
        non_blank(self.vision.api_endpoint.clone())
            .or_else(|| non_blank(std::env::var(API_ENDPOINT_ENV).ok()))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
    }

    pub fn resolve_model(&self) -> String {
        non_blank(self.vision.model.clone())
            .or_else(|| non_blank(std::env::var(MODEL_ENV).ok()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(cfg.vision.max_output_tokens, 1500);
        assert_eq!(cfg.vision.timeout, Duration::from_secs(60));
        assert_eq!(cfg.images.max_dimension, 1600);
        assert!((cfg.pricing.input_per_1k - 0.0025).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_humantime_durations() {
        let cfg = Config::from_toml_str(
            r#"
[vision]
model = "gpt-4.1-mini"
timeout = "90s"

[retry]
max_attempts = 5
base_delay = "250ms"

[pricing]
input_per_1k = 0.01
output_per_1k = 0.03
"#,
        )
        .expect("parse config");

        assert_eq!(cfg.vision.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(cfg.vision.timeout, Duration::from_secs(90));
        assert_eq!(cfg.vision.max_output_tokens, 1500);
        assert_eq!(cfg.retry.policy().max_attempts, 5);
        assert_eq!(cfg.retry.policy().base_delay, Duration::from_millis(250));
        assert!((cfg.pricing.output_per_1k - 0.03).abs() < f64::EPSILON);
        assert_eq!(cfg.images.max_dimension, 1600);
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(Config::from_toml_str("[retry]\nmax_attempts = \"three\"\n").is_err());
    }

    #[test]
    fn validate_flags_bad_values() {
        let mut cfg = Config::default();
        cfg.retry.max_attempts = 0;
        assert!(cfg.validate().unwrap_err().contains("max_attempts"));

        let mut cfg = Config::default();
        cfg.pricing.input_per_1k = -0.5;
        assert!(cfg.validate().unwrap_err().contains("input_per_1k"));

        let mut cfg = Config::default();
        cfg.vision.api_endpoint = Some("::nope".into());
        assert!(cfg.validate().unwrap_err().contains("api_endpoint"));
    }

    #[test]
    fn api_key_prefers_config_then_primary_env_then_fallback() {
        let env = |name: &str| match name {
            API_KEY_ENV => Some("primary".to_string()),
            FALLBACK_API_KEY_ENV => Some("fallback".to_string()),
            _ => None,
        };

        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_api_key_with(env).as_deref(), Some("primary"));

        cfg.vision.api_key = Some("from-file".into());
        assert_eq!(cfg.resolve_api_key_with(env).as_deref(), Some("from-file"));

        let cfg = Config::default();
        let only_fallback = |name: &str| {
            (name == FALLBACK_API_KEY_ENV).then(|| "fallback".to_string())
        };
        assert_eq!(
            cfg.resolve_api_key_with(only_fallback).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn blank_api_keys_count_as_missing() {
        let mut cfg = Config::default();
        cfg.vision.api_key = Some("   ".into());
        let env = |name: &str| (name == API_KEY_ENV).then(String::new);
        assert_eq!(cfg.resolve_api_key_with(env), None);
    }
}
