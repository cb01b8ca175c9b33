use std::fmt;
use std::net::SocketAddr;

use gateway_shared::DEFAULT_MODEL;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.siliconflow.cn/v1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const TRANSCRIPTION_MODEL: &str = "FunAudioLLM/SenseVoiceSmall";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Largest accepted `/chat` body.
pub const DEFAULT_CHAT_BODY_LIMIT: usize = 10 * 1024 * 1024;
/// Largest accepted `/transcriptions` form, matching common audio API caps.
pub const DEFAULT_UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set (environment or .env file)")]
    Missing(&'static str),

    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddr { name: &'static str, value: String },

    #[error("{name} is not a valid byte count: {value}")]
    InvalidSize { name: &'static str, value: String },
}

/// Settings for the experimental generative-content route.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Gateway configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub api_key: String,
    pub api_base: String,
    pub default_model: String,
    pub chat_body_limit: usize,
    pub upload_body_limit: usize,
    pub gemini: Option<GeminiConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("chat_body_limit", &self.chat_body_limit)
            .field("upload_body_limit", &self.upload_body_limit)
            .field("gemini", &self.gemini)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = get("API_KEY").ok_or(ConfigError::Missing("API_KEY"))?;

        let addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr.parse().map_err(|_| ConfigError::InvalidAddr {
            name: "BIND_ADDR",
            value: addr.clone(),
        })?;

        let api_base = get("UPSTREAM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let size = |name: &'static str, default: usize| match get(name) {
            None => Ok(default),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(ConfigError::InvalidSize { name, value }),
            },
        };
        let chat_body_limit = size("CHAT_BODY_LIMIT", DEFAULT_CHAT_BODY_LIMIT)?;
        let upload_body_limit = size("UPLOAD_BODY_LIMIT", DEFAULT_UPLOAD_BODY_LIMIT)?;

        let gemini = get("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        });

        Ok(Self {
            bind_addr,
            api_key,
            api_base,
            default_model: get("DEFAULT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            chat_body_limit,
            upload_body_limit,
            gemini,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn api_key_is_required() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("API_KEY"))));
        assert!(matches!(
            config(&[("API_KEY", "  ")]),
            Err(ConfigError::Missing("API_KEY"))
        ));
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.chat_body_limit, DEFAULT_CHAT_BODY_LIMIT);
        assert_eq!(config.upload_body_limit, DEFAULT_UPLOAD_BODY_LIMIT);
        assert!(config.gemini.is_none());
    }

    #[test]
    fn body_limits_are_configurable() {
        let limits = config(&[
            ("API_KEY", "sk-test"),
            ("CHAT_BODY_LIMIT", "4096"),
            ("UPLOAD_BODY_LIMIT", "104857600"),
        ])
        .unwrap();
        assert_eq!(limits.chat_body_limit, 4096);
        assert_eq!(limits.upload_body_limit, 100 * 1024 * 1024);

        for bad in ["0", "-1", "ten"] {
            let err = config(&[("API_KEY", "sk-test"), ("UPLOAD_BODY_LIMIT", bad)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidSize { name: "UPLOAD_BODY_LIMIT", .. }));
        }
    }

    #[test]
    fn overrides_apply() {
        let config = config(&[
            ("API_KEY", "sk-test"),
            ("UPSTREAM_BASE_URL", "http://localhost:9000/v1/"),
            ("DEFAULT_MODEL", "Qwen/Qwen3-8B"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("GEMINI_API_KEY", "g-key"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
        ])
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.default_model, "Qwen/Qwen3-8B");
        assert_eq!(config.bind_addr.port(), 8080);
        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "g-key");
        assert_eq!(gemini.model, "gemini-2.5-pro");
        assert_eq!(gemini.base_url, DEFAULT_GEMINI_BASE);
    }

    #[test]
    fn bad_bind_addr_is_rejected() {
        let err = config(&[("API_KEY", "sk-test"), ("BIND_ADDR", "nowhere")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddr { name: "BIND_ADDR", .. }));
    }

    #[test]
    fn debug_redacts_keys() {
        let config = config(&[("API_KEY", "sk-secret"), ("GEMINI_API_KEY", "g-secret")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("g-secret"));
    }
}
