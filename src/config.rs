use crate::error::{RedesignError, Result};
use crate::models::{ProviderKind, ResponseMode, StabilityApiVersion};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STABILITY_BASE_URL: &str = "https://api.stability.ai";
pub const DEFAULT_STABILITY_ENGINE: &str = "stable-image-core-v1-1";
pub const DEFAULT_STABILITY_V2BETA_ENGINE: &str = "sd3";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-image-1";

#[derive(Debug, Clone)]
pub struct StabilityConfig {
    pub api_key: Option<String>,
    /// Unset means the default engine of `api_version`.
    pub engine: Option<String>,
    pub api_version: StabilityApiVersion,
    pub base_url: String,
    pub default_strength: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub size: Option<String>,
    pub base_url: String,
    pub generate_fallback: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub provider: ProviderKind,
    pub response_mode: ResponseMode,
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub details_max_len: usize,
    pub scratch_dir: Option<PathBuf>,
    pub stability: StabilityConfig,
    pub openai: OpenAiConfig,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        StabilityConfig {
            api_key: None,
            engine: None,
            api_version: StabilityApiVersion::V1,
            base_url: DEFAULT_STABILITY_BASE_URL.to_string(),
            default_strength: Some("0.35".to_string()),
        }
    }
}

impl StabilityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `STABILITY_API_KEY` wins over the older `STABILITY_KEY` name.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = non_empty_var("STABILITY_API_KEY").or_else(|| non_empty_var("STABILITY_KEY"));
        let engine = non_empty_var("STABILITY_ENGINE");
        let api_version = non_empty_var("STABILITY_API_VERSION")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.api_version);
        let base_url = non_empty_var("STABILITY_BASE_URL").unwrap_or(defaults.base_url);
        let default_strength = non_empty_var("STABILITY_DEFAULT_STRENGTH").or(defaults.default_strength);

        StabilityConfig {
            api_key,
            engine,
            api_version,
            base_url,
            default_strength,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn engine(&self) -> &str {
        match (&self.engine, self.api_version) {
            (Some(engine), _) => engine.as_str(),
            (None, StabilityApiVersion::V1) => DEFAULT_STABILITY_ENGINE,
            (None, StabilityApiVersion::V2Beta) => DEFAULT_STABILITY_V2BETA_ENGINE,
        }
    }

    pub fn with_api_version(mut self, api_version: StabilityApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            size: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            generate_fallback: true,
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = non_empty_var("OPENAI_API_KEY");
        let model = non_empty_var("OPENAI_IMAGE_MODEL").unwrap_or(defaults.model);
        let size = non_empty_var("OPENAI_IMAGE_SIZE");
        let base_url = non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.base_url);
        let generate_fallback = non_empty_var("OPENAI_GENERATE_FALLBACK")
            .map_or(defaults.generate_fallback, |val| val != "false" && val != "0");

        OpenAiConfig {
            api_key,
            model,
            size,
            base_url,
            generate_fallback,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_generate_fallback(mut self, enabled: bool) -> Self {
        self.generate_fallback = enabled;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            provider: ProviderKind::Stability,
            response_mode: ResponseMode::Json,
            timeout: Duration::from_secs(120),
            max_body_bytes: 20 * 1024 * 1024,
            details_max_len: 2000,
            scratch_dir: None,
            stability: StabilityConfig::default(),
            openai: OpenAiConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the whole deployment configuration. Unparseable values fall back
    /// to defaults, except an unknown provider or response mode.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let host = non_empty_var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let provider = match non_empty_var("REDESIGN_PROVIDER") {
            Some(val) => val.parse()?,
            None => defaults.provider,
        };
        let response_mode = match non_empty_var("RESPONSE_MODE") {
            Some(val) => val.parse()?,
            None => defaults.response_mode,
        };
        let timeout = env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_body_bytes = env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_body_bytes);
        let details_max_len = env::var("DETAILS_MAX_LEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.details_max_len);
        let scratch_dir = non_empty_var("SCRATCH_DIR").map(PathBuf::from);

        Ok(Config {
            host,
            port,
            provider,
            response_mode,
            timeout,
            max_body_bytes,
            details_max_len,
            scratch_dir,
            stability: StabilityConfig::from_env(),
            openai: OpenAiConfig::from_env(),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_details_max_len(mut self, len: usize) -> Self {
        self.details_max_len = len;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn with_stability(mut self, config: StabilityConfig) -> Self {
        self.stability = config;
        self.provider = ProviderKind::Stability;
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self.provider = ProviderKind::OpenAi;
        self
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(env::temp_dir)
    }

    /// Whether the configured provider family has its API key.
    pub fn has_credentials(&self) -> bool {
        match self.provider {
            ProviderKind::Stability => self.stability.api_key.is_some(),
            ProviderKind::OpenAi => self.openai.api_key.is_some(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            return Err(RedesignError::ConfigError(
                "MAX_BODY_BYTES must be greater than zero".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(RedesignError::ConfigError(
                "PROVIDER_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.provider, ProviderKind::Stability);
        assert_eq!(config.response_mode, ResponseMode::Json);
        assert_eq!(config.details_max_len, 2000);
        assert_eq!(config.stability.default_strength.as_deref(), Some("0.35"));
        assert!(config.openai.generate_fallback);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders_switch_provider() {
        let config = Config::new().with_openai(OpenAiConfig::new().with_api_key("sk-test"));
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert!(config.has_credentials());

        let config = config.with_stability(StabilityConfig::new());
        assert_eq!(config.provider, ProviderKind::Stability);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_stability_engine_follows_api_version() {
        let config = StabilityConfig::new();
        assert_eq!(config.engine(), DEFAULT_STABILITY_ENGINE);

        let config = config.with_api_version(StabilityApiVersion::V2Beta);
        assert_eq!(config.engine(), DEFAULT_STABILITY_V2BETA_ENGINE);

        let config = config.with_engine("ultra");
        assert_eq!(config.engine(), "ultra");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config::new().with_timeout(Duration::from_secs(0));
        assert!(matches!(
            config.validate(),
            Err(RedesignError::ConfigError(_))
        ));
    }

    #[test]
    fn test_scratch_dir_defaults_to_temp() {
        assert_eq!(Config::new().scratch_dir(), env::temp_dir());
        let config = Config::new().with_scratch_dir("/tmp/roomgen");
        assert_eq!(config.scratch_dir(), PathBuf::from("/tmp/roomgen"));
    }
}
