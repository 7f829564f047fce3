use crate::error::{RedesignError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider family a deployment talks to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Image-to-image, source image drives the composition.
    Stability,
    /// Image edit with a prompt-only generate fallback.
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Stability => "stability",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = RedesignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stability" | "stability-ai" | "stabilityai" => Ok(ProviderKind::Stability),
            "openai" | "open-ai" => Ok(ProviderKind::OpenAi),
            other => Err(RedesignError::ConfigError(format!(
                "Unknown provider '{}', expected 'stability' or 'openai'",
                other
            ))),
        }
    }
}

/// How a successful render is handed back to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Json,
    Binary,
}

impl FromStr for ResponseMode {
    type Err = RedesignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseMode::Json),
            "binary" | "raw" => Ok(ResponseMode::Binary),
            other => Err(RedesignError::ConfigError(format!(
                "Unknown response mode '{}', expected 'json' or 'binary'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StabilityApiVersion {
    V1,
    V2Beta,
}

impl FromStr for StabilityApiVersion {
    type Err = RedesignError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(StabilityApiVersion::V1),
            "v2beta" | "v2" => Ok(StabilityApiVersion::V2Beta),
            other => Err(RedesignError::ConfigError(format!(
                "Unknown Stability API version '{}'",
                other
            ))),
        }
    }
}

/// Which operation produced a render.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Edit,
    Generate,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Edit => "edit",
            GenerationMode::Generate => "generate",
        }
    }
}
