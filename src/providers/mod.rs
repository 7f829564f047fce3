pub mod openai;
pub mod stability;

use crate::{
    error::{RedesignError, Result},
    models::{GenerationRequest, GenerationResult, ProviderKind, UploadedImage},
};
use async_trait::async_trait;
use reqwest::{multipart::Part, Client};
use std::time::Duration;

pub use openai::OpenAiProvider;
pub use stability::StabilityProvider;

/// One provider family's wire format behind a common contract.
///
/// `adapt` never returns an error: transport, status and payload problems all
/// come back as [`GenerationResult::Failure`].
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn adapt(&self, request: &GenerationRequest) -> GenerationResult;

    fn kind(&self) -> ProviderKind;

    /// False when the API key is missing; callers must not attempt `adapt` then.
    fn has_credentials(&self) -> bool;

    fn name(&self) -> &str {
        match self.kind() {
            ProviderKind::Stability => "Stability AI (image-to-image)",
            ProviderKind::OpenAi => "OpenAI (image edit)",
        }
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RedesignError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn image_part(image: &UploadedImage) -> Result<Part> {
    Part::bytes(image.bytes.clone())
        .file_name(image.filename.clone())
        .mime_str(&image.mime_type)
        .map_err(|e| {
            RedesignError::InvalidInput(format!(
                "Unsupported image mime type '{}': {}",
                image.mime_type, e
            ))
        })
}

pub(crate) fn body_text(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

pub(crate) fn rejected_details(status: u16, body: &[u8]) -> String {
    let text = body_text(body);
    if text.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        text
    }
}

/// Mime type for an `output_format` knob value, png when unset or unknown.
pub(crate) fn mime_for_format(format: Option<&str>) -> &'static str {
    match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        Some("jpeg") | Some("jpg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
