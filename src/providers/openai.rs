use crate::{
    config::OpenAiConfig,
    error::{ErrorKind, RedesignError, Result},
    models::{
        GenerationMode, GenerationRequest, GenerationResult, OpenAiGenerateRequest,
        OpenAiImagesResponse, ProviderKind,
    },
    providers::{body_text, build_client, image_part, mime_for_format, rejected_details, ImageProvider},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header::ACCEPT, multipart::Form, Client};
use std::time::Duration;

/// Edit-with-image adapter. A failed edit is retried once as a prompt-only
/// generation that ignores the source photo.
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/images/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// dall-e models return URLs unless asked for base64; gpt-image models
    /// always return base64 and reject the parameter.
    fn response_format(&self) -> Option<&'static str> {
        if self.config.model.starts_with("dall-e") {
            Some("b64_json")
        } else {
            None
        }
    }

    fn output_format<'a>(&self, request: &'a GenerationRequest) -> Option<&'a str> {
        if self.config.model.starts_with("gpt-image") {
            request.params().output_format.as_deref()
        } else {
            None
        }
    }

    pub fn build_edit_form(&self, request: &GenerationRequest) -> Result<Form> {
        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .text("prompt", request.prompt().to_string())
            .text("n", "1")
            .part("image", image_part(request.image())?);

        if let Some(size) = &self.config.size {
            form = form.text("size", size.clone());
        }
        if let Some(format) = self.response_format() {
            form = form.text("response_format", format);
        }
        if let Some(format) = self.output_format(request) {
            form = form.text("output_format", format.to_string());
        }

        Ok(form)
    }

    async fn edit(&self, api_key: &str, request: &GenerationRequest) -> Result<GenerationResult> {
        let form = self.build_edit_form(request)?;
        let _timer = crate::logger::timer("openai image edit");

        log::info!("Calling OpenAI image edit with model {}", self.config.model);

        let response = self
            .client
            .post(self.url("edits"))
            .bearer_auth(api_key)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(parse_images_response(
            status,
            &body,
            mime_for_format(self.output_format(request)),
            GenerationMode::Edit,
        ))
    }

    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<GenerationResult> {
        let payload = OpenAiGenerateRequest {
            model: &self.config.model,
            prompt: request.prompt(),
            n: 1,
            size: self.config.size.as_deref(),
            response_format: self.response_format(),
        };
        let _timer = crate::logger::timer("openai image generation");

        log::info!("Calling OpenAI prompt-only generation with model {}", self.config.model);

        let response = self
            .client
            .post(self.url("generations"))
            .bearer_auth(api_key)
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(parse_images_response(
            status,
            &body,
            "image/png",
            GenerationMode::Generate,
        ))
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    async fn adapt(&self, request: &GenerationRequest) -> GenerationResult {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) => key,
            None => {
                return GenerationResult::failure(
                    ErrorKind::MissingCredential,
                    "OPENAI_API_KEY is not configured",
                )
            }
        };

        let edited = self
            .edit(api_key, request)
            .await
            .unwrap_or_else(GenerationResult::from);

        match edited.failure_kind() {
            Some(kind @ (ErrorKind::ProviderRejected | ErrorKind::EmptyResult))
                if self.config.generate_fallback =>
            {
                log::warn!(
                    "Image edit failed ({}), falling back to prompt-only generation",
                    kind
                );
                self.generate(api_key, request)
                    .await
                    .unwrap_or_else(GenerationResult::from)
            }
            Some(kind) => {
                log::error!("Image edit failed ({}), not retrying", kind);
                edited
            }
            None => edited,
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }
}

/// Parses the `{"data":[{"b64_json":...}]}` envelope shared by edits and generations.
pub fn parse_images_response(
    status: u16,
    body: &[u8],
    mime_type: &str,
    mode: GenerationMode,
) -> GenerationResult {
    if !(200..300).contains(&status) {
        log::warn!("OpenAI rejected the {} request with HTTP {}", mode.as_str(), status);
        return GenerationResult::failure(
            ErrorKind::ProviderRejected,
            rejected_details(status, body),
        );
    }

    match decode_first_image(body) {
        Ok(bytes) => GenerationResult::success(bytes, mime_type, mode),
        Err(e) => e.into(),
    }
}

fn decode_first_image(body: &[u8]) -> Result<Vec<u8>> {
    let envelope: OpenAiImagesResponse = serde_json::from_slice(body)
        .map_err(|_| RedesignError::EmptyResult(body_text(body)))?;

    let encoded = envelope
        .data
        .into_iter()
        .next()
        .and_then(|item| item.b64_json)
        .filter(|b64| !b64.is_empty())
        .ok_or_else(|| RedesignError::EmptyResult(body_text(body)))?;

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| RedesignError::EmptyResult(format!("Undecodable image payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StyleParameters, UploadedImage};
    use serde_json::json;

    fn request() -> GenerationRequest {
        let image = UploadedImage::new(vec![9, 9], Some("image/png".into()), None).unwrap();
        GenerationRequest::new(image, StyleParameters::new().with_style("Art Deco"))
    }

    #[test]
    fn test_urls_and_formats() {
        let provider = OpenAiProvider::new(
            OpenAiConfig::new().with_base_url("http://localhost:9999/"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(provider.url("edits"), "http://localhost:9999/v1/images/edits");
        assert_eq!(provider.response_format(), None);
        assert!(provider.build_edit_form(&request()).is_ok());

        let dalle = OpenAiProvider::new(
            OpenAiConfig::new().with_model("dall-e-2"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(dalle.response_format(), Some("b64_json"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let provider = OpenAiProvider::new(OpenAiConfig::new(), Duration::from_secs(5)).unwrap();
        assert!(!provider.has_credentials());
        let result = provider.adapt(&request()).await;
        assert_eq!(result.failure_kind(), Some(ErrorKind::MissingCredential));
    }

    #[test]
    fn test_parse_success() {
        let body = json!({"created": 1, "data": [{"b64_json": STANDARD.encode(b"img")}]}).to_string();
        let result = parse_images_response(200, body.as_bytes(), "image/png", GenerationMode::Generate);
        assert_eq!(
            result,
            GenerationResult::success(b"img".to_vec(), "image/png", GenerationMode::Generate)
        );
    }

    #[test]
    fn test_parse_missing_key_echoes_response() {
        let body = json!({"data": [{"url": "https://cdn.example/x.png"}]}).to_string();
        match parse_images_response(200, body.as_bytes(), "image/png", GenerationMode::Edit) {
            GenerationResult::Failure(f) => {
                assert_eq!(f.kind, ErrorKind::EmptyResult);
                assert!(f.provider_message.contains("cdn.example"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejection() {
        let body = br#"{"error":{"message":"Invalid image"}}"#;
        let result = parse_images_response(400, body, "image/png", GenerationMode::Edit);
        assert_eq!(result.failure_kind(), Some(ErrorKind::ProviderRejected));
    }
}
