use crate::{
    config::StabilityConfig,
    error::{ErrorKind, RedesignError, Result},
    models::{
        GenerationMode, GenerationRequest, GenerationResult, ProviderKind, StabilityApiVersion,
        StabilityArtifactsResponse, StabilityImageResponse,
    },
    providers::{body_text, build_client, image_part, mime_for_format, rejected_details, ImageProvider},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    multipart::Form,
    Client,
};
use serde_json::Value;
use std::time::Duration;

/// Image-to-image adapter. The uploaded photo is the init image and the prompt
/// steers the restyle.
pub struct StabilityProvider {
    client: Client,
    config: StabilityConfig,
}

impl StabilityProvider {
    pub fn new(config: StabilityConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    pub fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.api_version {
            StabilityApiVersion::V1 => format!(
                "{}/v1/generation/{}/image-to-image",
                base,
                self.config.engine()
            ),
            StabilityApiVersion::V2Beta => format!(
                "{}/v2beta/stable-image/generate/{}",
                base,
                self.config.engine()
            ),
        }
    }

    fn accept(&self) -> &'static str {
        match self.config.api_version {
            StabilityApiVersion::V1 => "image/png",
            StabilityApiVersion::V2Beta => "image/*",
        }
    }

    pub fn build_form(&self, request: &GenerationRequest) -> Result<Form> {
        let params = request.params();
        let strength = params
            .strength
            .clone()
            .or_else(|| self.config.default_strength.clone());
        let output_format = params
            .output_format
            .clone()
            .unwrap_or_else(|| "png".to_string());

        let mut form = Form::new();
        let mut optional: Vec<(&'static str, Option<String>)> = Vec::new();

        match self.config.api_version {
            StabilityApiVersion::V1 => {
                form = form
                    .part("init_image", image_part(request.image())?)
                    .text("init_image_mode", "IMAGE_STRENGTH")
                    .text("text_prompts[0][text]", request.prompt().to_string())
                    .text("text_prompts[0][weight]", "1")
                    .text("samples", "1");
                optional.push(("image_strength", strength));
            }
            StabilityApiVersion::V2Beta => {
                form = form
                    .part("image", image_part(request.image())?)
                    .text("prompt", request.prompt().to_string())
                    .text("mode", "image-to-image");
                optional.push(("strength", strength));
            }
        }
        form = form.text("output_format", output_format);

        optional.push(("cfg_scale", params.cfg_scale.clone()));
        optional.push(("steps", params.steps.clone()));
        optional.push(("seed", params.seed.clone()));
        optional.push(("style_preset", params.style_preset.clone()));

        for (name, value) in optional {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }

        Ok(form)
    }

    async fn call(&self, api_key: &str, request: &GenerationRequest) -> Result<GenerationResult> {
        let form = self.build_form(request)?;
        let url = self.endpoint();
        let _timer = crate::logger::timer("stability image-to-image");

        log::info!("Calling Stability image-to-image: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header(ACCEPT, self.accept())
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        log::debug!(
            "Stability responded {} ({}, {} bytes)",
            status,
            content_type.as_deref().unwrap_or("no content type"),
            body.len()
        );

        Ok(parse_response(
            status,
            content_type.as_deref(),
            &body,
            request.params().output_format.as_deref(),
        ))
    }
}

#[async_trait]
impl ImageProvider for StabilityProvider {
    async fn adapt(&self, request: &GenerationRequest) -> GenerationResult {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) => key,
            None => {
                return GenerationResult::failure(
                    ErrorKind::MissingCredential,
                    "STABILITY_API_KEY is not configured",
                )
            }
        };

        match self.call(api_key, request).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Stability request failed: {}", e);
                e.into()
            }
        }
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Stability
    }

    fn has_credentials(&self) -> bool {
        self.config.api_key.is_some()
    }
}

/// Normalizes both success shapes: raw image bytes, or a JSON envelope with a
/// base64 artifact. The shape is chosen by the declared content type.
pub fn parse_response(
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
    output_format: Option<&str>,
) -> GenerationResult {
    if !(200..300).contains(&status) {
        log::warn!("Stability rejected the request with HTTP {}", status);
        return GenerationResult::failure(
            ErrorKind::ProviderRejected,
            rejected_details(status, body),
        );
    }

    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    let is_json = match media_type.as_deref() {
        Some(ct) => ct.ends_with("json"),
        None => body.first() == Some(&b'{'),
    };

    if is_json {
        return match parse_json_artifact(body, output_format) {
            Ok(result) => result,
            Err(e) => e.into(),
        };
    }

    if body.is_empty() {
        return GenerationResult::failure(
            ErrorKind::EmptyResult,
            "Stability returned an empty image body",
        );
    }

    let mime_type = media_type
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| "image/png".to_string());
    GenerationResult::success(body.to_vec(), mime_type, GenerationMode::Edit)
}

fn parse_json_artifact(body: &[u8], output_format: Option<&str>) -> Result<GenerationResult> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RedesignError::EmptyResult(body_text(body)))?;

    let (encoded, finish_reason) = if value.get("artifacts").is_some() {
        let envelope: StabilityArtifactsResponse = serde_json::from_value(value)
            .map_err(|_| RedesignError::EmptyResult(body_text(body)))?;
        envelope
            .artifacts
            .into_iter()
            .next()
            .map(|a| (a.base64, a.finish_reason))
            .unwrap_or((None, None))
    } else {
        let envelope: StabilityImageResponse = serde_json::from_value(value)
            .map_err(|_| RedesignError::EmptyResult(body_text(body)))?;
        (envelope.image, envelope.finish_reason)
    };

    if matches!(finish_reason.as_deref(), Some("CONTENT_FILTERED")) {
        return Err(RedesignError::ProviderRejected(
            "Stability filtered the generated image (CONTENT_FILTERED)".into(),
        ));
    }

    let encoded = encoded
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RedesignError::EmptyResult(body_text(body)))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RedesignError::EmptyResult(format!("Undecodable image payload: {}", e)))?;

    Ok(GenerationResult::success(
        bytes,
        mime_for_format(output_format),
        GenerationMode::Edit,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StyleParameters, UploadedImage};
    use serde_json::json;

    fn provider(version: StabilityApiVersion) -> StabilityProvider {
        let config = StabilityConfig::new()
            .with_api_key("sk-test")
            .with_api_version(version)
            .with_base_url("https://stability.example/");
        StabilityProvider::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(
            provider(StabilityApiVersion::V1).endpoint(),
            "https://stability.example/v1/generation/stable-image-core-v1-1/image-to-image"
        );
        assert_eq!(
            provider(StabilityApiVersion::V2Beta).endpoint(),
            "https://stability.example/v2beta/stable-image/generate/sd3"
        );
        let p = StabilityProvider::new(
            StabilityConfig::new()
                .with_api_version(StabilityApiVersion::V2Beta)
                .with_engine("core"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            p.endpoint(),
            "https://api.stability.ai/v2beta/stable-image/generate/core"
        );
        assert!(!p.has_credentials());
    }

    #[test]
    fn test_build_form_accepts_upload() {
        let image = UploadedImage::new(vec![1, 2, 3], Some("image/png".into()), None).unwrap();
        let params = StyleParameters::new().with_style("Boho").with_strength("1.7");
        let request = GenerationRequest::new(image, params);
        assert!(provider(StabilityApiVersion::V1).build_form(&request).is_ok());
        assert!(provider(StabilityApiVersion::V2Beta).build_form(&request).is_ok());
    }

    #[test]
    fn test_raw_image_response() {
        let result = parse_response(200, Some("image/png"), b"\x89PNG", None);
        assert_eq!(
            result,
            GenerationResult::success(b"\x89PNG".to_vec(), "image/png", GenerationMode::Edit)
        );

        let result = parse_response(200, Some("image/webp; charset=binary"), b"RIFF", None);
        match result {
            GenerationResult::Success(image) => assert_eq!(image.mime_type, "image/webp"),
            other => panic!("expected success, got {:?}", other),
        }

        let result = parse_response(200, None, b"rawbytes", None);
        match result {
            GenerationResult::Success(image) => assert_eq!(image.mime_type, "image/png"),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_json_artifact_responses() {
        let v1 = json!({"artifacts": [{"base64": STANDARD.encode(b"v1img"), "finishReason": "SUCCESS", "seed": 7}]});
        let result = parse_response(200, Some("application/json"), v1.to_string().as_bytes(), None);
        assert_eq!(
            result,
            GenerationResult::success(b"v1img".to_vec(), "image/png", GenerationMode::Edit)
        );

        let v2 = json!({"image": STANDARD.encode(b"v2img"), "finish_reason": "SUCCESS"});
        let result = parse_response(
            200,
            Some("application/json; charset=utf-8"),
            v2.to_string().as_bytes(),
            Some("jpeg"),
        );
        assert_eq!(
            result,
            GenerationResult::success(b"v2img".to_vec(), "image/jpeg", GenerationMode::Edit)
        );
    }

    #[test]
    fn test_json_without_artifact_is_empty_result() {
        let body = json!({"artifacts": []}).to_string();
        let result = parse_response(200, Some("application/json"), body.as_bytes(), None);
        assert_eq!(result.failure_kind(), Some(ErrorKind::EmptyResult));

        let filtered = json!({"artifacts": [{"base64": "", "finishReason": "CONTENT_FILTERED"}]});
        let result = parse_response(200, Some("application/json"), filtered.to_string().as_bytes(), None);
        assert_eq!(result.failure_kind(), Some(ErrorKind::ProviderRejected));
    }

    #[test]
    fn test_rejection_keeps_body() {
        let result = parse_response(400, Some("application/json"), b"{\"message\":\"init_image too large\"}", None);
        match result {
            GenerationResult::Failure(f) => {
                assert_eq!(f.kind, ErrorKind::ProviderRejected);
                assert!(f.provider_message.contains("init_image too large"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
