use serde::{Deserialize, Serialize};

/// Stability v1 JSON envelope (`Accept: application/json`).
#[derive(Debug, Serialize, Deserialize)]
pub struct StabilityArtifactsResponse {
    #[serde(default)]
    pub artifacts: Vec<StabilityArtifact>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StabilityArtifact {
    pub base64: Option<String>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
    pub seed: Option<u64>,
}

/// Stability v2beta JSON envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct StabilityImageResponse {
    pub image: Option<String>,
    pub finish_reason: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAiImagesResponse {
    #[serde(default)]
    pub data: Vec<OpenAiImageData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAiImageData {
    pub b64_json: Option<String>,
    pub url: Option<String>,
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OpenAiGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<&'a str>,
}
