use crate::error::{ErrorKind, RedesignError};
use crate::models::GenerationMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Flat text fields of an inbound request, first value wins.
pub type FieldMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

impl UploadedImage {
    /// Fills in the mime type and filename defaults. Empty buffers are rejected.
    pub fn new(
        bytes: Vec<u8>,
        mime_type: Option<String>,
        filename: Option<String>,
    ) -> Result<Self, RedesignError> {
        if bytes.is_empty() {
            return Err(RedesignError::MissingImage(
                "Uploaded image is empty".into(),
            ));
        }

        let mime_type = mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        let filename = filename
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| generated_filename(&mime_type));

        Ok(Self {
            bytes,
            mime_type,
            filename,
        })
    }
}

fn generated_filename(mime_type: &str) -> String {
    let ext = match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    };
    format!("upload-{}.{}", uuid::Uuid::new_v4(), ext)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleParameters {
    pub prompt: Option<String>,
    pub style: Option<String>,
    pub room_type: Option<String>,
    pub length: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub budget: Option<String>,
    pub wishes: Option<String>,
    // Provider tuning knobs, passed through unvalidated.
    pub strength: Option<String>,
    pub cfg_scale: Option<String>,
    pub steps: Option<String>,
    pub seed: Option<String>,
    pub style_preset: Option<String>,
    pub output_format: Option<String>,
}

impl StyleParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the recognized fields out of a flat field map. Blank values count as absent.
    pub fn from_fields(fields: &FieldMap) -> Self {
        let get = |keys: &[&str]| {
            keys.iter().find_map(|key| {
                fields
                    .get(*key)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(String::from)
            })
        };

        Self {
            prompt: get(&["prompt"]),
            style: get(&["style"]),
            room_type: get(&["roomType", "room_type"]),
            length: get(&["length"]),
            width: get(&["width"]),
            height: get(&["height"]),
            budget: get(&["budget"]),
            wishes: get(&["wishes"]),
            strength: get(&["image_strength", "strength"]),
            cfg_scale: get(&["cfg_scale"]),
            steps: get(&["steps"]),
            seed: get(&["seed"]),
            style_preset: get(&["style_preset"]),
            output_format: get(&["output_format"]),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_room_type(mut self, room_type: impl Into<String>) -> Self {
        self.room_type = Some(room_type.into());
        self
    }

    pub fn with_dimensions(
        mut self,
        length: impl Into<String>,
        width: impl Into<String>,
        height: impl Into<String>,
    ) -> Self {
        self.length = Some(length.into());
        self.width = Some(width.into());
        self.height = Some(height.into());
        self
    }

    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    pub fn with_wishes(mut self, wishes: impl Into<String>) -> Self {
        self.wishes = Some(wishes.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strength = Some(strength.into());
        self
    }
}

/// Normalized, provider-agnostic input to a single generation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    image: UploadedImage,
    params: StyleParameters,
    prompt: String,
}

impl GenerationRequest {
    pub fn new(image: UploadedImage, params: StyleParameters) -> Self {
        let prompt = crate::prompt::build_prompt(&params);
        Self {
            image,
            params,
            prompt,
        }
    }

    pub fn image(&self) -> &UploadedImage {
        &self.image
    }

    pub fn params(&self) -> &StyleParameters {
        &self.params
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub mode: GenerationMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationFailure {
    pub kind: ErrorKind,
    pub provider_message: String,
}

impl GenerationFailure {
    pub fn new(kind: ErrorKind, provider_message: impl Into<String>) -> Self {
        Self {
            kind,
            provider_message: provider_message.into(),
        }
    }
}

impl From<RedesignError> for GenerationFailure {
    fn from(e: RedesignError) -> Self {
        Self::new(e.kind(), e.details())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success(GeneratedImage),
    Failure(GenerationFailure),
}

impl GenerationResult {
    pub fn success(bytes: Vec<u8>, mime_type: impl Into<String>, mode: GenerationMode) -> Self {
        GenerationResult::Success(GeneratedImage {
            bytes,
            mime_type: mime_type.into(),
            mode,
        })
    }

    pub fn failure(kind: ErrorKind, provider_message: impl Into<String>) -> Self {
        GenerationResult::Failure(GenerationFailure::new(kind, provider_message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            GenerationResult::Success(_) => None,
            GenerationResult::Failure(f) => Some(f.kind),
        }
    }
}

impl From<RedesignError> for GenerationResult {
    fn from(e: RedesignError) -> Self {
        GenerationResult::Failure(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploaded_image_defaults() {
        let image = UploadedImage::new(vec![1, 2, 3], None, None).unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert!(image.filename.starts_with("upload-"));
        assert!(image.filename.ends_with(".jpg"));

        let image =
            UploadedImage::new(vec![1], Some("image/png".into()), Some("room.png".into())).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.filename, "room.png");
    }

    #[test]
    fn test_uploaded_image_rejects_empty() {
        let err = UploadedImage::new(Vec::new(), None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingImage);
    }

    #[test]
    fn test_style_parameters_from_fields() {
        let mut fields = FieldMap::new();
        fields.insert("roomType".into(), "kitchen".into());
        fields.insert("style".into(), "  Scandinavian ".into());
        fields.insert("wishes".into(), "   ".into());
        fields.insert("strength".into(), "0.6".into());
        fields.insert("unknown".into(), "ignored".into());

        let params = StyleParameters::from_fields(&fields);
        assert_eq!(params.room_type.as_deref(), Some("kitchen"));
        assert_eq!(params.style.as_deref(), Some("Scandinavian"));
        assert_eq!(params.wishes, None);
        assert_eq!(params.strength.as_deref(), Some("0.6"));
    }

    #[test]
    fn test_image_strength_takes_precedence() {
        let mut fields = FieldMap::new();
        fields.insert("strength".into(), "0.9".into());
        fields.insert("image_strength".into(), "0.2".into());
        let params = StyleParameters::from_fields(&fields);
        assert_eq!(params.strength.as_deref(), Some("0.2"));
    }

    #[test]
    fn test_failure_from_error() {
        let result: GenerationResult = RedesignError::Timeout("30s elapsed".into()).into();
        assert_eq!(result.failure_kind(), Some(ErrorKind::Timeout));
        assert!(!result.is_success());
    }
}
