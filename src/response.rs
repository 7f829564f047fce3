use crate::{
    data_url,
    error::ErrorKind,
    models::{GeneratedImage, GenerationFailure, GenerationResult, ResponseMode},
};
use actix_web::{
    http::{
        header::{self, CacheControl, CacheDirective},
        Method, StatusCode,
    },
    HttpResponse,
};
use serde::{Deserialize, Serialize};

pub const GENERATION_MODE_HEADER: &str = "X-Generation-Mode";

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorKind,
    pub details: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::MissingImage => StatusCode::BAD_REQUEST,
        ErrorKind::ProviderRejected | ErrorKind::Timeout | ErrorKind::NetworkFailure => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::MissingCredential | ErrorKind::EmptyResult | ErrorKind::Unexpected => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_details(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Turns a [`GenerationResult`] into the caller-facing HTTP response.
#[derive(Debug, Clone, Copy)]
pub struct ResponseEncoder {
    mode: ResponseMode,
    details_max_len: usize,
}

impl ResponseEncoder {
    pub fn new(mode: ResponseMode, details_max_len: usize) -> Self {
        Self {
            mode,
            details_max_len,
        }
    }

    pub fn mode(&self) -> ResponseMode {
        self.mode
    }

    pub fn encode(&self, result: &GenerationResult) -> HttpResponse {
        match result {
            GenerationResult::Success(image) => self.success(image),
            GenerationResult::Failure(failure) => self.failure(failure),
        }
    }

    fn success(&self, image: &GeneratedImage) -> HttpResponse {
        match self.mode {
            ResponseMode::Json => HttpResponse::Ok()
                .insert_header((GENERATION_MODE_HEADER, image.mode.as_str()))
                .json(SuccessEnvelope {
                    ok: true,
                    image: data_url::encode(&image.mime_type, &image.bytes),
                }),
            ResponseMode::Binary => HttpResponse::Ok()
                .insert_header((header::CONTENT_TYPE, image.mime_type.as_str()))
                .insert_header(CacheControl(vec![CacheDirective::NoStore]))
                .insert_header((GENERATION_MODE_HEADER, image.mode.as_str()))
                .body(image.bytes.clone()),
        }
    }

    pub fn failure(&self, failure: &GenerationFailure) -> HttpResponse {
        self.error(failure.kind, &failure.provider_message)
    }

    pub fn error(&self, kind: ErrorKind, details: &str) -> HttpResponse {
        HttpResponse::build(status_for(kind)).json(ErrorEnvelope {
            ok: false,
            error: kind,
            details: truncate_details(details, self.details_max_len),
        })
    }

    pub fn method_not_allowed(&self, method: &Method) -> HttpResponse {
        HttpResponse::MethodNotAllowed()
            .insert_header((header::ALLOW, "POST"))
            .json(ErrorEnvelope {
                ok: false,
                error: ErrorKind::InvalidInput,
                details: format!("Method {} not allowed, use POST", method),
            })
    }
}
