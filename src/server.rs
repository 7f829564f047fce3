//! HTTP surface: `POST /api/redesign` and `GET /health`.

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    error::{ErrorKind, RedesignError, Result},
    models::{GenerationRequest, GenerationResult},
    normalizer::{self, NormalizedInput},
    response::ResponseEncoder,
};
use actix_multipart::Multipart;
use actix_web::{
    http::{header::CONTENT_TYPE, Method},
    middleware, web, App, HttpRequest, HttpResponse, HttpServer,
};
use futures::{FutureExt, StreamExt};
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use uuid::Uuid;

pub const REDESIGN_PATH: &str = "/api/redesign";

/// Immutable per-process state shared by all workers.
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub encoder: ResponseEncoder,
    pub scratch_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Dispatcher::new(config)?, config))
    }

    pub fn new(dispatcher: Dispatcher, config: &Config) -> Self {
        Self {
            dispatcher,
            encoder: ResponseEncoder::new(config.response_mode, config.details_max_len),
            scratch_dir: config.scratch_dir(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(REDESIGN_PATH)
            .route(web::post().to(redesign))
            .default_service(web::to(method_not_allowed)),
    )
    .service(web::resource("/health").route(web::get().to(health)));
}

pub async fn serve(config: Config) -> Result<()> {
    let port = config.port.unwrap_or(8080);
    let host = config.host.clone();
    let state = web::Data::new(AppState::from_config(&config)?);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}

async fn method_not_allowed(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    log::warn!("Rejecting {} {}", req.method(), req.path());
    state.encoder.method_not_allowed(req.method())
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "ok": true,
        "provider": state.dispatcher.provider_kind(),
    }))
}

pub async fn redesign(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();

    if req.method() != Method::POST {
        return state.encoder.method_not_allowed(req.method());
    }

    // Checked before the body is touched so a missing key never costs an upload.
    if let Err(failure) = state.dispatcher.check_credentials() {
        log::error!("[req:{}] {}", request_id, failure.provider_message);
        return state.encoder.failure(&failure);
    }

    log::info!("[req:{}] Redesign request received", request_id);

    let pipeline = run_pipeline(&req, payload, &state, request_id);
    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(Ok(result)) => {
            if let GenerationResult::Failure(failure) = &result {
                log::warn!(
                    "[req:{}] Generation failed: {} ({})",
                    request_id,
                    failure.kind,
                    failure.provider_message
                );
            }
            state.encoder.encode(&result)
        }
        Ok(Err(e)) => {
            log::warn!("[req:{}] Request rejected: {}", request_id, e);
            state.encoder.error(e.kind(), &e.details())
        }
        Err(_) => {
            log::error!("[req:{}] Pipeline panicked", request_id);
            state
                .encoder
                .error(ErrorKind::Unexpected, "Internal error while processing the request")
        }
    }
}

async fn run_pipeline(
    req: &HttpRequest,
    payload: web::Payload,
    state: &AppState,
    request_id: Uuid,
) -> Result<GenerationResult> {
    let input = read_input(req, payload, state).await?;
    log::debug!(
        "[req:{}] Image {} ({} bytes, {})",
        request_id,
        input.image.filename,
        input.image.bytes.len(),
        input.image.mime_type
    );

    let request = GenerationRequest::new(input.image, input.params);
    log::debug!("[req:{}] Prompt: {}", request_id, request.prompt());

    Ok(state.dispatcher.dispatch(&request).await)
}

async fn read_input(
    req: &HttpRequest,
    payload: web::Payload,
    state: &AppState,
) -> Result<NormalizedInput> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::new(req.headers(), payload);
        let form =
            normalizer::read_multipart(multipart, &state.scratch_dir, state.max_body_bytes).await?;
        normalizer::normalize_multipart(form)
    } else if content_type.is_empty() || content_type.contains("json") {
        let body = read_body(payload, state.max_body_bytes).await?;
        normalizer::normalize_json(&body)
    } else {
        Err(RedesignError::InvalidInput(format!(
            "Unsupported content type '{}', send multipart/form-data or application/json",
            content_type
        )))
    }
}

async fn read_body(mut payload: web::Payload, max_bytes: usize) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| {
            RedesignError::InvalidInput(format!("Error reading request body: {}", e))
        })?;
        normalizer::check_size(body.len() + chunk.len(), max_bytes)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
