use std::sync::Arc;

use actix_web::{error::InternalError, web, App, HttpResponse, HttpServer, ResponseError};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;

use crate::{
    config::ServerConfig,
    error::AppResult,
    gemini::GeminiClient,
    generator::{GenerationFailure, ThumbnailGenerator},
    models::{
        AspectRatioInfo, CapabilitiesResponse, FailureEnvelope, GenerationRequest, OutputFormat,
        PartialMetadata, ServiceLimits, SuccessEnvelope, MAX_OUTPUT_QUALITY, MAX_PROMPT_CHARS,
        MAX_SEED, MIN_OUTPUT_QUALITY,
    },
    profiles,
    provider::ImageProvider,
    references::ReferenceStore,
};

const CAPABILITIES: [&str; 5] = [
    "text-to-image",
    "image-to-image",
    "aspect-ratio-anchoring",
    "seeded-generation",
    "data-uri-output",
];

#[derive(Clone)]
pub struct AppState {
    pub generator: ThumbnailGenerator,
}

impl AppState {
    pub fn new(generator: ThumbnailGenerator) -> Self {
        Self { generator }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/image")
            .route(web::post().to(generate_image))
            .route(web::get().to(capabilities)),
    );
}

/// Body extractor config that renders rejects as the failure envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let status = err.status_code();
            warn!(%status, "rejected request body: {err}");
            let envelope = FailureEnvelope::new(
                format!("invalid request body: {err}"),
                PartialMetadata::default(),
            );
            let response = HttpResponse::build(status).json(envelope);
            InternalError::from_response(err, response).into()
        })
}

pub async fn generate_image(state: web::Data<AppState>, body: web::Json<Value>) -> HttpResponse {
    let request = match GenerationRequest::deserialize(&*body) {
        Ok(request) => request,
        Err(err) => {
            info!("rejected request body: {err}");
            return HttpResponse::BadRequest().json(FailureEnvelope::new(
                format!("invalid request body: {err}"),
                PartialMetadata::from_raw_body(&body),
            ));
        }
    };

    match state.generator.build_and_submit(&request).await {
        Ok(result) => HttpResponse::Ok().json(SuccessEnvelope::from(result)),
        Err(failure) => failure_response(failure),
    }
}

pub async fn capabilities(state: web::Data<AppState>) -> HttpResponse {
    let provider = state.generator.provider();
    let aspect_ratios = profiles::all_profiles()
        .iter()
        .map(|profile| AspectRatioInfo {
            ratio: profile.ratio,
            width: profile.width,
            height: profile.height,
            platform: profile.platform,
        })
        .collect();
    let missing = state.generator.references().missing();

    HttpResponse::Ok().json(CapabilitiesResponse {
        status: if provider.is_configured() && missing.is_empty() {
            "ok"
        } else {
            "degraded"
        },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        model: provider.model().to_string(),
        configured: provider.is_configured(),
        supported_formats: OutputFormat::ALL.to_vec(),
        aspect_ratios,
        capabilities: CAPABILITIES.to_vec(),
        limits: ServiceLimits {
            max_prompt_length: MAX_PROMPT_CHARS,
            seed_max: MAX_SEED,
            min_output_quality: MIN_OUTPUT_QUALITY,
            max_output_quality: MAX_OUTPUT_QUALITY,
        },
    })
}

fn failure_response(failure: GenerationFailure) -> HttpResponse {
    let status = failure.error.status_code();
    if status.is_server_error() {
        error!(%status, kind = failure.error.kind(), "generation failed: {}", failure.error);
    } else {
        info!(%status, kind = failure.error.kind(), "generation rejected: {}", failure.error);
    }

    HttpResponse::build(status).json(FailureEnvelope::new(
        failure.error.to_string(),
        failure.metadata,
    ))
}

pub async fn run(config: ServerConfig) -> AppResult<()> {
    let store = ReferenceStore::new(&config.assets_dir);
    for profile in store.missing() {
        warn!(
            ratio = %profile.ratio,
            path = %store.path_for(profile).display(),
            "reference image missing; requests for this ratio will fail"
        );
    }

    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; every generation request will fail");
    }

    let provider: Arc<dyn ImageProvider> = Arc::new(GeminiClient::new(config.gemini.clone()));
    let generator =
        ThumbnailGenerator::new(provider, store).with_timeout(config.provider_timeout);
    let state = web::Data::new(AppState::new(generator));
    let limit = config.max_body_bytes;

    info!(
        host = %config.host,
        port = config.port,
        model = %config.gemini.model,
        assets = %config.assets_dir.display(),
        "starting thumbnail server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .app_data(json_config(limit))
            .configure(configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
