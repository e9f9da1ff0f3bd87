use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    error::GenerationError,
    provider::{ImageProvider, InlineImage, ProviderPart, ProviderRequest, ProviderResponse},
};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let api_key = non_empty_env("GEMINI_API_KEY");
        let model = non_empty_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base =
            non_empty_env("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            api_key,
            model,
            api_base,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn require_api_key(&self) -> Result<&str, GenerationError> {
        self.api_key.as_deref().ok_or_else(|| {
            GenerationError::configuration("GEMINI_API_KEY is missing. Add it to .env")
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, GenerationError> {
        let api_key = self.config.require_api_key()?;
        let payload = build_payload(&request);
        let payload_value = serde_json::to_value(&payload)
            .map_err(|error| GenerationError::Unknown(format!("failed to encode request: {error}")))?;

        debug!(
            model = %self.config.model,
            payload = %sanitize_payload(payload_value.clone()),
            "sending generateContent request"
        );

        let response = self
            .http_client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&payload_value)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let error = parse_gemini_http_error(status, &body);
            warn!(%status, kind = error.kind(), "gemini request failed");
            return Err(error);
        }

        let response_json: Value = serde_json::from_str(&body).map_err(|error| {
            GenerationError::Unknown(format!("could not parse provider response: {error}"))
        })?;

        let parsed = parse_response(&response_json);
        info!(
            model = parsed.model.as_deref().unwrap_or(&self.config.model),
            images = parsed.images.len(),
            finish_reason = parsed.finish_reason.as_deref().unwrap_or("-"),
            block_reason = parsed.block_reason.as_deref().unwrap_or("-"),
            "gemini response received"
        );

        Ok(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentPayload {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

fn build_payload(request: &ProviderRequest) -> GenerateContentPayload {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            ProviderPart::Text(text) => Part::Text { text: text.clone() },
            ProviderPart::InlineImage { mime, data } => Part::InlineData {
                inline_data: InlineDataPayload {
                    mime_type: mime.clone(),
                    data: data.clone(),
                },
            },
        })
        .collect();

    GenerateContentPayload {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
            seed: request.seed,
        },
    }
}

/// Deadlines are enforced by the caller, so the client carries no timeout.
fn map_transport_error(error: reqwest::Error) -> GenerationError {
    if error.is_connect() {
        GenerationError::ProviderUnavailable(error.to_string())
    } else {
        GenerationError::Unknown(error.to_string())
    }
}

fn parse_gemini_http_error(status: StatusCode, body: &str) -> GenerationError {
    let json = serde_json::from_str::<Value>(body).ok();
    let error_status = json
        .as_ref()
        .and_then(|json| json.pointer("/error/status"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let message = json
        .as_ref()
        .and_then(|json| {
            json.pointer("/error/message")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    let message = if message.is_empty() {
        format!("provider returned {status}")
    } else {
        message
    };

    match (status.as_u16(), error_status.as_str()) {
        (429, _) | (_, "RESOURCE_EXHAUSTED") => GenerationError::RateLimited(message),
        (503, _) | (404, _) | (_, "UNAVAILABLE") | (_, "NOT_FOUND") => {
            GenerationError::ProviderUnavailable(message)
        }
        (504, _) | (_, "DEADLINE_EXCEEDED") => GenerationError::Timeout(message),
        (401, _) | (403, _) | (_, "UNAUTHENTICATED") | (_, "PERMISSION_DENIED") => {
            GenerationError::configuration(format!("provider rejected credentials: {message}"))
        }
        (400, _) | (_, "INVALID_ARGUMENT") | (_, "FAILED_PRECONDITION") => {
            GenerationError::Validation(format!("provider rejected the request: {message}"))
        }
        _ => GenerationError::Unknown(format!("provider request failed ({status}): {message}")),
    }
}

fn parse_response(response: &Value) -> ProviderResponse {
    let block_reason = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
        .filter(|reason| !reason.trim().is_empty())
        .map(str::to_string);
    let candidate = response.pointer("/candidates/0");
    let finish_reason = candidate
        .and_then(|candidate| candidate.get("finishReason"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut images = Vec::new();
    let mut texts = Vec::new();

    let parts = candidate
        .and_then(|candidate| candidate.pointer("/content/parts"))
        .and_then(Value::as_array);
    for part in parts.into_iter().flatten() {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                texts.push(trimmed.to_string());
            }
        }

        let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
        if let Some(inline) = inline {
            let data = inline.get("data").and_then(Value::as_str);
            let mime = inline
                .get("mimeType")
                .or_else(|| inline.get("mime_type"))
                .and_then(Value::as_str)
                .unwrap_or("image/png");
            if let Some(data) = data.filter(|data| !data.is_empty()) {
                images.push(InlineImage {
                    mime: mime.to_string(),
                    data: data.to_string(),
                });
            }
        }
    }

    ProviderResponse {
        images,
        text: if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        },
        block_reason,
        finish_reason,
        response_id: response
            .get("responseId")
            .and_then(Value::as_str)
            .map(str::to_string),
        model: response
            .get("modelVersion")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn sanitize_payload(payload: Value) -> Value {
    fn walk(value: &mut Value) {
        match value {
            Value::Object(map) => {
                if let Some(Value::Object(inline)) = map.get_mut("inlineData") {
                    if let Some(Value::String(data)) = inline.get("data") {
                        let marker = json!(format!("[omitted {} base64 chars]", data.len()));
                        inline.insert("data".to_string(), marker);
                    }
                }
                for value in map.values_mut() {
                    walk(value);
                }
            }
            Value::Array(array) => {
                for value in array.iter_mut() {
                    walk(value);
                }
            }
            _ => {}
        }
    }

    let mut sanitized = payload;
    walk(&mut sanitized);
    sanitized
}
