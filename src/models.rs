use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::GenerationError, profiles::AspectRatioProfile, prompt, references};

pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MAX_SEED: i64 = i32::MAX as i64;
pub const MIN_OUTPUT_QUALITY: u8 = 1;
pub const MAX_OUTPUT_QUALITY: u8 = 100;
pub const DEFAULT_OUTPUT_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::Classic,
        Self::ClassicPortrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Classic => "4:3",
            Self::ClassicPortrait => "3:4",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [Self::Png, Self::Jpeg, Self::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }
}

fn default_output_quality() -> u8 {
    DEFAULT_OUTPUT_QUALITY
}

/// JSON body of `POST /api/image`.
///
/// Enum fields are checked by deserialization; range and length checks
/// happen in [`GenerationRequest::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub seed: Option<i64>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_output_quality")]
    pub output_quality: u8,
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub user_image: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            seed: None,
            output_format: OutputFormat::default(),
            output_quality: DEFAULT_OUTPUT_QUALITY,
            cache_enabled: false,
            user_image: None,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_user_image(mut self, data_url: impl Into<String>) -> Self {
        self.user_image = Some(data_url.into());
        self
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        prompt::validate_prompt(&self.prompt)?;

        if let Some(seed) = self.seed {
            if !(0..=MAX_SEED).contains(&seed) {
                return Err(GenerationError::validation(format!(
                    "seed must be between 0 and {MAX_SEED}"
                )));
            }
        }

        if !(MIN_OUTPUT_QUALITY..=MAX_OUTPUT_QUALITY).contains(&self.output_quality) {
            return Err(GenerationError::validation(format!(
                "outputQuality must be between {MIN_OUTPUT_QUALITY} and {MAX_OUTPUT_QUALITY}"
            )));
        }

        if let Some(data_url) = &self.user_image {
            references::parse_data_url(data_url)
                .map_err(|error| GenerationError::validation(format!("userImage: {error}")))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayMetadata {
    pub request_id: String,
    /// Milliseconds spent waiting on the provider.
    pub latency: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub image_url: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: AspectRatio,
    pub platform: String,
    pub seed: Option<i64>,
    pub generated_at: DateTime<Utc>,
    pub gateway: GatewayMetadata,
}

/// Whatever was known about a request when it failed.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PartialMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl PartialMetadata {
    pub fn from_request(request: &GenerationRequest) -> Self {
        Self {
            prompt: Some(request.prompt.clone()),
            aspect_ratio: Some(request.aspect_ratio),
            seed: request.seed,
            ..Self::default()
        }
    }

    /// Best-effort metadata from a body that failed the request schema.
    pub fn from_raw_body(body: &serde_json::Value) -> Self {
        Self {
            prompt: body
                .get("prompt")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
            aspect_ratio: body
                .get("aspectRatio")
                .and_then(|ratio| AspectRatio::deserialize(ratio).ok()),
            seed: body.get("seed").and_then(serde_json::Value::as_i64),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: &AspectRatioProfile) -> Self {
        self.width = Some(profile.width);
        self.height = Some(profile.height);
        self.platform = Some(profile.platform.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMetadata {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub aspect_ratio: AspectRatio,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub generated_at: DateTime<Utc>,
    pub gateway_metadata: GatewayMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    pub success: bool,
    pub image_url: String,
    pub metadata: SuccessMetadata,
}

impl From<GenerationResult> for SuccessEnvelope {
    fn from(result: GenerationResult) -> Self {
        Self {
            success: true,
            image_url: result.image_url,
            metadata: SuccessMetadata {
                prompt: result.prompt,
                width: result.width,
                height: result.height,
                aspect_ratio: result.aspect_ratio,
                platform: result.platform,
                seed: result.seed,
                generated_at: result.generated_at,
                gateway_metadata: result.gateway,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    pub metadata: PartialMetadata,
}

impl FailureEnvelope {
    pub fn new(error: impl Into<String>, metadata: PartialMetadata) -> Self {
        Self {
            success: false,
            error: error.into(),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectRatioInfo {
    pub ratio: AspectRatio,
    pub width: u32,
    pub height: u32,
    pub platform: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLimits {
    pub max_prompt_length: usize,
    pub seed_max: i64,
    pub min_output_quality: u8,
    pub max_output_quality: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model: String,
    pub configured: bool,
    pub supported_formats: Vec<OutputFormat>,
    pub aspect_ratios: Vec<AspectRatioInfo>,
    pub capabilities: Vec<&'static str>,
    pub limits: ServiceLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_camel_case_and_defaults() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "prompt": "a cat astronaut",
            "aspectRatio": "16:9",
            "cacheEnabled": true
        }))
        .expect("valid body");

        assert_eq!(request.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(request.output_format, OutputFormat::Png);
        assert_eq!(request.output_quality, DEFAULT_OUTPUT_QUALITY);
        assert!(request.cache_enabled);
        assert!(request.seed.is_none());
        assert!(request.user_image.is_none());
    }

    #[test]
    fn unknown_aspect_ratio_fails_deserialization() {
        let result = serde_json::from_value::<GenerationRequest>(serde_json::json!({
            "prompt": "a cat astronaut",
            "aspectRatio": "21:9"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn validate_bounds_seed_and_quality() {
        let base = GenerationRequest::new("a cat astronaut", AspectRatio::Square);
        assert!(base.clone().with_seed(0).validate().is_ok());
        assert!(base.clone().with_seed(MAX_SEED).validate().is_ok());
        assert!(base.clone().with_seed(MAX_SEED + 1).validate().is_err());
        assert!(base.clone().with_seed(-5).validate().is_err());

        let too_low = GenerationRequest {
            output_quality: 0,
            ..base.clone()
        };
        assert!(too_low.validate().is_err());

        let too_high = GenerationRequest {
            output_quality: 101,
            ..base
        };
        assert!(too_high.validate().is_err());
    }

    #[test]
    fn validate_rejects_unsupported_user_image() {
        let request = GenerationRequest::new("a cat astronaut", AspectRatio::Square)
            .with_user_image("data:image/gif;base64,R0lGOA==");
        let error = request.validate().expect_err("gif rejected");
        assert!(error.to_string().starts_with("userImage:"));
    }

    #[test]
    fn aspect_ratio_labels_round_trip_through_serde() {
        for ratio in AspectRatio::ALL {
            let json = serde_json::to_value(ratio).expect("serialize");
            assert_eq!(json, serde_json::json!(ratio.as_str()));
        }
    }

    #[test]
    fn raw_body_metadata_keeps_what_parses() {
        let metadata = PartialMetadata::from_raw_body(&serde_json::json!({
            "prompt": "a cat astronaut",
            "aspectRatio": "21:9",
            "seed": 7
        }));
        assert_eq!(metadata.prompt.as_deref(), Some("a cat astronaut"));
        assert!(metadata.aspect_ratio.is_none());
        assert_eq!(metadata.seed, Some(7));

        let metadata = PartialMetadata::from_raw_body(&serde_json::json!("not an object"));
        assert!(metadata.prompt.is_none());
    }

    #[test]
    fn partial_metadata_skips_unknown_fields() {
        let json = serde_json::to_value(PartialMetadata {
            prompt: Some("x".to_string()),
            ..PartialMetadata::default()
        })
        .expect("serialize");
        assert_eq!(json, serde_json::json!({ "prompt": "x" }));
    }
}
