use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{AppResult, GenerationError},
    models::{GatewayMetadata, GenerationRequest, GenerationResult, PartialMetadata},
    profiles::{self, AspectRatioProfile},
    prompt,
    provider::{ImageProvider, ProviderPart, ProviderRequest, ProviderResponse},
    references::{self, ReferenceStore},
};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Finish reasons that mean the provider refused to render.
const BLOCKING_FINISH_REASONS: [&str; 7] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
];

#[derive(Debug, Clone)]
pub struct GenerationFailure {
    pub error: GenerationError,
    pub metadata: PartialMetadata,
}

impl GenerationFailure {
    fn new(error: GenerationError, metadata: PartialMetadata) -> Self {
        Self { error, metadata }
    }
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for GenerationFailure {}

#[derive(Clone)]
pub struct ThumbnailGenerator {
    provider: Arc<dyn ImageProvider>,
    references: ReferenceStore,
    timeout: Duration,
}

impl ThumbnailGenerator {
    pub fn new(provider: Arc<dyn ImageProvider>, references: ReferenceStore) -> Self {
        Self {
            provider,
            references,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &dyn ImageProvider {
        self.provider.as_ref()
    }

    pub fn references(&self) -> &ReferenceStore {
        &self.references
    }

    pub async fn build_and_submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationFailure> {
        let metadata = PartialMetadata::from_request(request);
        request
            .validate()
            .map_err(|error| GenerationFailure::new(error, metadata.clone()))?;

        let profile = profiles::profile_for(request.aspect_ratio);
        let metadata = metadata.with_profile(profile);
        let request_id = Uuid::new_v4().to_string();
        let fail = |error: GenerationError| {
            let mut metadata = metadata.clone();
            metadata.request_id = Some(request_id.clone());
            GenerationFailure::new(error, metadata)
        };

        let provider_request = self.assemble(profile, request).map_err(&fail)?;

        if request.cache_enabled {
            debug!(%request_id, "cacheEnabled set; responses are never cached");
        }

        info!(
            %request_id,
            ratio = %profile.ratio,
            width = profile.width,
            height = profile.height,
            user_image = request.user_image.is_some(),
            provider = self.provider.name(),
            "submitting thumbnail generation"
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.provider.generate(provider_request))
            .await
            .map_err(|_| {
                GenerationError::Timeout(format!(
                    "no response from {} within {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                ))
            })
            .and_then(|result| result);
        let latency = started.elapsed().as_millis() as u64;

        let response = outcome.map_err(|error| {
            warn!(%request_id, kind = error.kind(), latency, "provider call failed: {error}");
            fail(error)
        })?;

        let image_url = interpret_response(profile, &response).map_err(|error| {
            warn!(%request_id, kind = error.kind(), latency, "no usable image: {error}");
            fail(error)
        })?;

        info!(
            %request_id,
            latency,
            provider_response_id = response.response_id.as_deref().unwrap_or("-"),
            "thumbnail generated"
        );

        Ok(GenerationResult {
            image_url,
            prompt: request.prompt.clone(),
            width: profile.width,
            height: profile.height,
            aspect_ratio: profile.ratio,
            platform: profile.platform.to_string(),
            seed: request.seed,
            generated_at: Utc::now(),
            gateway: GatewayMetadata {
                request_id,
                latency,
            },
        })
    }

    /// Reference image first, then the optional user image, then the text.
    fn assemble(
        &self,
        profile: &AspectRatioProfile,
        request: &GenerationRequest,
    ) -> Result<ProviderRequest, GenerationError> {
        let reference = self.references.load(profile)?;
        let mut parts = vec![ProviderPart::InlineImage {
            mime: reference.mime.to_string(),
            data: STANDARD.encode(&reference.bytes),
        }];

        // The payload was decoded once by `validate`; forward it as sent.
        if let Some(data_url) = &request.user_image {
            let user_image = references::split_data_url(data_url)
                .map_err(|error| GenerationError::validation(format!("userImage: {error}")))?;
            parts.push(ProviderPart::InlineImage {
                mime: user_image.mime.to_string(),
                data: user_image.payload.to_string(),
            });
        }

        parts.push(ProviderPart::Text(prompt::build_instruction(
            profile,
            &request.prompt,
            request.user_image.is_some(),
        )));

        Ok(ProviderRequest {
            parts,
            seed: request.seed,
        })
    }
}

fn interpret_response(
    profile: &AspectRatioProfile,
    response: &ProviderResponse,
) -> Result<String, GenerationError> {
    if let Some(reason) = &response.block_reason {
        return Err(GenerationError::ProviderBlocked {
            reason: reason.clone(),
        });
    }

    let Some(image) = response.images.first() else {
        if let Some(reason) = response
            .finish_reason
            .as_deref()
            .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
        {
            return Err(GenerationError::ProviderBlocked {
                reason: reason.to_string(),
            });
        }

        return Err(GenerationError::ProviderEmptyResponse {
            feedback: response.text.clone(),
        });
    };

    check_dimensions(profile, &image.data);

    Ok(references::to_data_url(&image.mime, &image.data))
}

/// Reported dimensions always come from the profile; a mismatch is only logged.
fn check_dimensions(profile: &AspectRatioProfile, data: &str) {
    let measured = measure_base64(data);

    match measured {
        Ok((width, height)) if (width, height) != (profile.width, profile.height) => {
            warn!(
                ratio = %profile.ratio,
                expected_width = profile.width,
                expected_height = profile.height,
                width,
                height,
                "provider ignored the reference dimensions"
            );
        }
        Ok(_) => {}
        Err(error) => {
            warn!(ratio = %profile.ratio, "could not measure returned image: {error}");
        }
    }
}

/// Base64 characters decoded when sniffing an image header. A multiple of 4.
const HEADER_PREFIX_CHARS: usize = 64 * 1024;

fn header_prefix(data: &str) -> &str {
    data.get(..HEADER_PREFIX_CHARS).unwrap_or(data)
}

fn measure_base64(data: &str) -> AppResult<(u32, u32)> {
    let bytes = STANDARD.decode(header_prefix(data))?;
    references::measure(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AspectRatio;

    fn response_with_image(data: &str) -> ProviderResponse {
        ProviderResponse {
            images: vec![crate::provider::InlineImage {
                mime: "image/png".to_string(),
                data: data.to_string(),
            }],
            ..ProviderResponse::default()
        }
    }

    #[test]
    fn block_reason_wins_over_images() {
        let profile = profiles::profile_for(AspectRatio::Square);
        let mut response = response_with_image("AAAA");
        response.block_reason = Some("OTHER".to_string());

        let error = interpret_response(profile, &response).expect_err("blocked");
        assert_eq!(
            error,
            GenerationError::ProviderBlocked {
                reason: "OTHER".to_string()
            }
        );
    }

    #[test]
    fn blocking_finish_reason_without_image_is_blocked() {
        let profile = profiles::profile_for(AspectRatio::Square);
        let response = ProviderResponse {
            finish_reason: Some("IMAGE_SAFETY".to_string()),
            ..ProviderResponse::default()
        };

        let error = interpret_response(profile, &response).expect_err("blocked");
        assert!(error.to_string().contains("IMAGE_SAFETY"));
    }

    #[test]
    fn text_only_response_is_empty_with_feedback() {
        let profile = profiles::profile_for(AspectRatio::Square);
        let response = ProviderResponse {
            text: Some("I cannot draw that".to_string()),
            finish_reason: Some("STOP".to_string()),
            ..ProviderResponse::default()
        };

        let error = interpret_response(profile, &response).expect_err("empty");
        assert_eq!(
            error,
            GenerationError::ProviderEmptyResponse {
                feedback: Some("I cannot draw that".to_string())
            }
        );
    }

    #[test]
    fn measuring_reads_only_the_header_prefix() {
        let mut bytes = references::render_blank(1344, 768).expect("render");
        bytes.extend(std::iter::repeat(0u8).take(200_000));
        let data = STANDARD.encode(&bytes);

        assert_eq!(header_prefix(&data).len(), HEADER_PREFIX_CHARS);
        assert_eq!(header_prefix("AAAA"), "AAAA");
        assert_eq!(measure_base64(&data).expect("measure"), (1344, 768));
    }

    #[test]
    fn image_becomes_data_url_with_declared_mime() {
        let profile = profiles::profile_for(AspectRatio::Square);
        let png = references::render_blank(8, 8).expect("render");
        let response = response_with_image(&STANDARD.encode(png));

        let url = interpret_response(profile, &response).expect("image");
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
