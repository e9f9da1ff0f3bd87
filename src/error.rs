use actix_web::http::StatusCode;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode/encode error: {0}")]
    Image(#[from] image::ImageError),
}

impl AppError {
    pub fn msg<T: Into<String>>(message: T) -> Self {
        Self::Message(message.into())
    }
}

/// Failure taxonomy for a single thumbnail generation.
///
/// Every variant carries a human-readable message and maps to exactly one
/// HTTP status through [`GenerationError::status_code`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),
    #[error("server configuration error: {0}")]
    Configuration(String),
    #[error("The request was blocked by the image provider ({reason}). Try rephrasing your prompt.")]
    ProviderBlocked { reason: String },
    #[error("{}", empty_response_message(.feedback.as_deref()))]
    ProviderEmptyResponse { feedback: Option<String> },
    #[error("too many requests: {0}")]
    RateLimited(String),
    #[error("image model unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("image generation timed out: {0}")]
    Timeout(String),
    #[error("image generation failed: {0}")]
    Unknown(String),
}

impl GenerationError {
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ProviderBlocked { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::ProviderEmptyResponse { .. } | Self::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable tag, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::ProviderBlocked { .. } => "provider_blocked",
            Self::ProviderEmptyResponse { .. } => "provider_empty_response",
            Self::RateLimited(_) => "rate_limited",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Unknown(_) => "unknown",
        }
    }
}

fn empty_response_message(feedback: Option<&str>) -> String {
    match feedback {
        Some(text) => format!(
            "The model did not produce an image. Model feedback: {text}. Try rephrasing your prompt."
        ),
        None => "No image was produced by the model. Try rephrasing your prompt with a more concrete visual description.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_message_keeps_reason_verbatim() {
        let error = GenerationError::ProviderBlocked {
            reason: "SAFETY".to_string(),
        };
        assert!(error.to_string().contains("SAFETY"));
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_response_without_feedback_suggests_rephrasing() {
        let message = GenerationError::ProviderEmptyResponse { feedback: None }.to_string();
        assert!(message.contains("No image was produced"));
        assert!(message.contains("rephrasing"));
    }

    #[test]
    fn empty_response_quotes_feedback() {
        let message = GenerationError::ProviderEmptyResponse {
            feedback: Some("I can only describe images".to_string()),
        }
        .to_string();
        assert!(message.contains("I can only describe images"));
        assert!(message.contains("rephrasing"));
    }

    #[test]
    fn app_errors_convert_from_plumbing_failures() {
        use base64::Engine;

        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let decode = base64::engine::general_purpose::STANDARD
            .decode("!!!")
            .map_err(AppError::from)
            .expect_err("invalid base64");
        let image = crate::references::measure(b"not an image").expect_err("no header");

        let tags: Vec<&str> = [AppError::msg("plain"), io, decode, image]
            .iter()
            .map(|error| match error {
                AppError::Message(_) => "message",
                AppError::Io(_) => "io",
                AppError::Base64(_) => "base64",
                AppError::Image(_) => "image",
            })
            .collect();
        assert_eq!(tags, ["message", "io", "base64", "image"]);
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        let cases = [
            (GenerationError::validation("x"), 400),
            (GenerationError::configuration("x"), 500),
            (GenerationError::RateLimited("x".into()), 429),
            (GenerationError::ProviderUnavailable("x".into()), 503),
            (GenerationError::Timeout("x".into()), 504),
            (GenerationError::Unknown("x".into()), 500),
            (GenerationError::ProviderEmptyResponse { feedback: None }, 500),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{}", error.kind());
        }
    }
}
