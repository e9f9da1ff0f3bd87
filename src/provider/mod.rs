//! Provider-neutral view of the hosted image model.
//!
//! The generator builds a [`ProviderRequest`] and interprets the
//! [`ProviderResponse`]; transports only translate between these types and
//! the wire. Transport failures come back as typed [`GenerationError`]s.

use async_trait::async_trait;

use crate::error::GenerationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPart {
    /// Base64 payload, no `data:` prefix.
    InlineImage { mime: String, data: String },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub parts: Vec<ProviderPart>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderResponse {
    pub images: Vec<InlineImage>,
    pub text: Option<String>,
    /// Prompt-level block reason.
    pub block_reason: Option<String>,
    pub finish_reason: Option<String>,
    pub response_id: Option<String>,
    pub model: Option<String>,
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether credentials are present. Calls still fail when false.
    fn is_configured(&self) -> bool;

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, GenerationError>;
}
