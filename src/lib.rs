pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod models;
pub mod profiles;
pub mod prompt;
pub mod provider;
pub mod references;
pub mod server;

pub use config::ServerConfig;
pub use error::{AppError, AppResult, GenerationError};
pub use gemini::{GeminiClient, GeminiConfig};
pub use generator::{GenerationFailure, ThumbnailGenerator};
pub use models::{AspectRatio, GenerationRequest, GenerationResult, OutputFormat};
pub use provider::{ImageProvider, ProviderPart, ProviderRequest, ProviderResponse};
pub use references::ReferenceStore;
