//! Generation client trait and error type.
//!
//! One operation: `generate(source, prompt) -> image`. It is asynchronous and
//! makes a single attempt. Implementations must not retry or back off on
//! their own; whether to try again is the user's call, made through the
//! session's `retry`.

use crate::capture::ImagePayload;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a generation call failed. Every variant renders a description fit to
/// show to the user.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{0}")]
    Transport(String),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("{0}")]
    UnusablePayload(String),
    #[error("missing API key: set the {0} environment variable")]
    MissingApiKey(String),
    /// Catch-all for implementations with nothing more specific to say.
    /// May be empty.
    #[error("{0}")]
    Other(String),
}

/// Turns a portrait and a prompt into a new image.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(
        &self,
        source: &ImagePayload,
        prompt: &str,
    ) -> Result<ImagePayload, GenerationError>;
}
