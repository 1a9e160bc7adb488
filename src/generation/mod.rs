//! The boundary to the remote image generator.
//!
//! - **Client**: [`GenerationClient`] trait + [`GenerationError`]
//! - **Gemini**: [`GeminiClient`], the production implementation over the
//!   Gemini `generateContent` REST endpoint
//!
//! The session only cares whether a call succeeded. Status codes, retry
//! classes and response shapes stay inside the implementation; what crosses
//! the boundary is a payload or an error with a human-readable description.

pub mod client;
pub mod gemini;

pub use client::{GenerationClient, GenerationError};
pub use gemini::GeminiClient;
