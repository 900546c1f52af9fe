//! Error types for the query pipeline.
//!
//! Each pipeline stage that parses model output has its own error variant
//! carrying the raw response text, so prompt or schema regressions surface
//! with enough context to diagnose. The orchestrator's public entry point
//! converts any of these into an error-shaped result instead of raising.

use thiserror::Error;

/// Errors produced by the agent pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the provider.
    #[error("API key missing: set OPENAI_API_KEY or VISRAG_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not recognized.
    #[error("Unsupported provider: {name}")]
    UnsupportedProvider {
        /// The unrecognized provider name.
        name: String,
    },

    /// A provider API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error description from the transport layer.
        message: String,
        /// HTTP status code, if one was received.
        status: Option<u16>,
    },

    /// A page image could not be read or encoded for a provider call.
    #[error("Failed to encode image {path}: {message}")]
    ImageEncoding {
        /// Path of the offending image.
        path: String,
        /// Underlying I/O error description.
        message: String,
    },

    /// Conversation context processing or summarization failed.
    #[error("Context processing failed: {message}")]
    ContextProcessing {
        /// Error description.
        message: String,
    },

    /// The reformulation response was malformed or missing its key.
    #[error("Query reformulation failed: {message}")]
    QueryReformulation {
        /// Error description.
        message: String,
        /// Raw model response for diagnosis.
        content: String,
    },

    /// The classification response was malformed or missing keys.
    #[error("Query classification failed: {message}")]
    QueryClassification {
        /// Error description.
        message: String,
        /// Raw model response for diagnosis.
        content: String,
    },

    /// Initial planning or a plan update returned an invalid payload.
    #[error("Task planning failed: {message}")]
    TaskPlanning {
        /// Error description.
        message: String,
        /// Raw model response for diagnosis.
        content: String,
    },

    /// Page selection returned unparsable JSON or zero valid ordinals.
    #[error("Page selection failed: {message}")]
    PageSelection {
        /// Error description.
        message: String,
        /// Raw model response for diagnosis.
        content: String,
    },

    /// A storage collaborator call failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A pipeline invariant was violated.
    #[error("Orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },
}

/// Errors produced by document storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No document with the given id exists.
    #[error("Document not found: {id}")]
    DocumentNotFound {
        /// The missing document id.
        id: String,
    },

    /// The backend failed internally.
    #[error("Storage backend error: {message}")]
    Backend {
        /// Error description.
        message: String,
    },
}

/// Convenience alias for pipeline results.
pub type Result<T, E = AgentError> = std::result::Result<T, E>;
