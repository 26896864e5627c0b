//! Error types for the Threadline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

use crate::assistant::RunStatus;

/// The top-level error type for all Threadline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Remote assistant service ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Run outcomes ---
    #[error("Run {run_id} ended with status {status}{}", reason_suffix(.last_error))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        last_error: Option<String>,
    },

    #[error("Run {run_id} aborted by user")]
    Aborted { run_id: String },

    // --- Attachments ---
    #[error("Unsupported attachment '{file_name}': allowed extensions are {allowed}")]
    UnsupportedAttachment { file_name: String, allowed: String },

    #[error("Failed to read attachment {path}: {reason}")]
    AttachmentRead { path: String, reason: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default()
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the remote assistant service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
