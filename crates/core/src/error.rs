//! Error types for the llmask domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all llmask operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Background material errors ---
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    // --- Answer handling ---
    #[error("Failed to parse answer: {0}")]
    AnswerParse(String),

    #[error("Too many tries: [{}]", errors.join("; "))]
    TooManyRetries { errors: Vec<String> },

    #[error("Too many tool rounds: gave up after {rounds}")]
    TooManyToolRounds { rounds: u32 },

    #[error("Unhandled finish reason: {0:?}")]
    UnhandledFinishReason(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Streaming sink ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The request exceeded a size or rate limit; `tokens` is the total the
    /// provider reported, when it reported one.
    #[error("Limit exceeded (total tokens = {}): {message}", tokens.map(|t| t.to_string()).unwrap_or_else(|| "unknown".into()))]
    LimitExceeded { tokens: Option<u64>, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0:?}")]
    NotFound(String),

    #[error("Tool name {key:?} does not match definition name {defined:?}")]
    NameMismatch { key: String, defined: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported content type: {0:?}")]
    UnsupportedContentType(String),

    #[error("No file extension found for content type {0:?}")]
    NoExtensionForContentType(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Text extraction failed ({status}): {stderr}")]
    ExtractionFailed { status: String, stderr: String },
}
