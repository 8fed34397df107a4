//! Error types for the copy generation pipeline.

/// Errors that can occur while generating ad copy.
#[derive(Debug, thiserror::Error)]
pub enum CopyStudioError {
    /// No usable API key at startup.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The Gemini API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The Gemini API answered without any usable text.
    #[error("Gemini returned an empty response")]
    EmptyResponse,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (e.g., reading an image, appending output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed ledger record on disk.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for copy generation operations.
pub type Result<T> = std::result::Result<T, CopyStudioError>;
