use thiserror::Error;

/// Unified error type for docx-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Document operations (opening, decoding, encoding, styles, tables)
/// - Translation operations (API requests, responses, rate limiting, credentials)
/// - Payload decoding (marker and segment mismatches)
/// - Checkpoint operations (reading, writing, clearing)
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Failed to open or parse a document
    #[error("failed to open document: {0}")]
    DocumentOpen(String),

    /// A required or referenced part of the document package could not be read
    #[error("failed to read document part '{part}': {reason}")]
    DocumentRead { part: String, reason: String },

    /// Failed to serialize a document
    #[error("failed to write document: {0}")]
    DocumentWrite(String),

    /// Style reference not present in the destination document
    #[error("style '{0}' not found in destination document")]
    StyleNotFound(String),

    /// Output table does not have the shape of its source table
    #[error("table at position {table} has shape {found:?}, expected {expected:?}")]
    TableShape {
        table: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// The API answered without any translated text
    #[error("translation API returned an empty response")]
    TranslationEmptyResponse,

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// No API credential configured for translation service
    #[error("translation API key not configured")]
    TranslationMissingApiKey,

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Every credential in the pool signalled a rate limit for the same payload
    #[error("all {attempts} credentials are rate limited")]
    CredentialsExhausted { attempts: usize },

    // ==========================================================================
    // Decode Errors
    // ==========================================================================
    /// Split-marker response carried a different number of segments than submitted
    #[error("response has {found} segments, expected {expected}")]
    SegmentCount { expected: usize, found: usize },

    // ==========================================================================
    // Checkpoint Errors
    // ==========================================================================
    /// Failed to read a checkpoint
    #[error("failed to read checkpoint: {0}")]
    CheckpointRead(String),

    /// Failed to write a checkpoint
    #[error("failed to write checkpoint: {0}")]
    CheckpointWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// Unsupported target language
    #[error("unsupported target language: {0}")]
    UnsupportedLanguage(String),

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the endpoint asked us to slow down with this credential.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::TranslationRateLimited { .. })
    }

    /// Whether this error must stop the whole run rather than fall back for one batch.
    pub const fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::CredentialsExhausted { .. } | Self::TranslationMissingApiKey
        )
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::DocumentOpen(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::DocumentOpen(format!("malformed XML: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::TranslationRateLimited { retry_after: None }.is_rate_limited());
        assert!(!Error::TranslationTimeout.is_rate_limited());
        assert!(Error::CredentialsExhausted { attempts: 2 }.is_run_fatal());
        assert!(!Error::TranslationEmptyResponse.is_run_fatal());
    }

    #[test]
    fn test_rate_limit_message() {
        let e = Error::TranslationRateLimited { retry_after: Some(7) };
        assert_eq!(e.to_string(), "translation rate limited, retry after 7 seconds");
    }
}
