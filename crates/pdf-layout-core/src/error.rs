use thiserror::Error;

/// Unified error type for pdf-layout-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Document operations (opening, extracting, rasterizing, painting, saving)
/// - Provider operations (translation and OCR requests, responses, timeouts)
/// - Cache operations (initialization, reading, writing)
/// - Configuration and font loading
/// - General I/O operations
///
/// Text that does not fit its box is not an error. The document engine reports
/// it as [`crate::pdf::InsertOutcome::Overflow`] and the fitter resolves it.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page number requested
    #[error("invalid page number {page} (document has {total} pages)")]
    PdfInvalidPage { page: usize, total: usize },

    /// Failed to extract text from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// Failed to rasterize a PDF page
    #[error("failed to render page {page}: {reason}")]
    PdfRender { page: usize, reason: String },

    /// Failed to paint onto a PDF page
    #[error("failed to paint page {page}: {reason}")]
    PdfPaint { page: usize, reason: String },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Provider Errors
    // ==========================================================================
    /// Translation or OCR request exceeded its time budget
    #[error("{operation} request timed out")]
    ProviderTimeout { operation: &'static str },

    /// Rate limiting, a server-side failure or a dropped connection
    #[error(
        "{operation} failed: {reason}{}",
        retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default()
    )]
    ProviderTransient {
        operation: &'static str,
        reason: String,
        retry_after: Option<u64>,
    },

    /// Permanent provider failure (client errors, unusable responses)
    #[error("{operation} failed: {reason}")]
    ProviderFatal {
        operation: &'static str,
        reason: String,
    },

    /// OCR response was not a JSON array of regions
    #[error("failed to parse OCR response: {0}")]
    OcrParse(String),

    /// API key not configured for the provider
    #[error("provider API key not configured")]
    MissingApiKey,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    /// Failed to load or parse a font file
    #[error("failed to load font {alias}: {reason}")]
    Font { alias: String, reason: String },

    // ==========================================================================
    // Control
    // ==========================================================================
    /// The document job was cancelled before the next remote call
    #[error("translation cancelled")]
    Cancelled,

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable error codes reported to the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ProviderTimeout,
    ProviderTransient,
    ProviderFatal,
    DocumentError,
    Cancelled,
    Internal,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProviderTimeout => "provider_timeout",
            Self::ProviderTransient => "provider_transient",
            Self::ProviderFatal => "provider_fatal",
            Self::DocumentError => "document_error",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Map this error onto the reporting taxonomy.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::PdfOpen(_)
            | Self::PdfInvalidPage { .. }
            | Self::PdfTextExtraction { .. }
            | Self::PdfRender { .. }
            | Self::PdfPaint { .. }
            | Self::PdfSave(_)
            | Self::Lopdf(_) => ErrorCode::DocumentError,
            Self::ProviderTimeout { .. } => ErrorCode::ProviderTimeout,
            Self::ProviderTransient { .. } => ErrorCode::ProviderTransient,
            Self::ProviderFatal { .. } | Self::OcrParse(_) | Self::MissingApiKey => {
                ErrorCode::ProviderFatal
            }
            Self::Cancelled => ErrorCode::Cancelled,
            Self::CacheInit(_)
            | Self::CacheWrite(_)
            | Self::ConfigLoad(_)
            | Self::ConfigInvalid { .. }
            | Self::Font { .. }
            | Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// Whether another attempt at the same request may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderTimeout { .. } | Self::ProviderTransient { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_and_transients_retry() {
        assert!(Error::ProviderTimeout { operation: "ocr" }.is_retryable());
        assert!(
            Error::ProviderTransient {
                operation: "translate",
                reason: "HTTP 503".into(),
                retry_after: None,
            }
            .is_retryable()
        );
        assert!(!Error::OcrParse("not a list".into()).is_retryable());
        assert!(
            !Error::ProviderFatal {
                operation: "translate",
                reason: "HTTP 400".into(),
            }
            .is_retryable()
        );
        assert!(!Error::PdfOpen("bad".into()).is_retryable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::OcrParse(String::new()).code(), ErrorCode::ProviderFatal);
        assert_eq!(Error::MissingApiKey.code(), ErrorCode::ProviderFatal);
        assert_eq!(Error::PdfSave(String::new()).code(), ErrorCode::DocumentError);
        assert_eq!(
            Error::ProviderTimeout { operation: "translate" }.code().as_str(),
            "provider_timeout"
        );
        assert_eq!(Error::Cancelled.code().to_string(), "cancelled");
    }

    #[test]
    fn test_transient_message_mentions_retry_after() {
        let err = Error::ProviderTransient {
            operation: "translate",
            reason: "HTTP 429".into(),
            retry_after: Some(7),
        };
        assert_eq!(err.to_string(), "translate failed: HTTP 429, retry after 7 seconds");
    }
}
