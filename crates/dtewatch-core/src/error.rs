//! Error types for the dtewatch-core library.

use thiserror::Error;

/// Main error type for the dtewatch library.
#[derive(Error, Debug)]
pub enum DteError {
    /// Document classification or transformation error.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// API submission error.
    #[error("submit error: {0}")]
    Submit(#[from] SubmitError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning raw sections into a document payload.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The file matches no known document header.
    #[error("tipo de DTE no reconocido{}", .0.map(|t| format!(": {t}")).unwrap_or_default())]
    UnrecognizedDocumentType(Option<i64>),

    /// A required section is absent from the file.
    #[error("missing section: {0}")]
    MissingSection(&'static str),

    /// A load-bearing field position is absent from a line.
    #[error("missing field {index} in section {section}")]
    MissingField { section: &'static str, index: usize },

    /// A field could not be parsed into its expected type.
    #[error("failed to parse field {index} in section {section}: {value:?}")]
    Parse {
        section: &'static str,
        index: usize,
        value: String,
    },
}

/// Errors raised while posting a document to the invoicing API.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The API was reachable but answered with a non-200 HTTP status.
    #[error("API rejected the request: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    /// The request never completed (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the expected JSON envelope.
    #[error("malformed API response: {0}")]
    MalformedResponse(String),
}

/// Result type for the dtewatch library.
pub type Result<T> = std::result::Result<T, DteError>;
