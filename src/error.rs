use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsolidatorError {
    #[error("Unable to list root path '{path}': {source}")]
    RootUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Publishing table '{table}' failed: {details}")]
    PublishFailed { table: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failures reported by a remote file store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Denied(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed store response: {0}")]
    Malformed(String),
}

/// Failures turning raw bytes into a grid or page text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Unsupported format for {0}")]
    UnsupportedFormat(String),

    #[error("Workbook could not be opened: {0}")]
    Workbook(String),

    #[error("Workbook has no sheets")]
    NoSheets,

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("PDF has no pages")]
    NoPages,
}

/// Failures extracting a canonical table from a decoded document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Document could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    #[error("Anchor '{0}' not found")]
    AnchorNotFound(String),

    #[error("Expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Required column '{0}' missing")]
    MissingColumn(String),

    #[error("Layout not recognized: {0}")]
    UnrecognizedLayout(String),

    #[error("Extraction task aborted: {0}")]
    TaskAborted(String),
}

pub type Result<T> = std::result::Result<T, ConsolidatorError>;
