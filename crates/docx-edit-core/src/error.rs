use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the document mutation engine.
#[derive(Debug, Error)]
pub enum DocxError {
    /// The path resolves outside every allowed root.
    #[error("Access to {path} denied. Allowed paths: {allowed}")]
    AccessDenied { path: PathBuf, allowed: String },

    /// A required input file is missing.
    #[error("File {0} does not exist")]
    NotFound(PathBuf),

    /// A file that must be created is already present.
    #[error("File {0} already exists")]
    AlreadyExists(PathBuf),

    /// A table, row or column index is out of bounds.
    #[error("{0}")]
    InvalidIndex(String),

    /// A caller-supplied operation or content block could not be decoded.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A pattern-mode rule failed to compile.
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The DOCX container or one of its XML parts is unusable.
    #[error("Package error: {0}")]
    Package(String),

    /// PDF parsing or text extraction failed.
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DocxError {
    fn from(err: zip::result::ZipError) -> Self {
        DocxError::Package(err.to_string())
    }
}

impl From<roxmltree::Error> for DocxError {
    fn from(err: roxmltree::Error) -> Self {
        DocxError::Package(format!("malformed XML: {err}"))
    }
}

impl From<lopdf::Error> for DocxError {
    fn from(err: lopdf::Error) -> Self {
        DocxError::Pdf(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DocxError>;
