//! Error types for the IMERG library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting precipitation data.
#[derive(Error, Debug)]
pub enum ImergError {
    /// IO error when reading files or directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested filename is empty or tries to leave the data directory.
    #[error("Invalid filename: {name:?}")]
    InvalidFilename { name: String },

    /// The requested granule does not exist in the data directory.
    #[error("GPM file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Neither the grouped nor the flat layout could be opened.
    #[error("Failed to open {path}: grouped layout: {grouped}; flat layout: {flat}")]
    OpenFailure {
        path: PathBuf,
        grouped: String,
        flat: String,
    },

    /// None of the known precipitation variable names is present.
    #[error("Variable not found (tried {candidates:?})")]
    VariableNotFound { candidates: Vec<String> },

    /// Reading a variable from an open dataset failed.
    #[error("Failed to read variable '{name}': {reason}")]
    Read { name: String, reason: String },

    /// The precipitation field is not two-dimensional after squeezing.
    #[error("Variable '{name}' has rank {} after squeezing (shape {shape:?}), expected a 2-D field", .shape.len())]
    UnsupportedRank { name: String, shape: Vec<usize> },

    /// The field shape does not line up with the coordinate lengths.
    #[error("Field shape {shape:?} does not match {lat_len} latitudes x {lon_len} longitudes")]
    ShapeMismatch {
        shape: Vec<usize>,
        lat_len: usize,
        lon_len: usize,
    },

    /// A dataset backend could not open or read a file.
    #[error("Dataset backend error: {0}")]
    Backend(String),

    /// A binary sparse payload could not be decoded.
    #[error("Malformed binary payload: {reason}")]
    MalformedPayload { reason: String },
}

/// Stable classification of [`ImergError`] for request boundaries.
///
/// Unlike the error messages, these kinds never carry paths or backend
/// details and can be shown to remote callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    OpenFailure,
    VariableNotFound,
    ProcessingFailure,
}

impl ErrorKind {
    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::OpenFailure => "open_failure",
            ErrorKind::VariableNotFound => "variable_not_found",
            ErrorKind::ProcessingFailure => "processing_failure",
        }
    }

    /// Human-readable message that is safe to return to callers.
    pub fn public_message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::NotFound => "file not found",
            ErrorKind::OpenFailure => "dataset could not be opened",
            ErrorKind::VariableNotFound => "no precipitation variable in dataset",
            ErrorKind::ProcessingFailure => "processing failed",
        }
    }
}

impl ImergError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImergError::InvalidFilename { .. } => ErrorKind::InvalidRequest,
            ImergError::FileNotFound { .. } => ErrorKind::NotFound,
            ImergError::OpenFailure { .. } => ErrorKind::OpenFailure,
            ImergError::VariableNotFound { .. } => ErrorKind::VariableNotFound,
            ImergError::Io(_)
            | ImergError::Backend(_)
            | ImergError::Read { .. }
            | ImergError::UnsupportedRank { .. }
            | ImergError::ShapeMismatch { .. }
            | ImergError::MalformedPayload { .. } => ErrorKind::ProcessingFailure,
        }
    }

    pub(crate) fn read(name: &str, reason: impl ToString) -> Self {
        ImergError::Read {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using [`ImergError`].
pub type Result<T> = std::result::Result<T, ImergError>;
