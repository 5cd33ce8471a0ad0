//! Unified error type and exit codes for annoscope front doors.
//!
//! Library operations never fail on a miss; errors only arise at the edges:
//! loading a manifest, or naming an element that the registry does not
//! contain. [`AnnoError`] bridges the core crate's errors into one type with
//! a stable [`OutputErrorCode`] for JSON output and process exit codes:
//!
//! - `2`: Invalid arguments (malformed element reference)
//! - `3`: Lookup errors (unknown type, method, field or annotation kind)
//! - `4`: Manifest errors (unreadable file, bad JSON, invalid hierarchy)
//! - `10`: Internal errors

use std::fmt;

use annoscope_core::{ManifestError, RegistryError};
use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller.
    InvalidArguments = 2,
    /// Named element not found in the registry.
    LookupError = 3,
    /// Manifest could not be loaded or validated.
    ManifestError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI and library front doors.
#[derive(Debug, Error)]
pub enum AnnoError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// No type registered under this name.
    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    /// The name exists but is not an annotation type.
    #[error("'{name}' is not an annotation type")]
    NotAnAnnotation { name: String },

    /// No method with this signature declared on the type.
    #[error("no method '{signature}' declared on '{type_name}'")]
    UnknownMethod {
        type_name: String,
        signature: String,
    },

    /// No field with this name declared on the type.
    #[error("no field '{field}' declared on '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// No package registered under this name.
    #[error("unknown package '{name}'")]
    UnknownPackage { name: String },

    /// Manifest loading or validation failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&AnnoError> for OutputErrorCode {
    fn from(err: &AnnoError) -> Self {
        match err {
            AnnoError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            AnnoError::UnknownType { .. }
            | AnnoError::NotAnAnnotation { .. }
            | AnnoError::UnknownMethod { .. }
            | AnnoError::UnknownField { .. }
            | AnnoError::UnknownPackage { .. } => OutputErrorCode::LookupError,
            AnnoError::Manifest(_) => OutputErrorCode::ManifestError,
            AnnoError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<AnnoError> for OutputErrorCode {
    fn from(err: AnnoError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: RegistryError -> AnnoError
// ============================================================================

impl From<RegistryError> for AnnoError {
    fn from(err: RegistryError) -> Self {
        AnnoError::Manifest(ManifestError::Registry(err))
    }
}

// ============================================================================
// Bridge: serde_json::Error -> AnnoError
// ============================================================================

impl From<serde_json::Error> for AnnoError {
    fn from(err: serde_json::Error) -> Self {
        AnnoError::InternalError {
            message: format!("JSON serialization failed: {err}"),
        }
    }
}

/// Result type for front-door operations.
pub type AnnoResult<T> = Result<T, AnnoError>;
