//! JSON output types for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** every response starts with `status` and `schema_version`
//! 2. **Deterministic:** same manifest and query, same output (element lists are
//!    either walk-ordered or sorted)
//! 3. **Nullable vs absent:** a resolution miss is an explicit `"annotation": null`

use std::collections::BTreeMap;
use std::io::{self, Write};

use annoscope_core::{Annotation, AttributeValue, ElementRef, TypeRegistry};
use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::error::{AnnoError, OutputErrorCode};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Building Blocks
// ============================================================================

/// A program element as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// One of: type, method, field, package.
    pub kind: String,
    /// Qualified display name, e.g. `web.Orders#execute()`.
    pub name: String,
}

impl ElementInfo {
    pub fn new(registry: &TypeRegistry, element: ElementRef) -> Self {
        let kind = match element {
            ElementRef::Type(_) => "type",
            ElementRef::Method(_) => "method",
            ElementRef::Field(_) => "field",
            ElementRef::Package(_) => "package",
        };
        ElementInfo {
            kind: kind.to_string(),
            name: registry.element_name(element),
        }
    }
}

/// A resolved annotation with its kind spelled out by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationInfo {
    pub kind: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AnnotationInfo {
    pub fn new(registry: &TypeRegistry, annotation: &Annotation) -> Self {
        AnnotationInfo {
            kind: registry.type_name(annotation.kind).to_string(),
            attributes: annotation.attributes.clone(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Response for single-annotation lookups (`method`, `type`, `element`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Element the lookup started from.
    pub element: ElementInfo,
    /// Annotation kind requested.
    pub requested: String,
    /// The match, or null.
    pub annotation: Option<AnnotationInfo>,
    pub cache: CacheStats,
}

impl ResolveResponse {
    pub fn new(
        element: ElementInfo,
        requested: impl Into<String>,
        annotation: Option<AnnotationInfo>,
        cache: CacheStats,
    ) -> Self {
        ResolveResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            element,
            requested: requested.into(),
            annotation,
            cache,
        }
    }
}

/// Response for collection queries (`annotated-methods`, `fields`, `methods`, `interfaces`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementListResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    /// Type the walk started from.
    pub start: String,
    /// Annotation kinds filtered on (empty for "any" or for interface listing).
    pub kinds: Vec<String>,
    pub elements: Vec<ElementInfo>,
}

impl ElementListResponse {
    pub fn new(start: impl Into<String>, kinds: Vec<String>, elements: Vec<ElementInfo>) -> Self {
        ElementListResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            start: start.into(),
            kinds,
            elements,
        }
    }
}

/// Response for `property-name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyNameResponse {
    /// Status: "ok".
    pub status: String,
    pub schema_version: String,
    pub method: String,
    pub param_count: usize,
    /// Inferred property, or null.
    pub property: Option<String>,
}

impl PropertyNameResponse {
    pub fn new(method: impl Into<String>, param_count: usize, property: Option<String>) -> Self {
        PropertyNameResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            method: method.into(),
            param_count,
            property,
        }
    }
}

/// Error details in an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &AnnoError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Response emitted for any failed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &AnnoError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty JSON followed by a newline.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
