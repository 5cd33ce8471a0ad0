//! Error types for registry construction, manifest loading and introspection.
//!
//! Resolution misses are never errors: a lookup that finds nothing returns
//! `None`. The types here cover the two places failure is real:
//!
//! - **Construction**: a descriptor graph that references unknown names,
//!   repeats a declaration, or inherits from itself ([`RegistryError`]).
//! - **Introspection**: an annotation attribute that names a type the
//!   registry does not contain ([`IntrospectionError`]). The resolver
//!   swallows these and treats the element as carrying no match.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::ElementRef;

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised while validating a descriptor graph in [`crate::RegistryBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two types were registered under the same qualified name.
    #[error("duplicate type '{name}'")]
    DuplicateType { name: String },

    /// Two packages were registered under the same name.
    #[error("duplicate package '{name}'")]
    DuplicatePackage { name: String },

    /// A type declares two methods with the same name and parameter types.
    #[error("duplicate method '{signature}' on type '{type_name}'")]
    DuplicateMethod {
        type_name: String,
        signature: String,
    },

    /// A type declares two fields with the same name.
    #[error("duplicate field '{field}' on type '{type_name}'")]
    DuplicateField { type_name: String, field: String },

    /// A referenced type name is not registered.
    #[error("unknown type '{name}' referenced by {referenced_by}")]
    UnknownType { name: String, referenced_by: String },

    /// A referenced package name is not registered.
    #[error("unknown package '{name}' referenced by {referenced_by}")]
    UnknownPackage { name: String, referenced_by: String },

    /// A superclass or root reference points at something other than a class.
    #[error("'{name}' is not a class (referenced by {referenced_by})")]
    NotAClass { name: String, referenced_by: String },

    /// An implemented interface reference points at something other than an interface.
    #[error("'{name}' is not an interface (referenced by {referenced_by})")]
    NotAnInterface { name: String, referenced_by: String },

    /// An annotation's kind is not an annotation type.
    #[error("'{name}' is not an annotation type (applied to {referenced_by})")]
    NotAnAnnotation { name: String, referenced_by: String },

    /// Interfaces and annotation types cannot extend a class.
    #[error("{kind} '{name}' cannot declare a superclass")]
    UnexpectedSuperclass { name: String, kind: String },

    /// The superclass/interface graph loops back on itself.
    #[error("inheritance cycle through type '{name}'")]
    InheritanceCycle { name: String },

    /// More elements of one kind than a `u32` id can number.
    #[error("too many {what} (ids are limited to u32)")]
    TooManyElements { what: &'static str },
}

// ============================================================================
// Manifest Errors
// ============================================================================

/// Errors raised while loading a [`crate::HierarchyManifest`].
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Manifest file could not be read.
    #[error("cannot read manifest {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Manifest content is not valid manifest JSON.
    #[error("invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Manifest parsed but describes an invalid descriptor graph.
    #[error("invalid hierarchy: {0}")]
    Registry(#[from] RegistryError),
}

// ============================================================================
// Introspection Errors
// ============================================================================

/// Failure to materialize the annotations declared on an element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntrospectionError {
    /// An attribute value names a type that is absent from the registry.
    #[error(
        "annotation '{annotation}' on {element}: attribute '{attribute}' references unknown type '{type_name}'"
    )]
    UnresolvedTypeReference {
        element: ElementRef,
        annotation: String,
        attribute: String,
        type_name: String,
    },
}

/// Result type for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;
