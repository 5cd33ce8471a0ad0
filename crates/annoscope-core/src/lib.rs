//! Core descriptor model for annoscope.
//!
//! This crate provides the reflection-free type model the resolver runs against:
//! - Typed ids and element descriptors (types, methods, fields, packages)
//! - The immutable [`model::TypeRegistry`] descriptor graph
//! - [`builder::RegistryBuilder`] for assembling and validating a graph by name
//! - [`manifest::HierarchyManifest`] for loading a graph from JSON
//! - Error types for construction and introspection failures

pub mod builder;
pub mod error;
pub mod manifest;
pub mod model;

pub use builder::{AnnotationSpec, FieldSpec, MethodSpec, PackageSpec, RegistryBuilder, TypeSpec};
pub use error::{IntrospectionError, ManifestError, RegistryError};
pub use manifest::HierarchyManifest;
pub use model::{
    Annotation, AttributeValue, ElementRef, FieldDescriptor, FieldId, MethodDescriptor, MethodId,
    PackageDescriptor, PackageId, RegistryId, TypeDescriptor, TypeId, TypeKind, TypeRegistry,
};
