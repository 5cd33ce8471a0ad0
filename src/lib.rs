//! Annoscope: annotation resolution over type descriptor graphs.
//!
//! Given a registry of classes, interfaces, packages and their annotations,
//! answers which annotation of a given kind applies to a method, type or
//! field once inheritance, interface implementation, package defaults and
//! one level of meta-annotation are taken into account.

// Descriptor model - re-exported from annoscope-core
pub use annoscope_core::builder;
pub use annoscope_core::manifest;
pub use annoscope_core::model;
pub use annoscope_core::{
    Annotation, AnnotationSpec, AttributeValue, ElementRef, FieldId, FieldSpec,
    HierarchyManifest, IntrospectionError, ManifestError, MethodId, MethodSpec, PackageId,
    PackageSpec, RegistryBuilder, RegistryError, RegistryId, TypeId, TypeKind, TypeRegistry,
    TypeSpec,
};

// Resolution
pub mod cache;
pub mod property;
pub mod resolver;

// Front doors
pub mod cli;
pub mod error;
pub mod output;

pub use cache::{CacheConfig, CacheStats, ResolutionCache};
pub use error::{AnnoError, AnnoResult, OutputErrorCode};
pub use property::{property_name_of, resolve_property_name};
pub use resolver::AnnotationResolver;
