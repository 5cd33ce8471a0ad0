//! Compile-only test to verify public API surface.
//!
//! This file serves as a compile-time contract for the public API.
//! If this file fails to compile, the public API has regressed.
//!
//! Run with: cargo test -- api_surface

// Allow unused imports - this test is about compile-time verification, not runtime usage
#![allow(unused_imports)]

// ============================================================================
// Descriptor Model
// ============================================================================

// model - ids, descriptors and the registry
use annoscope::model::{
    Annotation, AttributeValue, ElementRef, FieldDescriptor, FieldId, MethodDescriptor, MethodId,
    PackageDescriptor, PackageId, RegistryId, TypeDescriptor, TypeId, TypeKind, TypeRegistry,
};

// builder - name-based construction
use annoscope::builder::{
    AnnotationSpec, FieldSpec, MethodSpec, PackageSpec, RegistryBuilder, TypeSpec,
};

// manifest - JSON configuration
use annoscope::manifest::HierarchyManifest;

// core errors
use annoscope::{IntrospectionError, ManifestError, RegistryError};

// ============================================================================
// Resolution
// ============================================================================

use annoscope::cache::{CacheConfig, CacheKey, CacheStats, ResolutionCache, DEFAULT_CACHE_CAPACITY};
use annoscope::property::{property_name_of, resolve_property_name};
use annoscope::resolver::AnnotationResolver;

// ============================================================================
// Front Doors
// ============================================================================

use annoscope::cli::{self, ElementPath};
use annoscope::error::{AnnoError, AnnoResult, OutputErrorCode};
use annoscope::output::{
    emit_response, AnnotationInfo, ElementInfo, ElementListResponse, ErrorInfo, ErrorResponse,
    PropertyNameResponse, ResolveResponse, SCHEMA_VERSION,
};

// ============================================================================
// Test
// ============================================================================

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn api_surface_compiles() {
    // The imports above form the public API contract.
    let _ = std::any::type_name::<TypeRegistry>();
    let _ = std::any::type_name::<RegistryBuilder>();
    let _ = std::any::type_name::<HierarchyManifest>();
    let _ = std::any::type_name::<AnnotationResolver>();
    let _ = std::any::type_name::<AnnoError>();
    let _ = std::any::type_name::<ResolveResponse>();
}

#[test]
fn shared_state_is_thread_safe() {
    assert_send_sync::<TypeRegistry>();
    assert_send_sync::<ResolutionCache>();
    assert_send_sync::<AnnotationResolver>();
}

#[test]
fn schema_version_is_stable() {
    assert_eq!(SCHEMA_VERSION, "1");
}

#[test]
fn default_cache_capacity_is_stable() {
    assert_eq!(CacheConfig::default().initial_capacity, DEFAULT_CACHE_CAPACITY);
    assert_eq!(DEFAULT_CACHE_CAPACITY, 256);
}
