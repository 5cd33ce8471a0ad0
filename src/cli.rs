//! CLI front door: element lookups and JSON responses.
//!
//! Provides the helpers behind the `annoscope` binary:
//! - `method` / `type` / `element` - resolve one annotation kind
//! - `annotated-methods` - methods matching kinds across the ancestry
//! - `fields` / `methods` / `interfaces` - direct declarations, leaf first
//! - `property-name` - accessor name inference
//!
//! ## Element References
//!
//! Elements are named with [`ElementPath`] syntax:
//!
//! | Form | Element |
//! |------|---------|
//! | `web.Orders` | type |
//! | `web.Orders#execute()` | method with no parameters |
//! | `web.Orders#setId(long)` | method with parameter types |
//! | `web.Orders#id` | field |
//! | `package:web` | package |
//!
//! ## Error Handling
//!
//! All functions return `Result<T, AnnoError>`. A resolution miss is not an
//! error; naming something the manifest does not declare is.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use annoscope_core::{ElementRef, HierarchyManifest, TypeId, TypeRegistry};
use tracing::info;

use crate::cache::ResolutionCache;
use crate::error::{AnnoError, AnnoResult};
use crate::output::{
    AnnotationInfo, ElementInfo, ElementListResponse, PropertyNameResponse, ResolveResponse,
};
use crate::property::resolve_property_name;
use crate::resolver::AnnotationResolver;

// ============================================================================
// Element Paths
// ============================================================================

/// Textual reference to a program element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPath {
    Type(String),
    Method {
        owner: String,
        name: String,
        params: Vec<String>,
    },
    Field {
        owner: String,
        name: String,
    },
    Package(String),
}

impl FromStr for ElementPath {
    type Err = AnnoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AnnoError::InvalidArguments {
            message: format!("invalid element reference '{s}': {reason}"),
        };

        if let Some(package) = s.strip_prefix("package:") {
            if package.is_empty() {
                return Err(invalid("empty package name"));
            }
            return Ok(ElementPath::Package(package.to_string()));
        }

        let Some((owner, member)) = s.split_once('#') else {
            if s.is_empty() {
                return Err(invalid("empty type name"));
            }
            return Ok(ElementPath::Type(s.to_string()));
        };
        if owner.is_empty() || member.is_empty() {
            return Err(invalid("expected 'Type#member'"));
        }

        match member.split_once('(') {
            Some((name, rest)) => {
                let Some(params) = rest.strip_suffix(')') else {
                    return Err(invalid("unclosed parameter list"));
                };
                if name.is_empty() {
                    return Err(invalid("empty method name"));
                }
                let params = params
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(ElementPath::Method {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    params,
                })
            }
            None => Ok(ElementPath::Field {
                owner: owner.to_string(),
                name: member.to_string(),
            }),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a manifest and compose a resolver with a fresh cache.
pub fn load_resolver(manifest: &Path) -> AnnoResult<AnnotationResolver> {
    let registry = HierarchyManifest::load(manifest)?.into_registry()?;
    info!(
        manifest = %manifest.display(),
        types = registry.type_count(),
        methods = registry.method_count(),
        "registry ready"
    );
    Ok(AnnotationResolver::new(
        Arc::new(registry),
        Arc::new(ResolutionCache::new()),
    ))
}

// ============================================================================
// Lookups
// ============================================================================

fn lookup_type(registry: &TypeRegistry, name: &str) -> AnnoResult<TypeId> {
    registry.type_id(name).ok_or_else(|| AnnoError::UnknownType {
        name: name.to_string(),
    })
}

fn lookup_kind(registry: &TypeRegistry, name: &str) -> AnnoResult<TypeId> {
    let id = lookup_type(registry, name)?;
    match registry.ty(id) {
        Some(ty) if ty.is_annotation() => Ok(id),
        _ => Err(AnnoError::NotAnAnnotation {
            name: name.to_string(),
        }),
    }
}

/// Resolve a textual element reference against a registry.
pub fn lookup_element(registry: &TypeRegistry, path: &ElementPath) -> AnnoResult<ElementRef> {
    match path {
        ElementPath::Type(name) => lookup_type(registry, name).map(ElementRef::Type),
        ElementPath::Method {
            owner,
            name,
            params,
        } => {
            let owner_id = lookup_type(registry, owner)?;
            registry
                .declared_method(owner_id, name, params)
                .map(|m| ElementRef::Method(m.method_id))
                .ok_or_else(|| AnnoError::UnknownMethod {
                    type_name: owner.clone(),
                    signature: format!("{}({})", name, params.join(",")),
                })
        }
        ElementPath::Field { owner, name } => {
            let owner_id = lookup_type(registry, owner)?;
            registry
                .declared_fields(owner_id)
                .find(|f| &f.name == name)
                .map(|f| ElementRef::Field(f.field_id))
                .ok_or_else(|| AnnoError::UnknownField {
                    type_name: owner.clone(),
                    field: name.clone(),
                })
        }
        ElementPath::Package(name) => registry
            .package_by_name(name)
            .map(|p| ElementRef::Package(p.package_id))
            .ok_or_else(|| AnnoError::UnknownPackage { name: name.clone() }),
    }
}

fn resolve_response(
    resolver: &AnnotationResolver,
    element: ElementRef,
    kind_name: &str,
    found: Option<&annoscope_core::Annotation>,
) -> ResolveResponse {
    let registry = resolver.registry();
    ResolveResponse::new(
        ElementInfo::new(registry, element),
        kind_name,
        found.map(|a| AnnotationInfo::new(registry, a)),
        resolver.cache().stats(),
    )
}

// ============================================================================
// Commands
// ============================================================================

/// Resolve `kind` on a method, following overrides and interfaces.
pub fn run_resolve_method(
    resolver: &AnnotationResolver,
    method: &str,
    kind: &str,
) -> AnnoResult<ResolveResponse> {
    let registry = resolver.registry();
    let path: ElementPath = method.parse()?;
    let ElementPath::Method { .. } = path else {
        return Err(AnnoError::InvalidArguments {
            message: format!("'{method}' is not a method reference (expected 'Type#name(params)')"),
        });
    };
    let element = lookup_element(registry, &path)?;
    let kind_id = lookup_kind(registry, kind)?;
    let ElementRef::Method(method_id) = element else {
        return Err(AnnoError::InternalError {
            message: format!("method reference '{method}' resolved to {element}"),
        });
    };

    let found = resolver.find_method_annotation(method_id, kind_id);
    Ok(resolve_response(resolver, element, kind, found.as_deref()))
}

/// Resolve `kind` on a type, falling back to packages and superclasses.
pub fn run_resolve_type(
    resolver: &AnnotationResolver,
    ty: &str,
    kind: &str,
) -> AnnoResult<ResolveResponse> {
    let registry = resolver.registry();
    let type_id = lookup_type(registry, ty)?;
    let kind_id = lookup_kind(registry, kind)?;

    let found = resolver.find_type_annotation(type_id, kind_id);
    Ok(resolve_response(
        resolver,
        ElementRef::Type(type_id),
        kind,
        found.as_deref(),
    ))
}

/// Resolve `kind` directly on any element (one meta level, no inheritance).
pub fn run_resolve_element(
    resolver: &AnnotationResolver,
    element: &str,
    kind: &str,
) -> AnnoResult<ResolveResponse> {
    let registry = resolver.registry();
    let element = lookup_element(registry, &element.parse()?)?;
    let kind_id = lookup_kind(registry, kind)?;

    let found = resolver.annotation_on(element, kind_id);
    Ok(resolve_response(resolver, element, kind, found.as_deref()))
}

/// Methods of `ty` and its ancestry matching any of `kinds` (any annotation if empty).
///
/// The match set is unordered; output is sorted by display name.
pub fn run_annotated_methods(
    resolver: &AnnotationResolver,
    ty: &str,
    kinds: &[String],
) -> AnnoResult<ElementListResponse> {
    let registry = resolver.registry();
    let type_id = lookup_type(registry, ty)?;
    let kind_ids = kinds
        .iter()
        .map(|k| lookup_kind(registry, k))
        .collect::<AnnoResult<Vec<_>>>()?;

    let mut elements: Vec<ElementInfo> = resolver
        .annotated_methods(type_id, &kind_ids)
        .into_iter()
        .map(|m| ElementInfo::new(registry, ElementRef::Method(m)))
        .collect();
    elements.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(ElementListResponse::new(ty, kinds.to_vec(), elements))
}

/// Fields declared with `kind` along the superclass chain, leaf first.
pub fn run_annotated_fields(
    resolver: &AnnotationResolver,
    ty: &str,
    kind: &str,
) -> AnnoResult<ElementListResponse> {
    let registry = resolver.registry();
    let type_id = lookup_type(registry, ty)?;
    let kind_id = lookup_kind(registry, kind)?;

    let elements = resolver
        .annotated_fields(kind_id, type_id)
        .into_iter()
        .map(|f| ElementInfo::new(registry, ElementRef::Field(f)))
        .collect();
    Ok(ElementListResponse::new(ty, vec![kind.to_string()], elements))
}

/// Methods declared with `kind` along the superclass chain, leaf first.
pub fn run_annotated_declared_methods(
    resolver: &AnnotationResolver,
    ty: &str,
    kind: &str,
) -> AnnoResult<ElementListResponse> {
    let registry = resolver.registry();
    let type_id = lookup_type(registry, ty)?;
    let kind_id = lookup_kind(registry, kind)?;

    let elements = resolver
        .annotated_declared_methods(kind_id, type_id)
        .into_iter()
        .map(|m| ElementInfo::new(registry, ElementRef::Method(m)))
        .collect();
    Ok(ElementListResponse::new(ty, vec![kind.to_string()], elements))
}

/// Interfaces implemented along the superclass chain, leaf first.
pub fn run_interfaces(resolver: &AnnotationResolver, ty: &str) -> AnnoResult<ElementListResponse> {
    let registry = resolver.registry();
    let type_id = lookup_type(registry, ty)?;

    let elements = resolver
        .all_interfaces(type_id)
        .into_iter()
        .map(|i| ElementInfo::new(registry, ElementRef::Type(i)))
        .collect();
    Ok(ElementListResponse::new(ty, Vec::new(), elements))
}

/// Infer a property name; needs no manifest.
pub fn run_property_name(method: &str, param_count: usize) -> PropertyNameResponse {
    PropertyNameResponse::new(
        method,
        param_count,
        resolve_property_name(method, param_count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_types_and_packages() {
        assert_eq!(
            "web.Orders".parse::<ElementPath>().unwrap(),
            ElementPath::Type("web.Orders".into())
        );
        assert_eq!(
            "package:web".parse::<ElementPath>().unwrap(),
            ElementPath::Package("web".into())
        );
    }

    #[test]
    fn parses_methods_with_and_without_params() {
        assert_eq!(
            "web.Orders#execute()".parse::<ElementPath>().unwrap(),
            ElementPath::Method {
                owner: "web.Orders".into(),
                name: "execute".into(),
                params: vec![],
            }
        );
        assert_eq!(
            "web.Orders#find(long, String)".parse::<ElementPath>().unwrap(),
            ElementPath::Method {
                owner: "web.Orders".into(),
                name: "find".into(),
                params: vec!["long".into(), "String".into()],
            }
        );
    }

    #[test]
    fn parses_fields() {
        assert_eq!(
            "web.Orders#id".parse::<ElementPath>().unwrap(),
            ElementPath::Field {
                owner: "web.Orders".into(),
                name: "id".into(),
            }
        );
    }

    #[test]
    fn rejects_malformed_references() {
        for bad in ["", "#run()", "web.Orders#", "web.Orders#run(int", "web.Orders#(int)", "package:"] {
            let err = bad.parse::<ElementPath>().unwrap_err();
            assert!(
                matches!(err, AnnoError::InvalidArguments { .. }),
                "expected invalid arguments for {bad:?}"
            );
        }
    }

    #[test]
    fn property_name_needs_no_registry() {
        let response = run_property_name("isActive", 0);
        assert_eq!(response.property.as_deref(), Some("active"));
        assert_eq!(run_property_name("foo", 0).property, None);
    }
}
