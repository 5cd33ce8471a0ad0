//! Annotation resolution over a [`TypeRegistry`].
//!
//! The resolver answers "does this element carry annotation kind `K`,
//! directly or through its ancestry?" for methods, types and fields.
//!
//! # Lookup Rules
//!
//! - **Direct** ([`AnnotationResolver::annotation_on`]): the element's own
//!   annotations, then one level of meta-annotation (an annotation whose
//!   type is itself annotated with `K`). Meta lookup does not recurse.
//! - **Method** ([`AnnotationResolver::find_method_annotation`]): direct
//!   lookup on the method, then same-signature methods on the declaring
//!   type's interfaces, then on each superclass (and that superclass's
//!   interfaces) until the root class.
//! - **Type** ([`AnnotationResolver::find_type_annotation`]): the type, its
//!   package, then the same for each superclass.
//!
//! Matches are memoized in the shared [`ResolutionCache`]; misses are not.
//!
//! # Introspection Failures
//!
//! An element whose annotations cannot be materialized (an attribute names
//! an unregistered type) is treated as carrying no match. The failure is
//! logged at `debug` and never propagated.

use std::collections::HashSet;
use std::sync::Arc;

use annoscope_core::{
    Annotation, ElementRef, FieldId, IntrospectionError, MethodDescriptor, MethodId, TypeId,
    TypeRegistry,
};
use tracing::{debug, trace};

use crate::cache::{CacheKey, ResolutionCache};

/// Resolves annotations against one registry, memoizing into a shared cache.
///
/// Cloning is cheap; clones share the registry and the cache.
#[derive(Debug, Clone)]
pub struct AnnotationResolver {
    registry: Arc<TypeRegistry>,
    cache: Arc<ResolutionCache>,
}

impl AnnotationResolver {
    pub fn new(registry: Arc<TypeRegistry>, cache: Arc<ResolutionCache>) -> Self {
        AnnotationResolver { registry, cache }
    }

    /// Resolver with a private, default-sized cache.
    pub fn with_fresh_cache(registry: Arc<TypeRegistry>) -> Self {
        Self::new(registry, ResolutionCache::shared())
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    // ========================================================================
    // Method resolution
    // ========================================================================

    /// Find `kind` on a method or on the methods it overrides or implements.
    ///
    /// Search order, first match wins:
    /// 1. the method itself (with one meta level)
    /// 2. same-signature methods on the declaring type's interfaces, for
    ///    interfaces that have any annotated method at all
    /// 3. for each superclass up to (excluding) the root class: its declared
    ///    same-signature method, then its interfaces as in step 2
    pub fn find_method_annotation(&self, method: MethodId, kind: TypeId) -> Option<Arc<Annotation>> {
        let key = CacheKey::new(self.registry.id(), ElementRef::Method(method), kind);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let descriptor = self.registry.method(method)?;
        let mut current = descriptor.declaring_type;
        let mut result = self
            .annotation_on(ElementRef::Method(method), kind)
            .or_else(|| self.search_on_interfaces(descriptor, kind, current));

        while result.is_none() {
            let Some(superclass) = self.registry.superclass(current) else {
                break;
            };
            if Some(superclass) == self.registry.root() {
                break;
            }
            current = superclass;
            trace!(
                method = %descriptor.signature(),
                level = %self.registry.type_name(current),
                "searching superclass"
            );

            result = self
                .registry
                .declared_method(current, &descriptor.name, &descriptor.params)
                .and_then(|equivalent| {
                    self.annotation_on(ElementRef::Method(equivalent.method_id), kind)
                })
                .or_else(|| self.search_on_interfaces(descriptor, kind, current));
        }

        result.map(|found| self.cache.insert(key, found))
    }

    fn search_on_interfaces(
        &self,
        method: &MethodDescriptor,
        kind: TypeId,
        owner: TypeId,
    ) -> Option<Arc<Annotation>> {
        self.registry
            .interfaces(owner)
            .iter()
            .filter(|&&iface| self.has_annotated_methods(iface))
            .find_map(|&iface| {
                let equivalent = self
                    .registry
                    .public_method(iface, &method.name, &method.params)?;
                self.annotation_on(ElementRef::Method(equivalent.method_id), kind)
            })
    }

    /// Whether any method visible on `interface` carries any annotation.
    fn has_annotated_methods(&self, interface: TypeId) -> bool {
        if let Some(flag) = self.cache.interface_flag(self.registry.id(), interface) {
            return flag;
        }

        let found = self
            .registry
            .interface_methods(interface)
            .iter()
            .any(|method| {
                match self.registry.annotations(ElementRef::Method(method.method_id)) {
                    Ok(annotations) => !annotations.is_empty(),
                    Err(err) => {
                        log_introspection_failure(&err);
                        false
                    }
                }
            });

        self.cache
            .record_interface_flag(self.registry.id(), interface, found)
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Find `kind` on a type, falling back to its package, then to each
    /// superclass and its package, until the chain ends.
    ///
    /// Only directly declared annotations count at each level.
    pub fn find_type_annotation(&self, ty: TypeId, kind: TypeId) -> Option<Arc<Annotation>> {
        let key = CacheKey::new(self.registry.id(), ElementRef::Type(ty), kind);
        if let Some(cached) = self.cache.get(&key) {
            return Some(cached);
        }

        let mut current = Some(ty);
        let mut result = None;
        while let Some(level) = current {
            result = self.declared(ElementRef::Type(level), kind).or_else(|| {
                self.registry
                    .ty(level)
                    .and_then(|t| t.package)
                    .and_then(|package| self.declared(ElementRef::Package(package), kind))
            });
            if result.is_some() {
                break;
            }
            current = self.registry.superclass(level);
        }

        result.map(|found| self.cache.insert(key, found))
    }

    // ========================================================================
    // Direct lookup
    // ========================================================================

    /// Find `kind` declared on `element`, or on the type of one of its
    /// annotations (one meta level, not recursive).
    ///
    /// Annotations are scanned in declared order. Introspection failures
    /// count as no match.
    pub fn annotation_on(&self, element: ElementRef, kind: TypeId) -> Option<Arc<Annotation>> {
        match self.try_annotation_on(element, kind) {
            Ok(found) => found,
            Err(err) => {
                log_introspection_failure(&err);
                None
            }
        }
    }

    fn try_annotation_on(
        &self,
        element: ElementRef,
        kind: TypeId,
    ) -> Result<Option<Arc<Annotation>>, IntrospectionError> {
        let declared = self.registry.annotations(element)?;
        if let Some(direct) = declared.iter().find(|a| a.kind == kind) {
            return Ok(Some(Arc::clone(direct)));
        }
        for annotation in declared {
            let meta = self.registry.annotations(ElementRef::Type(annotation.kind))?;
            if let Some(found) = meta.iter().find(|m| m.kind == kind) {
                return Ok(Some(Arc::clone(found)));
            }
        }
        Ok(None)
    }

    /// `kind` declared directly on `element`, no meta lookup.
    fn declared(&self, element: ElementRef, kind: TypeId) -> Option<Arc<Annotation>> {
        match self.registry.annotations(element) {
            Ok(annotations) => annotations.iter().find(|a| a.kind == kind).cloned(),
            Err(err) => {
                log_introspection_failure(&err);
                None
            }
        }
    }

    fn carries(&self, element: ElementRef, kind: TypeId) -> bool {
        self.declared(element, kind).is_some()
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Methods of `ty` and its ancestry that match `kinds`.
    ///
    /// With no kinds, any method carrying at least one annotation matches.
    /// Otherwise a method matches when [`Self::find_method_annotation`]
    /// succeeds for any of the kinds. Classes walk the superclass chain;
    /// interfaces walk their superinterfaces.
    pub fn annotated_methods(&self, ty: TypeId, kinds: &[TypeId]) -> HashSet<MethodId> {
        let mut matched = HashSet::new();
        let mut visited = HashSet::new();
        self.collect_methods(ty, kinds, &mut matched, &mut visited);
        matched
    }

    fn collect_methods(
        &self,
        ty: TypeId,
        kinds: &[TypeId],
        matched: &mut HashSet<MethodId>,
        visited: &mut HashSet<TypeId>,
    ) {
        if !visited.insert(ty) {
            return;
        }
        for method in self.registry.declared_methods(ty) {
            let element = ElementRef::Method(method.method_id);
            let is_match = if kinds.is_empty() {
                self.registry
                    .annotations(element)
                    .map(|annotations| !annotations.is_empty())
                    .unwrap_or_else(|err| {
                        log_introspection_failure(&err);
                        false
                    })
            } else {
                kinds
                    .iter()
                    .any(|&kind| self.find_method_annotation(method.method_id, kind).is_some())
            };
            if is_match {
                matched.insert(method.method_id);
            }
        }

        let Some(descriptor) = self.registry.ty(ty) else {
            return;
        };
        if let Some(superclass) = descriptor.superclass {
            self.collect_methods(superclass, kinds, matched, visited);
        } else if descriptor.is_interface() {
            for &parent in &descriptor.interfaces {
                self.collect_methods(parent, kinds, matched, visited);
            }
        }
    }

    /// Fields declared with `kind` on `ty` and every superclass, leaf first.
    pub fn annotated_fields(&self, kind: TypeId, ty: TypeId) -> Vec<FieldId> {
        self.class_chain(ty)
            .flat_map(|level| self.registry.declared_fields(level))
            .map(|field| field.field_id)
            .filter(|&field| self.carries(ElementRef::Field(field), kind))
            .collect()
    }

    /// Methods declared with `kind` on `ty` and every superclass, leaf first.
    ///
    /// Unlike [`Self::annotated_methods`] this is a direct check per
    /// declaration: no override inheritance, no meta lookup.
    pub fn annotated_declared_methods(&self, kind: TypeId, ty: TypeId) -> Vec<MethodId> {
        self.class_chain(ty)
            .flat_map(|level| self.registry.declared_methods(level))
            .map(|method| method.method_id)
            .filter(|&method| self.carries(ElementRef::Method(method), kind))
            .collect()
    }

    /// Interfaces directly implemented by `ty` and every superclass, leaf first.
    ///
    /// Superinterfaces of those interfaces are not expanded, and an
    /// interface implemented at two levels appears twice.
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        self.class_chain(ty)
            .flat_map(|level| self.registry.interfaces(level).iter().copied())
            .collect()
    }

    /// `ty`, then each superclass until the chain ends (root included).
    fn class_chain(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::successors(self.registry.ty(ty).map(|t| t.type_id), move |&level| {
            self.registry.superclass(level)
        })
    }
}

fn log_introspection_failure(err: &IntrospectionError) {
    debug!(error = %err, "annotation introspection failed; treating as no match");
}

// ============================================================================
// Tests
// ============================================================================
