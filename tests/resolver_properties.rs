//! Resolution behavior over the `actions.json` hierarchy.
//!
//! The fixture models a small web framework:
//!
//! ```text
//! lang.Object (root)            execute() @Action("root")
//!   web.ActionSupport           @Secured, implements Serializable
//!                               execute() @Action("support"), setItem(Bean) @Inject
//!     web.ActionFoo             implements Auditable { execute() @Audit }
//!       web.ActionBar           execute(), list() @Routed (meta @Action("routed"))
//!     admin.Panel               package admin (no annotations)
//!   web.Plain                   execute()
//!   web.Broken                  run() @Ghost(target = missing.Gone)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use annoscope::{
    AnnotationResolver, AttributeValue, ElementRef, HierarchyManifest, MethodId,
    ResolutionCache, TypeId, TypeRegistry,
};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("actions.json")
}

fn load_registry() -> Arc<TypeRegistry> {
    let registry = HierarchyManifest::load(fixture_path())
        .and_then(HierarchyManifest::into_registry)
        .expect("fixture manifest is valid");
    Arc::new(registry)
}

fn resolver() -> AnnotationResolver {
    AnnotationResolver::with_fresh_cache(load_registry())
}

fn ty(resolver: &AnnotationResolver, name: &str) -> TypeId {
    resolver
        .registry()
        .type_id(name)
        .unwrap_or_else(|| panic!("fixture has no type {name}"))
}

fn method(resolver: &AnnotationResolver, owner: &str, name: &str) -> MethodId {
    let owner_id = ty(resolver, owner);
    resolver
        .registry()
        .declared_methods(owner_id)
        .find(|m| m.name == name)
        .map(|m| m.method_id)
        .unwrap_or_else(|| panic!("fixture has no method {owner}#{name}"))
}

fn name_attr(annotation: &annoscope::Annotation) -> Option<&str> {
    match annotation.attribute("name") {
        Some(AttributeValue::Str(name)) => Some(name.as_str()),
        _ => None,
    }
}

// ============================================================================
// Method Resolution
// ============================================================================

#[test]
fn method_inherits_from_nearest_annotated_superclass() {
    let r = resolver();
    let found = r
        .find_method_annotation(method(&r, "web.ActionBar", "execute"), ty(&r, "web.Action"))
        .expect("inherited from ActionSupport");

    assert_eq!(name_attr(&found), Some("support"));
}

#[test]
fn interface_of_a_superclass_is_searched_before_further_superclasses() {
    let r = resolver();
    let found = r.find_method_annotation(method(&r, "web.ActionBar", "execute"), ty(&r, "web.Audit"));

    assert!(found.is_some());
    assert_eq!(found.map(|a| a.kind), Some(ty(&r, "web.Audit")));
}

#[test]
fn walk_stops_before_root_class() {
    let r = resolver();
    let action = ty(&r, "web.Action");

    assert!(r
        .find_method_annotation(method(&r, "web.Plain", "execute"), action)
        .is_none());
    // The root's own method still resolves directly.
    let on_root = r
        .find_method_annotation(method(&r, "lang.Object", "execute"), action)
        .expect("declared on root");
    assert_eq!(name_attr(&on_root), Some("root"));
}

#[test]
fn meta_annotation_counts_one_level_deep() {
    let r = resolver();
    let list = method(&r, "web.ActionBar", "list");

    let found = r
        .find_method_annotation(list, ty(&r, "web.Action"))
        .expect("@Routed is itself annotated with @Action");
    assert_eq!(name_attr(&found), Some("routed"));
    assert!(r
        .annotation_on(ElementRef::Method(list), ty(&r, "web.Secured"))
        .is_none());
}

#[test]
fn introspection_failure_is_no_match() {
    let r = resolver();
    let run = method(&r, "web.Broken", "run");

    assert!(r.registry().annotations(ElementRef::Method(run)).is_err());
    assert!(r
        .find_method_annotation(run, ty(&r, "web.Ghost"))
        .is_none());
    assert!(r
        .annotation_on(ElementRef::Method(run), ty(&r, "web.Ghost"))
        .is_none());
}

// ============================================================================
// Type Resolution
// ============================================================================

#[test]
fn type_annotation_falls_back_to_superclass() {
    let r = resolver();
    let found = r
        .find_type_annotation(ty(&r, "web.ActionBar"), ty(&r, "web.Secured"))
        .expect("declared on ActionSupport");

    assert_eq!(
        found.attribute("role"),
        Some(&AttributeValue::Str("user".into()))
    );
}

#[test]
fn type_annotation_falls_back_to_package() {
    let r = resolver();
    let namespace = ty(&r, "web.Namespace");

    // Own package first.
    assert!(r
        .find_type_annotation(ty(&r, "web.ActionBar"), namespace)
        .is_some());
    // admin has no annotations; the superclass's package supplies it.
    let found = r
        .find_type_annotation(ty(&r, "admin.Panel"), namespace)
        .expect("from package web via ActionSupport");
    assert_eq!(
        found.attribute("value"),
        Some(&AttributeValue::Str("/web".into()))
    );
}

#[test]
fn type_without_any_source_is_none() {
    let r = resolver();
    assert!(r
        .find_type_annotation(ty(&r, "web.Plain"), ty(&r, "web.Secured"))
        .is_none());
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn second_lookup_is_served_from_cache() {
    let r = resolver();
    let execute = method(&r, "web.ActionBar", "execute");
    let action = ty(&r, "web.Action");

    let first = r.find_method_annotation(execute, action).unwrap();
    let before = r.cache().stats();
    let second = r.find_method_annotation(execute, action).unwrap();
    let after = r.cache().stats();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(after.hits, before.hits + 1);
    assert_eq!(after.inserts, before.inserts);
}

#[test]
fn misses_are_not_cached() {
    let r = resolver();
    let execute = method(&r, "web.Plain", "execute");

    assert!(r
        .find_method_annotation(execute, ty(&r, "web.Action"))
        .is_none());
    assert!(r.cache().is_empty());
}

#[test]
fn resolvers_sharing_a_cache_share_results() {
    let registry = load_registry();
    let cache = ResolutionCache::shared();
    let a = AnnotationResolver::new(Arc::clone(&registry), Arc::clone(&cache));
    let b = AnnotationResolver::new(registry, cache);

    let execute = method(&a, "web.ActionFoo", "execute");
    let action = ty(&a, "web.Action");
    let from_a = a.find_method_annotation(execute, action).unwrap();
    let from_b = b.find_method_annotation(execute, action).unwrap();

    assert!(Arc::ptr_eq(&from_a, &from_b));
    assert_eq!(b.cache().stats().hits, 1);
}

#[test]
fn concurrent_lookups_agree() {
    let r = resolver();
    let execute = method(&r, "web.ActionBar", "execute");
    let action = ty(&r, "web.Action");

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = r.clone();
                scope.spawn(move || r.find_method_annotation(execute, action))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    let cached = r.find_method_annotation(execute, action).unwrap();
    for found in &results {
        assert_eq!(**found, *cached);
    }
    assert_eq!(r.cache().len(), 1);
}

// ============================================================================
// Collection
// ============================================================================

#[test]
fn annotated_methods_cover_the_whole_chain() {
    let r = resolver();
    let found = r.annotated_methods(ty(&r, "web.ActionBar"), &[ty(&r, "web.Action")]);

    let mut names: Vec<String> = found
        .into_iter()
        .map(|m| r.registry().element_name(ElementRef::Method(m)))
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "lang.Object#execute()",
            "web.ActionBar#execute()",
            "web.ActionBar#list()",
            "web.ActionFoo#execute()",
            "web.ActionSupport#execute()",
        ]
    );
}

#[test]
fn annotated_methods_without_kinds_skip_broken_methods() {
    let r = resolver();
    let found = r.annotated_methods(ty(&r, "web.Broken"), &[]);

    assert_eq!(
        found.into_iter().collect::<Vec<_>>(),
        vec![method(&r, "lang.Object", "execute")]
    );
}

#[test]
fn fields_and_methods_are_listed_leaf_first() {
    let r = resolver();
    let bar = ty(&r, "web.ActionBar");
    let inject = ty(&r, "web.Inject");
    let names = |elements: Vec<ElementRef>| -> Vec<String> {
        elements
            .into_iter()
            .map(|e| r.registry().element_name(e))
            .collect()
    };

    assert_eq!(
        names(
            r.annotated_fields(inject, bar)
                .into_iter()
                .map(ElementRef::Field)
                .collect()
        ),
        vec!["web.ActionFoo#item", "web.ActionSupport#log"]
    );
    assert_eq!(
        names(
            r.annotated_declared_methods(inject, bar)
                .into_iter()
                .map(ElementRef::Method)
                .collect()
        ),
        vec!["web.ActionSupport#setItem(web.Bean)"]
    );
}

#[test]
fn interfaces_are_listed_leaf_first() {
    let r = resolver();
    let interfaces: Vec<&str> = r
        .all_interfaces(ty(&r, "web.ActionBar"))
        .into_iter()
        .map(|i| r.registry().type_name(i))
        .collect();

    assert_eq!(interfaces, vec!["web.Auditable", "web.Serializable"]);
}
