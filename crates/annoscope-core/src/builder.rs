//! Registry construction from name-based specs.
//!
//! Specs refer to each other by qualified name, so a hierarchy can be
//! declared in any order. [`RegistryBuilder::build`] assigns dense ids,
//! resolves every name, and rejects graphs the resolver cannot walk safely.
//!
//! The `*Spec` types double as the JSON manifest schema (see
//! [`crate::manifest`]), so they derive `Serialize`/`Deserialize`.
//!
//! ```ignore
//! let registry = RegistryBuilder::new()
//!     .root("lang.Object")
//!     .with_type(TypeSpec::class("lang.Object"))
//!     .with_type(TypeSpec::annotation("web.Action"))
//!     .with_type(
//!         TypeSpec::class("web.OrderAction")
//!             .extends("lang.Object")
//!             .method(MethodSpec::new("execute").annotated(AnnotationSpec::new("web.Action"))),
//!     )
//!     .build()?;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::model::{
    Annotation, AttributeValue, FieldDescriptor, FieldId, MethodDescriptor, MethodId,
    PackageDescriptor, PackageId, TypeDescriptor, TypeId, TypeKind, TypeRegistry,
};

// ============================================================================
// Specs
// ============================================================================

/// An annotation to apply, by kind name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl AnnotationSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        AnnotationSpec {
            kind: kind.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// A method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationSpec>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        MethodSpec {
            name: name.into(),
            params: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn param(mut self, type_name: impl Into<String>) -> Self {
        self.params.push(type_name.into());
        self
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(","))
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub annotations: Vec<AnnotationSpec>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        FieldSpec {
            name: name.into(),
            type_name: type_name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A package declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<AnnotationSpec>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        PackageSpec {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub annotations: Vec<AnnotationSpec>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        TypeSpec {
            name: name.into(),
            kind,
            package: None,
            superclass: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn annotation(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Annotation)
    }

    pub fn in_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add a directly implemented interface.
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add a superinterface. Same storage as [`TypeSpec::implements`]; reads better on interfaces.
    pub fn extends_interface(self, interface: impl Into<String>) -> Self {
        self.implements(interface)
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects specs and validates them into a [`TypeRegistry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    root: Option<String>,
    packages: Vec<PackageSpec>,
    types: Vec<TypeSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the universal root class (must itself be registered as a class).
    pub fn root(mut self, name: impl Into<String>) -> Self {
        self.root = Some(name.into());
        self
    }

    pub fn with_package(mut self, package: PackageSpec) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_type(mut self, ty: TypeSpec) -> Self {
        self.types.push(ty);
        self
    }

    pub fn add_package(&mut self, package: PackageSpec) -> &mut Self {
        self.packages.push(package);
        self
    }

    pub fn add_type(&mut self, ty: TypeSpec) -> &mut Self {
        self.types.push(ty);
        self
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Vec<PackageSpec>, Vec<TypeSpec>) {
        (self.root, self.packages, self.types)
    }

    /// Resolve all names and produce the registry.
    pub fn build(self) -> RegistryResult<TypeRegistry> {
        let mut package_ids: HashMap<&str, PackageId> = HashMap::new();
        for (index, package) in self.packages.iter().enumerate() {
            if package_ids
                .insert(package.name.as_str(), PackageId::new(dense_index(index, "packages")?))
                .is_some()
            {
                return Err(RegistryError::DuplicatePackage {
                    name: package.name.clone(),
                });
            }
        }

        let mut kinds: HashMap<&str, (TypeId, TypeKind)> = HashMap::new();
        for (index, ty) in self.types.iter().enumerate() {
            if kinds
                .insert(ty.name.as_str(), (TypeId::new(dense_index(index, "types")?), ty.kind))
                .is_some()
            {
                return Err(RegistryError::DuplicateType {
                    name: ty.name.clone(),
                });
            }
        }

        let resolver = NameResolver {
            kinds: &kinds,
            packages: &package_ids,
        };

        let root = match &self.root {
            Some(name) => Some(resolver.class(name, "root")?),
            None => None,
        };

        let packages = self
            .packages
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let referenced_by = format!("package '{}'", spec.name);
                Ok(PackageDescriptor {
                    package_id: PackageId::new(dense_index(index, "packages")?),
                    name: spec.name.clone(),
                    annotations: resolver.annotations(&spec.annotations, &referenced_by)?,
                })
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        let mut types = Vec::with_capacity(self.types.len());
        let mut methods = Vec::new();
        let mut fields = Vec::new();

        for (index, spec) in self.types.iter().enumerate() {
            let type_id = TypeId::new(dense_index(index, "types")?);
            let referenced_by = format!("type '{}'", spec.name);

            let package = spec
                .package
                .as_deref()
                .map(|name| resolver.package(name, &referenced_by))
                .transpose()?;

            let superclass = match (&spec.superclass, spec.kind) {
                (None, _) => None,
                (Some(name), TypeKind::Class) => Some(resolver.class(name, &referenced_by)?),
                (Some(_), kind) => {
                    return Err(RegistryError::UnexpectedSuperclass {
                        name: spec.name.clone(),
                        kind: kind.to_string(),
                    });
                }
            };

            let interfaces = spec
                .interfaces
                .iter()
                .map(|name| resolver.interface(name, &referenced_by))
                .collect::<RegistryResult<Vec<_>>>()?;

            let mut field_ids = Vec::with_capacity(spec.fields.len());
            let mut field_names = HashSet::new();
            for field in &spec.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(RegistryError::DuplicateField {
                        type_name: spec.name.clone(),
                        field: field.name.clone(),
                    });
                }
                let field_id = FieldId::new(dense_index(fields.len(), "fields")?);
                let owner = format!("field '{}.{}'", spec.name, field.name);
                fields.push(FieldDescriptor {
                    field_id,
                    declaring_type: type_id,
                    name: field.name.clone(),
                    type_name: field.type_name.clone(),
                    annotations: resolver.annotations(&field.annotations, &owner)?,
                });
                field_ids.push(field_id);
            }

            let mut method_ids = Vec::with_capacity(spec.methods.len());
            let mut signatures = HashSet::new();
            for method in &spec.methods {
                let signature = method.signature();
                if !signatures.insert(signature.clone()) {
                    return Err(RegistryError::DuplicateMethod {
                        type_name: spec.name.clone(),
                        signature,
                    });
                }
                let method_id = MethodId::new(dense_index(methods.len(), "methods")?);
                let owner = format!("method '{}#{}'", spec.name, signature);
                methods.push(MethodDescriptor {
                    method_id,
                    declaring_type: type_id,
                    name: method.name.clone(),
                    params: method.params.clone(),
                    annotations: resolver.annotations(&method.annotations, &owner)?,
                });
                method_ids.push(method_id);
            }

            types.push(TypeDescriptor {
                type_id,
                name: spec.name.clone(),
                kind: spec.kind,
                package,
                superclass,
                interfaces,
                annotations: resolver.annotations(&spec.annotations, &referenced_by)?,
                fields: field_ids,
                methods: method_ids,
            });
        }

        check_acyclic(&types)?;

        debug!(
            types = types.len(),
            methods = methods.len(),
            fields = fields.len(),
            packages = packages.len(),
            "built type registry"
        );

        Ok(TypeRegistry::from_parts(
            types, methods, fields, packages, root,
        ))
    }
}

/// Position in a descriptor table as a `u32` id.
fn dense_index(index: usize, what: &'static str) -> RegistryResult<u32> {
    u32::try_from(index).map_err(|_| RegistryError::TooManyElements { what })
}

/// Name lookups against the ids assigned during [`RegistryBuilder::build`].
struct NameResolver<'a> {
    kinds: &'a HashMap<&'a str, (TypeId, TypeKind)>,
    packages: &'a HashMap<&'a str, PackageId>,
}

impl NameResolver<'_> {
    fn lookup(&self, name: &str, referenced_by: &str) -> RegistryResult<(TypeId, TypeKind)> {
        self.kinds
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn class(&self, name: &str, referenced_by: &str) -> RegistryResult<TypeId> {
        match self.lookup(name, referenced_by)? {
            (id, TypeKind::Class) => Ok(id),
            _ => Err(RegistryError::NotAClass {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
        }
    }

    fn interface(&self, name: &str, referenced_by: &str) -> RegistryResult<TypeId> {
        match self.lookup(name, referenced_by)? {
            (id, TypeKind::Interface) => Ok(id),
            _ => Err(RegistryError::NotAnInterface {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            }),
        }
    }

    fn package(&self, name: &str, referenced_by: &str) -> RegistryResult<PackageId> {
        self.packages
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownPackage {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn annotations(
        &self,
        specs: &[AnnotationSpec],
        referenced_by: &str,
    ) -> RegistryResult<Vec<Arc<Annotation>>> {
        specs
            .iter()
            .map(|spec| match self.lookup(&spec.kind, referenced_by)? {
                (kind, TypeKind::Annotation) => Ok(Arc::new(Annotation {
                    kind,
                    attributes: spec.attributes.clone(),
                })),
                _ => Err(RegistryError::NotAnAnnotation {
                    name: spec.kind.clone(),
                    referenced_by: referenced_by.to_string(),
                }),
            })
            .collect()
    }
}

/// Reject superclass/interface cycles; every ancestry walk relies on termination.
fn check_acyclic(types: &[TypeDescriptor]) -> RegistryResult<()> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    fn visit(types: &[TypeDescriptor], id: TypeId, marks: &mut [Mark]) -> RegistryResult<()> {
        let index = id.0 as usize;
        match marks[index] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                return Err(RegistryError::InheritanceCycle {
                    name: types[index].name.clone(),
                });
            }
            Mark::Unvisited => {}
        }
        marks[index] = Mark::InProgress;
        let ty = &types[index];
        for &parent in ty.superclass.iter().chain(ty.interfaces.iter()) {
            visit(types, parent, marks)?;
        }
        marks[index] = Mark::Done;
        Ok(())
    }

    let mut marks = vec![Mark::Unvisited; types.len()];
    for ty in types {
        visit(types, ty.type_id, &mut marks)?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_dense_ids_in_registration_order() {
        let reg = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.First"))
            .with_type(TypeSpec::class("a.Second").extends("a.First"))
            .build()
            .unwrap();

        assert_eq!(reg.type_id("a.First"), Some(TypeId::new(0)));
        assert_eq!(reg.type_id("a.Second"), Some(TypeId::new(1)));
        assert_eq!(reg.superclass(TypeId::new(1)), Some(TypeId::new(0)));
    }

    #[test]
    fn types_may_reference_later_declarations() {
        let reg = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Child").extends("a.Parent"))
            .with_type(TypeSpec::class("a.Parent"))
            .build()
            .unwrap();

        let child = reg.type_id("a.Child").unwrap();
        assert_eq!(reg.superclass(child), reg.type_id("a.Parent"));
    }

    #[test]
    fn rejects_duplicate_type() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Dup"))
            .with_type(TypeSpec::interface("a.Dup"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateType {
                name: "a.Dup".into()
            }
        );
    }

    #[test]
    fn rejects_duplicate_method_signature() {
        let err = RegistryBuilder::new()
            .with_type(
                TypeSpec::class("a.Svc")
                    .method(MethodSpec::new("run").param("int"))
                    .method(MethodSpec::new("run").param("long"))
                    .method(MethodSpec::new("run").param("int")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateMethod { ref signature, .. } if signature == "run(int)"
        ));
    }

    #[test]
    fn rejects_unknown_superclass() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Orphan").extends("a.Nowhere"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType { ref name, .. } if name == "a.Nowhere"));
    }

    #[test]
    fn rejects_interface_as_superclass() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::interface("a.Api"))
            .with_type(TypeSpec::class("a.Impl").extends("a.Api"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAClass { .. }));
    }

    #[test]
    fn rejects_class_as_interface() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Base"))
            .with_type(TypeSpec::class("a.Impl").implements("a.Base"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAnInterface { .. }));
    }

    #[test]
    fn rejects_non_annotation_kind() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Plain"))
            .with_type(TypeSpec::class("a.Target").annotated(AnnotationSpec::new("a.Plain")))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotAnAnnotation { .. }));
    }

    #[test]
    fn rejects_superclass_on_interface() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.Base"))
            .with_type(TypeSpec::interface("a.Api").extends("a.Base"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnexpectedSuperclass { ref kind, .. } if kind == "interface"));
    }

    #[test]
    fn rejects_inheritance_cycle() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.A").extends("a.C"))
            .with_type(TypeSpec::class("a.B").extends("a.A"))
            .with_type(TypeSpec::class("a.C").extends("a.B"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InheritanceCycle { .. }));
    }

    #[test]
    fn rejects_interface_cycle() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::interface("a.I").extends_interface("a.J"))
            .with_type(TypeSpec::interface("a.J").extends_interface("a.I"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InheritanceCycle { .. }));
    }

    #[test]
    fn self_annotated_annotation_is_not_a_cycle() {
        let reg = RegistryBuilder::new()
            .with_type(TypeSpec::annotation("a.Documented").annotated(AnnotationSpec::new("a.Documented")))
            .build()
            .unwrap();
        assert_eq!(reg.type_count(), 1);
    }

    #[test]
    fn root_must_be_registered_class() {
        let err = RegistryBuilder::new().root("lang.Object").build().unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType { .. }));

        let reg = RegistryBuilder::new()
            .root("lang.Object")
            .with_type(TypeSpec::class("lang.Object"))
            .build()
            .unwrap();
        assert_eq!(reg.root(), reg.type_id("lang.Object"));
    }

    #[test]
    fn unknown_package_is_rejected() {
        let err = RegistryBuilder::new()
            .with_type(TypeSpec::class("a.X").in_package("a"))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownPackage { .. }));
    }

    #[test]
    fn ids_up_to_u32_max_are_accepted() {
        assert_eq!(dense_index(7, "types"), Ok(7));
        assert_eq!(dense_index(u32::MAX as usize, "types"), Ok(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn ids_past_u32_are_rejected() {
        let err = dense_index(u32::MAX as usize + 1, "methods").unwrap_err();
        assert_eq!(err, RegistryError::TooManyElements { what: "methods" });
        assert_eq!(err.to_string(), "too many methods (ids are limited to u32)");
    }

    #[test]
    fn mutable_builder_api_accumulates() {
        let mut builder = RegistryBuilder::new();
        builder
            .add_package(PackageSpec::new("a"))
            .add_type(TypeSpec::class("a.X").in_package("a"));
        let reg = builder.build().unwrap();

        let x = reg.type_by_name("a.X").unwrap();
        assert_eq!(reg.package(x.package.unwrap()).unwrap().name, "a");
    }
}
