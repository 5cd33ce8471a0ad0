//! Descriptor model: the reflective type graph as explicit tables.
//!
//! Each resolvable program element is registered up front as a descriptor:
//! - [`TypeDescriptor`]: classes, interfaces and annotation types
//! - [`MethodDescriptor`]: methods with their parameter-type signature
//! - [`FieldDescriptor`]: fields
//! - [`PackageDescriptor`]: packages, which may carry annotations too
//!
//! The [`TypeRegistry`] owns all descriptors and answers the questions a
//! reflection facility would: declared members, superclass, implemented
//! interfaces, and the annotations attached to an element.
//!
//! # Annotation Kinds
//!
//! An annotation kind is itself a type ([`TypeKind::Annotation`]). The
//! annotations declared on that type are its meta-annotations, so a one-level
//! meta lookup is just a second call to [`TypeRegistry::annotations`] with
//! [`ElementRef::Type`] of the annotation's kind.
//!
//! # Immutability
//!
//! A registry is immutable once built. Every lookup is a pure function of
//! the graph, which is what makes memoizing resolution results sound.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::IntrospectionError;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a type within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Create a new type ID.
    pub fn new(id: u32) -> Self {
        TypeId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type_{}", self.0)
    }
}

/// Unique identifier for a method within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct MethodId(pub u32);

impl MethodId {
    /// Create a new method ID.
    pub fn new(id: u32) -> Self {
        MethodId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method_{}", self.0)
    }
}

/// Unique identifier for a field within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Create a new field ID.
    pub fn new(id: u32) -> Self {
        FieldId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field_{}", self.0)
    }
}

/// Unique identifier for a package within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PackageId(pub u32);

impl PackageId {
    /// Create a new package ID.
    pub fn new(id: u32) -> Self {
        PackageId(id)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg_{}", self.0)
    }
}

/// Identity of one built registry.
///
/// Element ids are dense per registry, so they only identify an element
/// together with the registry that issued them. Every built registry gets a
/// fresh id; clones keep it, since they describe the same graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RegistryId(pub u64);

impl RegistryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry_{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Kind of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Concrete or abstract class; has at most one superclass.
    #[default]
    Class,
    /// Interface; extends other interfaces through `interfaces`.
    Interface,
    /// Annotation type; its own annotations are meta-annotations.
    Annotation,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Annotation => "annotation",
        };
        f.write_str(name)
    }
}

/// Identity of an annotated program element.
///
/// Together with a registry id this keys the resolution cache: two refs are equal
/// exactly when they name the same registered descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(tag = "element", content = "id", rename_all = "snake_case")]
pub enum ElementRef {
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
    Package(PackageId),
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Type(id) => write!(f, "{id}"),
            ElementRef::Method(id) => write!(f, "{id}"),
            ElementRef::Field(id) => write!(f, "{id}"),
            ElementRef::Package(id) => write!(f, "{id}"),
        }
    }
}

// ============================================================================
// Annotations
// ============================================================================

/// Value of one annotation attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Reference to a type by qualified name. Resolved lazily: a name the
    /// registry does not contain makes the owning element's annotations
    /// fail to materialize.
    Type(String),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// First type name in this value (searching arrays) that `registry` does not know.
    fn unresolved_type<'a>(&'a self, registry: &TypeRegistry) -> Option<&'a str> {
        match self {
            AttributeValue::Type(name) if registry.type_id(name).is_none() => Some(name),
            AttributeValue::Array(items) => items.iter().find_map(|v| v.unresolved_type(registry)),
            _ => None,
        }
    }
}

/// One applied annotation: its kind plus attribute values.
///
/// Instances are immutable and shared as `Arc<Annotation>`, so a resolved
/// annotation handed out twice compares equal and points at the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// The annotation type this instance is of.
    pub kind: TypeId,
    /// Attribute values by name.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Annotation {
    /// Create an annotation with no attributes.
    pub fn new(kind: TypeId) -> Self {
        Annotation {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute value.
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// A registered class, interface or annotation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_id: TypeId,
    /// Qualified name, e.g. `com.acme.web.OrderAction`.
    pub name: String,
    pub kind: TypeKind,
    pub package: Option<PackageId>,
    pub superclass: Option<TypeId>,
    /// Directly implemented (or, for interfaces, extended) interfaces in declared order.
    pub interfaces: Vec<TypeId>,
    pub annotations: Vec<Arc<Annotation>>,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldId>,
    /// Declared methods in declaration order.
    pub methods: Vec<MethodId>,
}

impl TypeDescriptor {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == TypeKind::Annotation
    }
}

/// A method declared on a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub method_id: MethodId,
    pub declaring_type: TypeId,
    pub name: String,
    /// Parameter type names in order. Primitive names need not be registered.
    pub params: Vec<String>,
    pub annotations: Vec<Arc<Annotation>>,
}

impl MethodDescriptor {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Whether this method has exactly the given name and parameter types.
    pub fn matches_signature(&self, name: &str, params: &[String]) -> bool {
        self.name == name && self.params == params
    }

    /// `name(T1,T2)` form used in diagnostics and output.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(","))
    }
}

/// A field declared on a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field_id: FieldId,
    pub declaring_type: TypeId,
    pub name: String,
    pub type_name: String,
    pub annotations: Vec<Arc<Annotation>>,
}

/// A package. Package-level annotations take part in type resolution fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub package_id: PackageId,
    pub name: String,
    pub annotations: Vec<Arc<Annotation>>,
}

// ============================================================================
// Type Registry
// ============================================================================

/// Immutable descriptor graph.
///
/// Descriptors are stored in dense tables indexed by id; ids are only ever
/// handed out by [`crate::RegistryBuilder`], so every id a registry produces
/// resolves against that same registry. Lookups with a foreign id return
/// `None` rather than panicking.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    id: RegistryId,
    types: Vec<TypeDescriptor>,
    methods: Vec<MethodDescriptor>,
    fields: Vec<FieldDescriptor>,
    packages: Vec<PackageDescriptor>,
    type_names: HashMap<String, TypeId>,
    package_names: HashMap<String, PackageId>,
    root: Option<TypeId>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::from_parts(Vec::new(), Vec::new(), Vec::new(), Vec::new(), None)
    }
}

impl TypeRegistry {
    pub(crate) fn from_parts(
        types: Vec<TypeDescriptor>,
        methods: Vec<MethodDescriptor>,
        fields: Vec<FieldDescriptor>,
        packages: Vec<PackageDescriptor>,
        root: Option<TypeId>,
    ) -> Self {
        let type_names = types.iter().map(|t| (t.name.clone(), t.type_id)).collect();
        let package_names = packages
            .iter()
            .map(|p| (p.name.clone(), p.package_id))
            .collect();
        TypeRegistry {
            id: RegistryId::next(),
            types,
            methods,
            fields,
            packages,
            type_names,
            package_names,
            root,
        }
    }

    /// Identity of this registry; element ids are only meaningful with it.
    pub fn id(&self) -> RegistryId {
        self.id
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn ty(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.index())
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodDescriptor> {
        self.methods.get(id.index())
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldDescriptor> {
        self.fields.get(id.index())
    }

    pub fn package(&self, id: PackageId) -> Option<&PackageDescriptor> {
        self.packages.get(id.index())
    }

    /// Find a type id by qualified name.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    pub fn type_by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.type_id(name).and_then(|id| self.ty(id))
    }

    pub fn package_by_name(&self, name: &str) -> Option<&PackageDescriptor> {
        self.package_names
            .get(name)
            .and_then(|&id| self.package(id))
    }

    /// All types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.iter()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// The universal root class, where method ancestry walks stop.
    pub fn root(&self) -> Option<TypeId> {
        self.root
    }

    pub fn superclass(&self, id: TypeId) -> Option<TypeId> {
        self.ty(id).and_then(|t| t.superclass)
    }

    /// Directly implemented interfaces of a type, in declared order.
    pub fn interfaces(&self, id: TypeId) -> &[TypeId] {
        self.ty(id).map(|t| t.interfaces.as_slice()).unwrap_or(&[])
    }

    pub fn declared_methods(&self, id: TypeId) -> impl Iterator<Item = &MethodDescriptor> {
        self.ty(id)
            .map(|t| t.methods.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&m| self.method(m))
    }

    pub fn declared_fields(&self, id: TypeId) -> impl Iterator<Item = &FieldDescriptor> {
        self.ty(id)
            .map(|t| t.fields.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&f| self.field(f))
    }

    /// A method declared directly on `id` with exactly this signature.
    pub fn declared_method(
        &self,
        id: TypeId,
        name: &str,
        params: &[String],
    ) -> Option<&MethodDescriptor> {
        self.declared_methods(id)
            .find(|m| m.matches_signature(name, params))
    }

    /// A method with this signature visible on `id`.
    ///
    /// Searches the type's own methods, then its interfaces depth-first in
    /// declared order, then its superclass chain.
    pub fn public_method(
        &self,
        id: TypeId,
        name: &str,
        params: &[String],
    ) -> Option<&MethodDescriptor> {
        let mut visited = HashSet::new();
        self.public_method_in(id, name, params, &mut visited)
    }

    fn public_method_in(
        &self,
        id: TypeId,
        name: &str,
        params: &[String],
        visited: &mut HashSet<TypeId>,
    ) -> Option<&MethodDescriptor> {
        if !visited.insert(id) {
            return None;
        }
        if let Some(found) = self.declared_method(id, name, params) {
            return Some(found);
        }
        for &iface in self.interfaces(id) {
            if let Some(found) = self.public_method_in(iface, name, params, visited) {
                return Some(found);
            }
        }
        self.superclass(id)
            .and_then(|sup| self.public_method_in(sup, name, params, visited))
    }

    /// All methods of an interface, including those inherited from superinterfaces.
    ///
    /// Order: the interface's own methods, then each superinterface depth-first.
    /// A superinterface reachable along two paths contributes once.
    pub fn interface_methods(&self, id: TypeId) -> Vec<&MethodDescriptor> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            out.extend(self.declared_methods(current));
            stack.extend(self.interfaces(current).iter().rev());
        }
        out
    }

    // ------------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------------

    /// Annotations declared on an element, without validating attributes.
    ///
    /// Unknown ids yield an empty slice.
    pub fn declared_annotations(&self, element: ElementRef) -> &[Arc<Annotation>] {
        let annotations = match element {
            ElementRef::Type(id) => self.ty(id).map(|t| &t.annotations),
            ElementRef::Method(id) => self.method(id).map(|m| &m.annotations),
            ElementRef::Field(id) => self.field(id).map(|f| &f.annotations),
            ElementRef::Package(id) => self.package(id).map(|p| &p.annotations),
        };
        annotations.map(Vec::as_slice).unwrap_or(&[])
    }

    /// Materialize the annotations declared on an element.
    ///
    /// Fails when any attribute of any annotation on the element references a
    /// type name the registry does not contain.
    pub fn annotations(
        &self,
        element: ElementRef,
    ) -> Result<&[Arc<Annotation>], IntrospectionError> {
        let declared = self.declared_annotations(element);
        for annotation in declared {
            for (attribute, value) in &annotation.attributes {
                if let Some(missing) = value.unresolved_type(self) {
                    return Err(IntrospectionError::UnresolvedTypeReference {
                        element,
                        annotation: self.type_name(annotation.kind).to_string(),
                        attribute: attribute.clone(),
                        type_name: missing.to_string(),
                    });
                }
            }
        }
        Ok(declared)
    }

    // ------------------------------------------------------------------------
    // Naming
    // ------------------------------------------------------------------------

    /// Qualified name of a type, or `"?"` for a foreign id.
    pub fn type_name(&self, id: TypeId) -> &str {
        self.ty(id).map(|t| t.name.as_str()).unwrap_or("?")
    }

    /// Human-readable name of any element.
    ///
    /// Types print as their qualified name, methods as `Type#name(params)`,
    /// fields as `Type#field`, and packages as their name.
    pub fn element_name(&self, element: ElementRef) -> String {
        match element {
            ElementRef::Type(id) => self.type_name(id).to_string(),
            ElementRef::Method(id) => match self.method(id) {
                Some(m) => format!("{}#{}", self.type_name(m.declaring_type), m.signature()),
                None => id.to_string(),
            },
            ElementRef::Field(id) => match self.field(id) {
                Some(f) => format!("{}#{}", self.type_name(f.declaring_type), f.name),
                None => id.to_string(),
            },
            ElementRef::Package(id) => match self.package(id) {
                Some(p) => p.name.clone(),
                None => id.to_string(),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
