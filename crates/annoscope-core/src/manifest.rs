//! JSON hierarchy manifests.
//!
//! A manifest is the serialized form of a [`RegistryBuilder`]: the `*Spec`
//! types are the schema. Field names follow those structs, with defaults
//! for everything except names:
//!
//! ```json
//! {
//!   "root": "lang.Object",
//!   "packages": [{ "name": "web", "annotations": [{ "kind": "web.Namespace" }] }],
//!   "types": [
//!     { "name": "lang.Object" },
//!     { "name": "web.Namespace", "kind": "annotation" },
//!     {
//!       "name": "web.OrderAction",
//!       "package": "web",
//!       "superclass": "lang.Object",
//!       "methods": [{ "name": "setId", "params": ["long"] }]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{PackageSpec, RegistryBuilder, TypeSpec};
use crate::error::ManifestError;
use crate::model::TypeRegistry;

/// Serialized descriptor graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default)]
    pub packages: Vec<PackageSpec>,
    #[serde(default)]
    pub types: Vec<TypeSpec>,
}

impl HierarchyManifest {
    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_json(&text)?;
        debug!(
            path = %path.display(),
            types = manifest.types.len(),
            packages = manifest.packages.len(),
            "loaded hierarchy manifest"
        );
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn into_builder(self) -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        if let Some(root) = self.root {
            builder = builder.root(root);
        }
        for package in self.packages {
            builder.add_package(package);
        }
        for ty in self.types {
            builder.add_type(ty);
        }
        builder
    }

    /// Validate the manifest into a registry.
    pub fn into_registry(self) -> Result<TypeRegistry, ManifestError> {
        Ok(self.into_builder().build()?)
    }
}

impl From<RegistryBuilder> for HierarchyManifest {
    fn from(builder: RegistryBuilder) -> Self {
        let (root, packages, types) = builder.into_parts();
        HierarchyManifest {
            root,
            packages,
            types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::model::{AttributeValue, ElementRef, TypeKind};
    use std::io::Write;

    const ACTIONS: &str = r#"{
        "root": "lang.Object",
        "packages": [
            { "name": "web", "annotations": [{ "kind": "web.Namespace", "attributes": { "value": { "kind": "str", "value": "/shop" } } }] }
        ],
        "types": [
            { "name": "lang.Object" },
            { "name": "web.Namespace", "kind": "annotation" },
            { "name": "web.Validate", "kind": "annotation" },
            {
                "name": "web.OrderAction",
                "package": "web",
                "superclass": "lang.Object",
                "fields": [{ "name": "id", "type": "long", "annotations": [{ "kind": "web.Validate" }] }],
                "methods": [{ "name": "setId", "params": ["long"] }]
            }
        ]
    }"#;

    #[test]
    fn parses_defaults_and_nested_members() {
        let manifest = HierarchyManifest::from_json(ACTIONS).unwrap();
        assert_eq!(manifest.root.as_deref(), Some("lang.Object"));
        assert_eq!(manifest.types[0].kind, TypeKind::Class);
        assert_eq!(manifest.types[1].kind, TypeKind::Annotation);
        assert_eq!(manifest.types[3].fields[0].type_name, "long");
        assert_eq!(manifest.types[3].methods[0].params, vec!["long"]);
    }

    #[test]
    fn builds_registry_with_package_annotations() {
        let reg = HierarchyManifest::from_json(ACTIONS)
            .unwrap()
            .into_registry()
            .unwrap();
        let package = reg.package_by_name("web").unwrap();
        let annotations = reg
            .annotations(ElementRef::Package(package.package_id))
            .unwrap();

        assert_eq!(annotations.len(), 1);
        assert_eq!(
            annotations[0].attribute("value"),
            Some(&AttributeValue::Str("/shop".into()))
        );
    }

    #[test]
    fn invalid_graph_surfaces_registry_error() {
        let json = r#"{ "types": [{ "name": "a.B", "superclass": "a.Missing" }] }"#;
        let err = HierarchyManifest::from_json(json)
            .unwrap()
            .into_registry()
            .unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Registry(RegistryError::UnknownType { .. })
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = HierarchyManifest::from_json("{ \"types\": 3 }").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ACTIONS.as_bytes()).unwrap();

        let manifest = HierarchyManifest::load(file.path()).unwrap();
        assert_eq!(manifest.types.len(), 4);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = HierarchyManifest::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn builder_converts_back_to_manifest() {
        let builder = RegistryBuilder::new()
            .root("lang.Object")
            .with_type(TypeSpec::class("lang.Object"));
        let manifest = HierarchyManifest::from(builder);
        let json = manifest.to_json().unwrap();

        assert_eq!(HierarchyManifest::from_json(&json).unwrap(), manifest);
    }
}
