//! Typed CycloneDX document (JSON shape).
//!
//! Field names follow the CycloneDX 1.4 - 1.6 JSON schema. Collections that
//! the schema marks optional are modelled as `Vec<T>` that are skipped on
//! output when empty; unknown keys survive a round trip through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Extra JSON keys not modelled explicitly.
pub type Extra = BTreeMap<String, Value>;

fn default_bom_format() -> String {
    "CycloneDX".to_string()
}

/// Root CycloneDX BOM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bom {
    #[serde(default = "default_bom_format")]
    pub bom_format: String,
    #[serde(default)]
    pub spec_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for Bom {
    fn default() -> Self {
        Self {
            bom_format: default_bom_format(),
            spec_version: String::new(),
            serial_number: None,
            version: None,
            metadata: None,
            components: Vec::new(),
            services: Vec::new(),
            dependencies: Vec::new(),
            vulnerabilities: Vec::new(),
            extra: Extra::new(),
        }
    }
}

impl Bom {
    /// The primary component (`metadata.component`), if any.
    #[must_use]
    pub fn primary_component(&self) -> Option<&Component> {
        self.metadata.as_ref().and_then(|m| m.component.as_ref())
    }

    /// Every bom-ref defined anywhere in the document: the primary component,
    /// all components (recursively) and all services.
    #[must_use]
    pub fn element_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        if let Some(primary) = self.primary_component() {
            primary.collect_refs(&mut refs);
        }
        for component in &self.components {
            component.collect_refs(&mut refs);
        }
        for service in &self.services {
            if let Some(r) = service.bom_ref.as_deref() {
                refs.push(r);
            }
        }
        refs
    }

    /// Count of components including nested ones and the primary.
    #[must_use]
    pub fn component_count(&self) -> usize {
        let nested: usize = self.components.iter().map(Component::tree_size).sum();
        nested + self.primary_component().map_or(0, Component::tree_size)
    }
}

/// BOM metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Tools>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<OrganizationalContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacture: Option<OrganizationalEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<OrganizationalEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Tools block: a flat array of tool records (1.4, deprecated in 1.5) or
/// an object of components and services (1.5+).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Tools {
    Legacy(Vec<Tool>),
    Modern(ToolsObject),
}

impl Default for Tools {
    fn default() -> Self {
        Self::Modern(ToolsObject::default())
    }
}

impl Tools {
    /// Whether the block lists no tools at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Legacy(tools) => tools.is_empty(),
            Self::Modern(obj) => obj.components.is_empty() && obj.services.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for Tools {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, SeqAccess, Visitor};

        struct ToolsVisitor;

        impl<'de> Visitor<'de> for ToolsVisitor {
            type Value = Tools;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an array of tools or an object with components/services")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut tools = Vec::new();
                while let Some(tool) = seq.next_element::<Tool>()? {
                    tools.push(tool);
                }
                Ok(Tools::Legacy(tools))
            }

            fn visit_map<M>(self, map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let obj: ToolsObject =
                    Deserialize::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(Tools::Modern(obj))
            }
        }

        deserializer.deserialize_any(ToolsVisitor)
    }
}

/// Legacy tool record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<Hash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
}

/// 1.5+ tools object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsObject {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

/// A CycloneDX component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<OrganizationalEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<Hash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub licenses: Vec<LicenseChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Component {
    /// Create a component with a type and name.
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style version setter.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Builder-style bom-ref setter.
    #[must_use]
    pub fn with_bom_ref(mut self, bom_ref: impl Into<String>) -> Self {
        self.bom_ref = Some(bom_ref.into());
        self
    }

    /// Builder-style purl setter.
    #[must_use]
    pub fn with_purl(mut self, purl: impl Into<String>) -> Self {
        self.purl = Some(purl.into());
        self
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(r) = self.bom_ref.as_deref() {
            out.push(r);
        }
        for child in &self.components {
            child.collect_refs(out);
        }
    }

    /// Number of components in this subtree, including self.
    #[must_use]
    pub fn tree_size(&self) -> usize {
        1 + self.components.iter().map(Self::tree_size).sum::<usize>()
    }

    /// Depth-first search for a component by bom-ref in this subtree.
    #[must_use]
    pub fn find_mut(&mut self, bom_ref: &str) -> Option<&mut Self> {
        if self.bom_ref.as_deref() == Some(bom_ref) {
            return Some(self);
        }
        self.components.iter_mut().find_map(|c| c.find_mut(bom_ref))
    }
}

/// License choice: either a license object or an SPDX expression
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl LicenseChoice {
    /// A choice holding an SPDX license id.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            license: Some(License {
                id: Some(id.into()),
                ..License::default()
            }),
            expression: None,
        }
    }

    /// A choice holding an SPDX license expression.
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            license: None,
            expression: Some(expression.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hash {
    pub alg: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReference {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<Hash>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub url: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contact: Vec<OrganizationalContact>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A dependency edge set: `dep_ref` depends on every ref in `depends_on`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(rename = "ref")]
    pub dep_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Dependency {
    pub fn new(dep_ref: impl Into<String>, depends_on: Vec<String>) -> Self {
        Self {
            dep_ref: dep_ref.into(),
            depends_on,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<OrganizationalEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    #[serde(rename = "bom-ref", default, skip_serializing_if = "Option::is_none")]
    pub bom_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VulnerabilitySource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ratings: Vec<Rating>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cwes: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affects: Vec<Affect>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilitySource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VulnerabilitySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affect {
    #[serde(rename = "ref")]
    pub affect_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_legacy_and_modern_shapes() {
        let legacy: Metadata =
            serde_json::from_str(r#"{"tools":[{"vendor":"acme","name":"scan","version":"1"}]}"#)
                .unwrap();
        assert!(matches!(legacy.tools, Some(Tools::Legacy(ref t)) if t.len() == 1));

        let modern: Metadata = serde_json::from_str(
            r#"{"tools":{"components":[{"type":"application","name":"scan"}]}}"#,
        )
        .unwrap();
        match modern.tools {
            Some(Tools::Modern(obj)) => assert_eq!(obj.components[0].name, "scan"),
            other => panic!("unexpected tools {other:?}"),
        }
    }

    #[test]
    fn test_unknown_fields_survive() {
        let json = r#"{"type":"library","name":"x","bom-ref":"r1","evidence":{"identity":{}}}"#;
        let comp: Component = serde_json::from_str(json).unwrap();
        assert_eq!(comp.bom_ref.as_deref(), Some("r1"));
        assert!(comp.extra.contains_key("evidence"));

        let back = serde_json::to_value(&comp).unwrap();
        assert!(back.get("evidence").is_some());
        assert!(back.get("hashes").is_none());
    }

    #[test]
    fn test_element_refs_include_nested_and_services() {
        let mut parent = Component::new("library", "parent").with_bom_ref("p");
        parent.components.push(Component::new("library", "child").with_bom_ref("c"));
        let bom = Bom {
            metadata: Some(Metadata {
                component: Some(Component::new("application", "app").with_bom_ref("app")),
                ..Metadata::default()
            }),
            components: vec![parent],
            services: vec![Service {
                bom_ref: Some("svc".to_string()),
                name: "api".to_string(),
                ..Service::default()
            }],
            ..Bom::default()
        };

        assert_eq!(bom.element_refs(), vec!["app", "p", "c", "svc"]);
        assert_eq!(bom.component_count(), 3);
    }

    #[test]
    fn test_find_mut_nested() {
        let mut parent = Component::new("library", "parent").with_bom_ref("p");
        parent.components.push(Component::new("library", "child").with_bom_ref("c"));
        let found = parent.find_mut("c").unwrap();
        found.description = Some("nested".to_string());
        assert_eq!(parent.components[0].description.as_deref(), Some("nested"));
    }
}
