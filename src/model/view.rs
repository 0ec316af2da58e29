//! Format-independent view over CycloneDX components and SPDX packages.
//!
//! The matcher only needs a handful of identity attributes; each format
//! adapts its own entity to [`ComponentView`].

use super::cyclonedx::Component;
use super::spdx::Package;
use super::SbomSpec;

/// Identity attributes used for matching.
pub trait ComponentView {
    fn purl(&self) -> Option<&str>;
    fn cpe(&self) -> Option<&str>;
    fn name(&self) -> &str;
    fn version(&self) -> Option<&str>;
    fn component_type(&self) -> Option<&str>;
    fn spec(&self) -> SbomSpec;

    fn is_cdx(&self) -> bool {
        self.spec() == SbomSpec::CycloneDx
    }

    fn is_spdx(&self) -> bool {
        self.spec() == SbomSpec::Spdx
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ComponentView for Component {
    fn purl(&self) -> Option<&str> {
        non_empty(self.purl.as_deref())
    }

    fn cpe(&self) -> Option<&str> {
        non_empty(self.cpe.as_deref())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    fn component_type(&self) -> Option<&str> {
        non_empty(Some(self.component_type.as_str()))
    }

    fn spec(&self) -> SbomSpec {
        SbomSpec::CycloneDx
    }
}

impl ComponentView for Package {
    fn purl(&self) -> Option<&str> {
        non_empty(self.external_ref_locator(&["purl"]))
    }

    fn cpe(&self) -> Option<&str> {
        non_empty(self.external_ref_locator(&["cpe23Type", "cpe22Type"]))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        non_empty(self.version_info.as_deref())
    }

    fn component_type(&self) -> Option<&str> {
        non_empty(self.primary_package_purpose.as_deref())
    }

    fn spec(&self) -> SbomSpec {
        SbomSpec::Spdx
    }
}

/// Owned snapshot of a component's identity, kept by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentFacts {
    pub purl: Option<String>,
    pub cpe: Option<String>,
    pub name: String,
    pub version: Option<String>,
    pub component_type: Option<String>,
    pub spec: SbomSpec,
}

impl ComponentFacts {
    /// Snapshot any view.
    pub fn of(view: &(impl ComponentView + ?Sized)) -> Self {
        Self {
            purl: view.purl().map(str::to_string),
            cpe: view.cpe().map(str::to_string),
            name: view.name().to_string(),
            version: view.version().map(str::to_string),
            component_type: view.component_type().map(str::to_string),
            spec: view.spec(),
        }
    }
}

impl ComponentView for ComponentFacts {
    fn purl(&self) -> Option<&str> {
        non_empty(self.purl.as_deref())
    }

    fn cpe(&self) -> Option<&str> {
        non_empty(self.cpe.as_deref())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        non_empty(self.version.as_deref())
    }

    fn component_type(&self) -> Option<&str> {
        non_empty(self.component_type.as_deref())
    }

    fn spec(&self) -> SbomSpec {
        self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::spdx::ExternalRef;

    #[test]
    fn test_cdx_view() {
        let comp = Component::new("library", "serde")
            .with_version("1.0.200")
            .with_purl("pkg:cargo/serde@1.0.200");
        assert_eq!(comp.purl(), Some("pkg:cargo/serde@1.0.200"));
        assert_eq!(comp.cpe(), None);
        assert_eq!(comp.component_type(), Some("library"));
        assert!(comp.is_cdx());
    }

    #[test]
    fn test_spdx_view_reads_external_refs() {
        let mut pkg = Package::new("SPDXRef-1", "openssl").with_version("3.0.0");
        pkg.external_refs.push(ExternalRef::cpe23(
            "cpe:2.3:a:openssl:openssl:3.0.0:*:*:*:*:*:*:*",
        ));
        pkg.external_refs.push(ExternalRef::purl("pkg:generic/openssl@3.0.0"));
        assert_eq!(pkg.purl(), Some("pkg:generic/openssl@3.0.0"));
        assert!(pkg.cpe().unwrap().starts_with("cpe:2.3:a:openssl"));
        assert!(pkg.is_spdx());
        assert_eq!(pkg.component_type(), None);
    }

    #[test]
    fn test_facts_snapshot_drops_blank_values() {
        let mut comp = Component::new("", "x");
        comp.version = Some("  ".to_string());
        let facts = ComponentFacts::of(&comp);
        assert_eq!(facts.version, None);
        assert_eq!(facts.component_type, None);
        assert_eq!(facts.name, "x");
    }
}
