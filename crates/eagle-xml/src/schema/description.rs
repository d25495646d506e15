// crates/eagle-xml/src/schema/description.rs

//! `serde` structures for declarative schema descriptions.
//!
//! A description looks like:
//!
//! ```xml
//! <schema>
//!   <tag name="layer">
//!     <attr name="number" kind="integer" required="true"/>
//!     <attr name="name" kind="string" required="true"/>
//!   </tag>
//!   <root kind="library" tag="eagle">
//!     <section name="layers" kind="layer-table" path="drawing/layers" tags="layer"/>
//!   </root>
//! </schema>
//! ```
//!
//! Elements of the same name must be contiguous (all `<tag>`s, then all
//! `<root>`s; all `<attr>`s, then all `<section>`s).

use super::{AttrSpec, SchemaRegistry, SectionKind, SectionSpec, TagSpec};
use crate::error::EagleError;
use crate::file::DocumentKind;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename = "schema")]
struct SchemaDescription {
    #[serde(rename = "tag", default)]
    tags: Vec<TagDescription>,

    #[serde(rename = "root", default)]
    roots: Vec<RootDescription>,
}

#[derive(Debug, Deserialize)]
struct TagDescription {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "@text", default)]
    text: bool,

    #[serde(rename = "attr", default)]
    attrs: Vec<AttrDescription>,

    #[serde(rename = "section", default)]
    sections: Vec<SectionDescription>,
}

#[derive(Debug, Deserialize)]
struct RootDescription {
    #[serde(rename = "@kind")]
    kind: String,

    #[serde(rename = "@tag")]
    tag: String,

    #[serde(rename = "attr", default)]
    attrs: Vec<AttrDescription>,

    #[serde(rename = "section", default)]
    sections: Vec<SectionDescription>,
}

#[derive(Debug, Deserialize)]
struct AttrDescription {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "@kind")]
    kind: String,

    #[serde(rename = "@required", default)]
    required: bool,

    #[serde(rename = "@only-under", default)]
    only_under: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionDescription {
    #[serde(rename = "@name")]
    name: String,

    #[serde(rename = "@kind")]
    kind: String,

    #[serde(rename = "@path", default)]
    path: String,

    /// Whitespace-separated list of accepted child tags.
    #[serde(rename = "@tags")]
    tags: String,

    #[serde(rename = "@key", default)]
    key: Option<String>,

    #[serde(rename = "@require-container", default)]
    require_container: bool,
}

pub(super) fn load(xml: &str) -> Result<SchemaRegistry, EagleError> {
    let description: SchemaDescription = quick_xml::de::from_str(xml)?;

    let mut registry = SchemaRegistry::new();
    for tag in description.tags {
        let spec = build_spec(&tag.name, tag.text, tag.attrs, tag.sections)?;
        registry.register(spec)?;
    }
    for root in description.roots {
        let kind: DocumentKind = root.kind.parse()?;
        let spec = build_spec(&root.tag, false, root.attrs, root.sections)?;
        registry.register_root(kind, spec)?;
    }
    Ok(registry)
}

fn build_spec(
    tag: &str,
    text: bool,
    attrs: Vec<AttrDescription>,
    sections: Vec<SectionDescription>,
) -> Result<TagSpec, EagleError> {
    let mut spec = TagSpec::new(tag);
    spec.preserves_text = text;

    for a in attrs {
        spec.attrs.push(AttrSpec {
            kind: a.kind.parse()?,
            name: a.name,
            required: a.required,
            only_under: a.only_under,
        });
    }

    for s in sections {
        let kind: SectionKind = s.kind.parse()?;
        spec.sections.push(SectionSpec {
            name: s.name,
            kind,
            path: s.path,
            tags: s.tags.split_whitespace().map(Into::into).collect(),
            key: s.key,
            require_container: s.require_container,
        });
    }
    Ok(spec)
}
