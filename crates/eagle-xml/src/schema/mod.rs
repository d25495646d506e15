// crates/eagle-xml/src/schema/mod.rs

//! Declarative tag descriptors and the registry that binds tags to them.
//!
//! A [`TagSpec`] lists a tag's attributes (name, kind, required) and its
//! sections (child lists, maps and singletons) in the order EAGLE expects them
//! on disk. The [`SchemaRegistry`] is an explicit value handed to every
//! document; there is no global tag table.

mod description;
pub mod eagle;

use crate::coerce::AttrKind;
use crate::error::{EagleError, SchemaError};
use crate::file::DocumentKind;
use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

/// Index of a descriptor inside its [`SchemaRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecId(usize);

/// How a section stores its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Ordered sequence.
    List,
    /// Unique keys, taken from an attribute of the child, in insertion order.
    Map,
    /// At most one child.
    Singleton,
    /// The file's layer table. Only valid on root descriptors.
    LayerTable,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SectionKind::List => "list",
            SectionKind::Map => "map",
            SectionKind::Singleton => "singleton",
            SectionKind::LayerTable => "layer-table",
        })
    }
}

impl FromStr for SectionKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(SectionKind::List),
            "map" => Ok(SectionKind::Map),
            "singleton" => Ok(SectionKind::Singleton),
            "layer-table" => Ok(SectionKind::LayerTable),
            other => Err(SchemaError::UnknownSectionKind {
                kind: other.into(),
            }),
        }
    }
}

/// One declared attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    pub kind: AttrKind,
    /// Required attributes are written as `""` when they have no value.
    pub required: bool,
    /// Only written when the owning node's parent has this tag.
    pub only_under: Option<String>,
}

/// One declared child section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub name: String,
    pub kind: SectionKind,
    /// Slash-separated container elements between the owner and the children.
    pub path: String,
    /// Child tags accepted by this section.
    pub tags: Vec<String>,
    /// Attribute the children of a map are keyed by.
    pub key: Option<String>,
    /// Emit the container path even when the section is empty.
    pub require_container: bool,
}

impl SectionSpec {
    pub fn accepts(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Descriptor for one tag: its attributes and sections in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSpec {
    pub tag: String,
    pub attrs: Vec<AttrSpec>,
    pub sections: Vec<SectionSpec>,
    pub preserves_text: bool,
}

impl TagSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            sections: Vec::new(),
            preserves_text: false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn section(&self, name: &str) -> Option<(usize, &SectionSpec)> {
        self.sections.iter().enumerate().find(|(_, s)| s.name == name)
    }

    // --- Builder helpers used by the built-in table ---

    /// Adds a required attribute.
    pub fn required(self, name: &str, kind: AttrKind) -> Self {
        self.with_attr(name, kind, true)
    }

    /// Adds an optional attribute.
    pub fn optional(self, name: &str, kind: AttrKind) -> Self {
        self.with_attr(name, kind, false)
    }

    fn with_attr(mut self, name: &str, kind: AttrKind, required: bool) -> Self {
        self.attrs.push(AttrSpec {
            name: name.into(),
            kind,
            required,
            only_under: None,
        });
        self
    }

    /// Restricts the most recently added attribute to nodes under `parent`.
    pub fn only_under(mut self, parent: &str) -> Self {
        if let Some(last) = self.attrs.last_mut() {
            last.only_under = Some(parent.into());
        }
        self
    }

    pub fn list(self, name: &str, path: &str, tags: &[&str]) -> Self {
        self.with_section(name, SectionKind::List, path, tags, None)
    }

    pub fn map(self, name: &str, path: &str, key: &str, tags: &[&str]) -> Self {
        self.with_section(name, SectionKind::Map, path, tags, Some(key))
    }

    pub fn singleton(self, name: &str, path: &str, tag: &str) -> Self {
        self.with_section(name, SectionKind::Singleton, path, &[tag], None)
    }

    pub fn layer_table(self, name: &str, path: &str, tag: &str) -> Self {
        self.with_section(name, SectionKind::LayerTable, path, &[tag], None)
    }

    fn with_section(
        mut self,
        name: &str,
        kind: SectionKind,
        path: &str,
        tags: &[&str],
        key: Option<&str>,
    ) -> Self {
        self.sections.push(SectionSpec {
            name: name.into(),
            kind,
            path: path.into(),
            tags: tags.iter().map(|t| (*t).into()).collect(),
            key: key.map(Into::into),
            require_container: false,
        });
        self
    }

    /// Marks the most recently added section's container as mandatory.
    pub fn require_container(mut self) -> Self {
        if let Some(last) = self.sections.last_mut() {
            last.require_container = true;
        }
        self
    }

    /// Keeps the element's text content.
    pub fn text(mut self) -> Self {
        self.preserves_text = true;
        self
    }
}

/// Binds tag names and document kinds to descriptors.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    specs: Vec<TagSpec>,
    by_tag: BTreeMap<String, SpecId>,
    roots: BTreeMap<DocumentKind, SpecId>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in EAGLE schema covering library, schematic and board files.
    pub fn eagle() -> Self {
        eagle::registry()
    }

    /// Builds a registry from a declarative XML schema description.
    pub fn from_xml_str(xml: &str) -> Result<Self, EagleError> {
        description::load(xml)
    }

    /// Registers the descriptor for a tag.
    pub fn register(&mut self, spec: TagSpec) -> Result<SpecId, SchemaError> {
        if self.by_tag.contains_key(&spec.tag) {
            return Err(SchemaError::DuplicateTag { tag: spec.tag });
        }
        Self::check_sections(&spec, false)?;
        Ok(self.insert(None, spec))
    }

    /// Registers the root descriptor for a document kind.
    pub fn register_root(
        &mut self,
        kind: DocumentKind,
        spec: TagSpec,
    ) -> Result<SpecId, SchemaError> {
        if self.roots.contains_key(&kind) {
            return Err(SchemaError::DuplicateTag {
                tag: format!("{} ({} root)", spec.tag, kind),
            });
        }
        Self::check_sections(&spec, true)?;
        Ok(self.insert(Some(kind), spec))
    }

    /// Stores a descriptor without any checks. The built-in table goes
    /// through here; its well-formedness is covered by tests.
    fn insert(&mut self, root: Option<DocumentKind>, spec: TagSpec) -> SpecId {
        let id = SpecId(self.specs.len());
        match root {
            Some(kind) => {
                self.roots.insert(kind, id);
            }
            None => {
                self.by_tag.insert(spec.tag.clone(), id);
            }
        }
        self.specs.push(spec);
        id
    }

    fn check_sections(spec: &TagSpec, is_root: bool) -> Result<(), SchemaError> {
        for section in &spec.sections {
            let misplaced_layers = section.kind == SectionKind::LayerTable && !is_root;
            let missing_key = section.kind == SectionKind::Map && section.key.is_none();
            if misplaced_layers || missing_key {
                return Err(SchemaError::WrongSectionKind {
                    tag: spec.tag.clone(),
                    section: section.name.clone(),
                    actual: section.kind,
                });
            }
        }
        Ok(())
    }

    /// Descriptor id for a tag.
    pub fn lookup(&self, tag: &str) -> Result<SpecId, SchemaError> {
        self.by_tag
            .get(tag)
            .copied()
            .ok_or_else(|| SchemaError::UnknownTag { tag: tag.into() })
    }

    /// Root descriptor id for a document kind.
    pub fn root(&self, kind: DocumentKind) -> Result<SpecId, SchemaError> {
        self.roots
            .get(&kind)
            .copied()
            .ok_or_else(|| SchemaError::UnknownRoot {
                kind: kind.to_string(),
            })
    }

    pub fn spec(&self, id: SpecId) -> &TagSpec {
        &self.specs[id.0]
    }

    /// Number of registered tag descriptors, roots excluded.
    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}
