// crates/eagle-xml/src/node.rs

//! The document arena: node identity, attributes, parent links, navigation,
//! deep copies and the structural sanity check.
//!
//! Nodes live in a `Vec` owned by their [`Document`] and are addressed by
//! [`NodeId`]. Each node records its owner, and each owner records its
//! children in one storage slot per declared section, so every
//! child-to-parent link has exactly one counterpart in the owner.

use crate::coerce::Value;
use crate::error::{EagleError, SchemaError};
use crate::file::DocumentKind;
use crate::layers::LayerTable;
use crate::schema::{AttrSpec, SchemaRegistry, SectionKind, SpecId, TagSpec};
use std::collections::{BTreeMap, BTreeSet};

/// Stable handle of a node inside its [`Document`].
///
/// Handles of discarded nodes are never reused; using one is a
/// [`SchemaError::StaleNode`] error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Child storage for one declared section.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    List(Vec<NodeId>),
    /// Entries in insertion order.
    Map(Vec<(String, NodeId)>),
    Single(Option<NodeId>),
    /// Children are held by the document's [`LayerTable`].
    Layers,
}

impl Slot {
    fn for_section(kind: SectionKind) -> Self {
        match kind {
            SectionKind::List => Slot::List(Vec::new()),
            SectionKind::Map => Slot::Map(Vec::new()),
            SectionKind::Singleton => Slot::Single(None),
            SectionKind::LayerTable => Slot::Layers,
        }
    }

    pub(crate) fn holds(&self, child: NodeId) -> bool {
        match self {
            Slot::List(v) => v.contains(&child),
            Slot::Map(v) => v.iter().any(|(_, c)| *c == child),
            Slot::Single(s) => *s == Some(child),
            Slot::Layers => false,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) spec: SpecId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) attrs: BTreeMap<String, Value>,
    pub(crate) slots: Vec<Slot>,
    pub(crate) text: Option<String>,
}

/// An owned, parent-free deep copy of a subtree.
///
/// Equality is structural: tags, attribute values, text and children in
/// section order. A fragment does not borrow its document and can be sent to
/// another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub tag: String,
    pub attrs: BTreeMap<String, Value>,
    /// Children per section, in declaration order.
    pub sections: Vec<(String, Vec<Fragment>)>,
    pub text: Option<String>,
}

/// One EAGLE file held as a typed object tree.
#[derive(Debug, Clone)]
pub struct Document<'s> {
    pub(crate) schema: &'s SchemaRegistry,
    pub(crate) kind: DocumentKind,
    pub(crate) nodes: Vec<Option<NodeData>>,
    pub(crate) root: NodeId,
    pub(crate) layers: LayerTable,
    pub(crate) filename: Option<String>,
}

impl<'s> Document<'s> {
    /// Creates an empty document of the given kind.
    pub fn new(schema: &'s SchemaRegistry, kind: DocumentKind) -> Result<Self, SchemaError> {
        let root_spec = schema.root(kind)?;
        let mut doc = Document {
            schema,
            kind,
            nodes: Vec::new(),
            root: NodeId(0),
            layers: LayerTable::default(),
            filename: None,
        };
        doc.root = doc.alloc(root_spec);
        Ok(doc)
    }

    pub fn schema(&self) -> &'s SchemaRegistry {
        self.schema
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: Option<String>) {
        self.filename = filename;
    }

    /// Name used for this file in messages.
    pub fn label(&self) -> String {
        match &self.filename {
            Some(name) => name.clone(),
            None => format!("<unnamed {}>", self.kind),
        }
    }

    /// Number of live nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub(crate) fn alloc(&mut self, spec: SpecId) -> NodeId {
        let slots = self
            .schema
            .spec(spec)
            .sections
            .iter()
            .map(|s| Slot::for_section(s.kind))
            .collect();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(NodeData {
            spec,
            parent: None,
            attrs: BTreeMap::new(),
            slots,
            text: None,
        }));
        id
    }

    /// Creates a detached node for a registered tag.
    pub fn create(&mut self, tag: &str) -> Result<NodeId, SchemaError> {
        let spec = self.schema.lookup(tag)?;
        Ok(self.alloc(spec))
    }

    pub(crate) fn data(&self, id: NodeId) -> Result<&NodeData, SchemaError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SchemaError::StaleNode { index: id.0 })
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, SchemaError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SchemaError::StaleNode { index: id.0 })
    }

    /// The descriptor a node was built from.
    pub fn spec_of(&self, id: NodeId) -> Result<&'s TagSpec, SchemaError> {
        let spec = self.data(id)?.spec;
        Ok(self.schema.spec(spec))
    }

    pub fn tag(&self, id: NodeId) -> Result<&'s str, SchemaError> {
        Ok(self.spec_of(id)?.tag.as_str())
    }

    /// Short human-readable name for messages, e.g. `<part 'R1'>`.
    pub fn describe(&self, id: NodeId) -> String {
        let Ok(data) = self.data(id) else {
            return format!("#{}", id.0);
        };
        let tag = &self.schema.spec(data.spec).tag;
        match data.attrs.get("name").and_then(Value::as_str) {
            Some(name) => format!("<{} '{}'>", tag, name),
            None => format!("<{}>", tag),
        }
    }

    /// Owner of a node; `None` for the root and for detached nodes.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SchemaError> {
        Ok(self.data(id)?.parent)
    }

    /// Whether the owner chain of `id` reaches the document root.
    pub fn is_attached(&self, id: NodeId) -> Result<bool, SchemaError> {
        let mut current = id;
        loop {
            if current == self.root {
                return Ok(true);
            }
            match self.data(current)?.parent {
                Some(p) => current = p,
                None => return Ok(false),
            }
        }
    }

    /// All children of a node in section order.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, SchemaError> {
        let data = self.data(id)?;
        Ok(data
            .slots
            .iter()
            .flat_map(|slot| self.slot_items(slot))
            .collect())
    }

    pub(crate) fn slot_items(&self, slot: &Slot) -> Vec<NodeId> {
        match slot {
            Slot::List(v) => v.clone(),
            Slot::Map(v) => v.iter().map(|(_, c)| *c).collect(),
            Slot::Single(s) => s.iter().copied().collect(),
            Slot::Layers => self.layers.nodes(),
        }
    }

    /// Index of the section of `owner` that holds `child`.
    pub(crate) fn slot_of(&self, owner: NodeId, child: NodeId) -> Result<Option<usize>, SchemaError> {
        let data = self.data(owner)?;
        Ok(data.slots.iter().position(|slot| match slot {
            Slot::Layers => self.layers.contains(child),
            other => other.holds(child),
        }))
    }

    // --- Attributes ---

    fn declared(&self, id: NodeId, name: &str) -> Result<&'s AttrSpec, SchemaError> {
        let spec = self.spec_of(id)?;
        spec.attr(name).ok_or_else(|| SchemaError::UnknownAttribute {
            tag: spec.tag.clone(),
            attribute: name.into(),
        })
    }

    /// Typed value of a declared attribute, `None` when unset.
    pub fn attr(&self, id: NodeId, name: &str) -> Result<Option<&Value>, SchemaError> {
        self.declared(id, name)?;
        Ok(self.data(id)?.attrs.get(name))
    }

    /// String value of a string or layer attribute.
    pub fn attr_str(&self, id: NodeId, name: &str) -> Result<Option<&str>, SchemaError> {
        Ok(self.attr(id, name)?.and_then(Value::as_str))
    }

    /// Sets a declared attribute.
    ///
    /// The value must be of the variant the attribute's kind stores. When the
    /// attribute is the key of the map (or layer table) holding the node, the
    /// entry is re-keyed; a collision leaves everything unchanged.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), SchemaError> {
        let value = value.into();
        let attr = self.declared(id, name)?;
        if !attr.kind.accepts(&value) {
            return Err(SchemaError::WrongValueType {
                tag: self.tag(id)?.into(),
                attribute: name.into(),
                expected: attr.kind,
            });
        }
        self.rekey(id, name, Some(&value))?;
        self.data_mut(id)?.attrs.insert(name.into(), value);
        Ok(())
    }

    /// Unsets an attribute and returns its previous value. Fails for the key
    /// of the map holding the node.
    pub fn clear_attr(&mut self, id: NodeId, name: &str) -> Result<Option<Value>, SchemaError> {
        self.declared(id, name)?;
        self.rekey(id, name, None)?;
        Ok(self.data_mut(id)?.attrs.remove(name))
    }

    fn rekey(&mut self, id: NodeId, name: &str, value: Option<&Value>) -> Result<(), SchemaError> {
        let Some(owner) = self.data(id)?.parent else {
            return Ok(());
        };
        let Some(index) = self.slot_of(owner, id)? else {
            return Ok(());
        };
        let section = &self.spec_of(owner)?.sections[index];
        match section.kind {
            SectionKind::Map if section.key.as_deref() == Some(name) => {
                let Some(value) = value else {
                    return Err(SchemaError::MissingKey {
                        node: self.describe(id),
                        key: name.into(),
                    });
                };
                let key = value.to_key();
                let taken = SchemaError::DuplicateKey {
                    owner: self.describe(owner),
                    section: section.name.clone(),
                    key: key.clone(),
                };
                if let Slot::Map(entries) = &mut self.data_mut(owner)?.slots[index] {
                    if entries.iter().any(|(k, c)| *k == key && *c != id) {
                        return Err(taken);
                    }
                    if let Some(entry) = entries.iter_mut().find(|(_, c)| *c == id) {
                        entry.0 = key;
                    }
                }
                Ok(())
            }
            SectionKind::LayerTable => self.rekey_layer(id, name, value),
            _ => Ok(()),
        }
    }

    // --- Text ---

    pub fn text(&self, id: NodeId) -> Result<Option<&str>, SchemaError> {
        Ok(self.data(id)?.text.as_deref())
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) -> Result<(), SchemaError> {
        let spec = self.spec_of(id)?;
        if !spec.preserves_text {
            return Err(SchemaError::NoText {
                tag: spec.tag.clone(),
            });
        }
        self.data_mut(id)?.text = text;
        Ok(())
    }

    // --- Detaching and freeing ---

    /// Removes a node from whichever container holds it. Detaching a detached
    /// node does nothing.
    pub fn detach(&mut self, id: NodeId) -> Result<(), SchemaError> {
        if id == self.root {
            return Err(SchemaError::RootOperation { operation: "detach" });
        }
        let Some(owner) = self.data(id)?.parent else {
            return Ok(());
        };
        if let Some(index) = self.slot_of(owner, id)? {
            let data = self
                .nodes
                .get_mut(owner.0)
                .and_then(Option::as_mut)
                .ok_or(SchemaError::StaleNode { index: owner.0 })?;
            match &mut data.slots[index] {
                Slot::List(v) => v.retain(|c| *c != id),
                Slot::Map(v) => v.retain(|(_, c)| *c != id),
                Slot::Single(s) => *s = None,
                Slot::Layers => self.layers.forget(id),
            }
        }
        self.data_mut(id)?.parent = None;
        Ok(())
    }

    /// Detaches a node and frees it with its whole subtree. Handles into the
    /// subtree become stale.
    pub fn discard(&mut self, id: NodeId) -> Result<(), SchemaError> {
        self.detach(id)?;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            pending.extend(self.children(next)?);
            self.nodes[next.0] = None;
        }
        Ok(())
    }

    // --- Copies ---

    /// Deep copy of a subtree as an owned [`Fragment`]. The fragment of the
    /// root includes the layer table.
    pub fn fragment(&self, id: NodeId) -> Result<Fragment, SchemaError> {
        let data = self.data(id)?;
        let spec = self.schema.spec(data.spec);
        let mut sections = Vec::with_capacity(spec.sections.len());
        for (section, slot) in spec.sections.iter().zip(&data.slots) {
            let children = self
                .slot_items(slot)
                .into_iter()
                .map(|c| self.fragment(c))
                .collect::<Result<Vec<_>, _>>()?;
            sections.push((section.name.clone(), children));
        }
        Ok(Fragment {
            tag: spec.tag.clone(),
            attrs: data.attrs.clone(),
            sections,
            text: data.text.clone(),
        })
    }

    /// Re-materializes a fragment in this document as a detached subtree.
    ///
    /// Tags are looked up in this document's registry, so fragments can move
    /// between documents that share tag descriptors.
    pub fn instantiate(&mut self, fragment: &Fragment) -> Result<NodeId, SchemaError> {
        let id = self.create(&fragment.tag)?;
        for (name, value) in &fragment.attrs {
            let attr = self.declared(id, name)?;
            if !attr.kind.accepts(value) {
                return Err(SchemaError::WrongValueType {
                    tag: fragment.tag.clone(),
                    attribute: name.clone(),
                    expected: attr.kind,
                });
            }
            self.data_mut(id)?.attrs.insert(name.clone(), value.clone());
        }
        if fragment.text.is_some() {
            self.set_text(id, fragment.text.clone())?;
        }

        let spec = self.spec_of(id)?;
        for (name, children) in &fragment.sections {
            let (index, section) = spec.section(name).ok_or_else(|| SchemaError::UnknownSection {
                tag: spec.tag.clone(),
                section: name.clone(),
            })?;
            if section.kind == SectionKind::LayerTable {
                return Err(SchemaError::WrongSectionKind {
                    tag: spec.tag.clone(),
                    section: name.clone(),
                    actual: section.kind,
                });
            }
            for child in children {
                let child = self.instantiate(child)?;
                self.insert_child(id, index, child)?;
            }
        }
        Ok(id)
    }

    /// Deep copy of a subtree inside this document, returned detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, SchemaError> {
        if id == self.root {
            return Err(SchemaError::RootOperation { operation: "clone" });
        }
        let fragment = self.fragment(id)?;
        self.instantiate(&fragment)
    }

    /// Deep copy of a subtree of another document, returned detached.
    pub fn import(&mut self, source: &Document<'_>, id: NodeId) -> Result<NodeId, SchemaError> {
        if id == source.root {
            return Err(SchemaError::RootOperation { operation: "import" });
        }
        let fragment = source.fragment(id)?;
        self.instantiate(&fragment)
    }

    // --- Invariants ---

    /// Walks the tree from the root and verifies ownership, map keys and the
    /// layer table, then runs the per-tag checks (part references).
    pub fn sanity_check(&self) -> Result<(), EagleError> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![self.root];
        seen.insert(self.root);

        while let Some(owner) = pending.pop() {
            let data = self.data(owner)?;
            let spec = self.schema.spec(data.spec);

            for (section, slot) in spec.sections.iter().zip(&data.slots) {
                if let Slot::Map(entries) = slot {
                    let key_attr = section.key.as_deref().unwrap_or_default();
                    for (key, child) in entries {
                        let actual = self.data(*child)?.attrs.get(key_attr).map(Value::to_key);
                        if actual.as_deref() != Some(key.as_str()) {
                            return Err(self.violation(*child, format!(
                                "held under key '{}' of '{}' but its '{}' is {:?}",
                                key, section.name, key_attr, actual
                            )));
                        }
                    }
                }
                for child in self.slot_items(slot) {
                    if self.data(child)?.parent != Some(owner) {
                        return Err(self.violation(child, format!(
                            "held by {} but its parent link points elsewhere",
                            self.describe(owner)
                        )));
                    }
                    if !seen.insert(child) {
                        return Err(self.violation(child, "reachable twice".into()));
                    }
                    pending.push(child);
                }
            }

            if spec.tag == "part" {
                self.check_part(owner)?;
            }
        }

        self.check_layer_table()?;
        Ok(())
    }

    pub(crate) fn violation(&self, id: NodeId, detail: String) -> EagleError {
        SchemaError::OwnershipViolation {
            node: self.describe(id),
            detail,
        }
        .into()
    }

    // --- Helpers for typed values ---

    /// Integer value of an attribute or `None`.
    pub fn attr_int(&self, id: NodeId, name: &str) -> Result<Option<i64>, SchemaError> {
        Ok(self.attr(id, name)?.and_then(Value::as_int))
    }
}
