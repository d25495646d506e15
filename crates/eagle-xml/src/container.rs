// crates/eagle-xml/src/container.rs

//! List, map and singleton accessors over a node's declared sections.
//!
//! Every accessor names the owning node and the section. Getters hand out
//! copies of the child handles; the containers themselves are only mutated
//! through the operations below, which keep parent links in step.

use crate::error::SchemaError;
use crate::node::{Document, NodeId, Slot};
use crate::schema::{SectionKind, SectionSpec};

impl<'s> Document<'s> {
    /// Looks up a section of `owner` and checks that it is one of `kinds`.
    fn section_of(
        &self,
        owner: NodeId,
        name: &str,
        kinds: &[SectionKind],
    ) -> Result<(usize, &'s SectionSpec), SchemaError> {
        let spec = self.spec_of(owner)?;
        let (index, section) = spec.section(name).ok_or_else(|| SchemaError::UnknownSection {
            tag: spec.tag.clone(),
            section: name.into(),
        })?;
        if !kinds.contains(&section.kind) {
            return Err(SchemaError::WrongSectionKind {
                tag: spec.tag.clone(),
                section: name.into(),
                actual: section.kind,
            });
        }
        Ok((index, section))
    }

    fn slot(&self, owner: NodeId, index: usize) -> Result<&Slot, SchemaError> {
        Ok(&self.data(owner)?.slots[index])
    }

    fn not_found(&self, owner: NodeId, section: &SectionSpec, key: String) -> SchemaError {
        SchemaError::NotFound {
            owner: self.describe(owner),
            section: section.name.clone(),
            key,
        }
    }

    /// Key a child would be stored under in map section `index` of `owner`,
    /// or `None` for other section kinds. Fails when the key is missing or
    /// held by another child.
    fn map_key(&self, owner: NodeId, index: usize, child: NodeId) -> Result<Option<String>, SchemaError> {
        let section = &self.spec_of(owner)?.sections[index];
        let Some(key_attr) = section.key.as_deref() else {
            return Ok(None);
        };
        if section.kind != SectionKind::Map {
            return Ok(None);
        }
        let key = self
            .data(child)?
            .attrs
            .get(key_attr)
            .map(|v| v.to_key())
            .ok_or_else(|| SchemaError::MissingKey {
                node: self.describe(child),
                key: key_attr.into(),
            })?;
        if let Slot::Map(entries) = self.slot(owner, index)? {
            if entries.iter().any(|(k, c)| *k == key && *c != child) {
                return Err(SchemaError::DuplicateKey {
                    owner: self.describe(owner),
                    section: section.name.clone(),
                    key,
                });
            }
        }
        Ok(Some(key))
    }

    /// Everything that must hold before `child` may move into section
    /// `index` of `owner`.
    fn check_insert(&self, owner: NodeId, index: usize, child: NodeId) -> Result<(), SchemaError> {
        if child == self.root {
            return Err(SchemaError::RootOperation { operation: "attach" });
        }
        let mut ancestor = Some(owner);
        while let Some(a) = ancestor {
            if a == child {
                return Err(SchemaError::OwnershipViolation {
                    node: self.describe(child),
                    detail: format!("cannot be placed under its own descendant {}", self.describe(owner)),
                });
            }
            ancestor = self.data(a)?.parent;
        }

        let section = &self.spec_of(owner)?.sections[index];
        let child_tag = self.tag(child)?;
        if !section.accepts(child_tag) {
            return Err(SchemaError::ChildNotAllowed {
                owner: self.describe(owner),
                section: section.name.clone(),
                child: child_tag.into(),
            });
        }

        self.map_key(owner, index, child)?;
        Ok(())
    }

    /// Stores a detached child in section `index` of `owner` and links it.
    /// A singleton's previous occupant is detached.
    pub(crate) fn insert_child(&mut self, owner: NodeId, index: usize, child: NodeId) -> Result<(), SchemaError> {
        let key = self.map_key(owner, index, child)?;
        if matches!(self.slot(owner, index)?, Slot::Layers) {
            return self.register_layer(child);
        }
        if let Slot::Single(Some(previous)) = *self.slot(owner, index)? {
            if previous != child {
                self.detach(previous)?;
            }
        }

        match &mut self.data_mut(owner)?.slots[index] {
            Slot::List(v) => v.push(child),
            Slot::Map(v) => v.push((key.unwrap_or_default(), child)),
            Slot::Single(s) => *s = Some(child),
            Slot::Layers => {}
        }
        self.data_mut(child)?.parent = Some(owner);
        Ok(())
    }

    // --- Lists and maps ---

    /// Appends `child` to a list or map section, detaching it from its
    /// current owner first. Re-adding a child to the map that holds it is a
    /// no-op. Adding to the root's layer table goes through
    /// [`Document::add_layer`].
    pub fn add(&mut self, owner: NodeId, section: &str, child: NodeId) -> Result<(), SchemaError> {
        let (index, spec) = self.section_of(
            owner,
            section,
            &[SectionKind::List, SectionKind::Map, SectionKind::LayerTable],
        )?;
        if spec.kind == SectionKind::LayerTable {
            return self.add_layer(child);
        }
        if spec.kind == SectionKind::Map
            && self.data(child)?.parent == Some(owner)
            && self.slot_of(owner, child)? == Some(index)
        {
            return Ok(());
        }
        self.check_insert(owner, index, child)?;
        self.detach(child)?;
        self.insert_child(owner, index, child)
    }

    /// The `n`-th child of a list section.
    pub fn get_nth(&self, owner: NodeId, section: &str, n: usize) -> Result<NodeId, SchemaError> {
        let (index, spec) = self.section_of(owner, section, &[SectionKind::List])?;
        match self.slot(owner, index)? {
            Slot::List(v) => v.get(n).copied(),
            _ => None,
        }
        .ok_or_else(|| self.not_found(owner, spec, format!("#{}", n)))
    }

    /// The child of a map section stored under `key`.
    pub fn lookup(&self, owner: NodeId, section: &str, key: &str) -> Result<NodeId, SchemaError> {
        let (index, spec) = self.section_of(owner, section, &[SectionKind::Map])?;
        match self.slot(owner, index)? {
            Slot::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, c)| *c),
            _ => None,
        }
        .ok_or_else(|| self.not_found(owner, spec, key.into()))
    }

    pub fn contains_key(&self, owner: NodeId, section: &str, key: &str) -> Result<bool, SchemaError> {
        match self.lookup(owner, section, key) {
            Ok(_) => Ok(true),
            Err(SchemaError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Copies of the child handles of any section, in storage order (layers
    /// by number).
    pub fn items(&self, owner: NodeId, section: &str) -> Result<Vec<NodeId>, SchemaError> {
        let (index, _) = self.section_of(
            owner,
            section,
            &[
                SectionKind::List,
                SectionKind::Map,
                SectionKind::Singleton,
                SectionKind::LayerTable,
            ],
        )?;
        Ok(self.slot_items(self.slot(owner, index)?))
    }

    /// Copies of the key/child pairs of a map section, in insertion order.
    pub fn entries(&self, owner: NodeId, section: &str) -> Result<Vec<(String, NodeId)>, SchemaError> {
        let (index, _) = self.section_of(owner, section, &[SectionKind::Map])?;
        match self.slot(owner, index)? {
            Slot::Map(entries) => Ok(entries.clone()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn len(&self, owner: NodeId, section: &str) -> Result<usize, SchemaError> {
        Ok(self.items(owner, section)?.len())
    }

    /// Detaches every child of a section and returns them.
    pub fn clear(&mut self, owner: NodeId, section: &str) -> Result<Vec<NodeId>, SchemaError> {
        let children = self.items(owner, section)?;
        for child in &children {
            self.detach(*child)?;
        }
        Ok(children)
    }

    /// Detaches the child stored under `key` in a map section and returns it.
    pub fn remove(&mut self, owner: NodeId, section: &str, key: &str) -> Result<NodeId, SchemaError> {
        let child = self.lookup(owner, section, key)?;
        self.detach(child)?;
        Ok(child)
    }

    // --- Singletons ---

    /// The occupant of a singleton section.
    pub fn get(&self, owner: NodeId, section: &str) -> Result<NodeId, SchemaError> {
        let (_, spec) = self.section_of(owner, section, &[SectionKind::Singleton])?;
        self.singleton(owner, section)?
            .ok_or_else(|| self.not_found(owner, spec, "(empty)".into()))
    }

    /// The occupant of a singleton section, if any.
    pub fn singleton(&self, owner: NodeId, section: &str) -> Result<Option<NodeId>, SchemaError> {
        let (index, _) = self.section_of(owner, section, &[SectionKind::Singleton])?;
        match self.slot(owner, index)? {
            Slot::Single(s) => Ok(*s),
            _ => Ok(None),
        }
    }

    /// Places `child` in a singleton section and returns the detached
    /// previous occupant. Setting the current occupant again changes nothing.
    pub fn set(&mut self, owner: NodeId, section: &str, child: NodeId) -> Result<Option<NodeId>, SchemaError> {
        let (index, _) = self.section_of(owner, section, &[SectionKind::Singleton])?;
        let previous = self.singleton(owner, section)?;
        if previous == Some(child) {
            return Ok(None);
        }
        self.check_insert(owner, index, child)?;
        self.detach(child)?;
        self.insert_child(owner, index, child)?;
        Ok(previous)
    }

    /// Detaches and returns the occupant of a singleton section.
    pub fn unset(&mut self, owner: NodeId, section: &str) -> Result<NodeId, SchemaError> {
        let child = self.get(owner, section)?;
        self.detach(child)?;
        Ok(child)
    }
}
