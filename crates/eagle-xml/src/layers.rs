// crates/eagle-xml/src/layers.rs

//! The per-file layer table.
//!
//! Layers are `<layer>` nodes owned by the document root and indexed twice,
//! by number and by name. Layer-reference attributes are stored by name in
//! memory and translated through this table when reading and writing.

use crate::coerce::{LayerLookup, Value};
use crate::error::{EagleError, SchemaError};
use crate::node::{Document, NodeId};
use crate::schema::SectionKind;
use std::collections::BTreeMap;

/// Two synchronized indexes over the root's layer nodes.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayerTable {
    by_number: BTreeMap<i64, NodeId>,
    by_name: BTreeMap<String, NodeId>,
}

impl LayerTable {
    /// Layer nodes ordered by number.
    pub(crate) fn nodes(&self) -> Vec<NodeId> {
        self.by_number.values().copied().collect()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.by_number.values().any(|n| *n == id)
    }

    pub(crate) fn forget(&mut self, id: NodeId) {
        self.by_number.retain(|_, n| *n != id);
        self.by_name.retain(|_, n| *n != id);
    }
}

/// A snapshot of one layer table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub number: i64,
    pub name: String,
    pub node: NodeId,
}

/// The ways of naming a layer to [`Document::remove_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRef<'a> {
    Node(NodeId),
    Name(&'a str),
    Number(i64),
}

impl From<NodeId> for LayerRef<'_> {
    fn from(id: NodeId) -> Self {
        LayerRef::Node(id)
    }
}

impl<'a> From<&'a str> for LayerRef<'a> {
    fn from(name: &'a str) -> Self {
        LayerRef::Name(name)
    }
}

impl From<i64> for LayerRef<'_> {
    fn from(number: i64) -> Self {
        LayerRef::Number(number)
    }
}

impl Document<'_> {
    fn layer_not_found(&self, layer: String) -> SchemaError {
        SchemaError::LayerNotFound {
            file: self.label(),
            layer,
        }
    }

    fn duplicate_layer(&self, layer: String) -> SchemaError {
        SchemaError::DuplicateLayer {
            file: self.label(),
            layer,
        }
    }

    /// Number and name of a candidate layer node, checked against the table.
    fn check_layer(&self, layer: NodeId) -> Result<(i64, String), SchemaError> {
        let root_spec = self.spec_of(self.root)?;
        let section = root_spec
            .sections
            .iter()
            .find(|s| s.kind == SectionKind::LayerTable)
            .ok_or_else(|| SchemaError::UnknownSection {
                tag: root_spec.tag.clone(),
                section: "layers".into(),
            })?;
        let tag = self.tag(layer)?;
        if !section.accepts(tag) {
            return Err(SchemaError::ChildNotAllowed {
                owner: self.describe(self.root),
                section: section.name.clone(),
                child: tag.into(),
            });
        }

        let missing = |key: &str| SchemaError::MissingKey {
            node: self.describe(layer),
            key: key.into(),
        };
        let number = self.attr_int(layer, "number")?.ok_or_else(|| missing("number"))?;
        let name = self
            .attr_str(layer, "name")?
            .ok_or_else(|| missing("name"))?
            .to_string();

        if self.layers.by_number.get(&number).is_some_and(|n| *n != layer) {
            return Err(self.duplicate_layer(format!("number {}", number)));
        }
        if self.layers.by_name.get(&name).is_some_and(|n| *n != layer) {
            return Err(self.duplicate_layer(format!("named '{}'", name)));
        }
        Ok((number, name))
    }

    /// Enters a detached layer node into the table and links it to the root.
    pub(crate) fn register_layer(&mut self, layer: NodeId) -> Result<(), SchemaError> {
        let (number, name) = self.check_layer(layer)?;
        self.layers.forget(layer);
        self.layers.by_number.insert(number, layer);
        self.layers.by_name.insert(name, layer);
        self.data_mut(layer)?.parent = Some(self.root);
        Ok(())
    }

    /// Adds a `<layer>` node to the file, detaching it from any previous
    /// owner. Rejects a number or name that another layer already has.
    pub fn add_layer(&mut self, layer: NodeId) -> Result<(), SchemaError> {
        self.check_layer(layer)?;
        self.detach(layer)?;
        self.register_layer(layer)
    }

    fn resolve_layer(&self, layer: LayerRef<'_>) -> Result<NodeId, SchemaError> {
        match layer {
            LayerRef::Node(id) if self.layers.contains(id) => Ok(id),
            LayerRef::Node(id) => Err(self.layer_not_found(self.describe(id))),
            LayerRef::Name(name) => self
                .layers
                .by_name
                .get(name)
                .copied()
                .ok_or_else(|| self.layer_not_found(format!("named '{}'", name))),
            LayerRef::Number(number) => self
                .layers
                .by_number
                .get(&number)
                .copied()
                .ok_or_else(|| self.layer_not_found(format!("number {}", number))),
        }
    }

    /// Removes a layer given as a node, a name or a number, and returns the
    /// detached node.
    pub fn remove_layer<'a>(&mut self, layer: impl Into<LayerRef<'a>>) -> Result<NodeId, SchemaError> {
        let id = self.resolve_layer(layer.into())?;
        self.detach(id)?;
        Ok(id)
    }

    /// Keeps both indexes in step when a layer's number or name changes.
    pub(crate) fn rekey_layer(
        &mut self,
        id: NodeId,
        attribute: &str,
        value: Option<&Value>,
    ) -> Result<(), SchemaError> {
        if attribute != "number" && attribute != "name" {
            return Ok(());
        }
        let Some(value) = value else {
            return Err(SchemaError::MissingKey {
                node: self.describe(id),
                key: attribute.into(),
            });
        };

        if let Some(number) = value.as_int().filter(|_| attribute == "number") {
            if self.layers.by_number.get(&number).is_some_and(|n| *n != id) {
                return Err(self.duplicate_layer(format!("number {}", number)));
            }
            self.layers.by_number.retain(|_, n| *n != id);
            self.layers.by_number.insert(number, id);
        } else if let Some(name) = value.as_str().filter(|_| attribute == "name") {
            if self.layers.by_name.get(name).is_some_and(|n| *n != id) {
                return Err(self.duplicate_layer(format!("named '{}'", name)));
            }
            self.layers.by_name.retain(|_, n| *n != id);
            self.layers.by_name.insert(name.to_string(), id);
        }
        Ok(())
    }

    fn layer_entry(&self, id: NodeId) -> Result<Layer, SchemaError> {
        Ok(Layer {
            number: self.attr_int(id, "number")?.unwrap_or_default(),
            name: self.attr_str(id, "name")?.unwrap_or_default().to_string(),
            node: id,
        })
    }

    /// All layers keyed by name.
    pub fn get_layers(&self) -> BTreeMap<String, Layer> {
        self.layers
            .by_name
            .values()
            .filter_map(|id| self.layer_entry(*id).ok())
            .map(|l| (l.name.clone(), l))
            .collect()
    }

    /// All layers keyed by number.
    pub fn get_layers_by_number(&self) -> BTreeMap<i64, Layer> {
        self.layers
            .by_number
            .values()
            .filter_map(|id| self.layer_entry(*id).ok())
            .map(|l| (l.number, l))
            .collect()
    }

    pub(crate) fn check_layer_table(&self) -> Result<(), EagleError> {
        if self.layers.by_number.len() != self.layers.by_name.len() {
            return Err(self.violation(
                self.root,
                "layer indexes by number and by name disagree".into(),
            ));
        }
        for (number, id) in &self.layers.by_number {
            let entry = self.layer_entry(*id)?;
            if entry.number != *number || self.layers.by_name.get(&entry.name) != Some(id) {
                return Err(self.violation(*id, format!("stale layer table entry {}", number)));
            }
            if self.parent(*id)? != Some(self.root) {
                return Err(self.violation(*id, "layer not owned by the file".into()));
            }
        }
        Ok(())
    }
}

impl LayerLookup for Document<'_> {
    fn layer_number_to_name(&self, number: i64) -> Result<String, SchemaError> {
        let id = self.resolve_layer(LayerRef::Number(number))?;
        Ok(self.attr_str(id, "name")?.unwrap_or_default().to_string())
    }

    fn layer_name_to_number(&self, name: &str) -> Result<i64, SchemaError> {
        let id = self.resolve_layer(LayerRef::Name(name))?;
        Ok(self.attr_int(id, "number")?.unwrap_or_default())
    }
}
