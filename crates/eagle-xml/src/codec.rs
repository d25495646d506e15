// crates/eagle-xml/src/codec.rs

//! Schema-driven conversion between [`Element`] trees and document nodes.
//!
//! Both directions walk a descriptor's attributes and then its sections in
//! declaration order, so a document always serializes in schema order no
//! matter how its children were arranged on disk.

use crate::coerce::{self, LayerLookup};
use crate::element::Element;
use crate::error::{EagleError, FormatError};
use crate::file::DocumentKind;
use crate::log::doc_debug;
use crate::node::{Document, NodeId};
use crate::schema::{SchemaRegistry, SectionKind, SpecId};

impl<'s> Document<'s> {
    /// Builds a document from its root element.
    pub fn from_element(
        schema: &'s SchemaRegistry,
        kind: DocumentKind,
        root: &Element,
    ) -> Result<Self, EagleError> {
        let mut doc = Document::new(schema, kind)?;
        let expected = &doc.spec_of(doc.root)?.tag;
        if root.tag != *expected {
            return Err(FormatError::UnexpectedTag {
                expected: expected.clone(),
                found: root.tag.clone(),
            }
            .into());
        }
        doc.read_attributes(doc.root, root, true)?;
        doc.read_sections(doc.root, root)?;
        Ok(doc)
    }

    /// Parses an element into a new detached node.
    ///
    /// Layer-reference attributes need an owning file, so a detached node
    /// can only be built from elements without them.
    pub fn build_node(&mut self, el: &Element) -> Result<NodeId, EagleError> {
        let spec = self.schema.lookup(&el.tag)?;
        self.build(spec, el, None)
    }

    fn build(&mut self, spec: SpecId, el: &Element, owner: Option<(NodeId, usize)>) -> Result<NodeId, EagleError> {
        let id = self.alloc(spec);
        let attached = match owner {
            Some((owner, _)) => self.is_attached(owner)?,
            None => false,
        };
        self.read_attributes(id, el, attached)?;
        if let Some((owner, index)) = owner {
            self.insert_child(owner, index, id)?;
        }
        self.read_sections(id, el)?;

        if self.spec_of(id)?.preserves_text {
            self.data_mut(id)?.text = el.text.clone();
        }
        Ok(id)
    }

    fn read_attributes(&mut self, id: NodeId, el: &Element, attached: bool) -> Result<(), EagleError> {
        let spec = self.spec_of(id)?;
        let layers: Option<&dyn LayerLookup> = if attached { Some(&*self) } else { None };

        let mut values = Vec::with_capacity(spec.attrs.len());
        for attr in &spec.attrs {
            let value = coerce::parse(attr.kind, el.get(&attr.name), layers)
                .map_err(|e| e.in_context(&self.describe(id), &spec.tag, &attr.name))?;
            if let Some(value) = value {
                values.push((attr.name.clone(), value));
            }
        }
        for (name, _) in el.attributes.iter().filter(|(n, _)| spec.attr(n).is_none()) {
            doc_debug!(self, "Ignoring undeclared attribute '{}' of <{}>", name, spec.tag);
        }

        self.data_mut(id)?.attrs.extend(values);
        Ok(())
    }

    fn read_sections(&mut self, id: NodeId, el: &Element) -> Result<(), EagleError> {
        let spec = self.spec_of(id)?;
        for (index, section) in spec.sections.iter().enumerate() {
            let matches = el.select(&section.path, &section.tags);
            let matches = match section.kind {
                SectionKind::Singleton => &matches[..matches.len().min(1)],
                _ => &matches[..],
            };
            for child in matches {
                let child_spec = self.schema.lookup(&child.tag)?;
                self.build(child_spec, child, Some((id, index)))?;
            }
        }
        Ok(())
    }

    /// Serializes a node and its subtree in schema order.
    ///
    /// Required attributes without a value are written as `""`; optional
    /// ones are left out.
    pub fn to_element(&self, id: NodeId) -> Result<Element, EagleError> {
        let data = self.data(id)?;
        let spec = self.schema.spec(data.spec);
        let parent_tag = match data.parent {
            Some(p) => Some(self.tag(p)?),
            None => None,
        };
        let layers: Option<&dyn LayerLookup> = if self.is_attached(id)? { Some(self) } else { None };

        let mut el = Element::new(&spec.tag);
        for attr in &spec.attrs {
            if attr.only_under.as_deref().is_some_and(|t| Some(t) != parent_tag) {
                continue;
            }
            let raw = coerce::unparse(attr.kind, data.attrs.get(&attr.name), layers)
                .map_err(|e| e.in_context(&self.describe(id), &spec.tag, &attr.name))?;
            match raw {
                Some(raw) => el.set(&attr.name, &raw),
                None if attr.required => el.set(&attr.name, ""),
                None => {}
            }
        }
        if spec.preserves_text {
            el.text = data.text.clone();
        }

        for (section, slot) in spec.sections.iter().zip(&data.slots) {
            let children = self
                .slot_items(slot)
                .into_iter()
                .map(|c| self.to_element(c))
                .collect::<Result<Vec<_>, _>>()?;
            if children.is_empty() && !section.require_container {
                continue;
            }
            el.ensure_path(&section.path).children.extend(children);
        }
        Ok(el)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::Value;
    use crate::element::parse_str;
    use crate::error::SchemaError;

    const BOARD: &str = r#"<eagle version="9.6.2">
  <drawing>
    <layers>
      <layer number="16" name="Bottom" color="1" fill="1"/>
      <layer number="1" name="Top" color="4" fill="1" visible="YES"/>
    </layers>
    <board>
      <plain>
        <wire x1="0" y1="0" x2="10" y2="0" width="0.254" layer="16"/>
        <text x="1" y="2" size="1.27" layer="1">REV A</text>
      </plain>
      <designrules name="default">
        <param name="mdWireWire" value="8mil"/>
      </designrules>
    </board>
  </drawing>
</eagle>"#;

    #[test]
    fn test_parse_board() {
        let schema = SchemaRegistry::eagle();
        let doc = Document::from_element(&schema, DocumentKind::Board, &parse_str(BOARD).unwrap()).unwrap();
        let root = doc.root();
        assert_eq!(doc.attr_str(root, "version").unwrap(), Some("9.6.2"));

        let plain = doc.items(root, "plain").unwrap();
        assert_eq!(plain.len(), 2);
        assert_eq!(doc.attr_str(plain[0], "layer").unwrap(), Some("Bottom"));
        assert_eq!(doc.attr(plain[0], "width").unwrap(), Some(&Value::Float(0.254)));
        assert_eq!(doc.text(plain[1]).unwrap(), Some("REV A"));

        let rules = doc.get(root, "designrules").unwrap();
        assert_eq!(doc.len(rules, "params").unwrap(), 1);
        doc.sanity_check().unwrap();
    }

    #[test]
    fn test_serialize_in_schema_order() {
        let schema = SchemaRegistry::eagle();
        let doc = Document::from_element(&schema, DocumentKind::Board, &parse_str(BOARD).unwrap()).unwrap();
        let el = doc.to_element(doc.root()).unwrap();

        let drawing = el.child("drawing").unwrap();
        let tags: Vec<&str> = drawing.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, ["layers", "board"]);

        // Layers come out by number and booleans normalized.
        let layers = &drawing.children[0].children;
        assert_eq!(layers[0].get("name"), Some("Top"));
        assert_eq!(layers[0].get("visible"), Some("yes"));
        assert_eq!(layers[1].get("visible"), None);

        let board = drawing.child("board").unwrap();
        let tags: Vec<&str> = board.children.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, ["plain", "designrules"]);
        let wire = &board.child("plain").unwrap().children[0];
        assert_eq!(wire.get("layer"), Some("16"));
    }

    #[test]
    fn test_required_containers_and_attributes() {
        let schema = SchemaRegistry::eagle();
        let mut doc = Document::new(&schema, DocumentKind::Board).unwrap();
        let el = doc.to_element(doc.root()).unwrap();
        assert_eq!(el.get("version"), Some(""));
        assert!(el.child("drawing").unwrap().child("layers").is_some());
        assert!(el.child("drawing").unwrap().child("board").is_some());

        let ds = doc.create("deviceset").unwrap();
        doc.set_attr(ds, "name", "R").unwrap();
        let out = doc.to_element(ds).unwrap();
        assert!(out.child("gates").is_some());
        assert!(out.child("devices").is_some());
        assert!(out.child("description").is_none());
    }

    #[test]
    fn test_constant_depends_on_owner() {
        let schema = SchemaRegistry::eagle();
        let mut doc = Document::new(&schema, DocumentKind::Schematic).unwrap();
        let tech = doc.create("technology").unwrap();
        doc.set_attr(tech, "name", "").unwrap();
        let part = doc.create("part").unwrap();

        let make = |doc: &mut Document<'_>| {
            let a = doc.create("attribute").unwrap();
            doc.set_attr(a, "name", "MF").unwrap();
            doc.set_attr(a, "constant", false).unwrap();
            a
        };
        let lib_attr = make(&mut doc);
        let part_attr = make(&mut doc);
        doc.add(tech, "attributes", lib_attr).unwrap();
        doc.add(part, "attributes", part_attr).unwrap();

        assert_eq!(doc.to_element(lib_attr).unwrap().get("constant"), Some("no"));
        assert_eq!(doc.to_element(part_attr).unwrap().get("constant"), None);
    }

    #[test]
    fn test_wrong_root_tag() {
        let schema = SchemaRegistry::eagle();
        let el = parse_str("<drawing/>").unwrap();
        let err = Document::from_element(&schema, DocumentKind::Board, &el).unwrap_err();
        assert!(matches!(
            err,
            EagleError::Format(FormatError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn test_unknown_layer_number_fails() {
        let schema = SchemaRegistry::eagle();
        let xml = BOARD.replace(r#"layer="16"/>"#, r#"layer="200"/>"#);
        let err = Document::from_element(&schema, DocumentKind::Board, &parse_str(&xml).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            EagleError::Schema(SchemaError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_detached_layer_reference_fails() {
        let schema = SchemaRegistry::eagle();
        let mut doc = Document::new(&schema, DocumentKind::Board).unwrap();
        let el = parse_str(r#"<circle x="0" y="0" radius="1" width="0.1" layer="21"/>"#).unwrap();
        let err = doc.build_node(&el).unwrap_err();
        assert!(matches!(err, EagleError::Schema(SchemaError::Detached { .. })));

        let hole = doc
            .build_node(&parse_str(r#"<hole x="1" y="2" drill="0.8"/>"#).unwrap())
            .unwrap();
        assert_eq!(doc.attr(hole, "drill").unwrap(), Some(&Value::Float(0.8)));
    }
}
