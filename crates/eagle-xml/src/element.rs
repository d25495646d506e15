// crates/eagle-xml/src/element.rs

//! A minimal owned element tree and its `quick-xml` reader and writer.
//!
//! This is the untyped intermediate form between bytes and the typed
//! [`Document`](crate::Document) tree, and the form handed to validators.

use crate::error::{EagleError, FormatError};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// XML declaration and doctype written in front of every saved document.
pub const DOCUMENT_HEADER: &str =
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE eagle SYSTEM \"eagle.dtd\">\n";

/// One XML element with its attributes (in document order), child elements
/// and text content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Returns the raw value of an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.into(),
            None => self.attributes.push((name.into(), value.into())),
        }
    }

    /// Removes an attribute and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Follows a slash-separated path of container names, reusing the first
    /// existing child at each step and creating missing ones.
    pub fn ensure_path(&mut self, path: &str) -> &mut Element {
        let mut target = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let index = match target.children.iter().position(|c| c.tag == segment) {
                Some(i) => i,
                None => {
                    target.children.push(Element::new(segment));
                    target.children.len() - 1
                }
            };
            target = &mut target.children[index];
        }
        target
    }

    /// Collects, in document order, the children with one of `tags` of every
    /// element reached by following `path`.
    pub fn select<'e>(&'e self, path: &str, tags: &[String]) -> Vec<&'e Element> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut out = Vec::new();
        self.select_into(&segments, tags, &mut out);
        out
    }

    fn select_into<'e>(&'e self, segments: &[&str], tags: &[String], out: &mut Vec<&'e Element>) {
        match segments.split_first() {
            Some((head, rest)) => {
                for c in self.children.iter().filter(|c| c.tag == *head) {
                    c.select_into(rest, tags, out);
                }
            }
            None => out.extend(self.children.iter().filter(|c| tags.contains(&c.tag))),
        }
    }

    /// Depth-first walk over this element and all descendants.
    pub fn walk<'e>(&'e self, visit: &mut dyn FnMut(&'e Element)) {
        visit(self);
        for c in &self.children {
            c.walk(visit);
        }
    }
}

/// Parses a whole XML document into its root element.
///
/// Whitespace-only text is dropped; comments, processing instructions and the
/// doctype are ignored.
pub fn parse_str(xml: &str) -> Result<Element, FormatError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(open_element(&e)?),
            Event::Empty(e) => {
                let el = open_element(&e)?;
                close_element(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| FormatError::Malformed("unbalanced end tag".into()))?;
                close_element(&mut stack, &mut root, el)?;
            }
            Event::Text(t) => push_text(&mut stack, utf8(&t)?),
            Event::CData(c) => push_text(&mut stack, utf8(&c)?),
            Event::GeneralRef(r) => {
                let resolved = resolve_reference(&r)?;
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FormatError::Malformed(format!(
            "element <{}> is never closed",
            open.tag
        )));
    }
    root.ok_or_else(|| FormatError::Malformed("document has no root element".into()))
}

fn utf8(bytes: &[u8]) -> Result<&str, FormatError> {
    core::str::from_utf8(bytes).map_err(|_| FormatError::Encoding)
}

fn open_element(e: &BytesStart<'_>) -> Result<Element, FormatError> {
    let mut el = Element::new(utf8(e.name().as_ref())?);
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        el.attributes.push((key.into(), value.into_owned()));
    }
    Ok(el)
}

fn close_element(
    stack: &mut [Element],
    root: &mut Option<Element>,
    mut el: Element,
) -> Result<(), FormatError> {
    if el.text.as_deref().is_some_and(|t| t.trim().is_empty()) {
        el.text = None;
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_some() => {
            return Err(FormatError::Malformed(format!(
                "second root element <{}>",
                el.tag
            )));
        }
        None => *root = Some(el),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn resolve_reference(r: &BytesRef<'_>) -> Result<String, FormatError> {
    if let Some(ch) = r.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = utf8(r)?;
    resolve_predefined_entity(name)
        .map(str::to_owned)
        .ok_or_else(|| FormatError::Malformed(format!("unknown entity '&{};'", name)))
}

/// Serializes an element tree into an indented XML document string,
/// prefixed with [`DOCUMENT_HEADER`].
pub fn write_document(root: &Element) -> Result<String, EagleError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_element(&mut writer, root)?;

    let body = String::from_utf8(writer.into_inner()).map_err(|_| FormatError::Encoding)?;
    let mut buffer = String::with_capacity(DOCUMENT_HEADER.len() + body.len() + 1);
    buffer.push_str(DOCUMENT_HEADER);
    buffer.push_str(&body);
    buffer.push('\n');
    Ok(buffer)
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), EagleError> {
    let mut start = BytesStart::new(el.tag.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() && el.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &el.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.tag.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <!-- comment -->
  <drawing>
    <layers>
      <layer number="1" name="Top"/>
      <layer number="16" name="Bottom"/>
    </layers>
  </drawing>
</eagle>"#;
        let root = parse_str(xml).unwrap();
        assert_eq!(root.tag, "eagle");
        assert_eq!(root.get("version"), Some("9.6.2"));
        let layers = root.select("drawing/layers", &["layer".to_string()]);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].get("name"), Some("Bottom"));
    }

    #[test]
    fn test_text_and_entities() {
        let xml = r#"<text x="1" size="&quot;big&quot;">R&amp;D &lt;1&gt; &#65;&#x42;</text>"#;
        let root = parse_str(xml).unwrap();
        assert_eq!(root.get("size"), Some("\"big\""));
        assert_eq!(root.text.as_deref(), Some("R&D <1> AB"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_str("<a><b></a>"),
            Err(FormatError::Xml(_)) | Err(FormatError::Malformed(_))
        ));
        assert!(parse_str("<a>").is_err());
        assert!(matches!(parse_str("<a/><b/>"), Err(FormatError::Malformed(_))));
        assert!(matches!(parse_str(""), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_unknown_entity() {
        let err = parse_str("<text>&nbsp;</text>").unwrap_err();
        match err {
            FormatError::Malformed(msg) => assert!(msg.contains("&nbsp;"), "{}", msg),
            other => panic!("Expected an unknown entity, got {:?}", other),
        }
        assert!(parse_str("<text>&#xZZ;</text>").is_err());
    }

    #[test]
    fn test_ensure_path_reuses_containers() {
        let mut root = Element::new("eagle");
        root.ensure_path("drawing/layers")
            .children
            .push(Element::new("layer"));
        root.ensure_path("drawing/board");
        root.ensure_path("drawing/layers")
            .children
            .push(Element::new("layer"));

        let drawing = root.child("drawing").unwrap();
        assert_eq!(drawing.children.len(), 2);
        assert_eq!(drawing.children[0].tag, "layers");
        assert_eq!(drawing.children[0].children.len(), 2);
        assert_eq!(drawing.children[1].tag, "board");
    }

    #[test]
    fn test_write_then_parse() {
        let mut root = Element::new("eagle");
        root.set("version", "9.6.2");
        let mut text = Element::new("text");
        text.set("align", "<center>");
        text.text = Some("A & B".into());
        root.ensure_path("drawing").children.push(text);

        let out = write_document(&root).unwrap();
        assert!(out.starts_with(DOCUMENT_HEADER));
        assert!(out.contains("&amp;"));
        let reparsed = parse_str(&out).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_set_and_remove_attributes() {
        let mut el = Element::new("attribute");
        el.set("name", "VALUE");
        el.set("constant", "no");
        el.set("name", "PART");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.get("name"), Some("PART"));
        assert_eq!(el.remove("constant").as_deref(), Some("no"));
        assert_eq!(el.get("constant"), None);
    }
}
