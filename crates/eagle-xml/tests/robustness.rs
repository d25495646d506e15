//! Integration tests focused on error handling and edge cases.
//!
//! These tests ensure malformed XML, wrong document shapes, bad attribute
//! literals and broken ownership are reported as errors naming the offending
//! node or file, without panicking.

use eagle_xml::{
    AcceptAll, Document, DocumentKind, EagleError, FormatError, LoadMode, SchemaError,
    SchemaRegistry, load_from_file, load_from_slice, load_from_str, save_to_string,
};
use std::fs;

/// A minimal valid board used as a base for creating corrupted test cases.
const MINIMAL_BOARD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <layers>
      <layer number="1" name="Top" color="4" fill="1" visible="yes" active="yes"/>
      <layer number="16" name="Bottom" color="1" fill="1" visible="yes" active="yes"/>
    </layers>
    <board>
      <plain>
        <wire x1="0" y1="0" x2="10" y2="0" width="0.254" layer="1"/>
      </plain>
      <elements/>
      <signals>
        <signal name="VCC"/>
      </signals>
    </board>
  </drawing>
</eagle>"#;

fn load_board<'s>(schema: &'s SchemaRegistry, xml: &str) -> Result<Document<'s>, EagleError> {
    load_from_str(schema, xml, DocumentKind::Board, LoadMode::Strict, &AcceptAll)
}

#[test]
fn test_minimal_board_loads() {
    let schema = SchemaRegistry::eagle();
    let doc = load_board(&schema, MINIMAL_BOARD).expect("minimal board should load");
    assert_eq!(doc.get_layers().len(), 2);
    assert_eq!(doc.len(doc.root(), "signals").unwrap(), 1);
}

#[test]
fn test_malformed_xml() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace("</plain>", "");
    let err = load_board(&schema, &xml).unwrap_err();
    assert!(matches!(err, EagleError::Format(_)), "{:?}", err);

    let err = load_board(&schema, "").unwrap_err();
    assert!(matches!(err, EagleError::Format(FormatError::Malformed(_))));

    let err = load_board(&schema, "<eagle/><eagle/>").unwrap_err();
    assert!(matches!(err, EagleError::Format(FormatError::Malformed(_))));
}

#[test]
fn test_wrong_root_element() {
    let schema = SchemaRegistry::eagle();
    let err = load_board(&schema, r#"<svg width="10"><g/></svg>"#).unwrap_err();
    match err {
        EagleError::Format(FormatError::UnexpectedTag { expected, found }) => {
            assert_eq!(expected, "eagle");
            assert_eq!(found, "svg");
        }
        other => panic!("Expected an unexpected-tag error, got {:?}", other),
    }
}

#[test]
fn test_unknown_elements_and_attributes_are_skipped() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD
        .replace("<elements/>", "<elements/><frobnicator level=\"3\"/>")
        .replace(r#"<signal name="VCC"/>"#, r#"<signal name="VCC" colour="red"/>"#);
    let doc = load_board(&schema, &xml).unwrap();
    let saved = save_to_string(&doc, &AcceptAll).unwrap();
    assert!(!saved.contains("frobnicator"));
    assert!(!saved.contains("colour"));
    assert!(saved.contains(r#"<signal name="VCC"/>"#));
}

#[test]
fn test_invalid_boolean_literal() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replacen(r#"visible="yes""#, r#"visible="maybe""#, 1);
    let err = load_board(&schema, &xml).unwrap_err();
    match err {
        EagleError::Schema(SchemaError::InvalidLiteral {
            tag,
            attribute,
            value,
            ..
        }) => {
            assert_eq!(tag, "layer");
            assert_eq!(attribute, "visible");
            assert_eq!(value, "maybe");
        }
        other => panic!("Expected an invalid literal, got {:?}", other),
    }
}

#[test]
fn test_invalid_numeric_literals() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace(r#"number="16""#, r#"number="sixteen""#);
    assert!(matches!(
        load_board(&schema, &xml),
        Err(EagleError::Schema(SchemaError::InvalidLiteral { .. }))
    ));

    let xml = MINIMAL_BOARD.replace(r#"width="0.254""#, r#"width="thin""#);
    assert!(matches!(
        load_board(&schema, &xml),
        Err(EagleError::Schema(SchemaError::InvalidLiteral { .. }))
    ));
}

#[test]
fn test_unknown_layer_reference() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace(r#"width="0.254" layer="1""#, r#"width="0.254" layer="21""#);
    let err = load_board(&schema, &xml).unwrap_err();
    match &err {
        EagleError::Schema(SchemaError::LayerNotFound { file, layer }) => {
            assert_eq!(file, "<unnamed board>");
            assert!(layer.contains("21"), "{}", layer);
        }
        other => panic!("Expected a missing layer, got {:?}", other),
    }
}

#[test]
fn test_duplicate_layers() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace(r#"number="16" name="Bottom""#, r#"number="1" name="Bottom""#);
    assert!(matches!(
        load_board(&schema, &xml),
        Err(EagleError::Schema(SchemaError::DuplicateLayer { .. }))
    ));

    let xml = MINIMAL_BOARD.replace(r#"number="16" name="Bottom""#, r#"number="16" name="Top""#);
    assert!(matches!(
        load_board(&schema, &xml),
        Err(EagleError::Schema(SchemaError::DuplicateLayer { .. }))
    ));
}

#[test]
fn test_duplicate_map_keys() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace(
        r#"<signal name="VCC"/>"#,
        r#"<signal name="VCC"/><signal name="VCC"/>"#,
    );
    let err = load_board(&schema, &xml).unwrap_err();
    match err {
        EagleError::Schema(SchemaError::DuplicateKey { section, key, .. }) => {
            assert_eq!(section, "signals");
            assert_eq!(key, "VCC");
        }
        other => panic!("Expected a duplicate key, got {:?}", other),
    }
}

#[test]
fn test_missing_required_attribute_serializes_empty() {
    let schema = SchemaRegistry::eagle();
    let xml = MINIMAL_BOARD.replace(r#"<eagle version="9.6.2">"#, "<eagle>");
    let doc = load_board(&schema, &xml).unwrap();
    assert_eq!(doc.attr(doc.root(), "version").unwrap(), None);
    let saved = save_to_string(&doc, &AcceptAll).unwrap();
    assert!(saved.contains(r#"<eagle version="">"#));
}

#[test]
fn test_file_errors() {
    let schema = SchemaRegistry::eagle();
    let dir = tempfile::tempdir().unwrap();

    // 1. Unknown suffix
    let txt = dir.path().join("notes.txt");
    fs::write(&txt, MINIMAL_BOARD).unwrap();
    let err = load_from_file(&schema, &txt, LoadMode::Strict, &AcceptAll).unwrap_err();
    assert!(matches!(
        err,
        EagleError::Format(FormatError::UnknownDocumentKind(_))
    ));

    // 2. Missing file
    let missing = dir.path().join("missing.brd");
    let err = load_from_file(&schema, &missing, LoadMode::Strict, &AcceptAll).unwrap_err();
    assert!(matches!(err, EagleError::Io(_)));

    // 3. Not XML at all
    let garbage = dir.path().join("garbage.brd");
    fs::write(&garbage, "PK\u{3}\u{4} binary board").unwrap();
    let err = load_from_file(&schema, &garbage, LoadMode::Strict, &AcceptAll).unwrap_err();
    match err {
        EagleError::Format(FormatError::Malformed(msg)) => {
            assert!(msg.contains("doesn't look like an XML EAGLE file"), "{}", msg);
        }
        other => panic!("Expected a malformed file, got {:?}", other),
    }

    // 4. Right XML, wrong suffix for its drawing
    let board_as_lbr = dir.path().join("board.lbr");
    fs::write(&board_as_lbr, MINIMAL_BOARD).unwrap();
    let err = load_from_file(&schema, &board_as_lbr, LoadMode::Strict, &AcceptAll).unwrap_err();
    assert!(matches!(
        err,
        EagleError::Format(FormatError::KindMismatch { .. })
    ));
}

#[test]
fn test_invalid_utf8_is_a_format_error() {
    let schema = SchemaRegistry::eagle();
    let mut bytes = MINIMAL_BOARD.as_bytes().to_vec();
    let at = MINIMAL_BOARD.find("VCC").unwrap();
    bytes[at] = 0xFF;

    let err = load_from_slice(&schema, &bytes, DocumentKind::Board, LoadMode::Strict, &AcceptAll)
        .unwrap_err();
    assert!(matches!(err, EagleError::Format(FormatError::Encoding)), "{:?}", err);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latin1.brd");
    fs::write(&path, &bytes).unwrap();
    let err = load_from_file(&schema, &path, LoadMode::Strict, &AcceptAll).unwrap_err();
    assert!(matches!(err, EagleError::Format(FormatError::Encoding)), "{:?}", err);

    let doc = load_from_slice(
        &schema,
        MINIMAL_BOARD.as_bytes(),
        DocumentKind::Board,
        LoadMode::Strict,
        &AcceptAll,
    )
    .unwrap();
    assert_eq!(doc.len(doc.root(), "signals").unwrap(), 1);
}

#[test]
fn test_stale_and_root_handles() {
    let schema = SchemaRegistry::eagle();
    let mut doc = load_board(&schema, MINIMAL_BOARD).unwrap();
    let root = doc.root();
    let signal = doc.lookup(root, "signals", "VCC").unwrap();
    doc.discard(signal).unwrap();

    assert!(matches!(
        doc.attr(signal, "name"),
        Err(SchemaError::StaleNode { .. })
    ));
    assert!(matches!(
        doc.detach(root),
        Err(SchemaError::RootOperation { .. })
    ));
    assert!(matches!(
        doc.clone_subtree(root),
        Err(SchemaError::RootOperation { .. })
    ));
    doc.sanity_check().unwrap();
}

#[test]
fn test_mutations_keep_ownership_exclusive() {
    let schema = SchemaRegistry::eagle();
    let mut doc = load_board(&schema, MINIMAL_BOARD).unwrap();
    let root = doc.root();
    let wire = doc.get_nth(root, "plain", 0).unwrap();
    let signal = doc.lookup(root, "signals", "VCC").unwrap();

    // Moving the wire into the signal takes it out of <plain>.
    doc.add(signal, "items", wire).unwrap();
    assert_eq!(doc.len(root, "plain").unwrap(), 0);
    assert_eq!(doc.parent(wire).unwrap(), Some(signal));
    doc.sanity_check().unwrap();

    // A signal is not allowed in <plain>.
    assert!(matches!(
        doc.add(root, "plain", signal),
        Err(SchemaError::ChildNotAllowed { .. })
    ));

    // Renaming onto an existing key is refused and leaves the map intact.
    let gnd = doc.create("signal").unwrap();
    doc.set_attr(gnd, "name", "GND").unwrap();
    doc.add(root, "signals", gnd).unwrap();
    assert!(matches!(
        doc.set_attr(gnd, "name", "VCC"),
        Err(SchemaError::DuplicateKey { .. })
    ));
    assert_eq!(doc.lookup(root, "signals", "GND").unwrap(), gnd);
    doc.sanity_check().unwrap();
}
