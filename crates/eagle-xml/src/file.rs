// crates/eagle-xml/src/file.rs

//! Loading, validating and saving whole documents.

use crate::element::{self, Element};
use crate::error::{EagleError, FormatError};
use crate::log::{doc_debug, doc_info, doc_warn};
use crate::node::Document;
use crate::schema::SchemaRegistry;
use core::fmt;
use core::str::FromStr;
use std::fs;
use std::path::Path;

/// Literal that a broken writer leaves behind for a missing value. No
/// attribute of a valid document may carry it.
pub const NULL_SENTINEL: &str = "None";

/// The three kinds of EAGLE files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Schematic,
    Board,
    Library,
}

impl DocumentKind {
    /// File suffix, without the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            DocumentKind::Schematic => "sch",
            DocumentKind::Board => "brd",
            DocumentKind::Library => "lbr",
        }
    }

    /// Selects the kind from a `.sch`, `.brd` or `.lbr` suffix.
    pub fn from_path(path: &Path) -> Result<Self, FormatError> {
        let suffix = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match suffix {
            "sch" => Ok(DocumentKind::Schematic),
            "brd" => Ok(DocumentKind::Board),
            "lbr" => Ok(DocumentKind::Library),
            _ => Err(FormatError::UnknownDocumentKind(format!(
                "file suffix '.{}' of {}",
                suffix,
                path.display()
            ))),
        }
    }

    /// Inspects `<drawing>` for the element that declares the kind.
    ///
    /// Returns `None` when the drawing has no `<schematic>`, `<board>` or
    /// `<library>` element, e.g. for a freshly created library file.
    pub fn detect(root: &Element) -> Option<Self> {
        root.child("drawing")?
            .children
            .iter()
            .find_map(|c| c.tag.parse().ok())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Schematic => "schematic",
            DocumentKind::Board => "board",
            DocumentKind::Library => "library",
        })
    }
}

impl FromStr for DocumentKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schematic" => Ok(DocumentKind::Schematic),
            "board" => Ok(DocumentKind::Board),
            "library" => Ok(DocumentKind::Library),
            other => Err(FormatError::UnknownDocumentKind(other.into())),
        }
    }
}

/// What to do when a document fails validation while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Abort with [`EagleError::Validation`].
    Strict,
    /// Log a warning and keep going.
    #[default]
    BestEffort,
}

/// An external conformance check, typically a DTD validator.
///
/// `Err` carries the first diagnostic.
pub trait Validator {
    fn validate(&self, root: &Element) -> Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&Element) -> Result<(), String>,
{
    fn validate(&self, root: &Element) -> Result<(), String> {
        self(root)
    }
}

/// A validator that accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Validator for AcceptAll {
    fn validate(&self, _root: &Element) -> Result<(), String> {
        Ok(())
    }
}

/// Runs the external validator, then the null-sentinel check.
fn check(root: &Element, validator: &dyn Validator) -> Result<(), String> {
    validator.validate(root)?;

    let mut offender = None;
    root.walk(&mut |el| {
        if offender.is_none() {
            if let Some((name, _)) = el.attributes.iter().find(|(_, v)| v == NULL_SENTINEL) {
                offender = Some(format!("<{}> has '{}' attribute value '{}'", el.tag, name, NULL_SENTINEL));
            }
        }
    });
    match offender {
        Some(diagnostic) => Err(diagnostic),
        None => Ok(()),
    }
}

/// Loads a document of the given kind from an XML string.
///
/// # Errors
/// Returns a format error for malformed XML or a drawing of another kind, a
/// validation error in [`LoadMode::Strict`] when `validator` rejects the
/// input, and a schema error when the tree does not fit the schema or fails
/// its sanity check.
pub fn load_from_str<'s>(
    schema: &'s SchemaRegistry,
    xml: &str,
    kind: DocumentKind,
    mode: LoadMode,
    validator: &dyn Validator,
) -> Result<Document<'s>, EagleError> {
    let root = element::parse_str(xml)?;
    load_element(schema, &root, kind, mode, validator, None)
}

/// Loads a document of the given kind from raw bytes.
///
/// # Errors
/// Input that is not UTF-8 is a [`FormatError::Encoding`]; otherwise as
/// [`load_from_str`].
pub fn load_from_slice<'s>(
    schema: &'s SchemaRegistry,
    bytes: &[u8],
    kind: DocumentKind,
    mode: LoadMode,
    validator: &dyn Validator,
) -> Result<Document<'s>, EagleError> {
    let root = parse_slice(bytes)?;
    load_element(schema, &root, kind, mode, validator, None)
}

/// Loads a document from a `.sch`, `.brd` or `.lbr` file.
pub fn load_from_file<'s>(
    schema: &'s SchemaRegistry,
    path: impl AsRef<Path>,
    mode: LoadMode,
    validator: &dyn Validator,
) -> Result<Document<'s>, EagleError> {
    let path = path.as_ref();
    let kind = DocumentKind::from_path(path)?;
    let bytes = fs::read(path)?;
    let root = parse_slice(&bytes).map_err(|e| match e {
        FormatError::Xml(_) | FormatError::Malformed(_) => FormatError::Malformed(format!(
            "'{}' doesn't look like an XML EAGLE file: {}",
            path.display(),
            e
        )),
        other => other,
    })?;
    load_element(
        schema,
        &root,
        kind,
        mode,
        validator,
        Some(path.display().to_string()),
    )
}

fn parse_slice(bytes: &[u8]) -> Result<Element, FormatError> {
    let xml = core::str::from_utf8(bytes).map_err(|_| FormatError::Encoding)?;
    element::parse_str(xml)
}

fn load_element<'s>(
    schema: &'s SchemaRegistry,
    root: &Element,
    kind: DocumentKind,
    mode: LoadMode,
    validator: &dyn Validator,
    filename: Option<String>,
) -> Result<Document<'s>, EagleError> {
    // 1. The drawing must hold what was asked for.
    if let Some(found) = DocumentKind::detect(root) {
        if found != kind {
            return Err(FormatError::KindMismatch {
                requested: kind.to_string(),
                found: found.to_string(),
            }
            .into());
        }
    }

    // 2. Validate the input as it is on disk.
    let verdict = check(root, validator);
    if let (LoadMode::Strict, Err(diagnostic)) = (mode, &verdict) {
        return Err(EagleError::Validation {
            file: filename.unwrap_or_else(|| format!("<unnamed {}>", kind)),
            diagnostic: diagnostic.clone(),
        });
    }

    // 3. Build the tree.
    let mut doc = Document::from_element(schema, kind, root)?;
    doc.set_filename(filename);
    match verdict {
        Ok(()) => doc_info!(doc, "Parsed to valid EAGLE data"),
        Err(diagnostic) => doc_warn!(doc, "Invalid on disk: {}", diagnostic),
    }

    // 4. Always finish with the structural check.
    doc.sanity_check()?;
    doc_debug!(doc, "Loaded {} nodes", doc.node_count());
    Ok(doc)
}

impl Document<'_> {
    /// Serializes the tree and runs `validator` plus the null-sentinel check
    /// on the result.
    pub fn validate(&self, validator: &dyn Validator) -> Result<(), EagleError> {
        let root = self.to_element(self.root())?;
        self.verdict(&root, validator)
    }

    fn verdict(&self, root: &Element, validator: &dyn Validator) -> Result<(), EagleError> {
        check(root, validator).map_err(|diagnostic| {
            doc_warn!(self, "Invalid: {}", diagnostic);
            EagleError::Validation {
                file: self.label(),
                diagnostic,
            }
        })
    }
}

/// Serializes a document to an XML string after checking it.
pub fn save_to_string(doc: &Document<'_>, validator: &dyn Validator) -> Result<String, EagleError> {
    doc.sanity_check()?;
    let root = doc.to_element(doc.root())?;
    doc.verdict(&root, validator)?;
    element::write_document(&root)
}

/// Writes a document to `path`.
///
/// When validation fails the output is written to `path` + `".broken"`
/// instead and the validation error is returned.
pub fn save_to_file(
    doc: &Document<'_>,
    path: impl AsRef<Path>,
    validator: &dyn Validator,
) -> Result<(), EagleError> {
    let path = path.as_ref();
    doc.sanity_check()?;
    let root = doc.to_element(doc.root())?;
    let text = element::write_document(&root)?;

    if let Err(e) = doc.verdict(&root, validator) {
        let mut broken = path.as_os_str().to_owned();
        broken.push(".broken");
        fs::write(&broken, text)?;
        return Err(e);
    }
    fs::write(path, text)?;
    doc_info!(doc, "Saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE eagle SYSTEM "eagle.dtd">
<eagle version="9.6.2">
  <drawing>
    <layers>
      <layer number="1" name="Top" color="4" fill="1" visible="yes" active="yes"/>
      <layer number="94" name="Symbols" color="4" fill="1" visible="yes" active="yes"/>
    </layers>
    <library>
      <packages/>
      <symbols/>
      <devicesets/>
    </library>
  </drawing>
</eagle>"#;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(
            DocumentKind::from_path(Path::new("amp.sch")).unwrap(),
            DocumentKind::Schematic
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("/tmp/x/amp.brd")).unwrap(),
            DocumentKind::Board
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("rcl.lbr")).unwrap(),
            DocumentKind::Library
        );
        assert!(matches!(
            DocumentKind::from_path(Path::new("amp.txt")),
            Err(FormatError::UnknownDocumentKind(_))
        ));
    }

    #[test]
    fn test_detect_kind() {
        let root = element::parse_str(LIBRARY).unwrap();
        assert_eq!(DocumentKind::detect(&root), Some(DocumentKind::Library));
        let bare = element::parse_str("<eagle><drawing><layers/></drawing></eagle>").unwrap();
        assert_eq!(DocumentKind::detect(&bare), None);
    }

    #[test]
    fn test_kind_mismatch_is_a_format_error() {
        let schema = SchemaRegistry::eagle();
        let err = load_from_str(
            &schema,
            LIBRARY,
            DocumentKind::Board,
            LoadMode::BestEffort,
            &AcceptAll,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EagleError::Format(FormatError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_strict_and_best_effort() {
        let schema = SchemaRegistry::eagle();
        let reject = |_: &Element| Err::<(), String>("Element eagle content does not follow the DTD".into());

        let err = load_from_str(&schema, LIBRARY, DocumentKind::Library, LoadMode::Strict, &reject)
            .unwrap_err();
        match err {
            EagleError::Validation { diagnostic, .. } => assert!(diagnostic.contains("DTD")),
            other => panic!("unexpected error {:?}", other),
        }

        let doc = load_from_str(
            &schema,
            LIBRARY,
            DocumentKind::Library,
            LoadMode::BestEffort,
            &reject,
        )
        .unwrap();
        assert_eq!(doc.get_layers().len(), 2);
    }

    #[test]
    fn test_null_sentinel_is_rejected() {
        let root = element::parse_str(r#"<eagle><note severity="None"/></eagle>"#).unwrap();
        let diagnostic = check(&root, &AcceptAll).unwrap_err();
        assert!(diagnostic.contains("severity"), "{}", diagnostic);
        assert!(check(&element::parse_str("<eagle/>").unwrap(), &AcceptAll).is_ok());
    }

    #[test]
    fn test_save_to_string_writes_header() {
        let schema = SchemaRegistry::eagle();
        let doc = load_from_str(
            &schema,
            LIBRARY,
            DocumentKind::Library,
            LoadMode::Strict,
            &AcceptAll,
        )
        .unwrap();
        let out = save_to_string(&doc, &AcceptAll).unwrap();
        assert!(out.starts_with(element::DOCUMENT_HEADER));
        assert!(out.contains(r#"<layer number="94" name="Symbols""#), "{}", out);
    }
}
