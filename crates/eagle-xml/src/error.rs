// crates/eagle-xml/src/error.rs

use crate::coerce::AttrKind;
use crate::schema::SectionKind;
use core::fmt;
use quick_xml::DeError;
use std::io;

/// Errors raised while turning bytes into a document tree: the input is not
/// well-formed XML, or it is XML of the wrong shape for the requested kind.
#[derive(Debug)]
pub enum FormatError {
    /// An error from the underlying `quick-xml` reader.
    Xml(quick_xml::Error),

    /// Element names, text or output bytes were not valid UTF-8.
    Encoding,

    /// The element structure itself is broken (no root, several roots, unknown entity, ...).
    Malformed(String),

    /// The element handed to a descriptor does not carry the descriptor's tag.
    UnexpectedTag { expected: String, found: String },

    /// A document kind name or file suffix that is not schematic, board or library.
    UnknownDocumentKind(String),

    /// The drawing declares a different document kind than the one requested.
    KindMismatch { requested: String, found: String },

    /// A declarative schema description could not be deserialized.
    SchemaDescription(DeError),
}

/// Errors raised by the typed object tree: schema violations, failed lookups
/// and broken ownership invariants.
#[derive(Debug)]
pub enum SchemaError {
    /// No descriptor is registered for a tag.
    UnknownTag { tag: String },

    /// No root descriptor is registered for a document kind.
    UnknownRoot { kind: String },

    /// A tag or root descriptor was registered twice.
    DuplicateTag { tag: String },

    /// An attribute kind name outside the closed set of kinds.
    UnknownAttributeKind { kind: String },

    /// A section kind name outside the closed set of kinds.
    UnknownSectionKind { kind: String },

    /// The attribute is not declared for the tag.
    UnknownAttribute { tag: String, attribute: String },

    /// The section is not declared for the tag.
    UnknownSection { tag: String, section: String },

    /// A raw attribute literal could not be parsed as the declared kind.
    InvalidLiteral {
        tag: String,
        attribute: String,
        kind: AttrKind,
        value: String,
    },

    /// A typed setter received a value of the wrong variant.
    WrongValueType {
        tag: String,
        attribute: String,
        expected: AttrKind,
    },

    /// A container operation was used on a section of a different kind.
    WrongSectionKind {
        tag: String,
        section: String,
        actual: SectionKind,
    },

    /// The child's tag is not permitted in the section.
    ChildNotAllowed {
        owner: String,
        section: String,
        child: String,
    },

    /// A node was passed where a node of another tag is required.
    UnexpectedTag { expected: String, found: String },

    /// The child lacks the attribute its map section is keyed by.
    MissingKey { node: String, key: String },

    /// A map section already holds an entry under this key.
    DuplicateKey {
        owner: String,
        section: String,
        key: String,
    },

    /// Lookup of a key, index or singleton that is not there.
    NotFound {
        owner: String,
        section: String,
        key: String,
    },

    /// A layer number or name is absent from the file's layer table.
    LayerNotFound { file: String, layer: String },

    /// A layer number or name is already taken in the file's layer table.
    DuplicateLayer { file: String, layer: String },

    /// Layer coercion attempted on a node whose owner chain does not reach the file.
    Detached { node: String, attribute: String },

    /// The tree violates exclusive ownership.
    OwnershipViolation { node: String, detail: String },

    /// A part's cross-reference chain does not resolve.
    UnresolvedReference {
        part: String,
        segment: &'static str,
        path: String,
    },

    /// The handle refers to a freed or foreign arena slot.
    StaleNode { index: usize },

    /// The operation is not defined for the document root.
    RootOperation { operation: &'static str },

    /// Text was set on a tag that does not preserve text.
    NoText { tag: String },
}

/// The single error type of the crate.
#[derive(Debug)]
pub enum EagleError {
    /// Malformed input or the wrong document shape.
    Format(FormatError),

    /// A schema, lookup or invariant violation in the object tree.
    Schema(SchemaError),

    /// The external validator (or the null-sentinel check) rejected a document.
    Validation { file: String, diagnostic: String },

    /// Reading or writing a file failed.
    Io(io::Error),
}

impl From<FormatError> for EagleError {
    fn from(e: FormatError) -> Self {
        EagleError::Format(e)
    }
}

impl From<SchemaError> for EagleError {
    fn from(e: SchemaError) -> Self {
        EagleError::Schema(e)
    }
}

impl From<quick_xml::Error> for FormatError {
    fn from(e: quick_xml::Error) -> Self {
        FormatError::Xml(e)
    }
}

impl From<quick_xml::Error> for EagleError {
    fn from(e: quick_xml::Error) -> Self {
        EagleError::Format(FormatError::Xml(e))
    }
}

impl From<DeError> for EagleError {
    fn from(e: DeError) -> Self {
        EagleError::Format(FormatError::SchemaDescription(e))
    }
}

impl From<io::Error> for EagleError {
    fn from(e: io::Error) -> Self {
        EagleError::Io(e)
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Xml(e) => write!(f, "XML parsing error: {}", e),
            FormatError::Encoding => write!(f, "Document is not valid UTF-8"),
            FormatError::Malformed(msg) => write!(f, "Malformed document: {}", msg),
            FormatError::UnexpectedTag { expected, found } => {
                write!(f, "Tried to create <{}> from <{}>", expected, found)
            }
            FormatError::UnknownDocumentKind(kind) => {
                write!(f, "Unknown document kind: '{}'", kind)
            }
            FormatError::KindMismatch { requested, found } => write!(
                f,
                "Requested a {} document but the drawing holds a {}",
                requested, found
            ),
            FormatError::SchemaDescription(e) => {
                write!(f, "Invalid schema description: {}", e)
            }
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownTag { tag } => write!(f, "No descriptor for tag <{}>", tag),
            SchemaError::UnknownRoot { kind } => {
                write!(f, "No root descriptor for {} documents", kind)
            }
            SchemaError::DuplicateTag { tag } => {
                write!(f, "Descriptor for <{}> registered twice", tag)
            }
            SchemaError::UnknownAttributeKind { kind } => {
                write!(f, "Unknown attribute kind '{}'", kind)
            }
            SchemaError::UnknownSectionKind { kind } => {
                write!(f, "Unknown section kind '{}'", kind)
            }
            SchemaError::UnknownAttribute { tag, attribute } => {
                write!(f, "<{}> has no attribute '{}'", tag, attribute)
            }
            SchemaError::UnknownSection { tag, section } => {
                write!(f, "<{}> has no section '{}'", tag, section)
            }
            SchemaError::InvalidLiteral {
                tag,
                attribute,
                kind,
                value,
            } => write!(
                f,
                "Invalid {} value '{}' for attribute '{}' of <{}>",
                kind, value, attribute, tag
            ),
            SchemaError::WrongValueType {
                tag,
                attribute,
                expected,
            } => write!(
                f,
                "Attribute '{}' of <{}> expects a {} value",
                attribute, tag, expected
            ),
            SchemaError::WrongSectionKind {
                tag,
                section,
                actual,
            } => write!(f, "Section '{}' of <{}> is a {}", section, tag, actual),
            SchemaError::ChildNotAllowed {
                owner,
                section,
                child,
            } => write!(
                f,
                "<{}> is not allowed in section '{}' of {}",
                child, section, owner
            ),
            SchemaError::UnexpectedTag { expected, found } => {
                write!(f, "Expected a <{}> node, got {}", expected, found)
            }
            SchemaError::MissingKey { node, key } => {
                write!(f, "{} has no '{}' to be keyed by", node, key)
            }
            SchemaError::DuplicateKey {
                owner,
                section,
                key,
            } => write!(
                f,
                "Section '{}' of {} already holds an entry keyed '{}'",
                section, owner, key
            ),
            SchemaError::NotFound {
                owner,
                section,
                key,
            } => write!(f, "No entry '{}' in section '{}' of {}", key, section, owner),
            SchemaError::LayerNotFound { file, layer } => {
                write!(f, "No layer {} in {}", layer, file)
            }
            SchemaError::DuplicateLayer { file, layer } => {
                write!(f, "Layer {} already exists in {}", layer, file)
            }
            SchemaError::Detached { node, attribute } => write!(
                f,
                "Cannot resolve layer attribute '{}' of {}: node is not attached to a file",
                attribute, node
            ),
            SchemaError::OwnershipViolation { node, detail } => {
                write!(f, "Ownership violation at {}: {}", node, detail)
            }
            SchemaError::UnresolvedReference {
                part,
                segment,
                path,
            } => write!(f, "{} '{}' missing for part {}", segment, path, part),
            SchemaError::StaleNode { index } => write!(f, "Node #{} does not exist", index),
            SchemaError::RootOperation { operation } => {
                write!(f, "Cannot {} the document root", operation)
            }
            SchemaError::NoText { tag } => write!(f, "<{}> does not preserve text", tag),
        }
    }
}

impl fmt::Display for EagleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EagleError::Format(e) => write!(f, "Format error: {}", e),
            EagleError::Schema(e) => write!(f, "Schema error: {}", e),
            EagleError::Validation { file, diagnostic } => {
                write!(f, "Eagle file '{}' is invalid: {}", file, diagnostic)
            }
            EagleError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for FormatError {}

impl std::error::Error for SchemaError {}

impl std::error::Error for EagleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EagleError::Format(FormatError::Xml(e)) => Some(e),
            EagleError::Format(FormatError::SchemaDescription(e)) => Some(e),
            EagleError::Io(e) => Some(e),
            _ => None,
        }
    }
}
