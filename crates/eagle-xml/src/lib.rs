// src/lib.rs

#![doc = "Reads, edits and writes EAGLE schematic, board and library XML files."]
#![doc = ""]
#![doc = "Documents are typed object trees built by a schema registry: every tag has a"]
#![doc = "descriptor naming its attributes and its child sections (lists, keyed maps,"]
#![doc = "singletons and the per-file layer table). The tree keeps exclusive ownership"]
#![doc = "and serializes back in schema order."]
#![doc = ""]
#![doc = "It supports:"]
#![doc = "- `load_from_str` / `load_from_slice` / `load_from_file`: parsing a document, with strict or best-effort validation."]
#![doc = "- `save_to_string` / `save_to_file`: re-validating and writing a document."]
#![doc = "- `Document`: node navigation, container editing, layers and part cross-references."]

// --- Crate Modules ---

mod codec;
pub mod coerce;
mod container;
pub mod element;
mod error;
mod file;
mod layers;
mod log;
mod node;
mod resolver;
pub mod schema;

// --- Public API Re-exports ---

pub use coerce::{AttrKind, LayerLookup, Value};
pub use element::Element;
pub use error::{EagleError, FormatError, SchemaError};
pub use file::{
    AcceptAll, DocumentKind, LoadMode, NULL_SENTINEL, Validator, load_from_file, load_from_slice,
    load_from_str, save_to_file, save_to_string,
};
pub use layers::{Layer, LayerRef};
pub use node::{Document, Fragment, NodeId};
pub use resolver::{EXTERNAL_MARKER, EXTERNAL_PACKAGE};
pub use schema::{AttrSpec, SchemaRegistry, SectionKind, SectionSpec, SpecId, TagSpec};
