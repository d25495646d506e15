// crates/eagle-xml/src/schema/eagle.rs

//! The built-in descriptor table for EAGLE 6 to 9 files.
//!
//! Sections are listed in the order `eagle.dtd` expects the corresponding
//! elements, since serialization emits them in declaration order.

use super::{SchemaRegistry, TagSpec};
use crate::coerce::AttrKind;
use crate::file::DocumentKind;

const STR: AttrKind = AttrKind::String;
const INT: AttrKind = AttrKind::Integer;
const FLOAT: AttrKind = AttrKind::Float;
const BOOL: AttrKind = AttrKind::Bool;
const DEFAULT_TRUE: AttrKind = AttrKind::DefaultTrueBool;
const LAYER: AttrKind = AttrKind::Layer;

/// Child tags allowed in `<plain>` and in package bodies.
const PLAIN: &[&str] = &[
    "polygon",
    "wire",
    "text",
    "dimension",
    "circle",
    "rectangle",
    "frame",
    "hole",
];
const PACKAGE_BODY: &[&str] = &[
    "polygon",
    "wire",
    "text",
    "dimension",
    "circle",
    "rectangle",
    "frame",
    "hole",
    "pad",
    "smd",
];
const SYMBOL_BODY: &[&str] = &[
    "polygon",
    "wire",
    "text",
    "dimension",
    "pin",
    "circle",
    "rectangle",
    "frame",
];
const SEGMENT_ITEMS: &[&str] = &["pinref", "portref", "wire", "junction", "label", "probe"];
const SIGNAL_ITEMS: &[&str] = &["contactref", "polygon", "wire", "via"];

/// Builds the registry for schematic, board and library documents.
pub fn registry() -> SchemaRegistry {
    let mut schema = SchemaRegistry::new();
    for spec in tags() {
        schema.insert(None, spec);
    }
    for (kind, spec) in roots() {
        schema.insert(Some(kind), spec);
    }
    schema
}

fn roots() -> Vec<(DocumentKind, TagSpec)> {
    vec![
        (DocumentKind::Schematic, schematic_root()),
        (DocumentKind::Board, board_root()),
        (DocumentKind::Library, library_root()),
    ]
}

/// Sections shared by every root: compatibility notes, then the drawing
/// header up to and including the layer table.
fn root_header() -> TagSpec {
    TagSpec::new("eagle")
        .required("version", STR)
        .singleton("compatibility", "", "compatibility")
        .list("settings", "drawing/settings", &["setting"])
        .singleton("grid", "drawing", "grid")
        .layer_table("layers", "drawing/layers", "layer")
        .require_container()
}

fn schematic_root() -> TagSpec {
    const BODY: &str = "drawing/schematic";
    root_header()
        .singleton("description", BODY, "description")
        .require_container()
        .map("libraries", "drawing/schematic/libraries", "name", &["library"])
        .map("attributes", "drawing/schematic/attributes", "name", &["attribute"])
        .map("variantdefs", "drawing/schematic/variantdefs", "name", &["variantdef"])
        .map("classes", "drawing/schematic/classes", "number", &["class"])
        .map("parts", "drawing/schematic/parts", "name", &["part"])
        .list("sheets", "drawing/schematic/sheets", &["sheet"])
}

fn board_root() -> TagSpec {
    const BODY: &str = "drawing/board";
    root_header()
        .singleton("description", BODY, "description")
        .require_container()
        .list("plain", "drawing/board/plain", PLAIN)
        .map("libraries", "drawing/board/libraries", "name", &["library"])
        .map("attributes", "drawing/board/attributes", "name", &["attribute"])
        .map("variantdefs", "drawing/board/variantdefs", "name", &["variantdef"])
        .map("classes", "drawing/board/classes", "number", &["class"])
        .singleton("designrules", BODY, "designrules")
        .singleton("autorouter", BODY, "autorouter")
        .map("elements", "drawing/board/elements", "name", &["element"])
        .map("signals", "drawing/board/signals", "name", &["signal"])
}

fn library_root() -> TagSpec {
    root_header().singleton("library", "drawing", "library")
}

fn tags() -> Vec<TagSpec> {
    vec![
        // --- Drawing header ---
        TagSpec::new("compatibility").list("notes", "", &["note"]),
        TagSpec::new("note")
            .optional("version", STR)
            .optional("severity", STR)
            .text(),
        TagSpec::new("setting")
            .optional("alwaysvectorfont", BOOL)
            .optional("verticaltext", STR)
            .optional("keepoldvectorfont", BOOL),
        TagSpec::new("grid")
            .optional("distance", FLOAT)
            .optional("unitdist", STR)
            .optional("unit", STR)
            .optional("style", STR)
            .optional("multiple", INT)
            .optional("display", BOOL)
            .optional("altdistance", FLOAT)
            .optional("altunitdist", STR)
            .optional("altunit", STR),
        TagSpec::new("layer")
            .required("number", INT)
            .required("name", STR)
            .required("color", INT)
            .required("fill", INT)
            .optional("visible", BOOL)
            .optional("active", BOOL),
        TagSpec::new("description").optional("language", STR).text(),
        // --- Libraries ---
        TagSpec::new("library")
            .optional("name", STR)
            .optional("urn", STR)
            .singleton("description", "", "description")
            .map("packages", "packages", "name", &["package"])
            .map("symbols", "symbols", "name", &["symbol"])
            .map("devicesets", "devicesets", "name", &["deviceset"]),
        TagSpec::new("package")
            .required("name", STR)
            .optional("urn", STR)
            .optional("locally_modified", BOOL)
            .optional("library_version", INT)
            .optional("library_locally_modified", BOOL)
            .singleton("description", "", "description")
            .list("drawables", "", PACKAGE_BODY),
        TagSpec::new("symbol")
            .required("name", STR)
            .optional("urn", STR)
            .optional("locally_modified", BOOL)
            .optional("library_version", INT)
            .optional("library_locally_modified", BOOL)
            .singleton("description", "", "description")
            .list("drawables", "", SYMBOL_BODY),
        TagSpec::new("deviceset")
            .required("name", STR)
            .optional("prefix", STR)
            .optional("uservalue", BOOL)
            .optional("urn", STR)
            .optional("locally_modified", BOOL)
            .optional("library_version", INT)
            .optional("library_locally_modified", BOOL)
            .singleton("description", "", "description")
            .map("gates", "gates", "name", &["gate"])
            .require_container()
            .map("devices", "devices", "name", &["device"])
            .require_container(),
        TagSpec::new("gate")
            .required("name", STR)
            .required("symbol", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .optional("addlevel", STR)
            .optional("swaplevel", INT),
        TagSpec::new("device")
            .required("name", STR)
            .optional("package", STR)
            .list("connects", "connects", &["connect"])
            .map("technologies", "technologies", "name", &["technology"]),
        TagSpec::new("connect")
            .required("gate", STR)
            .required("pin", STR)
            .required("pad", STR)
            .optional("route", STR),
        TagSpec::new("technology")
            .required("name", STR)
            .map("attributes", "", "name", &["attribute"]),
        TagSpec::new("attribute")
            .required("name", STR)
            .optional("value", STR)
            .optional("x", FLOAT)
            .optional("y", FLOAT)
            .optional("size", FLOAT)
            .optional("layer", LAYER)
            .optional("font", STR)
            .optional("ratio", INT)
            .optional("rot", STR)
            .optional("display", STR)
            .optional("constant", DEFAULT_TRUE)
            .only_under("technology")
            .optional("align", STR),
        // --- Geometry ---
        TagSpec::new("wire")
            .required("x1", FLOAT)
            .required("y1", FLOAT)
            .required("x2", FLOAT)
            .required("y2", FLOAT)
            .required("width", FLOAT)
            .required("layer", LAYER)
            .optional("extent", STR)
            .optional("style", STR)
            .optional("curve", FLOAT)
            .optional("cap", STR),
        TagSpec::new("smd")
            .required("name", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("dx", FLOAT)
            .required("dy", FLOAT)
            .required("layer", LAYER)
            .optional("roundness", INT)
            .optional("rot", STR)
            .optional("stop", BOOL)
            .optional("thermals", BOOL)
            .optional("cream", BOOL),
        TagSpec::new("pad")
            .required("name", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("drill", FLOAT)
            .optional("diameter", FLOAT)
            .optional("shape", STR)
            .optional("rot", STR)
            .optional("stop", BOOL)
            .optional("thermals", BOOL)
            .optional("first", BOOL),
        TagSpec::new("text")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("size", FLOAT)
            .required("layer", LAYER)
            .optional("font", STR)
            .optional("ratio", INT)
            .optional("rot", STR)
            .optional("align", STR)
            .optional("distance", INT)
            .text(),
        TagSpec::new("circle")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("radius", FLOAT)
            .required("width", FLOAT)
            .required("layer", LAYER),
        TagSpec::new("rectangle")
            .required("x1", FLOAT)
            .required("y1", FLOAT)
            .required("x2", FLOAT)
            .required("y2", FLOAT)
            .required("layer", LAYER)
            .optional("rot", STR),
        TagSpec::new("polygon")
            .required("width", FLOAT)
            .required("layer", LAYER)
            .optional("spacing", FLOAT)
            .optional("pour", STR)
            .optional("isolate", FLOAT)
            .optional("orphans", BOOL)
            .optional("thermals", BOOL)
            .optional("rank", INT)
            .list("vertices", "", &["vertex"]),
        TagSpec::new("vertex")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .optional("curve", FLOAT),
        TagSpec::new("hole")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("drill", FLOAT),
        TagSpec::new("frame")
            .required("x1", FLOAT)
            .required("y1", FLOAT)
            .required("x2", FLOAT)
            .required("y2", FLOAT)
            .required("columns", INT)
            .required("rows", INT)
            .required("layer", LAYER)
            .optional("border-left", BOOL)
            .optional("border-top", BOOL)
            .optional("border-right", BOOL)
            .optional("border-bottom", BOOL),
        TagSpec::new("dimension")
            .required("x1", FLOAT)
            .required("y1", FLOAT)
            .required("x2", FLOAT)
            .required("y2", FLOAT)
            .required("x3", FLOAT)
            .required("y3", FLOAT)
            .required("layer", LAYER)
            .optional("dtype", STR)
            .optional("width", FLOAT)
            .optional("extwidth", FLOAT)
            .optional("extlength", FLOAT)
            .optional("extoffset", FLOAT)
            .optional("textsize", FLOAT)
            .optional("textratio", INT)
            .optional("unit", STR)
            .optional("precision", INT)
            .optional("visible", BOOL),
        TagSpec::new("pin")
            .required("name", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .optional("visible", STR)
            .optional("length", STR)
            .optional("direction", STR)
            .optional("function", STR)
            .optional("swaplevel", INT)
            .optional("rot", STR),
        // --- Schematic ---
        TagSpec::new("part")
            .required("name", STR)
            .required("library", STR)
            .optional("library_urn", STR)
            .required("deviceset", STR)
            .required("device", STR)
            .optional("package3d_urn", STR)
            .optional("technology", STR)
            .optional("value", STR)
            .map("attributes", "", "name", &["attribute"])
            .map("variants", "", "name", &["variant"]),
        TagSpec::new("variant")
            .required("name", STR)
            .optional("populate", BOOL)
            .optional("value", STR)
            .optional("technology", STR),
        TagSpec::new("variantdef")
            .required("name", STR)
            .optional("current", BOOL),
        TagSpec::new("class")
            .required("number", INT)
            .required("name", STR)
            .optional("width", FLOAT)
            .optional("drill", FLOAT)
            .list("clearances", "", &["clearance"]),
        TagSpec::new("clearance")
            .required("class", INT)
            .optional("value", FLOAT),
        TagSpec::new("sheet")
            .singleton("description", "", "description")
            .list("plain", "plain", PLAIN)
            .list("instances", "instances", &["instance"])
            .list("busses", "busses", &["bus"])
            .list("nets", "nets", &["net"]),
        TagSpec::new("instance")
            .required("part", STR)
            .required("gate", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .optional("smashed", BOOL)
            .optional("rot", STR)
            .map("attributes", "", "name", &["attribute"]),
        TagSpec::new("bus")
            .required("name", STR)
            .list("segments", "", &["segment"]),
        TagSpec::new("net")
            .required("name", STR)
            .optional("class", INT)
            .list("segments", "", &["segment"]),
        TagSpec::new("segment").list("items", "", SEGMENT_ITEMS),
        TagSpec::new("pinref")
            .required("part", STR)
            .required("gate", STR)
            .required("pin", STR),
        TagSpec::new("portref")
            .required("moduleinst", STR)
            .required("port", STR),
        TagSpec::new("junction")
            .required("x", FLOAT)
            .required("y", FLOAT),
        TagSpec::new("label")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("size", FLOAT)
            .required("layer", LAYER)
            .optional("font", STR)
            .optional("ratio", INT)
            .optional("rot", STR)
            .optional("xref", BOOL)
            .optional("align", STR),
        TagSpec::new("probe")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("size", FLOAT)
            .required("layer", LAYER)
            .optional("font", STR)
            .optional("ratio", INT)
            .optional("rot", STR)
            .optional("xref", BOOL),
        // --- Board ---
        TagSpec::new("element")
            .required("name", STR)
            .required("library", STR)
            .optional("library_urn", STR)
            .required("package", STR)
            .optional("package3d_urn", STR)
            .required("value", STR)
            .required("x", FLOAT)
            .required("y", FLOAT)
            .optional("locked", BOOL)
            .optional("populate", BOOL)
            .optional("smashed", BOOL)
            .optional("rot", STR)
            .map("attributes", "", "name", &["attribute"])
            .map("variants", "", "name", &["variant"]),
        TagSpec::new("signal")
            .required("name", STR)
            .optional("class", INT)
            .optional("airwireshidden", BOOL)
            .list("items", "", SIGNAL_ITEMS),
        TagSpec::new("contactref")
            .required("element", STR)
            .required("pad", STR)
            .optional("route", STR)
            .optional("routetag", STR),
        TagSpec::new("via")
            .required("x", FLOAT)
            .required("y", FLOAT)
            .required("extent", STR)
            .required("drill", FLOAT)
            .optional("diameter", FLOAT)
            .optional("shape", STR)
            .optional("alwaysstop", BOOL),
        TagSpec::new("designrules")
            .required("name", STR)
            .list("descriptions", "", &["description"])
            .list("params", "", &["param"]),
        TagSpec::new("param")
            .required("name", STR)
            .required("value", STR),
        TagSpec::new("autorouter").list("passes", "", &["pass"]),
        TagSpec::new("pass")
            .required("name", STR)
            .optional("refer", STR)
            .optional("active", BOOL)
            .list("params", "", &["param"]),
    ]
}
