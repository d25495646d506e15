// crates/eagle-xml/src/coerce.rs

//! Conversion between raw attribute literals and typed attribute values.
//!
//! Every attribute declared in the schema has one [`AttrKind`]. [`parse`] and
//! [`unparse`] are the only places where the literal syntax of a kind lives.

use crate::error::SchemaError;
use core::fmt;
use core::str::FromStr;

/// The closed set of attribute kinds a schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Passed through untouched.
    String,
    /// Signed integer.
    Integer,
    /// Floating point number.
    Float,
    /// `yes`/`no`, case-insensitive on input.
    Bool,
    /// `no` means false, anything else (or absence) means true.
    DefaultTrueBool,
    /// A layer number on disk, a layer name in memory.
    Layer,
}

impl AttrKind {
    /// Whether a typed value is of the variant this kind stores.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (AttrKind::String | AttrKind::Layer, Value::Str(_))
                | (AttrKind::Integer, Value::Int(_))
                | (AttrKind::Float, Value::Float(_))
                | (AttrKind::Bool | AttrKind::DefaultTrueBool, Value::Bool(_))
        )
    }

    fn name(self) -> &'static str {
        match self {
            AttrKind::String => "string",
            AttrKind::Integer => "integer",
            AttrKind::Float => "float",
            AttrKind::Bool => "bool",
            AttrKind::DefaultTrueBool => "default-true-bool",
            AttrKind::Layer => "layer",
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttrKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(AttrKind::String),
            "integer" => Ok(AttrKind::Integer),
            "float" => Ok(AttrKind::Float),
            "bool" => Ok(AttrKind::Bool),
            "default-true-bool" => Ok(AttrKind::DefaultTrueBool),
            "layer" => Ok(AttrKind::Layer),
            other => Err(SchemaError::UnknownAttributeKind {
                kind: other.into(),
            }),
        }
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// The string slice, if this is a string (or layer name) value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical text used as a map key.
    pub fn to_key(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::Bool(b) => String::from(if *b { "yes" } else { "no" }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// File-scoped translation between layer numbers and layer names.
pub trait LayerLookup {
    fn layer_number_to_name(&self, number: i64) -> Result<String, SchemaError>;
    fn layer_name_to_number(&self, name: &str) -> Result<i64, SchemaError>;
}

/// Failure of a single coercion, before the caller attaches node context.
#[derive(Debug)]
pub enum CoercionError {
    /// The literal is not valid for the kind.
    Invalid { kind: AttrKind, raw: String },
    /// A layer reference was coerced without an owning file.
    NoFile,
    /// The owning file's layer table rejected the lookup.
    Layer(SchemaError),
}

impl CoercionError {
    /// Attaches the tag and attribute name the coercion was performed for.
    pub fn in_context(self, node: &str, tag: &str, attribute: &str) -> SchemaError {
        match self {
            CoercionError::Invalid { kind, raw } => SchemaError::InvalidLiteral {
                tag: tag.into(),
                attribute: attribute.into(),
                kind,
                value: raw,
            },
            CoercionError::NoFile => SchemaError::Detached {
                node: node.into(),
                attribute: attribute.into(),
            },
            CoercionError::Layer(e) => e,
        }
    }
}

/// Parses a raw attribute literal.
///
/// `layers` is the owning file, or `None` when the node is not attached to one;
/// it is only consulted for [`AttrKind::Layer`].
pub fn parse(
    kind: AttrKind,
    raw: Option<&str>,
    layers: Option<&dyn LayerLookup>,
) -> Result<Option<Value>, CoercionError> {
    let invalid = |raw: &str| CoercionError::Invalid {
        kind,
        raw: raw.into(),
    };

    // Absence only means something for default-true booleans.
    let Some(raw) = raw else {
        return Ok(match kind {
            AttrKind::DefaultTrueBool => Some(Value::Bool(true)),
            _ => None,
        });
    };

    let value = match kind {
        AttrKind::String => Value::Str(raw.into()),
        AttrKind::Integer => Value::Int(raw.trim().parse().map_err(|_| invalid(raw))?),
        AttrKind::Float => Value::Float(raw.trim().parse().map_err(|_| invalid(raw))?),
        AttrKind::Bool => {
            if raw.eq_ignore_ascii_case("yes") {
                Value::Bool(true)
            } else if raw.eq_ignore_ascii_case("no") {
                Value::Bool(false)
            } else {
                return Err(invalid(raw));
            }
        }
        AttrKind::DefaultTrueBool => Value::Bool(raw != "no"),
        AttrKind::Layer => {
            let number: i64 = raw.trim().parse().map_err(|_| invalid(raw))?;
            let file = layers.ok_or(CoercionError::NoFile)?;
            Value::Str(
                file.layer_number_to_name(number)
                    .map_err(CoercionError::Layer)?,
            )
        }
    };
    Ok(Some(value))
}

/// Turns a typed value back into its literal, or `None` when the attribute
/// should be left out of the output.
pub fn unparse(
    kind: AttrKind,
    value: Option<&Value>,
    layers: Option<&dyn LayerLookup>,
) -> Result<Option<String>, CoercionError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let mismatch = || CoercionError::Invalid {
        kind,
        raw: value.to_key(),
    };

    let raw = match (kind, value) {
        (AttrKind::String, Value::Str(s)) => s.clone(),
        (AttrKind::Integer, Value::Int(n)) => n.to_string(),
        (AttrKind::Float, Value::Float(x)) => x.to_string(),
        (AttrKind::Bool, Value::Bool(b)) => String::from(if *b { "yes" } else { "no" }),
        (AttrKind::DefaultTrueBool, Value::Bool(true)) => return Ok(None),
        (AttrKind::DefaultTrueBool, Value::Bool(false)) => "no".into(),
        (AttrKind::Layer, Value::Str(name)) => {
            let file = layers.ok_or(CoercionError::NoFile)?;
            file.layer_name_to_number(name)
                .map_err(CoercionError::Layer)?
                .to_string()
        }
        _ => return Err(mismatch()),
    };
    Ok(Some(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoLayers;

    impl LayerLookup for TwoLayers {
        fn layer_number_to_name(&self, number: i64) -> Result<String, SchemaError> {
            match number {
                1 => Ok("Top".into()),
                16 => Ok("Bottom".into()),
                n => Err(SchemaError::LayerNotFound {
                    file: "test.brd".into(),
                    layer: format!("number {}", n),
                }),
            }
        }

        fn layer_name_to_number(&self, name: &str) -> Result<i64, SchemaError> {
            match name {
                "Top" => Ok(1),
                "Bottom" => Ok(16),
                other => Err(SchemaError::LayerNotFound {
                    file: "test.brd".into(),
                    layer: format!("'{}'", other),
                }),
            }
        }
    }

    fn round(kind: AttrKind, raw: &str) -> Option<String> {
        let v = parse(kind, Some(raw), None).unwrap();
        unparse(kind, v.as_ref(), None).unwrap()
    }

    #[test]
    fn test_bool_is_case_insensitive_and_normalized() {
        assert_eq!(round(AttrKind::Bool, "YES").as_deref(), Some("yes"));
        assert_eq!(round(AttrKind::Bool, "NO").as_deref(), Some("no"));
        assert_eq!(round(AttrKind::Bool, "Yes").as_deref(), Some("yes"));
    }

    #[test]
    fn test_bool_rejects_other_literals() {
        let err = parse(AttrKind::Bool, Some("maybe"), None).unwrap_err();
        assert!(matches!(
            err,
            CoercionError::Invalid {
                kind: AttrKind::Bool,
                ..
            }
        ));
    }

    #[test]
    fn test_default_true_bool() {
        let p = |raw| parse(AttrKind::DefaultTrueBool, raw, None).unwrap();
        assert_eq!(p(Some("no")), Some(Value::Bool(false)));
        assert_eq!(p(Some("yes")), Some(Value::Bool(true)));
        assert_eq!(p(Some("NO")), Some(Value::Bool(true)));
        assert_eq!(p(Some("whatever")), Some(Value::Bool(true)));
        assert_eq!(p(None), Some(Value::Bool(true)));

        let u = |b: bool| unparse(AttrKind::DefaultTrueBool, Some(&Value::Bool(b)), None).unwrap();
        assert_eq!(u(false).as_deref(), Some("no"));
        assert_eq!(u(true), None);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            parse(AttrKind::Integer, Some("42"), None).unwrap(),
            Some(Value::Int(42))
        );
        assert_eq!(
            parse(AttrKind::Float, Some("-2.54"), None).unwrap(),
            Some(Value::Float(-2.54))
        );
        assert_eq!(round(AttrKind::Float, "1.27").as_deref(), Some("1.27"));
        assert!(parse(AttrKind::Integer, Some("1.5"), None).is_err());
        assert!(parse(AttrKind::Float, Some("wide"), None).is_err());
    }

    #[test]
    fn test_absent_values_stay_absent() {
        for kind in [AttrKind::String, AttrKind::Integer, AttrKind::Bool, AttrKind::Layer] {
            assert_eq!(parse(kind, None, None).unwrap(), None);
            assert_eq!(unparse(kind, None, None).unwrap(), None);
        }
    }

    #[test]
    fn test_string_is_untouched() {
        assert_eq!(round(AttrKind::String, " µ&<x> ").as_deref(), Some(" µ&<x> "));
    }

    #[test]
    fn test_layer_uses_file_table() {
        let file = TwoLayers;
        let v = parse(AttrKind::Layer, Some("16"), Some(&file)).unwrap();
        assert_eq!(v, Some(Value::Str("Bottom".into())));
        let raw = unparse(AttrKind::Layer, v.as_ref(), Some(&file)).unwrap();
        assert_eq!(raw.as_deref(), Some("16"));

        let err = parse(AttrKind::Layer, Some("99"), Some(&file)).unwrap_err();
        assert!(matches!(
            err,
            CoercionError::Layer(SchemaError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_layer_without_file_fails() {
        let err = parse(AttrKind::Layer, Some("1"), None).unwrap_err();
        assert!(matches!(err, CoercionError::NoFile));
        let err = unparse(AttrKind::Layer, Some(&Value::Str("Top".into())), None).unwrap_err();
        let schema_err = err.in_context("wire", "wire", "layer");
        assert!(matches!(schema_err, SchemaError::Detached { .. }));
    }

    #[test]
    fn test_unknown_kind_name() {
        assert_eq!("layer".parse::<AttrKind>().unwrap(), AttrKind::Layer);
        assert!(matches!(
            "colour".parse::<AttrKind>(),
            Err(SchemaError::UnknownAttributeKind { .. })
        ));
    }

    #[test]
    fn test_accepts() {
        assert!(AttrKind::Layer.accepts(&Value::from("Top")));
        assert!(AttrKind::DefaultTrueBool.accepts(&Value::from(false)));
        assert!(!AttrKind::Integer.accepts(&Value::from(1.0)));
        assert!(!AttrKind::String.accepts(&Value::from(3i64)));
    }
}
