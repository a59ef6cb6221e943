//! Parameter descriptor to native value conversions
//!
//! This module turns one loosely-typed [`ParameterDescriptor`] into a native
//! [`Value`] plus the [`ParamType`] it resolved to. It also holds the scalar
//! coercion table shared with the method resolver's fallback path.
//!
//! # Tag Mapping
//!
//! Tags are matched case-insensitively.
//!
//! | Tag | Type | Raw value |
//! |-----|------|-----------|
//! | `string` | `String` | string, number or boolean |
//! | `int` / `int32`, `long` / `int64` | `Int` / `Long` | integer, float (rounded half-to-even), numeric string, boolean |
//! | `float` / `single`, `double` | `Float` / `Double` | number, numeric string, boolean |
//! | `bool` / `boolean` | `Bool` | boolean, number, `"true"` / `"false"` |
//! | `decimal` | `Decimal` | number or numeric string, kept exact |
//! | `vector2`, `vector3` | `Vector2`, `Vector3` | `{x, y[, z]}`, missing fields are 0 |
//! | `color` | `Color` | `{r, g, b, a}`, missing `a` is 1 |
//! | `string[]`, `int[]`, `float[]` | arrays | JSON array, null is a null array |
//! | `gameobject` / `hostobject` | `HostObject` | object name |
//! | anything else | a registered type | enum member name or record object |
//!
//! A null or missing raw value for a scalar tag converts to the zero-equivalent
//! (`""`, `0`, `false`). Composites need an object, so a null vector or color
//! is a malformed shape.

use bigdecimal::BigDecimal;
use hostcall_common::protocol::requests::ParameterDescriptor;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::host::ObjectGraph;
use crate::registry::{EnumMember, FieldDef, HostRegistry, Shape, TypeDef};
use crate::runtime::type_resolver::TypeResolver;
use crate::runtime::types::ParamType;
use crate::runtime::value::{Color, EnumValue, RecordValue, Serializable, Value, Vector2, Vector3};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unsupported parameter type: {0}")]
    UnsupportedType(String),

    #[error("Invalid {shape} value: {reason}")]
    MalformedShape { shape: String, reason: String },

    #[error("'{value}' is not a valid member of {enum_name}")]
    UnknownEnumMember { enum_name: String, value: String },

    #[error("Error converting parameter: {0}")]
    Coercion(String),

    #[error("Host object reference requires a name")]
    MissingObjectName,

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<ConversionError>,
    },

    #[error("field '{field}': {source}")]
    Field {
        field: String,
        source: Box<ConversionError>,
    },
}

/// A successfully converted parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted {
    pub value: Value,
    pub ty: ParamType,
}

/// Maps a built-in tag to its type; `None` means the tag names a type.
pub fn builtin_tag(tag: &str) -> Option<ParamType> {
    let ty = match tag.trim().to_ascii_lowercase().as_str() {
        "string" => ParamType::String,
        "int" | "int32" => ParamType::Int,
        "long" | "int64" => ParamType::Long,
        "float" | "single" => ParamType::Float,
        "double" => ParamType::Double,
        "bool" | "boolean" => ParamType::Bool,
        "decimal" => ParamType::Decimal,
        "vector2" => ParamType::Vector2,
        "vector3" => ParamType::Vector3,
        "color" => ParamType::Color,
        "string[]" => ParamType::array(ParamType::String),
        "int[]" => ParamType::array(ParamType::Int),
        "float[]" => ParamType::array(ParamType::Float),
        "gameobject" | "hostobject" => ParamType::HostObject,
        _ => return None,
    };
    Some(ty)
}

pub struct ParameterMarshaller<'a> {
    registry: &'a HostRegistry,
    types: TypeResolver<'a>,
    objects: &'a dyn ObjectGraph,
    path_lookup: bool,
}

impl<'a> ParameterMarshaller<'a> {
    pub fn new(
        registry: &'a HostRegistry,
        objects: &'a dyn ObjectGraph,
        config: &EngineConfig,
    ) -> Self {
        Self {
            registry,
            types: TypeResolver::new(registry, config.bare_name_lookup),
            objects,
            path_lookup: config.path_lookup,
        }
    }

    pub fn convert(&self, descriptor: &ParameterDescriptor) -> Result<Converted, ConversionError> {
        if let Some(ty) = builtin_tag(&descriptor.tag) {
            let value = self.convert_as(&descriptor.value, &ty)?;
            return Ok(Converted { value, ty });
        }

        let def = self
            .types
            .resolve(&descriptor.tag)
            .ok_or_else(|| ConversionError::UnsupportedType(descriptor.tag.clone()))?;
        let value = self.convert_named(&descriptor.value, def)?;
        Ok(Converted {
            value,
            ty: def.param_type(),
        })
    }

    /// Converts a raw value into the given declared type.
    pub fn convert_as(&self, raw: &JsonValue, ty: &ParamType) -> Result<Value, ConversionError> {
        match ty {
            ParamType::Vector2 => {
                let fields = composite(raw, "Vector2")?;
                Ok(Value::Vector2(Vector2::new(
                    component(fields, "Vector2", "x", 0.0)?,
                    component(fields, "Vector2", "y", 0.0)?,
                )))
            }
            ParamType::Vector3 => {
                let fields = composite(raw, "Vector3")?;
                Ok(Value::Vector3(Vector3::new(
                    component(fields, "Vector3", "x", 0.0)?,
                    component(fields, "Vector3", "y", 0.0)?,
                    component(fields, "Vector3", "z", 0.0)?,
                )))
            }
            ParamType::Color => {
                let fields = composite(raw, "Color")?;
                Ok(Value::Color(Color::new(
                    component(fields, "Color", "r", 0.0)?,
                    component(fields, "Color", "g", 0.0)?,
                    component(fields, "Color", "b", 0.0)?,
                    component(fields, "Color", "a", 1.0)?,
                )))
            }
            ParamType::Array(element) => self.array(raw, element),
            ParamType::HostObject => self.host_object(raw),
            ParamType::Any => Ok(loose(raw)),
            ParamType::Named(full_name) => {
                let def = self
                    .registry
                    .find(full_name)
                    .ok_or_else(|| ConversionError::UnsupportedType(full_name.to_string()))?;
                self.convert_named(raw, def)
            }
            scalar => self.scalar(raw, scalar),
        }
    }

    fn scalar(&self, raw: &JsonValue, ty: &ParamType) -> Result<Value, ConversionError> {
        if let (ParamType::Decimal, JsonValue::Number(number)) = (ty, raw) {
            return BigDecimal::from_str(&number.to_string())
                .map(Value::Decimal)
                .map_err(|e| ConversionError::Coercion(e.to_string()));
        }

        match raw {
            JsonValue::Array(_) | JsonValue::Object(_) => Err(ConversionError::Coercion(format!(
                "expected a {} but got {}",
                ty.short_name(),
                json_kind(raw)
            ))),
            _ => change_type(loose(raw), ty, self.registry).map_err(ConversionError::Coercion),
        }
    }

    fn array(&self, raw: &JsonValue, element: &ParamType) -> Result<Value, ConversionError> {
        match raw {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.convert_as(item, element)
                        .map_err(|source| ConversionError::Element {
                            index,
                            source: Box::new(source),
                        })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(ConversionError::MalformedShape {
                shape: format!("{}[]", element.short_name()),
                reason: format!("expected an array but got {}", json_kind(other)),
            }),
        }
    }

    fn host_object(&self, raw: &JsonValue) -> Result<Value, ConversionError> {
        let name = match raw {
            JsonValue::String(name) => name.as_str(),
            JsonValue::Null => "",
            other => {
                return Err(ConversionError::MalformedShape {
                    shape: "GameObject".into(),
                    reason: format!("expected an object name but got {}", json_kind(other)),
                })
            }
        };
        if name.is_empty() {
            return Err(ConversionError::MissingObjectName);
        }

        let found = self.objects.find_by_name(name).or_else(|| {
            if self.path_lookup {
                self.objects.find_by_path(&format!("/{name}"))
            } else {
                None
            }
        });
        if found.is_none() {
            tracing::debug!("No host object named {}, passing a null reference", name);
        }
        Ok(Value::Object(found))
    }

    fn convert_named(&self, raw: &JsonValue, def: &TypeDef) -> Result<Value, ConversionError> {
        match def.shape() {
            Shape::Enum(members) => {
                let text = match raw {
                    JsonValue::String(text) => text.clone(),
                    JsonValue::Number(number) => number.to_string(),
                    other => other.to_string(),
                };
                enum_member(def, members, &text)
                    .map(Value::Enum)
                    .ok_or_else(|| ConversionError::UnknownEnumMember {
                        enum_name: def.full_name().to_string(),
                        value: text,
                    })
            }
            Shape::Record(fields) => self.record(raw, def, fields),
            Shape::Class => Err(ConversionError::Coercion(format!(
                "type '{}' has no structural form",
                def.full_name()
            ))),
        }
    }

    fn record(
        &self,
        raw: &JsonValue,
        def: &TypeDef,
        fields: &[FieldDef],
    ) -> Result<Value, ConversionError> {
        let JsonValue::Object(map) = raw else {
            return Err(ConversionError::Coercion(format!(
                "cannot convert {} to {}",
                json_kind(raw),
                def.name()
            )));
        };

        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let value = match lookup_field(map, &field.name) {
                None | Some(JsonValue::Null) => zero_value(&field.ty),
                Some(raw_field) => {
                    self.convert_as(raw_field, &field.ty)
                        .map_err(|source| ConversionError::Field {
                            field: field.name.clone(),
                            source: Box::new(source),
                        })?
                }
            };
            values.push((field.name.clone(), value));
        }

        Ok(Value::Record(RecordValue {
            type_name: def.full_name().into(),
            fields: values,
        }))
    }
}

fn lookup_field<'j>(map: &'j Map<String, JsonValue>, name: &str) -> Option<&'j JsonValue> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn composite<'j>(
    raw: &'j JsonValue,
    shape: &str,
) -> Result<&'j Map<String, JsonValue>, ConversionError> {
    match raw {
        JsonValue::Object(map) => Ok(map),
        other => Err(ConversionError::MalformedShape {
            shape: shape.into(),
            reason: format!("expected an object but got {}", json_kind(other)),
        }),
    }
}

fn component(
    fields: &Map<String, JsonValue>,
    shape: &str,
    key: &str,
    default: f32,
) -> Result<f32, ConversionError> {
    match fields.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(JsonValue::Number(number)) => number.as_f64().map(|n| n as f32).ok_or_else(|| {
            ConversionError::MalformedShape {
                shape: shape.into(),
                reason: format!("field '{key}' is out of range"),
            }
        }),
        Some(other) => Err(ConversionError::MalformedShape {
            shape: shape.into(),
            reason: format!("field '{key}' must be a number but got {}", json_kind(other)),
        }),
    }
}

/// Converts raw JSON into the closest native value without a declared type.
fn loose(raw: &JsonValue) -> Value {
    match raw {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(number) => match number.as_i64() {
            Some(n) => i32::try_from(n).map_or(Value::Long(n), Value::Int),
            None => Value::Double(number.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::Array(items.iter().map(loose).collect()),
        JsonValue::Object(_) => Value::opaque(Serializable(raw.clone())),
    }
}

fn json_kind(raw: &JsonValue) -> &'static str {
    match raw {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn enum_member(def: &TypeDef, members: &[EnumMember], text: &str) -> Option<EnumValue> {
    let text = text.trim();
    members
        .iter()
        .find(|member| member.name == text)
        .or_else(|| {
            let discriminant = text.parse::<i64>().ok()?;
            members.iter().find(|member| member.discriminant == discriminant)
        })
        .map(|member| EnumValue {
            type_name: def.full_name().into(),
            member: member.name.clone(),
            discriminant: member.discriminant,
        })
}

/// The value a missing argument or field of type `ty` takes.
pub(crate) fn zero_value(ty: &ParamType) -> Value {
    match ty {
        ParamType::String => Value::String(String::new()),
        ParamType::Int => Value::Int(0),
        ParamType::Long => Value::Long(0),
        ParamType::Float => Value::Float(0.0),
        ParamType::Double => Value::Double(0.0),
        ParamType::Bool => Value::Bool(false),
        ParamType::Decimal => Value::Decimal(BigDecimal::from(0i64)),
        ParamType::Vector2 => Value::Vector2(Vector2::default()),
        ParamType::Vector3 => Value::Vector3(Vector3::default()),
        ParamType::Color => Value::Color(Color::new(0.0, 0.0, 0.0, 1.0)),
        ParamType::HostObject => Value::Object(None),
        ParamType::Array(_) | ParamType::Any | ParamType::Named(_) => Value::Null,
    }
}

/// Coerces a native value to `target`.
///
/// Numeric conversions are range checked and round half-to-even, strings are
/// parsed, booleans map to and from 0/1, and strings or integers convert to
/// enum members. Every other pair is an invalid cast.
pub(crate) fn change_type(
    value: Value,
    target: &ParamType,
    registry: &HostRegistry,
) -> Result<Value, String> {
    if value.is_null() {
        return Ok(if target.is_scalar() {
            zero_value(target)
        } else {
            value
        });
    }

    let name = target.short_name();
    match target {
        ParamType::Any => Ok(value),
        ParamType::String => match value {
            Value::String(_) => Ok(value),
            Value::Int(_)
            | Value::Long(_)
            | Value::Float(_)
            | Value::Double(_)
            | Value::Bool(_)
            | Value::Decimal(_)
            | Value::Enum(_) => Ok(Value::String(value.to_string())),
            other => Err(invalid_cast(&other, &name)),
        },
        ParamType::Int => {
            let n = to_i64(&value, &name)?;
            i32::try_from(n).map(Value::Int).map_err(|_| overflow(&name))
        }
        ParamType::Long => to_i64(&value, &name).map(Value::Long),
        ParamType::Float => to_f64(&value, &name).map(|n| Value::Float(n as f32)),
        ParamType::Double => to_f64(&value, &name).map(Value::Double),
        ParamType::Bool => to_bool(&value, &name).map(Value::Bool),
        ParamType::Decimal => to_decimal(&value, &name).map(Value::Decimal),
        ParamType::Array(element) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| change_type(item, element, registry))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(invalid_cast(&other, &name)),
        },
        ParamType::Named(full_name) => match registry.find(full_name).map(TypeDef::shape) {
            Some(Shape::Enum(members)) => to_enum(value, full_name, members, registry, &name),
            Some(Shape::Record(_)) => {
                let same = matches!(&value, Value::Record(record) if *record.type_name == **full_name);
                if same {
                    Ok(value)
                } else {
                    Err(invalid_cast(&value, &name))
                }
            }
            _ => Err(invalid_cast(&value, &name)),
        },
        ParamType::Vector2 | ParamType::Vector3 | ParamType::Color | ParamType::HostObject => {
            let same = matches!(
                (target, &value),
                (ParamType::Vector2, Value::Vector2(_))
                    | (ParamType::Vector3, Value::Vector3(_))
                    | (ParamType::Color, Value::Color(_))
                    | (ParamType::HostObject, Value::Object(_))
            );
            if same {
                Ok(value)
            } else {
                Err(invalid_cast(&value, &name))
            }
        }
    }
}

fn to_enum(
    value: Value,
    full_name: &str,
    members: &[EnumMember],
    registry: &HostRegistry,
    name: &str,
) -> Result<Value, String> {
    let Some(def) = registry.find(full_name) else {
        return Err(invalid_cast(&value, name));
    };
    if matches!(&value, Value::Enum(existing) if &*existing.type_name == full_name) {
        return Ok(value);
    }
    let text = match &value {
        Value::String(text) => text.clone(),
        Value::Int(n) => n.to_string(),
        Value::Long(n) => n.to_string(),
        other => return Err(invalid_cast(other, name)),
    };
    enum_member(def, members, &text)
        .map(Value::Enum)
        .ok_or_else(|| format!("Requested value '{text}' was not found in {name}"))
}

fn invalid_cast(value: &Value, target: &str) -> String {
    format!("Invalid cast from '{}' to '{}'", value.kind_name(), target)
}

fn overflow(target: &str) -> String {
    format!("Value was either too large or too small for {target}")
}

fn round_integral(n: f64) -> Option<i64> {
    let rounded = n.round_ties_even();
    (rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64)
        .then_some(rounded as i64)
}

fn decimal_to_f64(decimal: &BigDecimal) -> Option<f64> {
    decimal.to_string().parse::<f64>().ok()
}

fn to_i64(value: &Value, target: &str) -> Result<i64, String> {
    match value {
        Value::Int(n) => Ok(i64::from(*n)),
        Value::Long(n) => Ok(*n),
        Value::Float(n) => round_integral(f64::from(*n)).ok_or_else(|| overflow(target)),
        Value::Double(n) => round_integral(*n).ok_or_else(|| overflow(target)),
        Value::Decimal(d) => decimal_to_f64(d)
            .and_then(round_integral)
            .ok_or_else(|| overflow(target)),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Enum(e) => Ok(e.discriminant),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("Input string '{s}' was not in a correct format")),
        other => Err(invalid_cast(other, target)),
    }
}

fn to_f64(value: &Value, target: &str) -> Result<f64, String> {
    match value {
        Value::Int(n) => Ok(f64::from(*n)),
        Value::Long(n) => Ok(*n as f64),
        Value::Float(n) => Ok(f64::from(*n)),
        Value::Double(n) => Ok(*n),
        Value::Decimal(d) => decimal_to_f64(d).ok_or_else(|| overflow(target)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Input string '{s}' was not in a correct format")),
        other => Err(invalid_cast(other, target)),
    }
}

fn to_bool(value: &Value, target: &str) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(n) => Ok(*n != 0),
        Value::Long(n) => Ok(*n != 0),
        Value::Float(n) => Ok(*n != 0.0),
        Value::Double(n) => Ok(*n != 0.0),
        Value::Decimal(d) => Ok(decimal_to_f64(d).is_some_and(|n| n != 0.0)),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
        Value::String(s) => Err(format!("String '{s}' was not recognized as a valid Boolean")),
        other => Err(invalid_cast(other, target)),
    }
}

fn to_decimal(value: &Value, target: &str) -> Result<BigDecimal, String> {
    let parse = |text: &str| {
        BigDecimal::from_str(text.trim())
            .map_err(|_| format!("Input string '{text}' was not in a correct format"))
    };
    match value {
        Value::Decimal(d) => Ok(d.clone()),
        Value::Int(n) => Ok(BigDecimal::from(i64::from(*n))),
        Value::Long(n) => Ok(BigDecimal::from(*n)),
        Value::Float(n) if n.is_finite() => parse(&n.to_string()),
        Value::Double(n) if n.is_finite() => parse(&n.to_string()),
        Value::Float(_) | Value::Double(_) => Err(overflow(target)),
        Value::Bool(b) => Ok(BigDecimal::from(i64::from(*b))),
        Value::String(s) => parse(s),
        other => Err(invalid_cast(other, target)),
    }
}
