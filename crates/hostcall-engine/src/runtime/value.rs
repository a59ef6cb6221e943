//! Native values passed to and returned from registered callables.

use bigdecimal::BigDecimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }
}

/// An object living in the host's object graph.
pub trait LiveObject: fmt::Debug + Send + Sync {
    fn name(&self) -> String;
    fn instance_id(&self) -> i64;
    fn is_active(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
}

pub type ObjectRef = Arc<dyn LiveObject>;

/// A host value with no dedicated [`Value`] variant.
///
/// The result marshaller first tries [`Structured::to_json`] and falls back to
/// the `Display` text when that fails.
pub trait Structured: fmt::Debug + fmt::Display + Send + Sync {
    fn to_json(&self) -> Result<JsonValue, String>;
}

/// Adapts any `Serialize + Display` type into a [`Structured`] value.
#[derive(Debug, Clone)]
pub struct Serializable<T>(pub T);

impl<T> fmt::Display for Serializable<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Structured for Serializable<T>
where
    T: Serialize + fmt::Display + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> Result<JsonValue, String> {
        serde_json::to_value(&self.0).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub type_name: Arc<str>,
    pub member: String,
    pub discriminant: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub type_name: Arc<str>,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Decimal(BigDecimal),
    Vector2(Vector2),
    Vector3(Vector3),
    Color(Color),
    Array(Vec<Value>),
    /// A live object reference; `None` is a null reference.
    Object(Option<ObjectRef>),
    Enum(EnumValue),
    Record(RecordValue),
    Opaque(Arc<dyn Structured>),
}

impl Value {
    pub fn opaque<T: Structured + 'static>(value: T) -> Self {
        Value::Opaque(Arc::new(value))
    }

    /// `Null` or a null object reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::Object(None))
    }

    /// Short name of the runtime kind, used in cast and mismatch messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::String(_) => "String".into(),
            Value::Int(_) => "Int32".into(),
            Value::Long(_) => "Int64".into(),
            Value::Float(_) => "Single".into(),
            Value::Double(_) => "Double".into(),
            Value::Bool(_) => "Boolean".into(),
            Value::Decimal(_) => "Decimal".into(),
            Value::Vector2(_) => "Vector2".into(),
            Value::Vector3(_) => "Vector3".into(),
            Value::Color(_) => "Color".into(),
            Value::Array(_) => "Array".into(),
            Value::Object(_) => "GameObject".into(),
            Value::Enum(value) => short(&value.type_name),
            Value::Record(value) => short(&value.type_name),
            Value::Opaque(_) => "Object".into(),
        }
    }
}

fn short(full: &str) -> String {
    full.rsplit('.').next().unwrap_or_default().to_string()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Vector2(a), Value::Vector2(b)) => a == b,
            (Value::Vector3(a), Value::Vector3(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.instance_id() == b.instance_id(),
                _ => false,
            },
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Color(c) => write!(f, "RGBA({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(Some(object)) => f.write_str(&object.name()),
            Value::Object(None) => f.write_str("null"),
            Value::Enum(value) => f.write_str(&value.member),
            Value::Record(value) => f.write_str(&value.type_name),
            Value::Opaque(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vector2> for Value {
    fn from(value: Vector2) -> Self {
        Value::Vector2(value)
    }
}

impl From<Vector3> for Value {
    fn from(value: Vector3) -> Self {
        Value::Vector3(value)
    }
}

impl From<Color> for Value {
    fn from(value: Color) -> Self {
        Value::Color(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(Some(value))
    }
}

/// An error raised by a callee while it executes.
///
/// Its message is surfaced verbatim in the failure envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for Fault {
    fn from(message: String) -> Self {
        Fault { message }
    }
}

impl From<&str> for Fault {
    fn from(message: &str) -> Self {
        Fault::new(message)
    }
}

/// Converted arguments handed to a callable, in declaration order.
///
/// The typed accessors fail with a [`Fault`] when the argument is missing or
/// holds a different kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<Value>,
}

macro_rules! scalar_accessor {
    ($name:ident, $variant:ident, $ty:ty, $label:literal) => {
        pub fn $name(&self, index: usize) -> Result<$ty, Fault> {
            match self.value(index)? {
                Value::$variant(value) => Ok(value.clone()),
                other => Err(mismatch(index, $label, other)),
            }
        }
    };
}

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Args { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn value(&self, index: usize) -> Result<&Value, Fault> {
        self.values
            .get(index)
            .ok_or_else(|| Fault::new(format!("argument {index} is missing")))
    }

    scalar_accessor!(int, Int, i32, "Int32");
    scalar_accessor!(long, Long, i64, "Int64");
    scalar_accessor!(float, Float, f32, "Single");
    scalar_accessor!(double, Double, f64, "Double");
    scalar_accessor!(bool, Bool, bool, "Boolean");
    scalar_accessor!(vector2, Vector2, Vector2, "Vector2");
    scalar_accessor!(vector3, Vector3, Vector3, "Vector3");
    scalar_accessor!(color, Color, Color, "Color");
    scalar_accessor!(enum_value, Enum, EnumValue, "enum");
    scalar_accessor!(record, Record, RecordValue, "record");

    pub fn string(&self, index: usize) -> Result<&str, Fault> {
        match self.value(index)? {
            Value::String(value) => Ok(value),
            other => Err(mismatch(index, "String", other)),
        }
    }

    /// A host object argument; a null reference is `Ok(None)`.
    pub fn object(&self, index: usize) -> Result<Option<ObjectRef>, Fault> {
        match self.value(index)? {
            Value::Object(object) => Ok(object.clone()),
            Value::Null => Ok(None),
            other => Err(mismatch(index, "GameObject", other)),
        }
    }

    /// An array argument; a null array is `Ok(None)`.
    pub fn array(&self, index: usize) -> Result<Option<&[Value]>, Fault> {
        match self.value(index)? {
            Value::Array(items) => Ok(Some(items)),
            Value::Null => Ok(None),
            other => Err(mismatch(index, "Array", other)),
        }
    }
}

fn mismatch(index: usize, expected: &str, found: &Value) -> Fault {
    Fault::new(format!(
        "argument {index} is {} but {expected} was expected",
        found.kind_name()
    ))
}
