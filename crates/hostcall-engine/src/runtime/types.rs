//! Declared parameter and return types.
//!
//! Callables registered with the engine declare their signatures with these
//! types; the parameter marshaller resolves each descriptor tag to one of them
//! and the method resolver compares them for exact-signature matches.
//!
//! # Naming
//!
//! | Type | Short name |
//! |------|------------|
//! | `String` | `String` |
//! | `Int` / `Long` | `Int32` / `Int64` |
//! | `Float` / `Double` | `Single` / `Double` |
//! | `Bool` | `Boolean` |
//! | `Array(Int)` | `Int32[]` |
//! | `HostObject` | `GameObject` |
//! | `Any` | `Object` |
//! | `Named("Demo.PrimitiveType")` | `PrimitiveType` |
//!
//! Full names differ from short names only for `Named` types, which keep their
//! namespace.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Decimal,
    Vector2,
    Vector3,
    Color,
    Array(Box<ParamType>),
    /// Reference into the host's live object graph.
    HostObject,
    /// Accepts every value without coercion.
    Any,
    /// A registered enum, record or class, by full name.
    Named(Arc<str>),
}

impl ParamType {
    pub fn array(element: ParamType) -> Self {
        ParamType::Array(Box::new(element))
    }

    pub fn named(full_name: impl Into<Arc<str>>) -> Self {
        ParamType::Named(full_name.into())
    }

    pub fn short_name(&self) -> String {
        match self {
            ParamType::Named(full) => full.rsplit('.').next().unwrap_or_default().to_string(),
            ParamType::Array(element) => format!("{}[]", element.short_name()),
            other => other.builtin_name().to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            ParamType::Named(full) => full.to_string(),
            ParamType::Array(element) => format!("{}[]", element.full_name()),
            other => other.builtin_name().to_string(),
        }
    }

    fn builtin_name(&self) -> &'static str {
        match self {
            ParamType::String => "String",
            ParamType::Int => "Int32",
            ParamType::Long => "Int64",
            ParamType::Float => "Single",
            ParamType::Double => "Double",
            ParamType::Bool => "Boolean",
            ParamType::Decimal => "Decimal",
            ParamType::Vector2 => "Vector2",
            ParamType::Vector3 => "Vector3",
            ParamType::Color => "Color",
            ParamType::HostObject => "GameObject",
            ParamType::Any => "Object",
            ParamType::Array(_) | ParamType::Named(_) => "",
        }
    }

    /// Types whose null value is replaced by a zero-equivalent.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ParamType::String
                | ParamType::Int
                | ParamType::Long
                | ParamType::Float
                | ParamType::Double
                | ParamType::Bool
                | ParamType::Decimal
        )
    }

    /// Whether a value of type `other` can be passed where `self` is declared
    /// without coercion.
    pub fn is_assignable_from(&self, other: &ParamType) -> bool {
        self == other || *self == ParamType::Any
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Deferred completion shapes a callable may declare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeferredShape {
    /// Completes without a payload.
    Task,
    /// Completes with a payload of the given type.
    TaskOf(ParamType),
    /// A third-party awaitable polled through its awaiter.
    Cooperative {
        name: Arc<str>,
        payload: Option<ParamType>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Value(ParamType),
    Deferred(DeferredShape),
}

impl ReturnType {
    pub fn value(ty: ParamType) -> Self {
        ReturnType::Value(ty)
    }

    pub fn task() -> Self {
        ReturnType::Deferred(DeferredShape::Task)
    }

    pub fn task_of(payload: ParamType) -> Self {
        ReturnType::Deferred(DeferredShape::TaskOf(payload))
    }

    pub fn cooperative(name: impl Into<Arc<str>>, payload: Option<ParamType>) -> Self {
        ReturnType::Deferred(DeferredShape::Cooperative {
            name: name.into(),
            payload,
        })
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, ReturnType::Deferred(_))
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnType::Void => f.write_str("Void"),
            ReturnType::Value(ty) => write!(f, "{ty}"),
            ReturnType::Deferred(DeferredShape::Task) => f.write_str("Task"),
            ReturnType::Deferred(DeferredShape::TaskOf(payload)) => write!(f, "Task<{payload}>"),
            ReturnType::Deferred(DeferredShape::Cooperative { name, payload: None }) => {
                f.write_str(name)
            }
            ReturnType::Deferred(DeferredShape::Cooperative {
                name,
                payload: Some(payload),
            }) => write!(f, "{name}<{payload}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_full_names() {
        assert_eq!(ParamType::Int.short_name(), "Int32");
        assert_eq!(ParamType::array(ParamType::Float).short_name(), "Single[]");
        let named = ParamType::named("Demo.Shapes.PrimitiveType");
        assert_eq!(named.short_name(), "PrimitiveType");
        assert_eq!(named.full_name(), "Demo.Shapes.PrimitiveType");
        assert_eq!(ParamType::named("Bare").short_name(), "Bare");
    }

    #[test]
    fn test_assignability() {
        assert!(ParamType::Int.is_assignable_from(&ParamType::Int));
        assert!(ParamType::Any.is_assignable_from(&ParamType::Vector3));
        assert!(!ParamType::Long.is_assignable_from(&ParamType::Int));
        assert!(!ParamType::Int.is_assignable_from(&ParamType::Any));
    }

    #[test]
    fn test_return_type_display() {
        assert_eq!(ReturnType::Void.to_string(), "Void");
        assert_eq!(ReturnType::value(ParamType::Int).to_string(), "Int32");
        assert_eq!(ReturnType::task().to_string(), "Task");
        assert_eq!(ReturnType::task_of(ParamType::String).to_string(), "Task<String>");
        assert_eq!(ReturnType::cooperative("UniTask", None).to_string(), "UniTask");
        assert_eq!(
            ReturnType::cooperative("UniTask", Some(ParamType::Int)).to_string(),
            "UniTask<Int32>"
        );
    }

    #[test]
    fn test_is_deferred() {
        assert!(!ReturnType::Void.is_deferred());
        assert!(!ReturnType::value(ParamType::Bool).is_deferred());
        assert!(ReturnType::task().is_deferred());
        assert!(ReturnType::cooperative("UniTask", None).is_deferred());
    }
}
