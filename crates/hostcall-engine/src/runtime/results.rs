//! Native result to JSON conversion
//!
//! # Type Mapping
//!
//! | Value | JSON |
//! |-------|------|
//! | `Null`, `Object(None)` | null |
//! | `String`, `Bool` | string, boolean |
//! | `Int`, `Long`, `Double`, `Decimal` | number |
//! | `Float` | number, through its shortest text form |
//! | `Vector2`, `Vector3`, `Color` | `{x, y}`, `{x, y, z}`, `{r, g, b, a}` |
//! | `Array` | array, element-wise |
//! | `Object(Some)` | `{name, instanceId, active}` |
//! | `Enum` | member name |
//! | `Record` | object of its fields |
//! | `Opaque` | its structural form, else its text |
//!
//! A value that cannot be represented (a non-finite float, an opaque value
//! whose serialization fails) is sent as its text form and logged at warn
//! level. Marshalling never fails.

use serde_json::{json, Map, Number, Value as JsonValue};
use std::str::FromStr;

use crate::runtime::types::ReturnType;
use crate::runtime::value::Value;

pub fn marshal_result(value: &Value) -> JsonValue {
    match value {
        Value::Null | Value::Object(None) => JsonValue::Null,
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Int(n) => JsonValue::from(*n),
        Value::Long(n) => JsonValue::from(*n),
        Value::Float(n) => single(*n),
        Value::Double(n) => double(*n),
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Decimal(d) => {
            let text = d.to_string();
            Number::from_str(&text)
                .map(JsonValue::Number)
                .unwrap_or_else(|_| text_fallback(text))
        }
        Value::Vector2(v) => json!({ "x": single(v.x), "y": single(v.y) }),
        Value::Vector3(v) => json!({ "x": single(v.x), "y": single(v.y), "z": single(v.z) }),
        Value::Color(c) => json!({
            "r": single(c.r),
            "g": single(c.g),
            "b": single(c.b),
            "a": single(c.a),
        }),
        Value::Array(items) => JsonValue::Array(items.iter().map(marshal_result).collect()),
        Value::Object(Some(object)) => json!({
            "name": object.name(),
            "instanceId": object.instance_id(),
            "active": object.is_active(),
        }),
        Value::Enum(e) => JsonValue::String(e.member.clone()),
        Value::Record(record) => {
            let fields = record
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), marshal_result(value)))
                .collect::<Map<_, _>>();
            JsonValue::Object(fields)
        }
        Value::Opaque(opaque) => match opaque.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Structural serialization failed ({}), sending text form", e);
                JsonValue::String(opaque.to_string())
            }
        },
    }
}

/// Name reported as `returnType`: the declared return type as written, e.g.
/// `Int32`, `Task<Int32>` or `UniTask<String>`.
pub fn return_type_name(declared: &ReturnType) -> String {
    declared.to_string()
}

fn single(n: f32) -> JsonValue {
    if !n.is_finite() {
        return text_fallback(n.to_string());
    }
    // f32 -> f64 widening would turn 0.1 into 0.10000000149011612.
    n.to_string()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| text_fallback(n.to_string()), JsonValue::Number)
}

fn double(n: f64) -> JsonValue {
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or_else(|| text_fallback(n.to_string()))
}

fn text_fallback(text: String) -> JsonValue {
    tracing::warn!("Value {} has no JSON number form, sending text", text);
    JsonValue::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryObjectGraph;
    use crate::runtime::types::ParamType;
    use crate::runtime::value::{
        Color, EnumValue, ObjectRef, RecordValue, Serializable, Structured, Vector2, Vector3,
    };
    use bigdecimal::BigDecimal;
    use std::fmt;
    use std::sync::Arc;

    #[test]
    fn test_primitives() {
        assert_eq!(marshal_result(&Value::Int(5)), json!(5));
        assert_eq!(marshal_result(&Value::Long(-9)), json!(-9));
        assert_eq!(marshal_result(&Value::from("ok")), json!("ok"));
        assert_eq!(marshal_result(&Value::Bool(true)), json!(true));
        assert_eq!(marshal_result(&Value::Double(2.5)), json!(2.5));
        assert_eq!(marshal_result(&Value::Null), JsonValue::Null);
    }

    #[test]
    fn test_float_uses_shortest_form() {
        assert_eq!(marshal_result(&Value::Float(0.1)), json!(0.1));
    }

    #[test]
    fn test_non_finite_falls_back_to_text() {
        assert_eq!(marshal_result(&Value::Double(f64::NAN)), json!("NaN"));
        assert_eq!(marshal_result(&Value::Float(f32::INFINITY)), json!("inf"));
    }

    #[test]
    fn test_decimal() {
        let value = Value::Decimal(BigDecimal::from_str("12.5").unwrap());
        assert_eq!(marshal_result(&value), json!(12.5));
    }

    #[test]
    fn test_composites_are_symmetric_with_input() {
        assert_eq!(
            marshal_result(&Value::Vector2(Vector2::new(1.0, 2.0))),
            json!({ "x": 1.0, "y": 2.0 })
        );
        assert_eq!(
            marshal_result(&Value::Vector3(Vector3::new(1.0, 0.5, -2.0))),
            json!({ "x": 1.0, "y": 0.5, "z": -2.0 })
        );
        assert_eq!(
            marshal_result(&Value::Color(Color::new(1.0, 0.0, 0.0, 1.0))),
            json!({ "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 })
        );
    }

    #[test]
    fn test_arrays_are_element_wise() {
        let value = Value::Array(vec![Value::Int(1), Value::from("two"), Value::Null]);
        assert_eq!(marshal_result(&value), json!([1, "two", null]));
    }

    #[test]
    fn test_host_object() {
        let scene = InMemoryObjectGraph::new();
        let lamp = scene.spawn("World/Lamp");
        lamp.set_active(false);
        let object: ObjectRef = lamp.clone();

        assert_eq!(
            marshal_result(&Value::Object(Some(object))),
            json!({ "name": "Lamp", "instanceId": 1, "active": false })
        );
        assert_eq!(marshal_result(&Value::Object(None)), JsonValue::Null);
    }

    #[test]
    fn test_enum_and_record() {
        let shape = Value::Enum(EnumValue {
            type_name: "Demo.PrimitiveType".into(),
            member: "Cube".into(),
            discriminant: 3,
        });
        assert_eq!(marshal_result(&shape), json!("Cube"));

        let record = Value::Record(RecordValue {
            type_name: "Demo.Spawn".into(),
            fields: vec![("count".into(), Value::Int(2)), ("shape".into(), shape)],
        });
        assert_eq!(marshal_result(&record), json!({ "count": 2, "shape": "Cube" }));
    }

    #[test]
    fn test_opaque_structural_form() {
        let value = Value::opaque(Serializable(json!({ "score": 3 })));
        assert_eq!(marshal_result(&value), json!({ "score": 3 }));
    }

    #[test]
    fn test_opaque_text_fallback() {
        #[derive(Debug)]
        struct Handle;

        impl fmt::Display for Handle {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("Handle#7")
            }
        }

        impl Structured for Handle {
            fn to_json(&self) -> Result<JsonValue, String> {
                Err("self-referencing".into())
            }
        }

        let value = Value::Opaque(Arc::new(Handle));
        assert_eq!(marshal_result(&value), json!("Handle#7"));
    }

    #[test]
    fn test_decimal_keeps_every_digit() {
        let exact = "12345678901234567890.123456789";
        let value = Value::Decimal(BigDecimal::from_str(exact).unwrap());
        let json = marshal_result(&value);
        assert!(json.is_number());
        assert_eq!(json.to_string(), exact);
    }

    #[test]
    fn test_return_type_name() {
        assert_eq!(return_type_name(&ReturnType::value(ParamType::Int)), "Int32");
        assert_eq!(return_type_name(&ReturnType::task_of(ParamType::String)), "Task<String>");
        assert_eq!(return_type_name(&ReturnType::task()), "Task");
        assert_eq!(return_type_name(&ReturnType::value(ParamType::Any)), "Object");
        assert_eq!(
            return_type_name(&ReturnType::cooperative("UniTask", Some(ParamType::String))),
            "UniTask<String>"
        );
        assert_eq!(
            return_type_name(&ReturnType::value(ParamType::named("Demo.SpawnSettings"))),
            "Demo.SpawnSettings"
        );
    }
}
