//! hostcall Request Types
//!
//! This module defines the invocation request and the wire-envelope parser
//! that validates it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{InvocationError, Result};

/// One loosely-typed call argument.
///
/// `tag` names the parameter type (`"int"`, `"vector3"`, `"Demo.PrimitiveType"`,
/// ...) and `value` holds the raw JSON payload. Descriptor order is the call
/// argument order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterDescriptor {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub value: Value,
}

impl ParameterDescriptor {
    pub fn new(tag: impl Into<String>, value: Value) -> Self {
        ParameterDescriptor {
            tag: tag.into(),
            value,
        }
    }
}

/// A request to invoke one static callable.
///
/// Created per incoming call and consumed once by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub type_name: String,
    pub method_name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
}

impl InvocationRequest {
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        InvocationRequest {
            type_name: type_name.into(),
            method_name: method_name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, tag: impl Into<String>, value: Value) -> Self {
        self.parameters.push(ParameterDescriptor::new(tag, value));
        self
    }

    /// Parses and validates a request envelope.
    ///
    /// # Errors
    ///
    /// Returns a validation error if:
    /// - `typeName` or `methodName` is absent, not a string, or empty
    /// - `parameters` is present but not an array (null counts as absent)
    /// - a parameter entry is not an object or lacks a non-empty `type`
    pub fn from_envelope(envelope: &Value) -> Result<Self> {
        let type_name = required_string(envelope, "typeName")?;
        let method_name = required_string(envelope, "methodName")?;

        let entries = match envelope.get("parameters") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(_) => {
                return Err(InvocationError::InvalidRequest(
                    "'parameters' must be an array".into(),
                ))
            }
        };

        let mut parameters = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Some(object) = entry.as_object() else {
                return Err(InvocationError::MalformedParameter {
                    index,
                    problem: "is not an object".into(),
                });
            };

            let tag = object
                .get("type")
                .and_then(Value::as_str)
                .filter(|tag| !tag.is_empty())
                .ok_or_else(|| InvocationError::MalformedParameter {
                    index,
                    problem: "missing 'type'".into(),
                })?;

            let value = object.get("value").cloned().unwrap_or(Value::Null);
            parameters.push(ParameterDescriptor::new(tag, value));
        }

        Ok(InvocationRequest {
            type_name,
            method_name,
            parameters,
        })
    }

    /// Checks the fields a directly-constructed request must carry.
    pub fn validate(&self) -> Result<()> {
        if self.type_name.is_empty() {
            return Err(InvocationError::MissingField("typeName".into()));
        }
        if self.method_name.is_empty() {
            return Err(InvocationError::MissingField("methodName".into()));
        }
        if let Some(index) = self.parameters.iter().position(|p| p.tag.is_empty()) {
            return Err(InvocationError::MalformedParameter {
                index,
                problem: "missing 'type'".into(),
            });
        }
        Ok(())
    }
}

fn required_string(envelope: &Value, field: &str) -> Result<String> {
    envelope
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| InvocationError::MissingField(field.into()))
}
