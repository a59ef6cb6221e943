//! hostcall Response Types
//!
//! This module defines the invocation response and the factory used to build
//! failure envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::InvocationError;

/// Outcome of one invocation.
///
/// # Envelope Shape
///
/// A successful response serializes to:
///
/// ```text
/// { "success": true, "type": "text", "message": "...",
///   "returnValue": ..., "returnType": "..." }
/// ```
///
/// `returnValue` and `returnType` are present only when the callable produced
/// a non-void, non-null result. Failed responses are turned into envelopes by
/// an [`ErrorEnvelopeFactory`].
///
/// # Example
///
/// ```
/// use hostcall_common::InvocationResponse;
/// use serde_json::json;
///
/// let response = InvocationResponse::success("Successfully invoked Demo.Math.Add")
///     .with_return_value(json!(5), "Int32");
/// assert!(response.success);
/// assert_eq!(response.return_value, Some(json!(5)));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub success: bool,
    #[serde(rename = "type")]
    pub content_type: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
}

impl InvocationResponse {
    pub fn success(message: impl Into<String>) -> Self {
        InvocationResponse {
            success: true,
            content_type: "text".into(),
            message: message.into(),
            return_value: None,
            return_type: None,
            error_category: None,
        }
    }

    pub fn failure(error: &InvocationError) -> Self {
        InvocationResponse {
            success: false,
            content_type: "text".into(),
            message: error.to_string(),
            return_value: None,
            return_type: None,
            error_category: Some(error.category().into()),
        }
    }

    pub fn with_return_value(mut self, value: Value, return_type: impl Into<String>) -> Self {
        self.return_value = Some(value);
        self.return_type = Some(return_type.into());
        self
    }

    /// Builds the envelope for this response.
    ///
    /// Failed responses are delegated to `errors` with their message and
    /// category.
    pub fn to_envelope(&self, errors: &dyn ErrorEnvelopeFactory) -> Value {
        if !self.success {
            let category = self
                .error_category
                .as_deref()
                .unwrap_or(super::error::INVOCATION_ERROR);
            return errors.create(&self.message, category);
        }

        let mut envelope = Map::new();
        envelope.insert("success".into(), Value::Bool(true));
        envelope.insert("type".into(), Value::String(self.content_type.clone()));
        envelope.insert("message".into(), Value::String(self.message.clone()));
        if let Some(value) = &self.return_value {
            envelope.insert("returnValue".into(), value.clone());
        }
        if let Some(return_type) = &self.return_type {
            envelope.insert("returnType".into(), Value::String(return_type.clone()));
        }
        Value::Object(envelope)
    }
}

/// Builds failure envelopes from a message and a category.
///
/// Injected by the host so error envelopes match whatever shape the dispatch
/// layer already uses for other tools.
pub trait ErrorEnvelopeFactory: Send + Sync {
    fn create(&self, message: &str, category: &str) -> Value;
}

/// Default factory: `{ "success": false, "error": { "type": ..., "message": ... } }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardErrorEnvelope;

impl ErrorEnvelopeFactory for StandardErrorEnvelope {
    fn create(&self, message: &str, category: &str) -> Value {
        json!({
            "success": false,
            "error": {
                "type": category,
                "message": message,
            }
        })
    }
}
