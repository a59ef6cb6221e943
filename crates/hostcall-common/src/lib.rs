//! hostcall Common Types
//!
//! This crate provides the envelope types exchanged with the dispatch layer
//! and the error taxonomy shared by every hostcall component.
//!
//! # Overview
//!
//! hostcall lets an external controller invoke static callables registered by
//! a running host application. The controller sends a request envelope naming
//! a type, a method and a list of loosely-typed parameter descriptors; the host
//! answers with a success envelope (optionally carrying the marshalled return
//! value) or an error envelope.
//!
//! - **Requests**: [`InvocationRequest`] and [`ParameterDescriptor`], parsed and
//!   validated from the wire envelope
//! - **Responses**: [`InvocationResponse`] and the [`ErrorEnvelopeFactory`]
//!   used to build failure envelopes
//! - **Errors**: [`InvocationError`], every variant surfaced under the single
//!   `"invocation_error"` category
//!
//! # Example
//!
//! ```
//! use hostcall_common::InvocationRequest;
//! use serde_json::json;
//!
//! let request = InvocationRequest::from_envelope(&json!({
//!     "typeName": "Demo.Math",
//!     "methodName": "Add",
//!     "parameters": [
//!         { "type": "int", "value": 2 },
//!         { "type": "int", "value": 3 }
//!     ]
//! }))
//! .unwrap();
//!
//! assert_eq!(request.parameters.len(), 2);
//! ```

pub mod protocol;

pub use protocol::*;
