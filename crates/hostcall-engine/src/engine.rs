use hostcall_common::protocol::error::{InvocationError, Result};
use hostcall_common::protocol::{
    ErrorEnvelopeFactory, InvocationRequest, InvocationResponse, StandardErrorEnvelope,
};
use serde_json::Value as JsonValue;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::host::{EmptyObjectGraph, LogSink, ObjectGraph, TracingLogSink};
use crate::registry::{HostRegistry, MethodDef};
use crate::runtime::completion::{panic_message, CompletionBridge, CompletionPlan, Returned};
use crate::runtime::conversions::ParameterMarshaller;
use crate::runtime::method_resolver::MethodResolver;
use crate::runtime::results::{marshal_result, return_type_name};
use crate::runtime::type_resolver::TypeResolver;
use crate::runtime::value::Args;

/// Dynamic invocation engine.
///
/// Resolves a request's type and method in the [`HostRegistry`], converts its
/// parameters, invokes the callable, waits for any deferred completion and
/// marshals the result into a response envelope.
///
/// # Pipeline
///
/// Each request runs strictly in order, and the first failing stage
/// short-circuits into a single failure envelope:
///
/// 1. validate the request fields
/// 2. resolve the type
/// 3. convert every parameter, in order
/// 4. resolve the method
/// 5. invoke it
/// 6. settle the completion chosen from the declared return type
/// 7. marshal the result
///
/// The engine holds no per-request state and is shared behind an `Arc` by
/// whatever dispatch layer feeds it. Requests never block each other.
///
/// # Example
///
/// ```
/// use hostcall_engine::registry::{HostRegistry, Module, TypeDef};
/// use hostcall_engine::runtime::{ParamType, ReturnType, Returned};
/// use hostcall_engine::Engine;
/// use serde_json::json;
///
/// let math = TypeDef::class("Demo.Math").with_static(
///     "Add",
///     [ParamType::Int, ParamType::Int],
///     ReturnType::value(ParamType::Int),
///     |args| Ok(Returned::value(args.int(0)? + args.int(1)?)),
/// );
/// let engine = Engine::new(HostRegistry::new().with_module(Module::new("Demo").with_type(math)));
///
/// let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let response = runtime.block_on(engine.handle(&json!({
///     "typeName": "Demo.Math",
///     "methodName": "Add",
///     "parameters": [{ "type": "int", "value": 2 }, { "type": "int", "value": 3 }]
/// })));
/// assert_eq!(response["returnValue"], json!(5));
/// ```
pub struct Engine {
    registry: Arc<HostRegistry>,
    objects: Arc<dyn ObjectGraph>,
    log: Arc<dyn LogSink>,
    envelopes: Arc<dyn ErrorEnvelopeFactory>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(registry: HostRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    pub fn from_shared(registry: Arc<HostRegistry>) -> Self {
        Self {
            registry,
            objects: Arc::new(EmptyObjectGraph),
            log: Arc::new(TracingLogSink),
            envelopes: Arc::new(StandardErrorEnvelope),
            config: EngineConfig::default(),
        }
    }

    pub fn with_object_graph(mut self, objects: Arc<dyn ObjectGraph>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    pub fn with_error_envelope(mut self, envelopes: Arc<dyn ErrorEnvelopeFactory>) -> Self {
        self.envelopes = envelopes;
        self
    }

    /// Replaces the configuration.
    ///
    /// An out-of-range poll interval is logged and brought into range when a
    /// cooperative completion is polled.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("Invalid engine configuration: {}", e);
        }
        self.config = config;
        self
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handles a raw request envelope and always produces a response envelope.
    pub async fn handle(&self, envelope: &JsonValue) -> JsonValue {
        let outcome = match InvocationRequest::from_envelope(envelope) {
            Ok(request) => self.invoke(&request).await,
            Err(e) => Err(e),
        };

        let response = outcome.unwrap_or_else(|e| {
            tracing::debug!("Invocation failed ({:?}): {}", e.kind(), e);
            InvocationResponse::failure(&e)
        });
        response.to_envelope(self.envelopes.as_ref())
    }

    /// Runs the invocation pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails. A fault raised by the
    /// callable, synchronously or while its deferred completion runs, is
    /// [`InvocationError::Fault`] carrying the callee's message.
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResponse> {
        request.validate()?;

        let ty = TypeResolver::new(&self.registry, self.config.bare_name_lookup)
            .resolve(&request.type_name)
            .ok_or_else(|| InvocationError::TypeNotFound(request.type_name.clone()))?;

        let marshaller = ParameterMarshaller::new(&self.registry, self.objects.as_ref(), &self.config);
        let mut args = Vec::with_capacity(request.parameters.len());
        let mut arg_types = Vec::with_capacity(request.parameters.len());
        for (index, descriptor) in request.parameters.iter().enumerate() {
            let converted = marshaller
                .convert(descriptor)
                .map_err(|e| InvocationError::Conversion {
                    index,
                    reason: e.to_string(),
                })?;
            tracing::debug!("Parameter {} ({}) converted to {}", index, descriptor.tag, converted.ty);
            args.push(converted.value);
            arg_types.push(converted.ty);
        }

        let call = MethodResolver::new(&self.registry, ty)
            .resolve(&request.method_name, args, &arg_types)
            .map_err(|e| match e {
                InvocationError::MethodNotFound { method, .. } => InvocationError::MethodNotFound {
                    type_name: request.type_name.clone(),
                    method,
                },
                other => other,
            })?;
        let declared = call.method.returns();
        let plan = CompletionPlan::for_return(declared);
        tracing::debug!("Completion plan {:?} for return type {}", plan, declared);

        self.log.info(&format!(
            "Invoking {}.{} with {} parameters",
            request.type_name,
            request.method_name,
            request.parameters.len()
        ));

        let returned = invoke_guarded(call.method, call.args)?;
        let settled = CompletionBridge::new(self.config.poll_interval)
            .settle(plan, declared, returned)
            .await?;

        let message = if declared.is_deferred() {
            format!("Successfully invoked async method {}.{}", request.type_name, request.method_name)
        } else {
            format!("Successfully invoked {}.{}", request.type_name, request.method_name)
        };

        let response = InvocationResponse::success(message);
        Ok(match settled.payload {
            Some(payload) => {
                response.with_return_value(marshal_result(&payload), return_type_name(declared))
            }
            None => response,
        })
    }
}

/// Calls the handler, turning a returned fault or a panic into an error.
fn invoke_guarded(method: &MethodDef, args: Args) -> Result<Returned> {
    match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(args))) {
        Ok(Ok(returned)) => Ok(returned),
        Ok(Err(fault)) => Err(InvocationError::Fault(fault.to_string())),
        Err(panic) => Err(InvocationError::Fault(panic_message(panic.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Module, TypeDef};
    use crate::runtime::types::{ParamType, ReturnType};
    use crate::runtime::value::Fault;
    use serde_json::json;

    fn engine() -> Engine {
        let ty = TypeDef::class("Demo.Faulty")
            .with_static("Fail", [], ReturnType::Void, |_| Err(Fault::new("boom")))
            .with_static("Panic", [], ReturnType::Void, |_| panic!("kaboom"))
            .with_static("Echo", [ParamType::String], ReturnType::value(ParamType::String), |args| {
                Ok(Returned::value(args.string(0)?))
            });
        Engine::new(HostRegistry::new().with_module(Module::new("Demo").with_type(ty)))
    }

    fn request(method: &str) -> InvocationRequest {
        InvocationRequest::new("Demo.Faulty", method)
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>(_: &T) {}

        assert_send_sync::<Engine>();
        let engine = engine();
        let envelope = json!({});
        assert_send(&engine.handle(&envelope));
    }

    #[tokio::test]
    async fn test_fault_message_is_verbatim() {
        let err = engine().invoke(&request("Fail")).await.unwrap_err();
        assert_eq!(err.to_string(), "Method execution failed: boom");
    }

    #[tokio::test]
    async fn test_panic_becomes_fault() {
        let err = engine().invoke(&request("Panic")).await.unwrap_err();
        assert_eq!(err, InvocationError::Fault("kaboom".into()));
    }

    #[tokio::test]
    async fn test_empty_type_name_is_validation_error() {
        let err = engine()
            .invoke(&InvocationRequest::new("", "Echo"))
            .await
            .unwrap_err();
        assert_eq!(err, InvocationError::MissingField("typeName".into()));
    }

    #[tokio::test]
    async fn test_handle_builds_success_envelope() {
        let envelope = engine()
            .handle(&json!({
                "typeName": "Demo.Faulty",
                "methodName": "Echo",
                "parameters": [{ "type": "string", "value": "hi" }]
            }))
            .await;
        assert_eq!(
            envelope,
            json!({
                "success": true,
                "type": "text",
                "message": "Successfully invoked Demo.Faulty.Echo",
                "returnValue": "hi",
                "returnType": "String"
            })
        );
    }

    #[tokio::test]
    async fn test_handle_validation_failure_envelope() {
        let envelope = engine().handle(&json!({ "typeName": "Demo.Faulty" })).await;
        assert_eq!(
            envelope,
            json!({
                "success": false,
                "error": {
                    "type": "invocation_error",
                    "message": "Required parameter 'methodName' not provided"
                }
            })
        );
    }
}
