//! Completion bridge for synchronous and deferred results
//!
//! This module unifies the outcomes a callable can produce into one eventual
//! payload. It is the only place the engine suspends.
//!
//! # Completion Shapes
//!
//! - **Immediate**: the callable returned a value (or nothing) synchronously
//! - **AwaitUnit**: a boxed future that completes without a payload
//! - **AwaitPayload**: a boxed future that completes with a [`Value`]
//! - **Poll**: a third-party [`CooperativeTask`] whose awaiter is polled until
//!   it reports completion, yielding to the tokio scheduler between checks
//!
//! # Execution Model
//!
//! The plan is chosen from the callable's *declared* return type before the
//! callable runs. After invocation the bridge checks that the produced
//! [`Returned`] fits the plan, then drives it to completion. A fault or panic
//! raised while a deferred completion runs becomes
//! [`InvocationError::Fault`]. There is no timeout and no cancellation: a
//! completion that never finishes stalls its request.

use futures_util::future::{BoxFuture, FutureExt};
use hostcall_common::protocol::error::{InvocationError, Result};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use crate::config::MAX_POLL_INTERVAL;
use crate::runtime::types::{DeferredShape, ReturnType};
use crate::runtime::value::{Fault, Value};

/// A boxed deferred completion produced by a callable.
pub type Deferred<T> = BoxFuture<'static, std::result::Result<T, Fault>>;

/// What a callable handed back when it was invoked.
pub enum Returned {
    /// A synchronous result; `Value::Null` for void or a null deferred handle.
    Value(Value),
    Deferred(Deferred<()>),
    DeferredValue(Deferred<Value>),
    Cooperative(Box<dyn CooperativeTask>),
}

impl Returned {
    pub fn void() -> Self {
        Returned::Value(Value::Null)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Returned::Value(value.into())
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<(), Fault>> + Send + 'static,
    {
        Returned::Deferred(future.boxed())
    }

    pub fn deferred_value<F>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<Value, Fault>> + Send + 'static,
    {
        Returned::DeferredValue(future.boxed())
    }

    pub fn cooperative(task: impl CooperativeTask + 'static) -> Self {
        Returned::Cooperative(Box::new(task))
    }

    fn describe(&self) -> &'static str {
        match self {
            Returned::Value(_) => "an immediate value",
            Returned::Deferred(_) => "a deferred completion",
            Returned::DeferredValue(_) => "a deferred value",
            Returned::Cooperative(_) => "a cooperative task",
        }
    }
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Returned::Value(value) => f.debug_tuple("Value").field(value).finish(),
            other => f.write_str(other.describe()),
        }
    }
}

/// A third-party awaitable.
///
/// Implemented once per async primitive the host exposes that is not a plain
/// Rust future.
pub trait CooperativeTask: Send {
    /// Returns the task's awaiter, or `None` if it exposes no awaiter.
    fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>>;
}

/// The polling side of a [`CooperativeTask`].
///
/// Both accessors default to `None`, meaning the awaiter does not expose them.
pub trait Awaiter: Send {
    /// `Some(true)` once the task is complete.
    fn is_completed(&self) -> Option<bool> {
        None
    }

    /// Extracts the payload once complete.
    fn result(&mut self) -> Option<std::result::Result<Value, Fault>> {
        None
    }
}

/// How a declared return type is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPlan {
    Immediate,
    AwaitUnit,
    AwaitPayload,
    Poll,
}

impl CompletionPlan {
    pub fn for_return(returns: &ReturnType) -> Self {
        match returns {
            ReturnType::Void | ReturnType::Value(_) => CompletionPlan::Immediate,
            ReturnType::Deferred(DeferredShape::Task) => CompletionPlan::AwaitUnit,
            ReturnType::Deferred(DeferredShape::TaskOf(_)) => CompletionPlan::AwaitPayload,
            ReturnType::Deferred(DeferredShape::Cooperative { .. }) => CompletionPlan::Poll,
        }
    }
}

/// The eventual result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    /// The payload, `None` when there is none or it is null.
    pub payload: Option<Value>,
    /// Whether the bridge had to wait on a deferred completion.
    pub suspended: bool,
}

impl Settled {
    fn immediate(value: Value) -> Self {
        Settled {
            payload: non_null(value),
            suspended: false,
        }
    }

    fn awaited(payload: Option<Value>) -> Self {
        Settled {
            payload: payload.and_then(non_null),
            suspended: true,
        }
    }
}

fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionBridge {
    poll_interval: Option<Duration>,
}

impl CompletionBridge {
    /// `poll_interval` is the wait between cooperative checks; `None` yields
    /// to the scheduler once per check.
    ///
    /// A zero interval yields instead, and one above [`MAX_POLL_INTERVAL`] is
    /// clamped to it.
    pub fn new(poll_interval: Option<Duration>) -> Self {
        let poll_interval = match poll_interval {
            Some(interval) if interval.is_zero() => None,
            Some(interval) if interval > MAX_POLL_INTERVAL => {
                tracing::warn!(
                    "Poll interval {} ms exceeds the maximum, using {} ms",
                    interval.as_millis(),
                    MAX_POLL_INTERVAL.as_millis()
                );
                Some(MAX_POLL_INTERVAL)
            }
            other => other,
        };
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    pub async fn settle(
        &self,
        plan: CompletionPlan,
        declared: &ReturnType,
        returned: Returned,
    ) -> Result<Settled> {
        match (plan, returned) {
            (CompletionPlan::Immediate, Returned::Value(value)) => Ok(Settled::immediate(value)),
            // A null deferred handle carries nothing to wait on.
            (_, Returned::Value(Value::Null)) => Ok(Settled::immediate(Value::Null)),
            (CompletionPlan::AwaitUnit, Returned::Deferred(future)) => {
                tracing::debug!("Awaiting deferred completion ({})", declared);
                guard(future).await?;
                Ok(Settled::awaited(None))
            }
            (CompletionPlan::AwaitPayload, Returned::DeferredValue(future)) => {
                tracing::debug!("Awaiting deferred value ({})", declared);
                let value = guard(future).await?;
                Ok(Settled::awaited(Some(value)))
            }
            (CompletionPlan::Poll, Returned::Cooperative(task)) => {
                tracing::debug!("Polling cooperative task ({})", declared);
                let payload = self.poll(task).await?;
                Ok(Settled::awaited(payload))
            }
            (_, other) => Err(InvocationError::ShapeMismatch {
                declared: declared.to_string(),
                produced: other.describe().to_string(),
            }),
        }
    }

    async fn poll(&self, task: Box<dyn CooperativeTask>) -> Result<Option<Value>> {
        let Some(mut awaiter) = contain(|| task.awaiter())? else {
            return Ok(None);
        };

        while contain(|| awaiter.is_completed())? == Some(false) {
            match self.poll_interval {
                Some(interval) => tokio::time::sleep(interval).await,
                None => tokio::task::yield_now().await,
            }
        }

        match contain(|| awaiter.result())? {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(fault)) => Err(InvocationError::Fault(fault.to_string())),
            None => Ok(None),
        }
    }
}

/// Awaits a deferred completion, turning faults and panics into errors.
async fn guard<T>(future: Deferred<T>) -> Result<T> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(fault)) => Err(InvocationError::Fault(fault.to_string())),
        Err(panic) => Err(InvocationError::Fault(panic_message(panic.as_ref()))),
    }
}

/// Runs one call into a third-party awaiter, turning a panic into a fault.
fn contain<T>(call: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .map_err(|panic| InvocationError::Fault(panic_message(panic.as_ref())))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "callee panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::ParamType;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Countdown {
        remaining: Arc<AtomicUsize>,
        payload: Option<Value>,
    }

    struct CountdownAwaiter {
        remaining: Arc<AtomicUsize>,
        payload: Option<Value>,
    }

    impl CooperativeTask for Countdown {
        fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>> {
            Some(Box::new(CountdownAwaiter {
                remaining: self.remaining,
                payload: self.payload,
            }))
        }
    }

    impl Awaiter for CountdownAwaiter {
        fn is_completed(&self) -> Option<bool> {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                return Some(true);
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
            Some(false)
        }

        fn result(&mut self) -> Option<std::result::Result<Value, Fault>> {
            self.payload.take().map(Ok)
        }
    }

    struct NoAwaiter;

    impl CooperativeTask for NoAwaiter {
        fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>> {
            None
        }
    }

    struct Bare;

    impl Awaiter for Bare {}

    struct BareTask;

    impl CooperativeTask for BareTask {
        fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>> {
            Some(Box::new(Bare))
        }
    }

    /// Panics from whichever awaiter call `stage` names.
    struct Exploding {
        stage: &'static str,
    }

    impl CooperativeTask for Exploding {
        fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>> {
            if self.stage == "awaiter" {
                panic!("awaiter exploded");
            }
            Some(Box::new(ExplodingAwaiter { stage: self.stage }))
        }
    }

    struct ExplodingAwaiter {
        stage: &'static str,
    }

    impl Awaiter for ExplodingAwaiter {
        fn is_completed(&self) -> Option<bool> {
            if self.stage == "is_completed" {
                panic!("is_completed exploded");
            }
            Some(true)
        }

        fn result(&mut self) -> Option<std::result::Result<Value, Fault>> {
            if self.stage == "result" {
                panic!("result exploded");
            }
            None
        }
    }

    fn bridge() -> CompletionBridge {
        CompletionBridge::default()
    }

    #[test]
    fn test_plan_follows_declared_type() {
        assert_eq!(CompletionPlan::for_return(&ReturnType::Void), CompletionPlan::Immediate);
        assert_eq!(
            CompletionPlan::for_return(&ReturnType::value(ParamType::Int)),
            CompletionPlan::Immediate
        );
        assert_eq!(CompletionPlan::for_return(&ReturnType::task()), CompletionPlan::AwaitUnit);
        assert_eq!(
            CompletionPlan::for_return(&ReturnType::task_of(ParamType::Int)),
            CompletionPlan::AwaitPayload
        );
        assert_eq!(
            CompletionPlan::for_return(&ReturnType::cooperative("UniTask", None)),
            CompletionPlan::Poll
        );
    }

    #[tokio::test]
    async fn test_immediate_value() {
        let declared = ReturnType::value(ParamType::Int);
        let settled = bridge()
            .settle(CompletionPlan::Immediate, &declared, Returned::value(5))
            .await
            .unwrap();
        assert_eq!(settled, Settled { payload: Some(Value::Int(5)), suspended: false });
    }

    #[tokio::test]
    async fn test_void_has_no_payload() {
        let settled = bridge()
            .settle(CompletionPlan::Immediate, &ReturnType::Void, Returned::void())
            .await
            .unwrap();
        assert!(settled.payload.is_none());
    }

    #[tokio::test]
    async fn test_unit_completion_is_awaited() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let returned = Returned::deferred(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let settled = bridge()
            .settle(CompletionPlan::AwaitUnit, &ReturnType::task(), returned)
            .await
            .unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert!(settled.suspended);
        assert!(settled.payload.is_none());
    }

    #[tokio::test]
    async fn test_payload_completion() {
        let returned = Returned::deferred_value(async { Ok(Value::from("done")) });
        let settled = bridge()
            .settle(CompletionPlan::AwaitPayload, &ReturnType::task_of(ParamType::String), returned)
            .await
            .unwrap();
        assert_eq!(settled.payload, Some(Value::from("done")));
    }

    #[tokio::test]
    async fn test_deferred_fault_is_surfaced() {
        let returned = Returned::deferred(async { Err(Fault::new("disk full")) });
        let err = bridge()
            .settle(CompletionPlan::AwaitUnit, &ReturnType::task(), returned)
            .await
            .unwrap_err();
        assert_eq!(err, InvocationError::Fault("disk full".into()));
    }

    #[tokio::test]
    async fn test_deferred_panic_is_fault() {
        let returned = Returned::deferred_value(async { panic!("exploded") });
        let err = bridge()
            .settle(CompletionPlan::AwaitPayload, &ReturnType::task_of(ParamType::Int), returned)
            .await
            .unwrap_err();
        assert_eq!(err, InvocationError::Fault("exploded".into()));
    }

    #[tokio::test]
    async fn test_awaiter_panic_is_fault() {
        let declared = ReturnType::cooperative("UniTask", Some(ParamType::Int));
        for stage in ["awaiter", "is_completed", "result"] {
            let returned = Returned::cooperative(Exploding { stage });
            let err = bridge()
                .settle(CompletionPlan::Poll, &declared, returned)
                .await
                .unwrap_err();
            assert_eq!(err, InvocationError::Fault(format!("{stage} exploded")));
        }
    }

    #[tokio::test]
    async fn test_cooperative_polls_until_complete() {
        let remaining = Arc::new(AtomicUsize::new(3));
        let returned = Returned::cooperative(Countdown {
            remaining: Arc::clone(&remaining),
            payload: Some(Value::Int(42)),
        });
        let declared = ReturnType::cooperative("UniTask", Some(ParamType::Int));

        let settled = bridge().settle(CompletionPlan::Poll, &declared, returned).await.unwrap();
        assert_eq!(remaining.load(Ordering::SeqCst), 0);
        assert_eq!(settled.payload, Some(Value::Int(42)));
        assert!(settled.suspended);
    }

    #[tokio::test]
    async fn test_cooperative_with_poll_interval() {
        let returned = Returned::cooperative(Countdown {
            remaining: Arc::new(AtomicUsize::new(2)),
            payload: None,
        });
        let declared = ReturnType::cooperative("UniTask", None);
        let settled = CompletionBridge::new(Some(Duration::from_millis(1)))
            .settle(CompletionPlan::Poll, &declared, returned)
            .await
            .unwrap();
        assert!(settled.payload.is_none());
    }

    #[test]
    fn test_poll_interval_is_kept_in_range() {
        assert_eq!(CompletionBridge::new(Some(Duration::ZERO)).poll_interval(), None);
        assert_eq!(
            CompletionBridge::new(Some(Duration::from_secs(30))).poll_interval(),
            Some(MAX_POLL_INTERVAL)
        );
        assert_eq!(
            CompletionBridge::new(Some(Duration::from_millis(5))).poll_interval(),
            Some(Duration::from_millis(5))
        );
        assert_eq!(CompletionBridge::new(None).poll_interval(), None);
    }

    #[tokio::test]
    async fn test_missing_awaiter_means_no_payload() {
        let declared = ReturnType::cooperative("UniTask", Some(ParamType::Int));
        let settled = bridge()
            .settle(CompletionPlan::Poll, &declared, Returned::cooperative(NoAwaiter))
            .await
            .unwrap();
        assert!(settled.payload.is_none());
    }

    #[tokio::test]
    async fn test_awaiter_without_accessors_means_no_payload() {
        let declared = ReturnType::cooperative("UniTask", Some(ParamType::Int));
        let settled = bridge()
            .settle(CompletionPlan::Poll, &declared, Returned::cooperative(BareTask))
            .await
            .unwrap();
        assert!(settled.payload.is_none());
    }

    #[tokio::test]
    async fn test_null_deferred_handle_is_immediate() {
        let settled = bridge()
            .settle(CompletionPlan::AwaitUnit, &ReturnType::task(), Returned::void())
            .await
            .unwrap();
        assert!(!settled.suspended);
    }

    #[tokio::test]
    async fn test_shape_mismatch() {
        let returned = Returned::deferred(async { Ok(()) });
        let err = bridge()
            .settle(CompletionPlan::Immediate, &ReturnType::value(ParamType::Int), returned)
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { .. }));
        assert!(err.to_string().contains("Int32"));
    }
}
