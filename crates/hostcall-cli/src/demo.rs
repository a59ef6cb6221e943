//! Demo host exposed by the `hostcall` binary.
//!
//! A small scene plus a handful of callables covering every completion shape:
//! immediate values, void, deferred tasks with and without a payload, and a
//! cooperative awaitable polled through its awaiter.

use hostcall_engine::registry::{FieldDef, HostRegistry, Module, TypeDef};
use hostcall_engine::runtime::{
    Awaiter, CooperativeTask, Fault, ObjectRef, ParamType, ReturnType, Returned, Value,
};
use hostcall_engine::{Engine, EngineConfig, InMemoryObjectGraph, ObjectGraph, SceneObject};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const MODULE: &str = "Demo.Runtime";

/// Builds the demo scene with a few well-known objects.
pub fn scene() -> Arc<InMemoryObjectGraph> {
    let scene = InMemoryObjectGraph::new();
    scene.spawn("Main Camera");
    scene.spawn("Directional Light");
    scene.spawn("World/Player");
    scene.spawn("World/Props/Crate");
    Arc::new(scene)
}

/// An engine over the demo registry and a fresh demo scene.
pub fn engine(config: EngineConfig) -> Engine {
    let scene = scene();
    Engine::new(registry(scene.clone()))
        .with_object_graph(scene)
        .with_config(config)
}

pub fn registry(scene: Arc<InMemoryObjectGraph>) -> HostRegistry {
    let module = Module::new(MODULE)
        .with_type(math())
        .with_type(asynchronous())
        .with_type(debug())
        .with_type(scene_type(scene))
        .with_type(TypeDef::enumeration(
            "Demo.PrimitiveType",
            [("Sphere", 0), ("Capsule", 1), ("Cylinder", 2), ("Cube", 3), ("Plane", 4), ("Quad", 5)],
        ))
        .with_type(TypeDef::record(
            "Demo.SpawnSettings",
            [
                FieldDef::new("name", ParamType::String),
                FieldDef::new("shape", ParamType::named("Demo.PrimitiveType")),
                FieldDef::new("position", ParamType::Vector3),
            ],
        ));
    HostRegistry::new().with_module(module)
}

fn math() -> TypeDef {
    TypeDef::class("Demo.Math")
        .with_static(
            "Add",
            [ParamType::Int, ParamType::Int],
            ReturnType::value(ParamType::Int),
            |args| {
                let sum = args
                    .int(0)?
                    .checked_add(args.int(1)?)
                    .ok_or_else(|| Fault::new("Arithmetic operation resulted in an overflow."))?;
                Ok(Returned::value(sum))
            },
        )
        .with_static(
            "Multiply",
            [ParamType::Float, ParamType::Float],
            ReturnType::value(ParamType::Float),
            |args| Ok(Returned::value(args.float(0)? * args.float(1)?)),
        )
        .with_static(
            "Divide",
            [ParamType::Int, ParamType::Int],
            ReturnType::value(ParamType::Int),
            |args| {
                let divisor = args.int(1)?;
                if divisor == 0 {
                    return Err(Fault::new("Attempted to divide by zero."));
                }
                Ok(Returned::value(args.int(0)? / divisor))
            },
        )
        .with_static(
            "Clamp",
            [ParamType::Double, ParamType::Double, ParamType::Double],
            ReturnType::value(ParamType::Double),
            |args| {
                let (value, min, max) = (args.double(0)?, args.double(1)?, args.double(2)?);
                if min > max {
                    return Err(Fault::new(format!("min {min} is greater than max {max}")));
                }
                Ok(Returned::value(value.clamp(min, max)))
            },
        )
}

fn asynchronous() -> TypeDef {
    TypeDef::class("Demo.Async")
        .with_static("TestSimpleAsync", [], ReturnType::task(), |_| {
            Ok(Returned::deferred(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                tracing::info!("TestSimpleAsync finished");
                Ok(())
            }))
        })
        .with_static(
            "TestAsyncWithReturn",
            [ParamType::Int],
            ReturnType::task_of(ParamType::Int),
            |args| {
                let value = args.int(0)?;
                Ok(Returned::deferred_value(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Value::Int(value.wrapping_mul(value)))
                }))
            },
        )
        .with_static(
            "CalculateAsync",
            [ParamType::Int, ParamType::Int],
            ReturnType::task_of(ParamType::Int),
            |args| {
                let (a, b) = (args.int(0)?, args.int(1)?);
                Ok(Returned::deferred_value(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    a.checked_add(b)
                        .map(Value::Int)
                        .ok_or_else(|| Fault::new("Arithmetic operation resulted in an overflow."))
                }))
            },
        )
        .with_static(
            "TestSync",
            [ParamType::String],
            ReturnType::value(ParamType::String),
            |args| Ok(Returned::value(format!("Sync: {}", args.string(0)?))),
        )
        .with_static(
            "CooperativeCount",
            [ParamType::Int],
            ReturnType::cooperative("UniTask", Some(ParamType::Int)),
            |args| {
                let polls = args.int(0)?;
                if polls < 0 {
                    return Err(Fault::new(format!("poll count must not be negative (got {polls})")));
                }
                Ok(Returned::cooperative(Countdown { polls }))
            },
        )
}

fn debug() -> TypeDef {
    TypeDef::class("Demo.Debug")
        .with_static("Log", [ParamType::String], ReturnType::Void, |args| {
            tracing::info!("{}", args.string(0)?);
            Ok(Returned::void())
        })
        .with_static("Log", [ParamType::Any], ReturnType::Void, |args| {
            tracing::info!("{}", args.value(0)?);
            Ok(Returned::void())
        })
}

fn scene_type(scene: Arc<InMemoryObjectGraph>) -> TypeDef {
    let spawner = scene.clone();
    TypeDef::class("Demo.Scene")
        .with_static(
            "Describe",
            [ParamType::HostObject],
            ReturnType::value(ParamType::HostObject),
            |args| Ok(Returned::value(Value::Object(args.object(0)?))),
        )
        .with_static(
            "SetActive",
            [ParamType::HostObject, ParamType::Bool],
            ReturnType::value(ParamType::Bool),
            |args| {
                let object = args
                    .object(0)?
                    .ok_or_else(|| Fault::new("Object reference not set to an instance of an object."))?;
                let node = object
                    .as_any()
                    .downcast_ref::<SceneObject>()
                    .ok_or_else(|| Fault::new(format!("{} is not a scene object", object.name())))?;
                node.set_active(args.bool(1)?);
                Ok(Returned::value(object.is_active()))
            },
        )
        .with_static(
            "Find",
            [ParamType::String],
            ReturnType::value(ParamType::HostObject),
            move |args| Ok(Returned::value(Value::Object(scene.find_by_name(args.string(0)?)))),
        )
        .with_static(
            "Spawn",
            [ParamType::named("Demo.SpawnSettings")],
            ReturnType::value(ParamType::HostObject),
            move |args| {
                let settings = args.record(0)?;
                let name = match settings.field("name") {
                    Some(Value::String(name)) if !name.is_empty() => name.clone(),
                    _ => return Err(Fault::new("SpawnSettings.name must not be empty")),
                };
                let object: ObjectRef = spawner.spawn(&format!("World/{name}"));
                Ok(Returned::value(Value::Object(Some(object))))
            },
        )
}

/// Cooperative awaitable that completes after a fixed number of polls and
/// yields that number.
struct Countdown {
    polls: i32,
}

impl CooperativeTask for Countdown {
    fn awaiter(self: Box<Self>) -> Option<Box<dyn Awaiter>> {
        Some(Box::new(CountdownAwaiter {
            total: self.polls,
            remaining: AtomicUsize::new(self.polls.unsigned_abs() as usize),
        }))
    }
}

struct CountdownAwaiter {
    total: i32,
    remaining: AtomicUsize,
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

    fn result(&mut self) -> Option<Result<Value, Fault>> {
        Some(Ok(Value::Int(self.total)))
    }
}
