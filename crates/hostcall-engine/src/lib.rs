//! hostcall Engine
//!
//! This crate provides the dynamic invocation engine: it lets a controller
//! call static callables of a running host by name, with loosely-typed
//! parameter descriptors, and get back one normalized response even when the
//! callable completes asynchronously.
//!
//! Hosts describe what can be called by filling a [`HostRegistry`]; the
//! [`Engine`] resolves, converts, invokes, awaits and marshals.

pub mod config;
pub mod engine;
pub mod host;
pub mod registry;
pub mod runtime;

pub use config::EngineConfig;
pub use engine::Engine;
pub use host::{EmptyObjectGraph, InMemoryObjectGraph, LogSink, ObjectGraph, SceneObject, TracingLogSink};
pub use registry::{HostRegistry, MethodDef, Module, Shape, TypeDef};
