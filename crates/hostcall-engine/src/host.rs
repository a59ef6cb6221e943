//! Host collaborators
//!
//! The engine touches the host application through two narrow seams: the live
//! object graph searched by host-object parameters, and the sink receiving the
//! one informational line logged per invocation.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::runtime::value::{LiveObject, ObjectRef};

/// Lookup into the host's live object graph.
pub trait ObjectGraph: Send + Sync {
    /// Finds an object by its exact name.
    fn find_by_name(&self, name: &str) -> Option<ObjectRef>;

    /// Finds an object by absolute path, e.g. `/Root/Child`.
    fn find_by_path(&self, path: &str) -> Option<ObjectRef>;
}

/// An object graph with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyObjectGraph;

impl ObjectGraph for EmptyObjectGraph {
    fn find_by_name(&self, _name: &str) -> Option<ObjectRef> {
        None
    }

    fn find_by_path(&self, _path: &str) -> Option<ObjectRef> {
        None
    }
}

/// A node of an [`InMemoryObjectGraph`].
#[derive(Debug)]
pub struct SceneObject {
    name: String,
    path: String,
    instance_id: i64,
    active: AtomicBool,
}

impl SceneObject {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl LiveObject for SceneObject {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn instance_id(&self) -> i64 {
        self.instance_id
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A flat, thread-safe object graph keyed by slash-separated paths.
///
/// # Example
///
/// ```
/// use hostcall_engine::host::{InMemoryObjectGraph, ObjectGraph};
///
/// let scene = InMemoryObjectGraph::new();
/// scene.spawn("World/Player");
///
/// assert!(scene.find_by_name("Player").is_some());
/// assert!(scene.find_by_path("/World/Player").is_some());
/// assert!(scene.find_by_path("/Player").is_none());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryObjectGraph {
    objects: RwLock<Vec<Arc<SceneObject>>>,
    next_id: AtomicI64,
}

impl InMemoryObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an active object at `path`; its name is the last path segment.
    pub fn spawn(&self, path: &str) -> Arc<SceneObject> {
        let trimmed = path.trim_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or_default().to_string();
        let object = Arc::new(SceneObject {
            name,
            path: format!("/{trimmed}"),
            instance_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            active: AtomicBool::new(true),
        });

        let mut objects = self.objects.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        objects.push(Arc::clone(&object));
        object
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<SceneObject>>> {
        self.objects.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn find(&self, matches: impl Fn(&SceneObject) -> bool) -> Option<ObjectRef> {
        self.read()
            .iter()
            .find(|object| matches(object))
            .map(|object| Arc::clone(object) as ObjectRef)
    }
}

impl ObjectGraph for InMemoryObjectGraph {
    fn find_by_name(&self, name: &str) -> Option<ObjectRef> {
        self.find(|object| object.name == name)
    }

    fn find_by_path(&self, path: &str) -> Option<ObjectRef> {
        self.find(|object| object.path == path)
    }
}

/// Receives the informational line logged once per invocation.
pub trait LogSink: Send + Sync {
    fn info(&self, line: &str);
}

/// Forwards invocation lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn info(&self, line: &str) {
        tracing::info!("{}", line);
    }
}
