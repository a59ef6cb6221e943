//! Capability registry for host callables
//!
//! Hosts expose their types and static callables by registering them here
//! instead of relying on runtime introspection. This is the SINGLE place the
//! engine looks when resolving type and method names.
//!
//! # Structure
//!
//! - [`HostRegistry`] - ordered list of modules; the first is the primary module
//! - [`Module`] - a named group of types (the unit that gets "loaded")
//! - [`TypeDef`] - a namespace-qualified type with a [`Shape`] and methods
//! - [`MethodDef`] - one callable: name, declared signature and handler
//!
//! # Example
//!
//! ```
//! use hostcall_engine::registry::{HostRegistry, Module, TypeDef};
//! use hostcall_engine::runtime::{ParamType, ReturnType, Returned, Value};
//!
//! let math = TypeDef::class("Demo.Math").with_static(
//!     "Add",
//!     [ParamType::Int, ParamType::Int],
//!     ReturnType::value(ParamType::Int),
//!     |args| Ok(Returned::value(args.int(0)? + args.int(1)?)),
//! );
//!
//! let registry = HostRegistry::new().with_module(Module::new("Demo.Core").with_type(math));
//! assert!(registry.find("Demo.Math").is_some());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::runtime::completion::Returned;
use crate::runtime::types::{ParamType, ReturnType};
use crate::runtime::value::{Args, Fault};

/// Callable handle invoked with the converted arguments.
pub type Handler = Arc<dyn Fn(Args) -> Result<Returned, Fault> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    NonPublic,
}

#[derive(Clone)]
pub struct MethodDef {
    name: String,
    params: Vec<ParamType>,
    returns: ReturnType,
    is_static: bool,
    visibility: Visibility,
    handler: Handler,
}

impl MethodDef {
    pub fn new_static<F>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
        returns: ReturnType,
        handler: F,
    ) -> Self
    where
        F: Fn(Args) -> Result<Returned, Fault> + Send + Sync + 'static,
    {
        MethodDef {
            name: name.into(),
            params: params.into_iter().collect(),
            returns,
            is_static: true,
            visibility: Visibility::Public,
            handler: Arc::new(handler),
        }
    }

    /// An instance method; registered for completeness, never a candidate.
    pub fn new_instance<F>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
        returns: ReturnType,
        handler: F,
    ) -> Self
    where
        F: Fn(Args) -> Result<Returned, Fault> + Send + Sync + 'static,
    {
        MethodDef {
            is_static: false,
            ..MethodDef::new_static(name, params, returns, handler)
        }
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn returns(&self) -> &ReturnType {
        &self.returns
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// `Name(T1, T2)` with short parameter type names.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(ParamType::short_name)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, params)
    }

    pub fn invoke(&self, args: Args) -> Result<Returned, Fault> {
        (self.handler)(args)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("signature", &self.signature())
            .field("returns", &self.returns)
            .field("is_static", &self.is_static)
            .field("visibility", &self.visibility)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub discriminant: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: ParamType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        FieldDef {
            name: name.into(),
            ty,
        }
    }
}

/// Structural form of a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A holder of callables with no structural form.
    Class,
    Enum(Vec<EnumMember>),
    Record(Vec<FieldDef>),
}

#[derive(Debug, Clone)]
pub struct TypeDef {
    full_name: Arc<str>,
    shape: Shape,
    methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn class(full_name: impl Into<Arc<str>>) -> Self {
        TypeDef {
            full_name: full_name.into(),
            shape: Shape::Class,
            methods: Vec::new(),
        }
    }

    pub fn enumeration<S: Into<String>>(
        full_name: impl Into<Arc<str>>,
        members: impl IntoIterator<Item = (S, i64)>,
    ) -> Self {
        let members = members
            .into_iter()
            .map(|(name, discriminant)| EnumMember {
                name: name.into(),
                discriminant,
            })
            .collect();
        TypeDef {
            full_name: full_name.into(),
            shape: Shape::Enum(members),
            methods: Vec::new(),
        }
    }

    pub fn record(full_name: impl Into<Arc<str>>, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        TypeDef {
            full_name: full_name.into(),
            shape: Shape::Record(fields.into_iter().collect()),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_static<F>(
        self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamType>,
        returns: ReturnType,
        handler: F,
    ) -> Self
    where
        F: Fn(Args) -> Result<Returned, Fault> + Send + Sync + 'static,
    {
        self.with_method(MethodDef::new_static(name, params, returns, handler))
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Name without its namespace.
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or_default()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The parameter type naming this type.
    pub fn param_type(&self) -> ParamType {
        ParamType::Named(self.full_name.clone())
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    pub fn static_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|method| method.is_static())
    }
}

/// A named group of types.
///
/// Lookup by full name returns the first type registered under that name.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    types: Vec<TypeDef>,
    index: HashMap<String, usize>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            types: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.add_type(ty);
        self
    }

    pub fn add_type(&mut self, ty: TypeDef) {
        let position = self.types.len();
        self.index.entry(ty.full_name().to_string()).or_insert(position);
        self.types.push(ty);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, full_name: &str) -> Option<&TypeDef> {
        self.index.get(full_name).map(|&position| &self.types[position])
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }
}

#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    modules: Vec<Module>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// The module searched first by fully-qualified lookups.
    pub fn primary(&self) -> Option<&Module> {
        self.modules.first()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Finds a type by exact full name across all modules, in load order.
    pub fn find(&self, full_name: &str) -> Option<&TypeDef> {
        self.modules.iter().find_map(|module| module.get(full_name))
    }
}
