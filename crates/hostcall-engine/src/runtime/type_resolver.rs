//! Type name resolution
//!
//! Resolves a possibly-namespaced type name against the [`HostRegistry`].
//!
//! # Resolution Order
//!
//! 1. Exact lookup: `Namespace.Type, Module` inside the named module, or
//!    `Namespace.Type` inside the primary module
//! 2. Exact full-name scan across every loaded module, in load order
//! 3. Bare-name scan (no `.` in the name) across every module; the first type
//!    whose last name segment matches wins
//!
//! Step 3 does not detect ambiguity: when two modules register `A.Widget` and
//! `B.Widget`, `"Widget"` silently resolves to whichever was loaded first.

use crate::registry::{HostRegistry, TypeDef};

pub struct TypeResolver<'a> {
    registry: &'a HostRegistry,
    bare_name_lookup: bool,
}

impl<'a> TypeResolver<'a> {
    pub fn new(registry: &'a HostRegistry, bare_name_lookup: bool) -> Self {
        Self {
            registry,
            bare_name_lookup,
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&'a TypeDef> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Some(found) = self.exact(name) {
            tracing::debug!("Resolved type {} by exact lookup", found.full_name());
            return Some(found);
        }

        let full_name = strip_module(name);
        if let Some(found) = self.registry.find(full_name) {
            tracing::debug!("Resolved type {} by module scan", found.full_name());
            return Some(found);
        }

        if self.bare_name_lookup && !full_name.contains('.') {
            let found = self
                .registry
                .modules()
                .iter()
                .flat_map(|module| module.types())
                .find(|ty| ty.name() == full_name);
            if let Some(found) = found {
                tracing::debug!("Resolved bare name {} to {}", full_name, found.full_name());
                return Some(found);
            }
        }

        None
    }

    fn exact(&self, name: &str) -> Option<&'a TypeDef> {
        match name.split_once(',') {
            Some((full_name, module)) => self
                .registry
                .module(module.trim())
                .and_then(|module| module.get(full_name.trim())),
            None => self.registry.primary().and_then(|module| module.get(name)),
        }
    }
}

fn strip_module(name: &str) -> &str {
    name.split_once(',').map_or(name, |(full_name, _)| full_name.trim())
}
