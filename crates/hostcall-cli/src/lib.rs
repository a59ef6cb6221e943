//! # hostcall CLI
//!
//! Command-line driver for the hostcall invocation engine.
//!
//! The binary loads the [`demo`] host, feeds it one request envelope and
//! prints the response envelope as JSON. Requests come either from a file or
//! from `--type`/`--method`/`--params` flags, which are assembled into the
//! same envelope shape by [`build_request`].

pub mod cli;
pub mod demo;

use anyhow::{Context, Result};
use hostcall_engine::{HostRegistry, Shape};
use serde_json::{json, Value as JsonValue};
use std::path::Path;

/// Assembles a request envelope from command-line pieces.
///
/// `params` is a JSON array of `{"type": ..., "value": ...}` descriptors.
/// When absent the request carries no parameters.
///
/// # Errors
///
/// Returns an error if `params` is not valid JSON or is not an array.
pub fn build_request(type_name: &str, method_name: &str, params: Option<&str>) -> Result<JsonValue> {
    let parameters = match params {
        Some(raw) => {
            let parsed: JsonValue =
                serde_json::from_str(raw).context("--params must be valid JSON")?;
            if !parsed.is_array() {
                anyhow::bail!("--params must be a JSON array of parameter descriptors");
            }
            parsed
        }
        None => json!([]),
    };

    Ok(json!({
        "typeName": type_name,
        "methodName": method_name,
        "parameters": parameters,
    }))
}

/// Reads a request envelope from a JSON file.
pub fn read_request(path: &Path) -> Result<JsonValue> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("request file {} is not valid JSON", path.display()))
}

/// One line per registered type, followed by its static signatures.
pub fn describe_registry(registry: &HostRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    for module in registry.modules() {
        for ty in module.types() {
            let kind = match ty.shape() {
                Shape::Class => "class".to_string(),
                Shape::Enum(members) => {
                    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
                    format!("enum {{{}}}", names.join(", "))
                }
                Shape::Record(fields) => {
                    let names: Vec<String> = fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, f.ty.short_name()))
                        .collect();
                    format!("record {{{}}}", names.join(", "))
                }
            };
            lines.push(format!("{} ({}) {}", ty.full_name(), module.name(), kind));
            for method in ty.static_methods() {
                lines.push(format!("    {} -> {}", method.signature(), method.returns()));
            }
        }
    }
    lines
}
