use thiserror::Error;

/// Category attached to every failure envelope produced by the engine.
pub const INVOCATION_ERROR: &str = "invocation_error";

/// Coarse classification of an [`InvocationError`].
///
/// Every kind is surfaced externally under [`INVOCATION_ERROR`]; the kind
/// exists so hosts and tests can tell the pipeline stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required request field was absent or malformed.
    Validation,
    /// Type not found, method not found, or method name ambiguous.
    Resolution,
    /// A parameter descriptor could not be converted.
    Conversion,
    /// The single fallback candidate declares a different parameter count.
    Arity,
    /// A supplied argument could not be coerced to the declared type.
    Coercion,
    /// The callee faulted while executing.
    InvocationFault,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("Required parameter '{0}' not provided")]
    MissingField(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Parameter at index {index} {problem}")]
    MalformedParameter { index: usize, problem: String },

    #[error("Type '{0}' not found")]
    TypeNotFound(String),

    #[error("Static method '{method}' not found in type '{type_name}'")]
    MethodNotFound { type_name: String, method: String },

    #[error("Multiple overloads found for '{method}':\n{}", bullet_list(.signatures))]
    AmbiguousMethod { method: String, signatures: Vec<String> },

    #[error("Parameter at index {index}: {reason}")]
    Conversion { index: usize, reason: String },

    #[error("Method '{method}' expects {expected} parameters, but {provided} provided")]
    Arity { method: String, expected: usize, provided: usize },

    #[error("Cannot convert parameter {index} to {target}: {reason}")]
    Coercion { index: usize, target: String, reason: String },

    #[error("Method execution failed: {0}")]
    Fault(String),

    #[error("Method execution failed: declared return type {declared} but the callable produced {produced}")]
    ShapeMismatch { declared: String, produced: String },
}

fn bullet_list(signatures: &[String]) -> String {
    signatures
        .iter()
        .map(|signature| format!("- {signature}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl InvocationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvocationError::MissingField(_)
            | InvocationError::InvalidRequest(_)
            | InvocationError::MalformedParameter { .. } => ErrorKind::Validation,
            InvocationError::TypeNotFound(_)
            | InvocationError::MethodNotFound { .. }
            | InvocationError::AmbiguousMethod { .. } => ErrorKind::Resolution,
            InvocationError::Conversion { .. } => ErrorKind::Conversion,
            InvocationError::Arity { .. } => ErrorKind::Arity,
            InvocationError::Coercion { .. } => ErrorKind::Coercion,
            InvocationError::Fault(_) | InvocationError::ShapeMismatch { .. } => {
                ErrorKind::InvocationFault
            }
        }
    }

    /// External category; identical for every variant.
    pub fn category(&self) -> &'static str {
        INVOCATION_ERROR
    }
}

pub type Result<T> = std::result::Result<T, InvocationError>;
