pub mod error;
pub mod requests;
pub mod responses;


pub use error::{ErrorKind, InvocationError, Result, INVOCATION_ERROR};
pub use requests::{InvocationRequest, ParameterDescriptor};
pub use responses::{ErrorEnvelopeFactory, InvocationResponse, StandardErrorEnvelope};
