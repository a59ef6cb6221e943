pub mod completion;
pub mod conversions;
pub mod method_resolver;
pub mod results;
pub mod type_resolver;
pub mod types;
pub mod value;


pub use completion::{Awaiter, CompletionBridge, CompletionPlan, CooperativeTask, Deferred, Returned, Settled};
pub use conversions::{builtin_tag, ConversionError, Converted, ParameterMarshaller};
pub use method_resolver::{MethodResolver, ResolvedCall};
pub use results::{marshal_result, return_type_name};
pub use type_resolver::TypeResolver;
pub use types::{DeferredShape, ParamType, ReturnType};
pub use value::{
    Args, Color, EnumValue, Fault, LiveObject, ObjectRef, RecordValue, Serializable, Structured,
    Value, Vector2, Vector3,
};
