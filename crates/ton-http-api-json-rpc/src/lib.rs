//! # Dual-protocol method dispatch
//!
//! Transport-agnostic core shared by the REST and JSON-RPC entry points of
//! the TON HTTP API gateway.
//!
//! - [`registry`]: write-once mapping from method name to business function
//!   and its [`ParameterDescriptor`]
//! - [`params`]: static parameter metadata and the JSON-RPC normalizer
//! - [`invoke`]: deadline-bounded invocation producing the success envelope
//! - [`dispatch`]: the single JSON-RPC endpoint logic
//! - [`error`]: the one place errors become envelopes and status codes

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod invoke;
pub mod params;
pub mod prelude;
pub mod registry;

pub use dispatch::{DispatchOutcome, JsonRpcDispatcher, invoke_method};
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use error::{GatewayError, NormalizeError, status_codes};
pub use invoke::{DEFAULT_REQUEST_TIMEOUT, Invoker};
pub use params::{
    MethodParams, NoParams, ParamDefault, ParamKind, ParamSpec, ParameterDescriptor, normalize,
};
pub use registry::{FnHandler, MethodHandler, MethodRegistry, RegisteredMethod, RegistryBuilder};
