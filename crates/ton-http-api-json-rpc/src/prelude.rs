//! Common re-exports for method implementations.
//!
//! ```rust
//! use ton_http_api_json_rpc::prelude::*;
//! ```

pub use crate::envelope::{RequestEnvelope, ResponseEnvelope};
pub use crate::error::{GatewayError, NormalizeError};
pub use crate::params::{MethodParams, NoParams, ParamKind, ParameterDescriptor};
pub use crate::registry::{MethodRegistry, RegisteredMethod, RegistryBuilder};
