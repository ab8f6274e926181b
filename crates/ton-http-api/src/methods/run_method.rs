//! Get-method execution against a contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ton_http_api_json_rpc::prelude::*;
use ton_http_api_server::HttpApiServerBuilder;

use super::{ApiContext, with_context};
use crate::address::prepare_address;
use crate::client::GetMethodId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunGetMethodParams {
    pub address: String,
    /// Method name or numeric id
    pub method: GetMethodId,
    /// Entries as `[type, value]` pairs
    pub stack: Vec<Value>,
}

impl MethodParams for RunGetMethodParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
            .required("address", ParamKind::String)
            .required("method", ParamKind::Any)
            .required("stack", ParamKind::Array)
    }
}

impl GetMethodId {
    /// Names made of digits select the method by id
    fn normalized(self) -> Self {
        match self {
            GetMethodId::Name(name) => match name.parse::<i64>() {
                Ok(id) => GetMethodId::Id(id),
                Err(_) => GetMethodId::Name(name),
            },
            id => id,
        }
    }
}

pub fn register(builder: HttpApiServerBuilder, ctx: &Arc<ApiContext>) -> HttpApiServerBuilder {
    builder.post("runGetMethod", with_context(ctx, run_get_method))
}

pub async fn run_get_method(
    ctx: Arc<ApiContext>,
    params: RunGetMethodParams,
) -> Result<Value, GatewayError> {
    let address = prepare_address(&params.address)?;
    Ok(ctx
        .client
        .raw_run_method(&address, params.method.normalized(), params.stack)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::test_support::assert_defaults_agree;
    use serde_json::json;

    #[test]
    fn test_defaults_agree() {
        assert_defaults_agree::<RunGetMethodParams>(json!({
            "address": "EQ",
            "method": "seqno",
            "stack": []
        }));
    }

    #[test]
    fn test_method_id_normalization() {
        assert_eq!(
            GetMethodId::Name("85143".into()).normalized(),
            GetMethodId::Id(85143)
        );
        assert_eq!(
            GetMethodId::Name("get_public_key".into()).normalized(),
            GetMethodId::Name("get_public_key".into())
        );
        assert_eq!(GetMethodId::Id(7).normalized(), GetMethodId::Id(7));
    }
}
