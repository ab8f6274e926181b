//! In-process transport tests driving [`HttpApiServer::handle`]


use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{HeaderMap, Method, Request, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use ton_http_api_json_rpc::{GatewayError, MethodParams, NoParams, ParamKind, ParameterDescriptor};

use crate::server::{HttpApiServer, HttpApiServerBuilder};

#[derive(Deserialize)]
pub(crate) struct AddressParams {
    address: String,
}

impl MethodParams for AddressParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("address", ParamKind::String)
    }
}

#[derive(Deserialize)]
pub(crate) struct TransactionsParams {
    address: String,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    lt: Option<u64>,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    to_lt: u64,
    #[serde(default)]
    archival: bool,
}

fn default_limit() -> u32 {
    10
}

impl MethodParams for TransactionsParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
            .required("address", ParamKind::String)
            .optional("limit", ParamKind::OptionalInteger, 10)
            .nullable("lt", ParamKind::OptionalInteger)
            .nullable("hash", ParamKind::OptionalString)
            .optional("to_lt", ParamKind::OptionalInteger, 0)
            .optional("archival", ParamKind::Boolean, false)
    }
}

#[derive(Deserialize)]
pub(crate) struct BocParams {
    boc: String,
}

impl MethodParams for BocParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new().required("boc", ParamKind::String)
    }
}

pub(crate) const VALID_ADDRESS: &str = "EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N";

/// Builder preloaded with a handful of stub methods
pub(crate) fn test_builder() -> HttpApiServerBuilder {
    HttpApiServer::builder()
        .request_timeout(Duration::from_secs(2))
        .get("getAddressState", |p: AddressParams| async move {
            if p.address == VALID_ADDRESS {
                Ok("active")
            } else {
                Err(GatewayError::InvalidAddress)
            }
        })
        .get("getTransactions", |p: TransactionsParams| async move {
            Ok::<_, GatewayError>(json!({
                "address": p.address,
                "limit": p.limit,
                "lt": p.lt,
                "hash": p.hash,
                "to_lt": p.to_lt,
                "archival": p.archival,
            }))
        })
        .post("sendBoc", |p: BocParams| async move {
            if p.boc.is_empty() {
                Err(GatewayError::malformed("Empty boc"))
            } else {
                Ok(json!({"@type": "ok"}))
            }
        })
        .get("getMasterchainInfo", |_: NoParams| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, GatewayError>(json!({}))
        })
}

pub(crate) fn peer() -> SocketAddr {
    SocketAddr::from(([192, 0, 2, 10], 40000))
}

pub(crate) fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub(crate) fn post(uri: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Full::new(body.into()))
        .unwrap()
}

pub(crate) fn rpc(body: Value) -> Request<Full<Bytes>> {
    post("/api/v2/jsonRPC", body.to_string())
}

pub(crate) async fn send(
    server: &HttpApiServer,
    req: Request<Full<Bytes>>,
) -> (StatusCode, HeaderMap, Value) {
    let response = server.handle(req, Some(peer())).await;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}
