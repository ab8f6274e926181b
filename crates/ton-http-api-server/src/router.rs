//! REST bindings: one fixed path and verb per business method.
//!
//! REST arguments never go through the JSON-RPC normalizer. Query strings
//! are typed here from the method's descriptor; absent parameters are left
//! to the serde defaults of the method's parameter struct.

use std::collections::HashMap;

use hyper::Method;
use serde_json::{Map, Value};
use ton_http_api_json_rpc::params::parse_integer;
use ton_http_api_json_rpc::{GatewayError, ParamKind, ParameterDescriptor};

/// Where a route takes its arguments from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Query,
    JsonBody,
}

#[derive(Debug, Clone)]
pub struct RestRoute {
    pub method_name: String,
    pub verb: Method,
    pub binding: Binding,
}

/// Path table for the REST side of the server
#[derive(Debug, Clone, Default)]
pub struct RestRouter {
    routes: HashMap<String, RestRoute>,
}

impl RestRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the route at `path`
    pub fn insert(&mut self, path: impl Into<String>, route: RestRoute) -> Option<RestRoute> {
        self.routes.insert(path.into(), route)
    }

    /// Drop every route bound to `method_name`
    pub fn remove_method(&mut self, method_name: &str) {
        self.routes.retain(|_, route| route.method_name != method_name);
    }

    pub fn lookup(&self, path: &str) -> Option<&RestRoute> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.routes.keys().cloned().collect();
        paths.sort();
        paths
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn typed_query_value(name: &str, kind: ParamKind, text: &str) -> Result<Value, GatewayError> {
    match kind {
        ParamKind::Integer | ParamKind::OptionalInteger => parse_integer(text)
            .map(Value::Number)
            .ok_or_else(|| {
                GatewayError::validation(format!("value is not a valid integer for '{name}'"))
            }),
        ParamKind::Boolean => parse_bool(text).map(Value::Bool).ok_or_else(|| {
            GatewayError::validation(format!("value could not be parsed to a boolean for '{name}'"))
        }),
        ParamKind::Any => Ok(parse_integer(text)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string()))),
        ParamKind::Object | ParamKind::OptionalObject | ParamKind::Array => {
            serde_json::from_str(text).map_err(|err| {
                GatewayError::validation(format!("invalid JSON for '{name}': {err}"))
            })
        }
        ParamKind::String | ParamKind::OptionalString => Ok(Value::String(text.to_string())),
    }
}

/// Bind a raw query string against a descriptor.
///
/// Only declared parameters are kept; a repeated key keeps its last value.
pub fn bind_query(
    descriptor: &ParameterDescriptor,
    query: Option<&str>,
) -> Result<Map<String, Value>, GatewayError> {
    let mut args = Map::new();
    let Some(query) = query else {
        return Ok(args);
    };

    for (name, text) in url::form_urlencoded::parse(query.as_bytes()) {
        let Some(spec) = descriptor.get(&name) else {
            continue;
        };
        let value = typed_query_value(&spec.name, spec.kind, &text)?;
        args.insert(spec.name.clone(), value);
    }
    Ok(args)
}

/// Bind a JSON request body. An empty body binds as no arguments.
pub fn bind_json_body(body: &[u8]) -> Result<Map<String, Value>, GatewayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body).map_err(GatewayError::validation)? {
        Value::Object(args) => Ok(args),
        _ => Err(GatewayError::validation("request body must be a JSON object")),
    }
}
