use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keeps `"id": null` distinct from an absent `id`.
///
/// With a plain `Option<Value>` serde collapses both into `None`; here an
/// explicit null becomes `Some(Value::Null)` and only absence is `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// `"params": null` reads as no parameters
fn deserialize_params<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A JSON-RPC call as accepted by the single JSON-RPC endpoint.
///
/// `jsonrpc` and other unknown members are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub method: String,
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, params: Map<String, Value>, id: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            id,
        }
    }

    /// Parse a request envelope from a raw body
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// The uniform `{ok, result|error, code, id?}` body shared by both transports.
///
/// `result` is present iff `ok`, `error` iff not. `id` is only ever set on the
/// JSON-RPC path, where it is echoed verbatim (an explicit null included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub ok: bool,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
}

impl ResponseEnvelope {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            code: None,
            id: None,
        }
    }

    pub fn failure(error: impl Into<String>, code: u16) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
            code: Some(code),
            id: None,
        }
    }

    /// Attach the JSON-RPC correlation id, replacing any previous one
    pub fn with_id(mut self, id: Option<Value>) -> Self {
        self.id = id;
        self
    }

    pub fn is_error(&self) -> bool {
        !self.ok
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_value};

    #[test]
    fn test_request_parsing() {
        let request = RequestEnvelope::parse(
            br#"{"jsonrpc":"2.0","method":"getAddressState","params":{"address":"EQ"},"id":1}"#,
        )
        .unwrap();

        assert_eq!(request.method, "getAddressState");
        assert_eq!(request.get_param("address"), Some(&json!("EQ")));
        assert_eq!(request.id, Some(json!(1)));
    }

    #[test]
    fn test_request_id_null_and_absent() {
        let with_null: RequestEnvelope = from_str(r#"{"method":"m","id":null}"#).unwrap();
        assert_eq!(with_null.id, Some(Value::Null));

        let absent: RequestEnvelope = from_str(r#"{"method":"m"}"#).unwrap();
        assert_eq!(absent.id, None);
        assert!(absent.params.is_empty());
    }

    #[test]
    fn test_null_params_read_as_empty() {
        let request: RequestEnvelope =
            from_str(r#"{"method":"getMasterchainInfo","params":null,"id":3}"#).unwrap();
        assert!(request.params.is_empty());
        assert_eq!(request.id, Some(json!(3)));
    }

    #[test]
    fn test_request_rejects_positional_params() {
        assert!(RequestEnvelope::parse(br#"{"method":"m","params":[1,2],"id":1}"#).is_err());
        assert!(RequestEnvelope::parse(br#"{"params":{},"id":1}"#).is_err());
    }

    #[test]
    fn test_success_envelope_shape() {
        let envelope = ResponseEnvelope::success(json!("active"));
        assert_eq!(envelope.error, None);
        assert_eq!(envelope.code, None);
        assert_eq!(to_value(&envelope).unwrap(), json!({"ok": true, "result": "active"}));
    }

    #[test]
    fn test_null_id_is_serialized() {
        let envelope = ResponseEnvelope::success(json!(1)).with_id(Some(Value::Null));
        assert_eq!(
            to_value(&envelope).unwrap(),
            json!({"ok": true, "result": 1, "id": null})
        );

        let parsed: ResponseEnvelope = from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed.id, Some(Value::Null));
    }

    #[test]
    fn test_null_result_is_kept() {
        let envelope = ResponseEnvelope::success(Value::Null);
        assert_eq!(to_value(&envelope).unwrap(), json!({"ok": true, "result": null}));
    }

    #[test]
    fn test_failure_envelope_shape() {
        let envelope = ResponseEnvelope::failure("Incorrect address", 416);
        assert!(envelope.is_error());
        assert_eq!(
            to_value(&envelope).unwrap(),
            json!({"ok": false, "error": "Incorrect address", "code": 416})
        );
    }
}
