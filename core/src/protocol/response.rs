use serde::Serialize;
use serde_json::{Map, Value};

use super::codec::encode_frame;

/// A response object. `status` is always the first key; error responses
/// carry `msg`.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    body: Map<String, Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self::with_status("ok")
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::with_status("error").with("msg", msg.into())
    }

    fn with_status(status: &str) -> Self {
        let mut body = Map::new();
        body.insert("status".to_string(), Value::from(status));
        Self { body }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }

    /// Add a field holding any serializable value.
    pub fn with_serialized<T: Serialize>(self, key: &str, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.with(key, value)
    }

    /// Append every field of a serializable struct, in declaration order.
    pub fn merge<T: Serialize>(mut self, fields: &T) -> Self {
        if let Ok(Value::Object(map)) = serde_json::to_value(fields) {
            self.body.extend(map);
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.body.get("status").and_then(Value::as_str) == Some("ok")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_default()
    }

    /// Length-prefixed wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.to_json().as_bytes())
    }
}
