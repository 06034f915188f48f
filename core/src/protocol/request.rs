use serde_json::{Map, Value};

use crate::error::FrameError;

/// A decoded command envelope: the command name plus its other fields.
///
/// Field access is deliberately forgiving. A field that is absent, or
/// present with the wrong JSON type, yields the caller's default; a
/// malformed field never fails the whole request.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    cmd: String,
    fields: Map<String, Value>,
}

impl Request {
    /// Parse a payload into a request. The payload must be a JSON object
    /// with a string `cmd` field.
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| FrameError::InvalidPayload(e.to_string()))?;
        let Value::Object(mut fields) = value else {
            return Err(FrameError::InvalidPayload(
                "expected a JSON object".to_string(),
            ));
        };
        match fields.remove("cmd") {
            Some(Value::String(cmd)) => Ok(Self { cmd, fields }),
            _ => Err(FrameError::MissingCommand),
        }
    }

    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            fields: Map::new(),
        }
    }

    /// Builder used by tests and clients to add a field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// String field, or `default` when absent or not a string.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.opt_str(key).unwrap_or(default)
    }

    /// Non-empty string field.
    pub fn opt_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Integer field, `None` when absent or not an integer. Numeric strings
    /// do not count.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(as_int)
    }

    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.int(key).unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }

    /// A single integer or an array of integers. Any non-integer element
    /// makes the whole field read as absent.
    pub fn int_list(&self, key: &str) -> Option<Vec<i64>> {
        match self.fields.get(key)? {
            Value::Array(items) => items.iter().map(as_int).collect(),
            value => as_int(value).map(|n| vec![n]),
        }
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Request {
        Request::parse(json.as_bytes()).unwrap()
    }

    #[test]
    fn parses_command_and_fields() {
        let req = parse(r#"{"cmd":"peek","addr":1536,"len":4}"#);
        assert_eq!(req.cmd(), "peek");
        assert_eq!(req.int("addr"), Some(1536));
        assert_eq!(req.int_or("len", 1), 4);
    }

    #[test]
    fn rejects_non_object_and_missing_cmd() {
        assert!(matches!(
            Request::parse(b"[1,2]"),
            Err(FrameError::InvalidPayload(_))
        ));
        assert!(matches!(
            Request::parse(b"{\"cmd\":"),
            Err(FrameError::InvalidPayload(_))
        ));
        assert_eq!(
            Request::parse(br#"{"addr":1}"#),
            Err(FrameError::MissingCommand)
        );
        assert_eq!(
            Request::parse(br#"{"cmd":5}"#),
            Err(FrameError::MissingCommand)
        );
    }

    #[test]
    fn wrong_shape_falls_back_to_default() {
        let req = parse(r#"{"cmd":"run","frames":"60","fire":1,"path":7}"#);
        assert_eq!(req.int_or("frames", 1), 1);
        assert!(!req.bool_or("fire", false));
        assert_eq!(req.str_or("path", "none"), "none");
        assert_eq!(req.int_or("missing", 42), 42);
    }

    #[test]
    fn empty_string_reads_as_absent() {
        let req = parse(r#"{"cmd":"load","path":""}"#);
        assert_eq!(req.opt_str("path"), None);
    }

    #[test]
    fn int_list_accepts_scalar_or_array() {
        let req = parse(r#"{"cmd":"poke","a":7,"b":[1,2,3],"c":[1,"x"]}"#);
        assert_eq!(req.int_list("a"), Some(vec![7]));
        assert_eq!(req.int_list("b"), Some(vec![1, 2, 3]));
        assert_eq!(req.int_list("c"), None);
        assert_eq!(req.int_list("d"), None);
    }
}
