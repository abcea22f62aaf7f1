//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON document except `null`
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
///
/// Fields are checked by the engine, not here, so rejected requests are
/// counted like any other failed call.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Query string for DELETE /clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearQuery {
    /// Restricts the clear to keys starting with this prefix
    pub prefix: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"name": "Ada"}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"name": "Ada"}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_set_request_keeps_null_value() {
        let json = r#"{"key": "k", "value": null}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert!(req.value.is_null());
    }

    #[test]
    fn test_set_request_missing_key_fails() {
        let result: Result<SetRequest, _> = serde_json::from_str(r#"{"value": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_clear_query_defaults_to_no_prefix() {
        let query: ClearQuery = serde_json::from_str("{}").unwrap();
        assert!(query.prefix.is_none());
    }
}
