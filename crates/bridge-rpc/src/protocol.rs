//! JSON-RPC 2.0 envelope validation and construction.
//!
//! Requests are validated from loosely parsed `serde_json::Value` frames so
//! the client's `id` can be echoed verbatim whether it is a string or a
//! number, and so a request without an `id` field (a notification) can be
//! told apart from `id: null`.

use serde_json::{json, Map, Value};

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// A validated inbound request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Echoed verbatim in the response; `None` for notifications.
    pub id: Option<Value>,
    pub method: String,
    pub params: Map<String, Value>,
}

/// Outcome of validating one parsed frame.
#[derive(Debug)]
pub enum Inbound {
    Call(Request),
    /// The frame was structurally invalid; reply with this error.
    Invalid {
        id: Value,
        code: i64,
        message: String,
    },
}

/// Applies the JSON-RPC validation ladder to one parsed frame.
pub fn validate(frame: Value) -> Inbound {
    let Value::Object(object) = frame else {
        return Inbound::Invalid {
            id: Value::Null,
            code: error_codes::INVALID_REQUEST,
            message: "request must be a JSON object".to_string(),
        };
    };

    let id = object.get("id").cloned();
    let reply_id = id.clone().unwrap_or(Value::Null);

    if let Some(version) = object.get("jsonrpc") {
        if version != "2.0" {
            return Inbound::Invalid {
                id: reply_id,
                code: error_codes::INVALID_REQUEST,
                message: "unsupported jsonrpc version".to_string(),
            };
        }
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if method.is_empty() {
        return Inbound::Invalid {
            id: reply_id,
            code: error_codes::INVALID_REQUEST,
            message: "method is required".to_string(),
        };
    }

    let params = match object.get("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Inbound::Invalid {
                id: reply_id,
                code: error_codes::INVALID_PARAMS,
                message: "params must be an object".to_string(),
            }
        }
    };

    Inbound::Call(Request {
        id,
        method: method.to_string(),
        params,
    })
}

/// A successful response echoing the client's id.
pub fn success(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// An error response echoing the client's id (or `null`).
pub fn error(id: &Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// A server-initiated notification; notifications carry no id.
pub fn notification(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params })
}
