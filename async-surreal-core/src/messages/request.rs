// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

use surreal_types::{Object, Result, Value};

use super::PayloadFormat;

/// The RPC method names the client invokes. Names must match the server
/// bit-exact.
pub mod methods {
    #![allow(missing_docs)]

    pub const PING: &str = "ping";
    pub const VERSION: &str = "version";
    pub const USE: &str = "use";
    pub const SIGNIN: &str = "signin";
    pub const SIGNUP: &str = "signup";
    pub const AUTHENTICATE: &str = "authenticate";
    pub const INVALIDATE: &str = "invalidate";
    pub const INFO: &str = "info";
    pub const LET: &str = "let";
    pub const UNSET: &str = "unset";
    pub const QUERY: &str = "query";
    pub const SELECT: &str = "select";
    pub const CREATE: &str = "create";
    pub const INSERT: &str = "insert";
    pub const UPDATE: &str = "update";
    pub const UPSERT: &str = "upsert";
    pub const MERGE: &str = "merge";
    pub const PATCH: &str = "patch";
    pub const DELETE: &str = "delete";
    pub const RELATE: &str = "relate";
    pub const LIVE: &str = "live";
    pub const KILL: &str = "kill";
}

/// An outbound request envelope.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique within the connection lifetime.
    pub id: String,
    /// The RPC method, one of [`methods`].
    pub method: &'static str,
    /// Positional parameters; absent when the method takes none.
    pub params: Option<Vec<Value>>,
}

impl Request {
    /// Create a request with no parameters.
    pub fn new(id: impl Into<String>, method: &'static str) -> Self {
        Self {
            id: id.into(),
            method,
            params: None,
        }
    }

    /// Attach positional parameters.
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = Some(params);
        self
    }

    /// The envelope as a wire value.
    pub fn to_value(&self) -> Value {
        let mut map = Object::new();
        map.insert("id".to_string(), Value::Strand(self.id.clone()));
        map.insert("method".to_string(), Value::Strand(self.method.to_string()));
        if let Some(params) = &self.params {
            map.insert("params".to_string(), Value::Array(params.clone()));
        }
        Value::Object(map)
    }

    /// Serialize the envelope with the negotiated encoding.
    pub fn encode(&self, format: PayloadFormat) -> Result<Vec<u8>> {
        format.encode(&self.to_value())
    }
}
