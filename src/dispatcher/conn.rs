use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::RequestId;
use crate::router::{ParamVec, PrivateData};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage; names are shared `Arc<str>`
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Per-request context threaded through pipes and handlers.
///
/// The router reads `method`, `host` and `path`; dispatch writes
/// `path_params` and merges route private data into `private`. Everything
/// else belongs to pipes and handlers.
#[derive(Debug, Clone)]
pub struct Conn {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Value of the Host header
    pub host: String,
    /// Request path (without query string)
    pub path: String,
    /// Request headers
    pub req_headers: HeaderVec,
    /// Path parameters bound by the matched route
    pub path_params: ParamVec,
    /// Framework-private data; route private data is merged in here
    pub private: PrivateData,
    /// Application data set by pipes for handlers
    pub assigns: HashMap<String, Value>,
    /// Response status, once something has set one
    pub status: Option<u16>,
    /// Response headers
    pub resp_headers: HeaderVec,
    /// Response body
    pub resp_body: Option<Value>,
    /// Set by a pipe to stop the rest of the chain
    pub halted: bool,
}

impl Conn {
    /// Create a context for an incoming request
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            host: host.into(),
            path: path.into(),
            req_headers: HeaderVec::new(),
            path_params: ParamVec::new(),
            private: PrivateData::new(),
            assigns: HashMap::new(),
            status: None,
            resp_headers: HeaderVec::new(),
            resp_body: None,
            halted: false,
        }
    }

    /// Add a request header; an `x-request-id` header becomes the request id
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.req_headers.push((Arc::from(name), value));
        self
    }

    /// Get a request header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.req_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a bound path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Merge route private data. Keys from `data` overwrite, all other keys
    /// already on the request are kept. Applying the same data twice is a no-op.
    pub fn merge_private(&mut self, data: &PrivateData) {
        self.private
            .extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Set one private key
    pub fn put_private(&mut self, key: impl Into<String>, value: Value) {
        self.private.insert(key.into(), value);
    }

    /// Set one assign
    pub fn assign(&mut self, key: impl Into<String>, value: Value) {
        self.assigns.insert(key.into(), value);
    }

    /// Set status and body
    #[must_use]
    pub fn send(mut self, status: u16, body: Value) -> Self {
        self.status = Some(status);
        self.resp_body = Some(body);
        self
    }

    /// Add or replace a response header
    pub fn put_resp_header(&mut self, name: &str, value: impl Into<String>) {
        self.resp_headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.resp_headers.push((Arc::from(name), value.into()));
    }

    /// Get a response header by name
    #[must_use]
    pub fn get_resp_header(&self, name: &str) -> Option<&str> {
        self.resp_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Stop the chain: no inner pipe or handler runs after this
    #[must_use]
    pub fn halt(mut self) -> Self {
        self.halted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_private_keeps_existing_keys() {
        let mut conn = Conn::new(Method::GET, "example.com", "/");
        conn.put_private("b", json!(2));
        let route_private: PrivateData = [("a".to_string(), json!(1))].into_iter().collect();

        conn.merge_private(&route_private);
        assert_eq!(conn.private.len(), 2);
        assert_eq!(conn.private["a"], json!(1));
        assert_eq!(conn.private["b"], json!(2));

        let before = conn.private.clone();
        conn.merge_private(&route_private);
        assert_eq!(conn.private, before);
    }

    #[test]
    fn test_merge_private_route_wins() {
        let mut conn = Conn::new(Method::GET, "example.com", "/");
        conn.put_private("layout", json!("app"));
        let route_private: PrivateData =
            [("layout".to_string(), json!("admin"))].into_iter().collect();
        conn.merge_private(&route_private);
        assert_eq!(conn.private["layout"], json!("admin"));
    }

    #[test]
    fn test_request_id_header() {
        let id = RequestId::new();
        let conn = Conn::new(Method::GET, "h", "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(conn.request_id, id);
        assert_eq!(conn.get_header("x-request-id"), Some(id.to_string().as_str()));
    }
}
