use serde_json::json;
use tracing::warn;

use crate::dispatcher::{Conn, Pipe};

/// Halts with 401 unless the `authorization` header equals the configured
/// token. On success the token's subject is assigned as `current_user`.
pub struct AuthPipe {
    token: String,
    subject: String,
}

impl AuthPipe {
    /// Accept requests carrying `token`, identifying them as `subject`
    pub fn new(token: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subject: subject.into(),
        }
    }
}

impl Pipe for AuthPipe {
    fn name(&self) -> &str {
        "auth"
    }

    fn before(&self, conn: &mut Conn) -> anyhow::Result<()> {
        match conn.get_header("authorization") {
            Some(h) if h == self.token => {
                conn.assign("current_user", json!(self.subject));
            }
            _ => {
                warn!(
                    request_id = %conn.request_id,
                    path = %conn.path,
                    "Unauthorized request halted"
                );
                conn.status = Some(401);
                conn.resp_body = Some(json!({ "error": "Unauthorized" }));
                conn.halted = true;
            }
        }
        Ok(())
    }
}
