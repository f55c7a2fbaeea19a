use tracing::info_span;

use crate::dispatcher::{Conn, Next, Pipe};

/// Opens a `request` span around the rest of the chain, so every log line
/// emitted by inner pipes and the handler carries the request fields.
pub struct TracingPipe;

impl Pipe for TracingPipe {
    fn name(&self) -> &str {
        "tracing"
    }

    fn call(&self, conn: Conn, next: Next<'_>) -> anyhow::Result<Conn> {
        let span = info_span!(
            "request",
            request_id = %conn.request_id,
            method = %conn.method,
            host = %conn.host,
            path = %conn.path,
            status = tracing::field::Empty,
        );
        let result = span.in_scope(|| next.run(conn));
        if let Ok(conn) = &result {
            if let Some(status) = conn.status {
                span.record("status", status);
            }
        }
        result
    }
}
