use serde_json::Value;

use crate::dispatcher::{Conn, Pipe};
use crate::router::PrivateData;

/// Puts fixed private data on every request passing through.
///
/// Runs after the route's own private data was merged, so keys set here win
/// over route keys for the rest of the chain.
pub struct PutPrivatePipe {
    data: PrivateData,
}

impl PutPrivatePipe {
    /// Pipe that merges `data` into each request's private data
    #[must_use]
    pub fn new(data: PrivateData) -> Self {
        Self { data }
    }

    /// Single-key shorthand
    #[must_use]
    pub fn single(key: impl Into<String>, value: Value) -> Self {
        let mut data = PrivateData::new();
        data.insert(key.into(), value);
        Self { data }
    }
}

impl Pipe for PutPrivatePipe {
    fn name(&self) -> &str {
        "put_private"
    }

    fn before(&self, conn: &mut Conn) -> anyhow::Result<()> {
        conn.merge_private(&self.data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_keys_are_added_and_others_kept() {
        let pipe = PutPrivatePipe::single("layout", json!("admin"));
        let mut conn = Conn::new(Method::GET, "h", "/");
        conn.put_private("locale", json!("en"));
        pipe.before(&mut conn).unwrap();
        assert_eq!(conn.private["layout"], json!("admin"));
        assert_eq!(conn.private["locale"], json!("en"));
        assert!(!conn.halted);
    }

    #[test]
    fn test_pipe_keys_win_over_existing() {
        let data: PrivateData = [
            ("layout".to_string(), json!("admin")),
            ("section".to_string(), json!("users")),
        ]
        .into_iter()
        .collect();
        let pipe = PutPrivatePipe::new(data);
        let mut conn = Conn::new(Method::GET, "h", "/");
        conn.put_private("layout", json!("app"));
        pipe.before(&mut conn).unwrap();
        assert_eq!(conn.private["layout"], json!("admin"));
        assert_eq!(conn.private["section"], json!("users"));
    }
}
