//! Host template matching.
//!
//! - no template: every host matches
//! - `api.` (trailing dot): any host starting with `api.` followed by at least
//!   one more character
//! - `api.example.com`: that exact string only
//!
//! Comparison is case-sensitive; hosts are not normalized here.

use std::fmt;

use crate::error::{CompileErrorReason, RouteCompileError};

/// A compiled host predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompiledHost {
    /// Accepts every host
    #[default]
    Any,
    /// Accepts only this host
    Exact(String),
    /// Accepts `prefix` followed by a non-empty suffix; `prefix` ends with `.`
    Prefix(String),
}

/// Compile an optional host template.
///
/// # Errors
///
/// An empty template, or one consisting only of dots, cannot match anything
/// sensible and is rejected.
pub fn compile_host(host: Option<&str>) -> Result<CompiledHost, RouteCompileError> {
    let Some(host) = host else {
        return Ok(CompiledHost::Any);
    };
    if host.trim_matches('.').is_empty() {
        return Err(RouteCompileError::new(
            host,
            CompileErrorReason::EmptyTemplate,
        ));
    }
    if host.ends_with('.') {
        Ok(CompiledHost::Prefix(host.to_string()))
    } else {
        Ok(CompiledHost::Exact(host.to_string()))
    }
}

impl CompiledHost {
    /// Test an incoming host value.
    #[inline]
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        match self {
            CompiledHost::Any => true,
            CompiledHost::Exact(expected) => host == expected,
            CompiledHost::Prefix(prefix) => {
                host.len() > prefix.len() && host.starts_with(prefix.as_str())
            }
        }
    }

    /// The template this predicate was compiled from, if any
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        match self {
            CompiledHost::Any => None,
            CompiledHost::Exact(h) | CompiledHost::Prefix(h) => Some(h),
        }
    }
}

impl fmt::Display for CompiledHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledHost::Any => write!(f, "*"),
            CompiledHost::Exact(h) => write!(f, "{h}"),
            CompiledHost::Prefix(h) => write!(f, "{h}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_host_matches_everything() {
        let host = compile_host(None).unwrap();
        assert!(host.matches("example.com"));
        assert!(host.matches(""));
    }

    #[test]
    fn test_prefix_host() {
        let host = compile_host(Some("api.")).unwrap();
        assert!(host.matches("api.example.com"));
        assert!(host.matches("api.x"));
        assert!(!host.matches("api."));
        assert!(!host.matches("api"));
        assert!(!host.matches("otherapi.com"));
    }

    #[test]
    fn test_exact_host_is_case_sensitive() {
        let host = compile_host(Some("api.example.com")).unwrap();
        assert!(host.matches("api.example.com"));
        assert!(!host.matches("API.example.com"));
        assert!(!host.matches("api.example.com.evil"));
    }

    #[test]
    fn test_empty_host_template_rejected() {
        assert!(compile_host(Some("")).is_err());
        assert!(compile_host(Some(".")).is_err());
    }
}
