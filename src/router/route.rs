//! Route records.
//!
//! A [`Route`] is built once from a [`Registration`] and never changes
//! afterwards. It carries the compiled path and host matchers next to the raw
//! registration data so the dispatcher and the helper index can share it
//! behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::host::{compile_host, CompiledHost};
use super::path::{compile_path, CompiledPath, ParamVec};
use crate::error::{RouteBuildError, RouteError};

/// Route-scoped data merged into every matched request.
pub type PrivateData = HashMap<String, Value>;

/// The verb a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// A single HTTP method
    Exact(Method),
    /// Any method; registered as `*`
    Any,
}

impl Verb {
    /// Parse a registration verb. Case-insensitive; stored upcased.
    ///
    /// # Errors
    ///
    /// [`RouteBuildError::EmptyVerb`] or [`RouteBuildError::InvalidVerb`].
    pub fn parse(verb: &str) -> Result<Self, RouteBuildError> {
        let verb = verb.trim();
        if verb.is_empty() {
            return Err(RouteBuildError::EmptyVerb);
        }
        if verb == "*" {
            return Ok(Verb::Any);
        }
        let upper = verb.to_ascii_uppercase();
        Method::from_bytes(upper.as_bytes())
            .map(Verb::Exact)
            .map_err(|_| RouteBuildError::InvalidVerb {
                verb: verb.to_string(),
            })
    }

    /// Test an incoming method
    #[inline]
    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            Verb::Any => true,
            Verb::Exact(m) => m == method,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Any => write!(f, "*"),
            Verb::Exact(m) => write!(f, "{m}"),
        }
    }
}

/// Identity of the controller/action pair a route dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerId {
    /// Controller identifier, e.g. `PageController`
    pub controller: String,
    /// Action identifier, e.g. `show`
    pub action: String,
}

impl HandlerId {
    /// Create a handler id
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.controller, self.action)
    }
}

/// Typed registration input: one call per route.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    /// HTTP verb (any case) or `*`
    pub verb: String,
    /// Path template
    pub path: String,
    /// Optional host template
    pub host: Option<String>,
    /// Controller identifier
    pub controller: String,
    /// Action identifier
    pub action: String,
    /// Optional helper name for reverse path generation
    pub helper: Option<String>,
    /// Pipeline names, outermost first
    pub pipe_through: Vec<String>,
    /// Data merged into the request before dispatch
    pub private: PrivateData,
}

impl Registration {
    /// Start a registration for `verb path -> controller#action`
    pub fn new(
        verb: impl Into<String>,
        path: impl Into<String>,
        controller: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            verb: verb.into(),
            path: path.into(),
            controller: controller.into(),
            action: action.into(),
            ..Self::default()
        }
    }

    /// Restrict the route to a host template
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Name the route for reverse path generation
    #[must_use]
    pub fn helper(mut self, helper: impl Into<String>) -> Self {
        self.helper = Some(helper.into());
        self
    }

    /// Append a pipeline; call order is wrapping order
    #[must_use]
    pub fn pipe_through(mut self, pipeline: impl Into<String>) -> Self {
        self.pipe_through.push(pipeline.into());
        self
    }

    /// Attach one private key/value
    #[must_use]
    pub fn private(mut self, key: impl Into<String>, value: Value) -> Self {
        self.private.insert(key.into(), value);
        self
    }
}

/// Untyped registration as it appears in a route file.
///
/// Required fields are optional here and `pipe_through` and `private` are
/// kept as raw JSON values, so a missing or misshapen field surfaces as a
/// [`RouteBuildError`] naming the route rather than as an opaque deserializer
/// message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteDefinition {
    /// HTTP verb or `*`
    #[serde(default)]
    pub verb: Option<String>,
    /// Path template
    #[serde(default)]
    pub path: Option<String>,
    /// Optional host template
    #[serde(default)]
    pub host: Option<String>,
    /// Controller identifier
    #[serde(default)]
    pub controller: Option<String>,
    /// Action identifier
    #[serde(default)]
    pub action: Option<String>,
    /// Optional helper name
    #[serde(default, alias = "as")]
    pub helper: Option<String>,
    /// Expected: list of strings
    #[serde(default)]
    pub pipe_through: Option<Value>,
    /// Expected: map
    #[serde(default)]
    pub private: Option<Value>,
}

/// Validate an untyped `pipe_through` value: absent, a single name, or a list
/// of names.
pub(crate) fn parse_pipe_through(
    path: &str,
    raw: Option<Value>,
) -> Result<Vec<String>, RouteBuildError> {
    let invalid = || RouteBuildError::InvalidShape {
        path: path.to_string(),
        field: "pipe_through",
        expected: "a list of pipeline names",
    };
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(single)) => Ok(vec![single]),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid()),
            })
            .collect(),
        Some(_) => Err(invalid()),
    }
}

/// Validate an untyped `private` value: absent or a map.
pub(crate) fn parse_private(
    path: &str,
    raw: Option<Value>,
) -> Result<PrivateData, RouteBuildError> {
    match raw {
        None | Some(Value::Null) => Ok(PrivateData::new()),
        Some(Value::Object(map)) => Ok(map.into_iter().collect()),
        Some(_) => Err(RouteBuildError::InvalidShape {
            path: path.to_string(),
            field: "private",
            expected: "a map of keys to values",
        }),
    }
}

// Label for a definition without a path: `VERB Controller#action`, with `?`
// for whatever else is missing too.
fn describe_pathless(def: &RouteDefinition) -> String {
    format!(
        "{} {}#{}",
        def.verb.as_deref().unwrap_or("?"),
        def.controller.as_deref().unwrap_or("?"),
        def.action.as_deref().unwrap_or("?")
    )
}

impl TryFrom<RouteDefinition> for Registration {
    type Error = RouteBuildError;

    fn try_from(def: RouteDefinition) -> Result<Self, Self::Error> {
        let Some(path) = def.path.clone() else {
            return Err(RouteBuildError::MissingField {
                route: describe_pathless(&def),
                field: "path",
            });
        };
        let required = |value: Option<String>, field: &'static str| {
            value.ok_or_else(|| RouteBuildError::MissingField {
                route: path.clone(),
                field,
            })
        };
        let verb = required(def.verb, "verb")?;
        let controller = required(def.controller, "controller")?;
        let action = required(def.action, "action")?;
        let pipe_through = parse_pipe_through(&path, def.pipe_through)?;
        let private = parse_private(&path, def.private)?;

        Ok(Registration {
            verb,
            path,
            host: def.host,
            controller,
            action,
            helper: def.helper,
            pipe_through,
            private,
        })
    }
}

/// One registered rule with its compiled matchers.
#[derive(Debug, Clone)]
pub struct Route {
    /// Verb matcher
    pub verb: Verb,
    /// Compiled path; `path.template()` is the normalized template
    pub path: CompiledPath,
    /// Compiled host predicate
    pub host: CompiledHost,
    /// Target controller/action
    pub handler: HandlerId,
    /// Helper name for reverse path generation
    pub helper: Option<String>,
    /// Data merged into matched requests
    pub private: Arc<PrivateData>,
    /// Pipeline names, outermost first, exactly as registered
    pub pipe_through: Vec<String>,
}

impl Route {
    /// Validate a registration and compile its templates.
    ///
    /// # Errors
    ///
    /// [`RouteError::Build`] for missing or malformed fields and
    /// [`RouteError::Compile`] for malformed path or host templates.
    pub fn build(reg: Registration) -> Result<Self, RouteError> {
        let verb = Verb::parse(&reg.verb)?;
        if reg.path.is_empty() {
            return Err(RouteBuildError::EmptyPath.into());
        }
        if reg.controller.trim().is_empty() {
            return Err(RouteBuildError::EmptyController { path: reg.path }.into());
        }
        if reg.action.trim().is_empty() {
            return Err(RouteBuildError::EmptyAction { path: reg.path }.into());
        }
        if reg.helper.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(RouteBuildError::EmptyHelper { path: reg.path }.into());
        }
        if reg.pipe_through.iter().any(|p| p.trim().is_empty()) {
            return Err(RouteBuildError::EmptyPipelineName { path: reg.path }.into());
        }

        let path = compile_path(&reg.path)?;
        let host = compile_host(reg.host.as_deref())?;
        let handler = HandlerId::new(reg.controller, reg.action);

        debug!(
            verb = %verb,
            path = %path.template(),
            host = %host,
            handler = %handler,
            params = ?path.param_names().collect::<Vec<_>>(),
            pipe_through = ?reg.pipe_through,
            "Route compiled"
        );

        Ok(Route {
            verb,
            path,
            host,
            handler,
            helper: reg.helper,
            private: Arc::new(reg.private),
            pipe_through: reg.pipe_through,
        })
    }

    /// Verb, host and path test in one call.
    ///
    /// Returns the bound parameters when the route applies to the request.
    #[inline]
    #[must_use]
    pub fn match_request(&self, method: &Method, host: &str, path: &str) -> Option<ParamVec> {
        if !self.verb.matches(method) || !self.host.matches(host) {
            return None;
        }
        self.path.extract(path)
    }

    /// Normalized path template
    #[must_use]
    pub fn template(&self) -> &str {
        self.path.template()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.path.template())?;
        if let Some(host) = self.host.template() {
            write!(f, " (host {host})")?;
        }
        write!(f, " -> {}", self.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CompileErrorReason, RouteCompileError};
    use serde_json::json;

    #[test]
    fn test_build_upcases_verb() {
        let route = Route::build(Registration::new("get", "pages/:page", "Page", "show")).unwrap();
        assert_eq!(route.verb, Verb::Exact(Method::GET));
        assert_eq!(route.template(), "/pages/:page");
        assert_eq!(route.handler.to_string(), "Page#show");
    }

    #[test]
    fn test_build_keeps_pipeline_order() {
        let reg = Registration::new("GET", "/", "Page", "index")
            .pipe_through("browser")
            .pipe_through("auth")
            .pipe_through("browser");
        let route = Route::build(reg).unwrap();
        assert_eq!(route.pipe_through, vec!["browser", "auth", "browser"]);
    }

    #[test]
    fn test_build_rejects_missing_fields() {
        assert_eq!(
            Route::build(Registration::new("", "/", "Page", "index")).unwrap_err(),
            RouteError::Build(RouteBuildError::EmptyVerb)
        );
        assert_eq!(
            Route::build(Registration::new("GET", "", "Page", "index")).unwrap_err(),
            RouteError::Build(RouteBuildError::EmptyPath)
        );
        assert!(matches!(
            Route::build(Registration::new("GET", "/", "", "index")).unwrap_err(),
            RouteError::Build(RouteBuildError::EmptyController { .. })
        ));
        assert!(matches!(
            Route::build(Registration::new("GET", "/", "Page", "index").helper("")).unwrap_err(),
            RouteError::Build(RouteBuildError::EmptyHelper { .. })
        ));
        assert!(matches!(
            Route::build(Registration::new("G ET", "/", "Page", "index")).unwrap_err(),
            RouteError::Build(RouteBuildError::InvalidVerb { .. })
        ));
    }

    #[test]
    fn test_build_surfaces_compile_errors() {
        let err = Route::build(Registration::new("GET", "/a/*b/c", "A", "b")).unwrap_err();
        assert_eq!(
            err,
            RouteError::Compile(RouteCompileError {
                template: "/a/*b/c".into(),
                reason: CompileErrorReason::SplatNotLast { name: "b".into() },
            })
        );
    }

    #[test]
    fn test_any_verb() {
        let route = Route::build(Registration::new("*", "/health", "Health", "check")).unwrap();
        assert!(route.match_request(&Method::DELETE, "x", "/health").is_some());
        assert!(route.match_request(&Method::GET, "x", "/health").is_some());
    }

    #[test]
    fn test_match_request_checks_host_first() {
        let route =
            Route::build(Registration::new("GET", "/users/:id", "User", "show").host("api."))
                .unwrap();
        assert!(route.match_request(&Method::GET, "www.example.com", "/users/1").is_none());
        assert!(route.match_request(&Method::POST, "api.example.com", "/users/1").is_none());
        let params = route
            .match_request(&Method::GET, "api.example.com", "/users/1")
            .unwrap();
        assert_eq!(params[0].1, "1");
    }

    #[test]
    fn test_definition_shapes() {
        let def: RouteDefinition = serde_json::from_value(json!({
            "verb": "get",
            "path": "/admin",
            "controller": "Admin",
            "action": "index",
            "as": "admin",
            "pipe_through": ["browser", "auth"],
            "private": {"layout": "admin"}
        }))
        .unwrap();
        let reg = Registration::try_from(def).unwrap();
        assert_eq!(reg.helper.as_deref(), Some("admin"));
        assert_eq!(reg.pipe_through, vec!["browser", "auth"]);
        assert_eq!(reg.private["layout"], json!("admin"));

        let def: RouteDefinition = serde_json::from_value(json!({
            "verb": "get",
            "path": "/admin",
            "controller": "Admin",
            "action": "index",
            "private": ["not", "a", "map"]
        }))
        .unwrap();
        assert_eq!(
            Registration::try_from(def).unwrap_err(),
            RouteBuildError::InvalidShape {
                path: "/admin".into(),
                field: "private",
                expected: "a map of keys to values",
            }
        );

        let def: RouteDefinition = serde_json::from_value(json!({
            "verb": "get",
            "path": "/admin",
            "controller": "Admin",
            "action": "index",
            "pipe_through": [1, 2]
        }))
        .unwrap();
        assert!(matches!(
            Registration::try_from(def).unwrap_err(),
            RouteBuildError::InvalidShape { field: "pipe_through", .. }
        ));
    }

    #[test]
    fn test_definition_missing_fields() {
        let def: RouteDefinition = serde_json::from_value(json!({
            "verb": "get",
            "path": "/admin",
            "action": "index"
        }))
        .unwrap();
        let err = Registration::try_from(def).unwrap_err();
        assert_eq!(
            err,
            RouteBuildError::MissingField {
                route: "/admin".into(),
                field: "controller",
            }
        );
        assert_eq!(
            err.to_string(),
            "route '/admin' is missing required field 'controller'"
        );

        let def: RouteDefinition = serde_json::from_value(json!({
            "path": "/admin",
            "controller": "Admin",
            "action": "index"
        }))
        .unwrap();
        assert!(matches!(
            Registration::try_from(def).unwrap_err(),
            RouteBuildError::MissingField { field: "verb", .. }
        ));

        let def: RouteDefinition = serde_json::from_value(json!({
            "verb": "GET",
            "controller": "Admin",
            "action": "index"
        }))
        .unwrap();
        assert_eq!(
            Registration::try_from(def).unwrap_err(),
            RouteBuildError::MissingField {
                route: "GET Admin#index".into(),
                field: "path",
            }
        );
    }
}
