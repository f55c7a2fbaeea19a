//! # Route File Loader
//!
//! Reads registration input from YAML or JSON route files and builds a
//! [`Router`]. A route file is a list of routes and scopes:
//!
//! ```yaml
//! routes:
//!   - verb: GET
//!     path: /
//!     controller: Page
//!     action: index
//!     as: root
//!     pipe_through: [browser]
//!   - scope: /admin
//!     host: "admin."
//!     as: admin
//!     pipe_through: [browser, auth]
//!     private: { layout: admin }
//!     routes:
//!       - verb: GET
//!         path: /users/:id
//!         controller: AdminUser
//!         action: show
//!         as: user            # helper becomes admin_user
//! ```
//!
//! Scopes prefix the path of everything inside them, supply a default host,
//! prepend their pipelines, prefix helper names with `<as>_` and contribute
//! private data that routes may override. Entries keep file order, which is
//! the order routes are matched in.

use std::path::Path;

use anyhow::Context;
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use tracing::info;

use crate::error::RouteBuildError;
use crate::router::{
    parse_pipe_through, parse_private, PrivateData, Registration, RouteDefinition, Router,
};

/// A scope grouping nested routes.
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeDefinition {
    /// Path prefix
    pub scope: String,
    /// Default host for nested routes
    #[serde(default)]
    pub host: Option<String>,
    /// Helper prefix
    #[serde(default, alias = "as")]
    pub helper: Option<String>,
    /// Pipelines run before the nested routes' own pipelines
    #[serde(default)]
    pub pipe_through: Option<Value>,
    /// Private data for nested routes
    #[serde(default)]
    pub private: Option<Value>,
    /// Nested entries
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One entry of a route file.
///
/// An entry with a `scope` key is a scope; anything else is a route. Picking
/// the variant by key keeps field errors attached to the right kind of entry.
#[derive(Debug, Clone)]
pub enum RouteEntry {
    /// A nested scope
    Scope(ScopeDefinition),
    /// A single route
    Route(RouteDefinition),
}

impl<'de> Deserialize<'de> for RouteEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.get("scope").is_some() {
            ScopeDefinition::deserialize(value)
                .map(RouteEntry::Scope)
                .map_err(de::Error::custom)
        } else {
            RouteDefinition::deserialize(value)
                .map(RouteEntry::Route)
                .map_err(de::Error::custom)
        }
    }
}

/// Top level of a route file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteFile {
    /// Entries in match order
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// Serialization format of a route file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFormat {
    Yaml,
    Json,
}

impl RouteFormat {
    /// Pick the format from a file extension; anything but `.yaml`/`.yml` is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => RouteFormat::Yaml,
            _ => RouteFormat::Json,
        }
    }
}

#[derive(Default, Clone)]
struct ScopeContext {
    path: String,
    host: Option<String>,
    helper: Option<String>,
    pipe_through: Vec<String>,
    private: PrivateData,
}

fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{path}"),
    }
}

fn join_helpers(prefix: Option<&str>, helper: Option<String>) -> Option<String> {
    match (prefix, helper) {
        (Some(prefix), Some(helper)) => Some(format!("{prefix}_{helper}")),
        (_, helper) => helper,
    }
}

fn flatten(
    entries: Vec<RouteEntry>,
    ctx: &ScopeContext,
    out: &mut Vec<Registration>,
) -> Result<(), RouteBuildError> {
    for entry in entries {
        match entry {
            RouteEntry::Route(def) => {
                let mut reg = Registration::try_from(def)?;
                if !ctx.path.is_empty() {
                    reg.path = join_paths(&ctx.path, &reg.path);
                }
                if reg.host.is_none() {
                    reg.host.clone_from(&ctx.host);
                }
                reg.helper = join_helpers(ctx.helper.as_deref(), reg.helper);
                if !ctx.pipe_through.is_empty() {
                    let mut pipes = ctx.pipe_through.clone();
                    pipes.append(&mut reg.pipe_through);
                    reg.pipe_through = pipes;
                }
                if !ctx.private.is_empty() {
                    let mut private = ctx.private.clone();
                    private.extend(reg.private);
                    reg.private = private;
                }
                out.push(reg);
            }
            RouteEntry::Scope(scope) => {
                let path = join_paths(&ctx.path, &scope.scope);
                let mut pipe_through = ctx.pipe_through.clone();
                pipe_through.extend(parse_pipe_through(&path, scope.pipe_through)?);
                let mut private = ctx.private.clone();
                private.extend(parse_private(&path, scope.private)?);

                let nested = ScopeContext {
                    host: scope.host.or_else(|| ctx.host.clone()),
                    helper: join_helpers(ctx.helper.as_deref(), scope.helper),
                    path,
                    pipe_through,
                    private,
                };
                flatten(scope.routes, &nested, out)?;
            }
        }
    }
    Ok(())
}

/// Flatten a parsed route file into registrations, in file order.
///
/// # Errors
///
/// [`RouteBuildError::MissingField`] when a route lacks a required field and
/// [`RouteBuildError::InvalidShape`] when a `pipe_through` or `private` field
/// has the wrong shape.
pub fn registrations(file: RouteFile) -> Result<Vec<Registration>, RouteBuildError> {
    let mut out = Vec::new();
    flatten(file.routes, &ScopeContext::default(), &mut out)?;
    Ok(out)
}

/// Parse route file content.
///
/// # Errors
///
/// Syntax errors and registration shape errors.
pub fn parse_routes(content: &str, format: RouteFormat) -> anyhow::Result<Vec<Registration>> {
    let file: RouteFile = match format {
        RouteFormat::Yaml => serde_yaml::from_str(content).context("invalid YAML route file")?,
        RouteFormat::Json => serde_json::from_str(content).context("invalid JSON route file")?,
    };
    Ok(registrations(file)?)
}

/// Load a route file from disk and build the router.
///
/// # Errors
///
/// I/O, syntax, shape and compile errors; any malformed route aborts loading.
pub fn load_routes(file_path: impl AsRef<Path>) -> anyhow::Result<Router> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read route file {}", file_path.display()))?;
    let regs = parse_routes(&content, RouteFormat::from_path(file_path))
        .with_context(|| format!("failed to parse route file {}", file_path.display()))?;
    let count = regs.len();
    let router = Router::build(regs)
        .with_context(|| format!("failed to build routes from {}", file_path.display()))?;
    info!(
        file = %file_path.display(),
        routes_count = count,
        "Route file loaded"
    );
    Ok(router)
}
