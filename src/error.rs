//! Error types for route compilation, route construction, reverse path
//! generation and dispatch.
//!
//! Compile and build errors are raised once, while the route table is being
//! assembled, and abort construction of the whole table. A request that does not
//! match a route is not an error; matching returns `Option` instead.

use std::fmt;

/// A path or host template could not be compiled.
///
/// Carries the offending template so startup failures point at the exact
/// registration that needs fixing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCompileError {
    /// The template as it was registered
    pub template: String,
    /// What is wrong with it
    pub reason: CompileErrorReason,
}

/// Reasons a template is rejected by the path or host compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorReason {
    /// The template has no content at all
    EmptyTemplate,
    /// A `*name` splat appears before the final segment
    SplatNotLast {
        /// Name of the misplaced splat
        name: String,
    },
    /// `:` or `*` is not followed by a parameter name
    EmptyParamName,
    /// The same parameter name is bound twice in one path
    DuplicateParam {
        /// The repeated name
        name: String,
    },
    /// Parameter names must look like identifiers
    InvalidParamName {
        /// The rejected name
        name: String,
    },
    /// A single segment may contain at most one `:` or `*` token
    MultipleDynamicTokens {
        /// The segment holding several tokens
        segment: String,
    },
}

impl RouteCompileError {
    pub(crate) fn new(template: &str, reason: CompileErrorReason) -> Self {
        Self {
            template: template.to_string(),
            reason,
        }
    }
}

impl fmt::Display for RouteCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid route template '{}': ", self.template)?;
        match &self.reason {
            CompileErrorReason::EmptyTemplate => write!(f, "template is empty"),
            CompileErrorReason::SplatNotLast { name } => {
                write!(f, "splat '*{name}' must be the last segment")
            }
            CompileErrorReason::EmptyParamName => {
                write!(f, "':' and '*' must be followed by a parameter name")
            }
            CompileErrorReason::DuplicateParam { name } => {
                write!(f, "parameter '{name}' is bound more than once")
            }
            CompileErrorReason::InvalidParamName { name } => write!(
                f,
                "parameter name '{name}' must start with a letter or '_' and contain only letters, digits or '_'"
            ),
            CompileErrorReason::MultipleDynamicTokens { segment } => write!(
                f,
                "segment '{segment}' contains more than one ':' or '*' token"
            ),
        }
    }
}

impl std::error::Error for RouteCompileError {}

/// Registration arguments are missing or have the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteBuildError {
    /// The HTTP verb is empty
    EmptyVerb,
    /// The HTTP verb is not a valid method token
    InvalidVerb {
        /// The rejected verb
        verb: String,
    },
    /// The path template is empty
    EmptyPath,
    /// The controller identifier is empty
    EmptyController {
        /// Path of the route being registered
        path: String,
    },
    /// The action identifier is empty
    EmptyAction {
        /// Path of the route being registered
        path: String,
    },
    /// A helper name was supplied but is empty
    EmptyHelper {
        /// Path of the route being registered
        path: String,
    },
    /// A pipeline name in `pipe_through` is empty
    EmptyPipelineName {
        /// Path of the route being registered
        path: String,
    },
    /// A required field of an untyped registration is absent
    MissingField {
        /// Path of the route, or `VERB Controller#action` when the path itself is missing
        route: String,
        /// Field name (`verb`, `path`, `controller` or `action`)
        field: &'static str,
    },
    /// A field of an untyped registration does not have the expected shape
    InvalidShape {
        /// Path of the route being registered
        path: String,
        /// Field name (`pipe_through`, `private`, ...)
        field: &'static str,
        /// Expected shape, e.g. "a list of strings"
        expected: &'static str,
    },
    /// The route names a handler nobody registered
    UnknownHandler {
        /// `Controller#action`
        handler: String,
    },
    /// The route pipes through a pipeline nobody registered
    UnknownPipeline {
        /// Pipeline name
        pipeline: String,
        /// Path of the route referencing it
        path: String,
    },
}

impl fmt::Display for RouteBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteBuildError::EmptyVerb => write!(f, "route verb must not be empty"),
            RouteBuildError::InvalidVerb { verb } => {
                write!(f, "route verb '{verb}' is not a valid HTTP method")
            }
            RouteBuildError::EmptyPath => write!(f, "route path must not be empty"),
            RouteBuildError::EmptyController { path } => {
                write!(f, "route '{path}' has an empty controller")
            }
            RouteBuildError::EmptyAction { path } => {
                write!(f, "route '{path}' has an empty action")
            }
            RouteBuildError::EmptyHelper { path } => {
                write!(f, "route '{path}' has an empty helper name")
            }
            RouteBuildError::EmptyPipelineName { path } => {
                write!(f, "route '{path}' pipes through an empty pipeline name")
            }
            RouteBuildError::MissingField { route, field } => {
                write!(f, "route '{route}' is missing required field '{field}'")
            }
            RouteBuildError::InvalidShape {
                path,
                field,
                expected,
            } => write!(f, "route '{path}': field '{field}' must be {expected}"),
            RouteBuildError::UnknownHandler { handler } => {
                write!(f, "no handler registered for '{handler}'")
            }
            RouteBuildError::UnknownPipeline { pipeline, path } => {
                write!(f, "route '{path}' pipes through unknown pipeline '{pipeline}'")
            }
        }
    }
}

impl std::error::Error for RouteBuildError {}

/// Either failure that can abort registration of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Template compilation failed
    Compile(RouteCompileError),
    /// Registration arguments were rejected
    Build(RouteBuildError),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Compile(e) => e.fmt(f),
            RouteError::Build(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Compile(e) => Some(e),
            RouteError::Build(e) => Some(e),
        }
    }
}

impl From<RouteCompileError> for RouteError {
    fn from(e: RouteCompileError) -> Self {
        RouteError::Compile(e)
    }
}

impl From<RouteBuildError> for RouteError {
    fn from(e: RouteBuildError) -> Self {
        RouteError::Build(e)
    }
}

/// Reverse path generation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathHelperError {
    /// No route carries this helper name
    UnknownHelper {
        /// The requested helper
        helper: String,
    },
    /// A parameter the template binds was not supplied
    MissingParam {
        /// The route template
        template: String,
        /// The missing parameter
        name: String,
    },
    /// A single-segment parameter value is empty or contains `/`, so the
    /// generated path would not match its own route
    InvalidParamValue {
        /// The route template
        template: String,
        /// The parameter
        name: String,
        /// The rejected value
        value: String,
    },
}

impl fmt::Display for PathHelperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathHelperError::UnknownHelper { helper } => {
                write!(f, "no route registered with helper '{helper}'")
            }
            PathHelperError::MissingParam { template, name } => {
                write!(f, "missing parameter '{name}' for route '{template}'")
            }
            PathHelperError::InvalidParamValue {
                template,
                name,
                value,
            } => write!(
                f,
                "value '{value}' for parameter '{name}' of route '{template}' must be a non-empty segment without '/'"
            ),
        }
    }
}

impl std::error::Error for PathHelperError {}

/// A handler or pipe failed while processing a matched request.
///
/// The dispatcher never recovers these; they are handed to the serving loop.
#[derive(Debug)]
pub struct DispatchError {
    /// `Controller#action` of the route being dispatched
    pub handler: String,
    /// Underlying failure
    pub source: anyhow::Error,
}

impl DispatchError {
    /// Wrap a failure raised while dispatching `handler`.
    pub fn new(handler: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            handler: handler.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch to '{}' failed: {}", self.handler, self.source)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let inner: &(dyn std::error::Error + 'static) = self.source.as_ref();
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_template() {
        let err = RouteCompileError::new(
            "/files/*path/edit",
            CompileErrorReason::SplatNotLast {
                name: "path".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("/files/*path/edit"));
        assert!(msg.contains("*path"));
    }

    #[test]
    fn route_error_wraps_source() {
        let err: RouteError = RouteBuildError::EmptyVerb.into();
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "route verb must not be empty");
    }
}
