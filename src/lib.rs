//! # piperoute
//!
//! **piperoute** is a routing core for HTTP applications: it compiles route
//! registrations into matchers, resolves requests first-match-wins, and turns
//! each matched route into a single executable chain of named pipelines that
//! wraps a controller/action handler.
//!
//! ## Overview
//!
//! Routes are registered with a verb, a path template, an optional host, a
//! controller/action target, an optional helper name, a list of pipelines and
//! private data:
//!
//! - `/pages/:page` binds one segment
//! - `/profiles/user-:id` binds the remainder of a segment after a literal prefix
//! - `/files/*path` binds the rest of the path
//! - `api.` as a host matches any host starting with `api.`
//!
//! Templates are compiled once into [`router::Segment`] matchers. A malformed
//! template aborts table construction instead of surfacing per request.
//!
//! ## Architecture
//!
//! - **[`router`]** - path and host compilation, route records, the ordered table,
//!   helper lookup and reverse path generation
//! - **[`dispatcher`]** - the connection value, pipes, handlers and the
//!   dispatch chain built for each route
//! - **[`middleware`]** - ready-made pipes (auth, metrics, tracing)
//! - **[`loader`]** - YAML/JSON route files with nested scopes
//! - **[`logging`]** / **[`runtime_config`]** - environment-driven setup
//! - **[`cli`]** - the `piperoute` inspection tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Table as DispatchTable
//!     participant Matcher as ExecutableMatcher
//!     participant Pipe as Pipes (outermost first)
//!     participant Handler
//!
//!     App->>Table: serve(conn)
//!     Table->>Matcher: verb, host, path test (in order)
//!     Matcher->>Matcher: merge private data, set path params
//!     Matcher->>Pipe: call(conn, next)
//!     Pipe->>Pipe: before()
//!     alt halted
//!         Pipe-->>App: conn (handler skipped)
//!     else continue
//!         Pipe->>Handler: call(conn, params)
//!         Handler-->>Pipe: conn
//!         Pipe->>Pipe: after()
//!         Pipe-->>App: conn
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use piperoute::dispatcher::{Conn, Dispatcher, Pipe, Served};
//! use piperoute::middleware::AuthPipe;
//! use piperoute::router::{Registration, Router};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let router = Router::build(vec![
//!     Registration::new("GET", "/users/:id", "User", "show").pipe_through("api"),
//! ])
//! .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! let auth: Arc<dyn Pipe> = Arc::new(AuthPipe::new("secret", "alice"));
//! dispatcher.add_pipeline("api", vec![auth]);
//! dispatcher.register_handler("User", "show", |conn: Conn, _params| {
//!     let id = conn.get_path_param("id").unwrap_or_default().to_string();
//!     Ok(conn.send(200, json!({ "id": id })))
//! });
//!
//! let table = dispatcher.build_table(&router).unwrap();
//! let conn = Conn::new(Method::GET, "example.com", "/users/7")
//!     .with_header("authorization", "secret");
//! match table.serve(conn).unwrap() {
//!     Served::Dispatched(conn) => assert_eq!(conn.status, Some(200)),
//!     Served::NoMatch(_) => unreachable!(),
//! }
//! ```

pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod loader;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;

pub use error::{
    CompileErrorReason, DispatchError, PathHelperError, RouteBuildError, RouteCompileError,
    RouteError,
};
pub use loader::{load_routes, parse_routes, RouteFormat};
