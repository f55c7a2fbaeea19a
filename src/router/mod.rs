//! # Router Module
//!
//! The router module compiles route registrations into matchers and keeps them in
//! an ordered, read-only table.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path templates (`/pages/:page`, `/files/*path`, `/profiles/user-:id`)
//!   into segment matchers with stable binding slots
//! - Compiling host templates (exact, `api.` prefix, or any host)
//! - Validating registration input into immutable [`Route`] records
//! - First-match-wins lookup across the table and reverse path generation
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Compilation**: at startup every registration is validated and its path
//!    template split into [`Segment`] matchers (literal, parameter, splat). Any
//!    malformed template aborts construction of the table.
//!
//! 2. **Matching**: for each incoming request the table is walked in
//!    registration order; verb and host are checked before the path interpreter
//!    runs, and the first route that accepts all three wins.
//!
//! ## Example
//!
//! ```rust
//! use piperoute::router::{Registration, Router};
//! use http::Method;
//!
//! let router = Router::build(vec![
//!     Registration::new("GET", "profiles/user-:id", "Profile", "show").helper("profile"),
//! ])
//! .unwrap();
//!
//! let m = router.route(&Method::GET, "example.com", "/profiles/user-42").unwrap();
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(router.route(&Method::GET, "example.com", "/profiles/admin-42").is_none());
//! assert_eq!(router.path_for("profile", &[("id", "42")]).unwrap(), "/profiles/user-42");
//! ```

mod core;
mod host;
mod path;
mod route;

pub use core::{RouteMatch, Router, DEFAULT_SLOW_MATCH};
pub use host::{compile_host, CompiledHost};
pub use path::{
    compile_path, decode_param, split_segments, BindingSlot, CompiledPath, ParamVec, Segment,
    SlotValues, MAX_INLINE_PARAMS,
};
pub use route::{HandlerId, PrivateData, Registration, Route, RouteDefinition, Verb};
pub(crate) use route::{parse_pipe_through, parse_private};
