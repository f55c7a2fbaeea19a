//! # Dispatcher Module
//!
//! The dispatcher turns compiled [`Route`](crate::router::Route)s into
//! [`ExecutableMatcher`]s: a route plus its resolved handler and the flattened
//! pipe chain of every pipeline it pipes through.
//!
//! ## Overview
//!
//! For a matched request a matcher:
//!
//! 1. merges the route's private data into [`Conn::private`] (route keys win,
//!    existing keys are kept),
//! 2. binds the path parameters onto the conn,
//! 3. runs the pipes, outermost first, with the handler innermost.
//!
//! ## Pipeline Ordering
//!
//! A route registered with `pipe_through: [auth, logging]` runs as
//! `auth(logging(handler(conn)))`: `auth` enters first and leaves last. Each
//! pipe receives a [`Next`] for the rest of the chain and may stop it by
//! halting the conn instead of calling `next.run`.
//!
//! ```rust
//! use piperoute::dispatcher::{pipe_fn, Conn, Dispatcher, Served};
//! use piperoute::router::{Registration, Router};
//! use http::Method;
//! use serde_json::json;
//!
//! let router = Router::build(vec![
//!     Registration::new("GET", "/pages/:page", "Page", "show").pipe_through("browser"),
//! ])
//! .unwrap();
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_pipeline(
//!     "browser",
//!     vec![pipe_fn("html", |mut conn, next| {
//!         conn.put_resp_header("content-type", "text/html");
//!         next.run(conn)
//!     })],
//! );
//! dispatcher.register_handler("Page", "show", |conn, params| {
//!     let page = params[0].1.clone();
//!     Ok(conn.send(200, json!({ "page": page })))
//! });
//!
//! let table = dispatcher.build_table(&router).unwrap();
//! let served = table.serve(Conn::new(Method::GET, "example.com", "/pages/about")).unwrap();
//! match served {
//!     Served::Dispatched(conn) => assert_eq!(conn.resp_body, Some(json!({ "page": "about" }))),
//!     Served::NoMatch(_) => unreachable!(),
//! }
//! ```
//!
//! ## Error Handling
//!
//! Unknown handlers and pipelines fail [`Dispatcher::build_dispatch`] at build
//! time. Failures raised by pipes or handlers are wrapped once in a
//! [`DispatchError`](crate::error::DispatchError) naming the handler and handed
//! back to the caller; nothing here retries or recovers.

mod conn;
mod core;

pub use conn::{Conn, HeaderVec, MAX_INLINE_HEADERS};
pub use core::{
    pipe_fn, Controller, DispatchTable, Dispatcher, ExecutableMatcher, Handler, Next, Pipe,
    Served,
};
