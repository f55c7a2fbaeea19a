//! Dispatcher core module - builds executable matchers and runs the pipe chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info};

use super::conn::Conn;
use crate::error::{DispatchError, RouteBuildError};
use crate::router::{HandlerId, ParamVec, Route, Router};

/// The innermost step of a dispatch: a controller action.
pub trait Handler: Send + Sync {
    /// Handle a matched request. `params` are the bound path parameters.
    ///
    /// # Errors
    ///
    /// Any failure is propagated to the serving loop unchanged.
    fn call(&self, conn: Conn, params: &ParamVec) -> anyhow::Result<Conn>;
}

/// A controller answering several actions by name.
pub trait Controller: Send + Sync {
    /// Run `action`.
    ///
    /// # Errors
    ///
    /// Unknown actions and action failures alike.
    fn call(&self, action: &str, conn: Conn, params: &ParamVec) -> anyhow::Result<Conn>;
}

struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(Conn, &ParamVec) -> anyhow::Result<Conn> + Send + Sync,
{
    fn call(&self, conn: Conn, params: &ParamVec) -> anyhow::Result<Conn> {
        (self.0)(conn, params)
    }
}

/// Binds one action of a registered [`Controller`].
struct ControllerAction {
    controller: Arc<dyn Controller>,
    action: String,
}

impl Handler for ControllerAction {
    fn call(&self, conn: Conn, params: &ParamVec) -> anyhow::Result<Conn> {
        self.controller.call(&self.action, conn, params)
    }
}

/// One processing step wrapped around the handler.
///
/// The default [`Pipe::call`] runs [`Pipe::before`], then the rest of the
/// chain, then [`Pipe::after`]; a pipe that halts the conn in `before` keeps
/// every inner pipe and the handler from running. Override `call` for full
/// control (spans, timing, error mapping).
pub trait Pipe: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs on the way in.
    ///
    /// # Errors
    ///
    /// Aborts the dispatch.
    fn before(&self, _conn: &mut Conn) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on the way out, after every inner step.
    ///
    /// # Errors
    ///
    /// Aborts the dispatch.
    fn after(&self, _conn: &mut Conn) -> anyhow::Result<()> {
        Ok(())
    }

    /// Wrap the rest of the chain.
    ///
    /// # Errors
    ///
    /// Errors from this pipe or anything inside it.
    fn call(&self, mut conn: Conn, next: Next<'_>) -> anyhow::Result<Conn> {
        self.before(&mut conn)?;
        if conn.halted {
            debug!(
                request_id = %conn.request_id,
                pipe = %self.name(),
                "Pipe halted the request"
            );
            return Ok(conn);
        }
        let mut conn = next.run(conn)?;
        self.after(&mut conn)?;
        Ok(conn)
    }
}

struct FnPipe<F> {
    name: String,
    f: F,
}

impl<F> Pipe for FnPipe<F>
where
    F: Fn(Conn, Next<'_>) -> anyhow::Result<Conn> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, conn: Conn, next: Next<'_>) -> anyhow::Result<Conn> {
        (self.f)(conn, next)
    }
}

/// Build a pipe from a closure receiving the conn and the rest of the chain.
pub fn pipe_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Pipe>
where
    F: Fn(Conn, Next<'_>) -> anyhow::Result<Conn> + Send + Sync + 'static,
{
    Arc::new(FnPipe {
        name: name.into(),
        f,
    })
}

/// The remainder of a dispatch chain: the pipes not yet entered, then the handler.
pub struct Next<'a> {
    pipes: &'a [Arc<dyn Pipe>],
    handler: &'a dyn Handler,
    params: &'a ParamVec,
}

impl Next<'_> {
    /// Enter the next pipe, or call the handler when none are left.
    ///
    /// # Errors
    ///
    /// Whatever the inner pipe or handler returns.
    pub fn run(self, conn: Conn) -> anyhow::Result<Conn> {
        if conn.halted {
            return Ok(conn);
        }
        match self.pipes.split_first() {
            Some((pipe, rest)) => pipe.call(
                conn,
                Next {
                    pipes: rest,
                    handler: self.handler,
                    params: self.params,
                },
            ),
            None => self.handler.call(conn, self.params),
        }
    }

    /// Pipes still to run before the handler
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pipes.len()
    }
}

/// Outcome of offering a request to a matcher or table.
#[derive(Debug)]
pub enum Served {
    /// A route matched and its chain ran to completion (or was halted)
    Dispatched(Conn),
    /// Nothing matched; the conn is returned untouched
    NoMatch(Conn),
}

/// One route with its handler and flattened pipe chain, resolved at build time.
#[derive(Clone)]
pub struct ExecutableMatcher {
    route: Arc<Route>,
    handler: Arc<dyn Handler>,
    /// Pipes of every pipeline in `pipe_through` order, outermost first
    pipes: Vec<Arc<dyn Pipe>>,
}

impl ExecutableMatcher {
    /// The route this matcher was built from
    #[must_use]
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Number of pipes wrapped around the handler
    #[must_use]
    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    /// Verb, host and path test; `None` means try the next route.
    #[inline]
    #[must_use]
    pub fn matches(&self, conn: &Conn) -> Option<ParamVec> {
        self.route
            .match_request(&conn.method, &conn.host, &conn.path)
    }

    /// Run the chain for an already-matched request.
    ///
    /// Route private data is merged and the parameters are bound onto the conn
    /// first, so every pipe sees them; then the pipes run outermost first with
    /// the handler innermost.
    ///
    /// # Errors
    ///
    /// [`DispatchError`] wrapping the first pipe or handler failure.
    pub fn dispatch(&self, mut conn: Conn, params: ParamVec) -> Result<Conn, DispatchError> {
        if !self.route.private.is_empty() {
            conn.merge_private(&self.route.private);
        }
        conn.path_params = params.clone();

        let request_id = conn.request_id;
        info!(
            request_id = %request_id,
            handler = %self.route.handler,
            method = %conn.method,
            path = %conn.path,
            pipe_count = self.pipes.len(),
            "Request dispatched to handler"
        );

        let start = Instant::now();
        let next = Next {
            pipes: &self.pipes,
            handler: self.handler.as_ref(),
            params: &params,
        };

        match next.run(conn) {
            Ok(conn) => {
                info!(
                    request_id = %request_id,
                    handler = %self.route.handler,
                    status = ?conn.status,
                    halted = conn.halted,
                    latency_us = start.elapsed().as_micros(),
                    "Dispatch complete"
                );
                Ok(conn)
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    handler = %self.route.handler,
                    error = %e,
                    latency_us = start.elapsed().as_micros(),
                    "Dispatch failed"
                );
                Err(DispatchError::new(self.route.handler.to_string(), e))
            }
        }
    }

    /// Match and, on success, dispatch.
    ///
    /// # Errors
    ///
    /// See [`ExecutableMatcher::dispatch`].
    pub fn call(&self, conn: Conn) -> Result<Served, DispatchError> {
        match self.matches(&conn) {
            Some(params) => self.dispatch(conn, params).map(Served::Dispatched),
            None => Ok(Served::NoMatch(conn)),
        }
    }
}

impl std::fmt::Debug for ExecutableMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableMatcher")
            .field("route", &self.route.to_string())
            .field("pipes", &self.pipes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Ordered executable matchers, one per route, in registration order.
#[derive(Clone, Debug, Default)]
pub struct DispatchTable {
    matchers: Vec<ExecutableMatcher>,
}

impl DispatchTable {
    /// Matchers in registration order
    #[must_use]
    pub fn matchers(&self) -> &[ExecutableMatcher] {
        &self.matchers
    }

    /// Offer the request to each matcher in order; the first match runs.
    ///
    /// # Errors
    ///
    /// The matched chain's [`DispatchError`], unchanged.
    pub fn serve(&self, conn: Conn) -> Result<Served, DispatchError> {
        let Some((matcher, params)) = self
            .matchers
            .iter()
            .find_map(|m| m.matches(&conn).map(|params| (m, params)))
        else {
            debug!(
                request_id = %conn.request_id,
                method = %conn.method,
                host = %conn.host,
                path = %conn.path,
                "No route matched"
            );
            return Ok(Served::NoMatch(conn));
        };
        matcher.dispatch(conn, params).map(Served::Dispatched)
    }
}

/// Registry of handlers and named pipelines, used to turn routes into
/// [`ExecutableMatcher`]s.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// Handlers keyed by `Controller#action`
    handlers: HashMap<HandlerId, Arc<dyn Handler>>,
    /// Controllers answering any action
    controllers: HashMap<String, Arc<dyn Controller>>,
    /// Named pipelines; each is an ordered list of pipes
    pipelines: HashMap<String, Vec<Arc<dyn Pipe>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one controller/action pair, replacing any
    /// previous one.
    pub fn add_handler(&mut self, id: HandlerId, handler: Arc<dyn Handler>) {
        if self.handlers.insert(id.clone(), handler).is_some() {
            info!(handler = %id, "Replaced existing handler");
        } else {
            debug!(
                handler = %id,
                total_handlers = self.handlers.len(),
                "Handler registered"
            );
        }
    }

    /// Register a closure as the handler for `controller#action`.
    pub fn register_handler<F>(&mut self, controller: &str, action: &str, handler_fn: F)
    where
        F: Fn(Conn, &ParamVec) -> anyhow::Result<Conn> + Send + Sync + 'static,
    {
        self.add_handler(
            HandlerId::new(controller, action),
            Arc::new(FnHandler(handler_fn)),
        );
    }

    /// Register a controller; used for any action without a dedicated handler.
    pub fn register_controller(&mut self, name: impl Into<String>, controller: Arc<dyn Controller>) {
        let name = name.into();
        debug!(controller = %name, "Controller registered");
        self.controllers.insert(name, controller);
    }

    /// Register (or replace) a named pipeline.
    pub fn add_pipeline(&mut self, name: impl Into<String>, pipes: Vec<Arc<dyn Pipe>>) {
        let name = name.into();
        debug!(
            pipeline = %name,
            pipes = ?pipes.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            "Pipeline registered"
        );
        self.pipelines.insert(name, pipes);
    }

    fn resolve_handler(&self, id: &HandlerId) -> Option<Arc<dyn Handler>> {
        if let Some(handler) = self.handlers.get(id) {
            return Some(Arc::clone(handler));
        }
        self.controllers.get(&id.controller).map(|controller| {
            Arc::new(ControllerAction {
                controller: Arc::clone(controller),
                action: id.action.clone(),
            }) as Arc<dyn Handler>
        })
    }

    /// Resolve a route's handler and pipelines into an executable matcher.
    ///
    /// # Errors
    ///
    /// [`RouteBuildError::UnknownHandler`] or [`RouteBuildError::UnknownPipeline`];
    /// unresolved names are build-time failures, never per-request ones.
    pub fn build_dispatch(&self, route: Arc<Route>) -> Result<ExecutableMatcher, RouteBuildError> {
        let handler =
            self.resolve_handler(&route.handler)
                .ok_or_else(|| RouteBuildError::UnknownHandler {
                    handler: route.handler.to_string(),
                })?;

        let mut pipes = Vec::new();
        for name in &route.pipe_through {
            let pipeline =
                self.pipelines
                    .get(name)
                    .ok_or_else(|| RouteBuildError::UnknownPipeline {
                        pipeline: name.clone(),
                        path: route.template().to_string(),
                    })?;
            pipes.extend(pipeline.iter().map(Arc::clone));
        }

        Ok(ExecutableMatcher {
            route,
            handler,
            pipes,
        })
    }

    /// Build a matcher for every route of `router`, preserving order.
    ///
    /// # Errors
    ///
    /// The first route that cannot be resolved.
    pub fn build_table(&self, router: &Router) -> Result<DispatchTable, RouteBuildError> {
        let matchers = router
            .routes()
            .iter()
            .map(|route| self.build_dispatch(Arc::clone(route)))
            .collect::<Result<Vec<_>, _>>()?;
        info!(matchers = matchers.len(), "Dispatch table built");
        Ok(DispatchTable { matchers })
    }
}
