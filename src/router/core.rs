//! Router core module - the ordered route table.
//!
//! Routes are kept in registration order and evaluated first-match-wins. The
//! table is assembled once, then shared read-only (`Router` is `Clone` and all
//! routes sit behind `Arc`), so request threads never take a lock.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;
use tracing::{debug, info, warn};

use super::path::{decode_param, ParamVec};
use super::route::{Registration, Route};
use crate::error::{PathHelperError, RouteError};

/// Default threshold above which a route lookup is reported as slow.
pub const DEFAULT_SLOW_MATCH: Duration = Duration::from_millis(1);

/// Result of successfully matching a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route (shared with the table)
    pub route: Arc<Route>,
    /// Position of the route in registration order
    pub index: usize,
    /// Path parameters extracted from the URL (e.g. `:id` -> `{"id": "123"}`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name, percent-decoded
    #[must_use]
    pub fn decoded_path_param(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get_path_param(name).map(decode_param)
    }

    /// Convert path_params to a HashMap
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Ordered, immutable table of compiled routes.
#[derive(Clone, Debug)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    /// Helper name -> index of the first route registered under it
    helpers: HashMap<String, usize>,
    slow_match: Duration,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Router {
    /// Create a router from already-built routes, keeping their order.
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();

        let mut helpers = HashMap::new();
        for (idx, route) in routes.iter().enumerate() {
            if let Some(helper) = &route.helper {
                helpers.entry(helper.clone()).or_insert(idx);
            }
        }

        if routes.is_empty() {
            info!(routes_count = 0, "Routing table loaded with no routes");
        } else {
            let routes_summary: Vec<String> =
                routes.iter().take(10).map(|r| r.to_string()).collect();
            info!(
                routes_count = routes.len(),
                helpers_count = helpers.len(),
                routes_summary = ?routes_summary,
                "Routing table loaded"
            );
        }

        Self {
            routes,
            helpers,
            slow_match: DEFAULT_SLOW_MATCH,
        }
    }

    /// Build every registration, in order, into a router.
    ///
    /// # Errors
    ///
    /// The first malformed registration aborts the whole table; nothing is
    /// skipped silently.
    pub fn build<I>(registrations: I) -> Result<Self, RouteError>
    where
        I: IntoIterator<Item = Registration>,
    {
        let routes = registrations
            .into_iter()
            .map(Route::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    /// Override the slow-lookup warning threshold
    #[must_use]
    pub fn with_slow_match_threshold(mut self, threshold: Duration) -> Self {
        self.slow_match = threshold;
        self
    }

    /// Routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route matching verb, host and path.
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch)` - the first matching route in registration order
    /// * `None` - no route matches (results in 404)
    #[must_use]
    pub fn route(&self, method: &Method, host: &str, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, host = %host, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let found = self.routes.iter().enumerate().find_map(|(index, route)| {
            route
                .match_request(method, host, path)
                .map(|params| (index, route, params))
        });
        let match_duration = match_start.elapsed();

        let Some((index, route, path_params)) = found else {
            debug!(
                method = %method,
                host = %host,
                path = %path,
                duration_us = match_duration.as_micros(),
                "No route matched"
            );
            return None;
        };

        if match_duration > self.slow_match {
            warn!(
                method = %method,
                path = %path,
                handler = %route.handler,
                route_pattern = %route.template(),
                path_params = ?path_params,
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            debug!(
                method = %method,
                path = %path,
                handler = %route.handler,
                route_pattern = %route.template(),
                path_params = ?path_params,
                duration_us = match_duration.as_micros(),
                "Route matched"
            );
        }

        Some(RouteMatch {
            route: Arc::clone(route),
            index,
            path_params,
        })
    }

    /// Look up the first route registered under a helper name
    #[must_use]
    pub fn helper(&self, name: &str) -> Option<&Arc<Route>> {
        self.helpers.get(name).and_then(|idx| self.routes.get(*idx))
    }

    /// Generate a concrete path for a named route.
    ///
    /// Parameters the template binds fill their segments; any others are
    /// appended as a query string in the order given.
    ///
    /// # Errors
    ///
    /// [`PathHelperError::UnknownHelper`] or [`PathHelperError::MissingParam`].
    pub fn path_for(&self, helper: &str, params: &[(&str, &str)]) -> Result<String, PathHelperError> {
        let route = self
            .helper(helper)
            .ok_or_else(|| PathHelperError::UnknownHelper {
                helper: helper.to_string(),
            })?;

        let mut path = route.path.build(params)?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (key, value) in params {
            if route.path.param_names().any(|name| name == *key) {
                continue;
            }
            query.append_pair(key, value);
            has_query = true;
        }
        if has_query {
            path.push('?');
            path.push_str(&query.finish());
        }
        Ok(path)
    }

    /// Render the table, one route per line
    #[must_use]
    pub fn format_routes(&self) -> String {
        let helper_width = self
            .routes
            .iter()
            .filter_map(|r| r.helper.as_deref().map(str::len))
            .max()
            .unwrap_or(0);
        let verb_width = self
            .routes
            .iter()
            .map(|r| r.verb.to_string().len())
            .max()
            .unwrap_or(0);
        let path_width = self
            .routes
            .iter()
            .map(|r| r.template().len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for route in &self.routes {
            let _ = writeln!(
                out,
                "{:>hw$}  {:<vw$}  {:<pw$}  {}{}",
                route.helper.as_deref().unwrap_or(""),
                route.verb.to_string(),
                route.template(),
                route.handler,
                route
                    .host
                    .template()
                    .map(|h| format!("  [host {h}]"))
                    .unwrap_or_default(),
                hw = helper_width,
                vw = verb_width,
                pw = path_width,
            );
        }
        out
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        print!("{}", self.format_routes());
    }
}
