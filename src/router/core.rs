use crate::collections::{IdList, IdListError};
use crate::error::{EngineError, Result};
use crate::ids::{ResponseId, RouteId};
use crate::matcher::PathParams;
use crate::request::MockRequest;
use crate::response::{Response, ResponseSelector};
use crate::route::{Route, RouteDef};
use crate::validator_cache::SchemaCache;
use arc_swap::ArcSwap;
use http::{Method, StatusCode};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Result of a successful route match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Arc<Route>,
    /// The matched method
    pub method: Method,
    /// Raw values captured by the route's placeholders
    pub path_params: PathParams,
}

impl RouteMatch {
    /// Captured value of a path placeholder.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }
}

/// One immutable generation of router contents.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    routes: IdList<Arc<Route>>,
    error_responses: IdList<Arc<Response>>,
    error_selector: ResponseSelector,
}

/// Ordered, mutable collection of routes plus global error responses.
#[derive(Debug)]
pub struct Router {
    snapshot: ArcSwap<Snapshot>,
    writer: Mutex<()>,
}

impl Default for Router {
    fn default() -> Self {
        Self::with_error_selector(ResponseSelector::First)
    }
}

fn duplicate_route(e: IdListError<RouteId>) -> EngineError {
    match e {
        IdListError::Duplicate(id) => EngineError::DuplicateRoute(id.to_string()),
        IdListError::Missing(id) => EngineError::MissingRoute(id.to_string()),
    }
}

fn duplicate_response(e: IdListError<ResponseId>) -> EngineError {
    match e {
        IdListError::Duplicate(id) => EngineError::DuplicateResponse(id.to_string()),
        IdListError::Missing(id) => EngineError::MissingResponse(id.to_string()),
    }
}

impl Router {
    /// Empty router whose error responses are picked with `first`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty router with the given error selector.
    #[must_use]
    pub fn with_error_selector(selector: ResponseSelector) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot {
                error_selector: selector,
                ..Snapshot::default()
            }),
            writer: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the current snapshot and publish it.
    /// Nothing is published when `change` fails.
    fn update<T>(&self, change: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let _guard = self.lock();
        let mut next = Snapshot::clone(&self.snapshot.load());
        let out = change(&mut next)?;
        self.snapshot.store(Arc::new(next));
        Ok(out)
    }

    /// Publish a change that cannot fail.
    fn publish(&self, change: impl FnOnce(&mut Snapshot)) {
        let _guard = self.lock();
        let mut next = Snapshot::clone(&self.snapshot.load());
        change(&mut next);
        self.snapshot.store(Arc::new(next));
    }

    /// Find the first route matching a method and path.
    #[must_use]
    pub fn match_parts(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");
        let snapshot = self.snapshot.load();
        for route in &snapshot.routes {
            if let Some(path_params) = route.match_parts(method, path) {
                info!(
                    method = %method,
                    path = %path,
                    route_id = %route.id(),
                    route_pattern = %route.path(),
                    path_params = ?path_params,
                    "Route matched"
                );
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    method: method.clone(),
                    path_params,
                });
            }
        }
        warn!(method = %method, path = %path, "No route matched");
        None
    }

    /// Find the first route matching a request.
    #[must_use]
    pub fn match_request(&self, request: &MockRequest) -> Option<RouteMatch> {
        self.match_parts(&request.method, &request.path)
    }

    /// Snapshot of all routes in match order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.snapshot.load().routes.iter().map(Arc::clone).collect()
    }

    /// Route by id.
    #[must_use]
    pub fn get_route(&self, id: &RouteId) -> Option<Arc<Route>> {
        self.snapshot.load().routes.get(id).map(Arc::clone)
    }

    /// Append a route (lowest priority).
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateRoute`] if the id is taken.
    pub fn add_route(&self, route: Route) -> Result<Arc<Route>> {
        let route = Arc::new(route);
        self.update(|s| s.routes.add(Arc::clone(&route)).map_err(duplicate_route))?;
        info!(route_id = %route.id(), path = %route.path(), "Route added");
        Ok(route)
    }

    /// Build and append a route from its definition.
    ///
    /// # Errors
    ///
    /// Any [`Route::from_def`] error, or [`EngineError::DuplicateRoute`].
    pub fn add_route_def(&self, def: RouteDef) -> Result<Arc<Route>> {
        self.add_route(Route::from_def(def)?)
    }

    /// Remove a route.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingRoute`] if `id` is unknown.
    pub fn remove_route(&self, id: &RouteId) -> Result<Arc<Route>> {
        let removed = self.update(|s| {
            s.routes
                .remove(id)
                .ok_or_else(|| EngineError::MissingRoute(id.to_string()))
        })?;
        info!(route_id = %id, "Route removed");
        Ok(removed)
    }

    /// Substitute a route in place, keeping its match priority.
    ///
    /// The new route may carry a different id if no other route uses it.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingRoute`] if `id` is unknown
    /// - [`EngineError::DuplicateRoute`] if the new id belongs to another route
    pub fn replace_route(&self, id: &RouteId, route: Route) -> Result<Arc<Route>> {
        let route = Arc::new(route);
        self.update(|s| {
            s.routes
                .replace(id, Arc::clone(&route))
                .map_err(duplicate_route)
        })?;
        info!(route_id = %id, new_route_id = %route.id(), "Route replaced");
        Ok(route)
    }

    /// Build a route from its definition and substitute it in place.
    ///
    /// # Errors
    ///
    /// Any [`Route::from_def`] or [`Router::replace_route`] error.
    pub fn replace_route_def(&self, id: &RouteId, def: RouteDef) -> Result<Arc<Route>> {
        self.replace_route(id, Route::from_def(def)?)
    }

    /// Replace every route at once. Nothing changes if the list has
    /// duplicate ids.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateRoute`] on the first repeated id.
    pub fn reset_routes(&self, routes: Vec<Route>) -> Result<()> {
        let routes = IdList::try_from_iter(routes.into_iter().map(Arc::new)).map_err(duplicate_route)?;
        let count = routes.len();
        self.update(|s| {
            s.routes = routes;
            Ok(())
        })?;
        info!(routes_count = count, "Routes reset");
        Ok(())
    }

    /// Snapshot of global error responses.
    #[must_use]
    pub fn error_responses(&self) -> Vec<Arc<Response>> {
        self.snapshot
            .load()
            .error_responses
            .iter()
            .map(Arc::clone)
            .collect()
    }

    /// Selector used for global error responses.
    #[must_use]
    pub fn error_selector(&self) -> ResponseSelector {
        self.snapshot.load().error_selector
    }

    /// Change the selector used for global error responses.
    pub fn set_error_selector(&self, selector: ResponseSelector) {
        self.publish(|s| s.error_selector = selector);
    }

    /// Add a global error response.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateResponse`] if the id is taken.
    pub fn add_error_response(&self, response: Response) -> Result<Arc<Response>> {
        let response = Arc::new(response);
        self.update(|s| {
            s.error_responses
                .add(Arc::clone(&response))
                .map_err(duplicate_response)
        })?;
        Ok(response)
    }

    /// Remove a global error response.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingResponse`] if `id` is unknown.
    pub fn remove_error_response(&self, id: &ResponseId) -> Result<Arc<Response>> {
        self.update(|s| {
            s.error_responses
                .remove(id)
                .ok_or_else(|| EngineError::MissingResponse(id.to_string()))
        })
    }

    /// Replace every global error response at once.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateResponse`] on the first repeated id.
    pub fn reset_error_responses(&self, responses: Vec<Response>) -> Result<()> {
        let responses =
            IdList::try_from_iter(responses.into_iter().map(Arc::new)).map_err(duplicate_response)?;
        self.update(|s| {
            s.error_responses = responses;
            Ok(())
        })
    }

    /// Replace routes, error responses and error selector in one atomic step.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateRoute`] / [`EngineError::DuplicateResponse`]
    /// on repeated ids; the router is left untouched.
    pub fn replace_all(
        &self,
        routes: Vec<Route>,
        error_responses: Vec<Response>,
        error_selector: ResponseSelector,
    ) -> Result<()> {
        let routes = IdList::try_from_iter(routes.into_iter().map(Arc::new)).map_err(duplicate_route)?;
        let error_responses = IdList::try_from_iter(error_responses.into_iter().map(Arc::new))
            .map_err(duplicate_response)?;
        let routes_count = routes.len();
        self.update(|s| {
            *s = Snapshot {
                routes,
                error_responses,
                error_selector,
            };
            Ok(())
        })?;
        info!(routes_count, "Router contents replaced");
        Ok(())
    }

    /// Pick a global error response for `status` and reserve one use of it
    /// (see [`Response::try_claim`]).
    #[must_use]
    pub fn get_error_response(&self, status: StatusCode) -> Option<Arc<Response>> {
        let snapshot = self.snapshot.load();
        let candidates: Vec<Arc<Response>> = snapshot
            .error_responses
            .iter()
            .filter(|r| r.status() == status)
            .map(Arc::clone)
            .collect();
        snapshot
            .error_selector
            .claim(&candidates)
            .ok()
            .map(Arc::clone)
    }

    /// Drop all routes and error responses and invalidate the compiled
    /// schema cache. The error selector is kept.
    pub fn reset(&self) {
        self.publish(|s| {
            s.routes.clear();
            s.error_responses.clear();
        });
        SchemaCache::global().clear();
        info!("Router reset");
    }
}

impl Serialize for Router {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let snapshot = self.snapshot.load();
        let mut out = serializer.serialize_struct("Router", 3)?;
        out.serialize_field("routes", &snapshot.routes)?;
        out.serialize_field("error_responses", &snapshot.error_responses)?;
        out.serialize_field("error_selector", &snapshot.error_selector)?;
        out.end()
    }
}
