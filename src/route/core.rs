use super::def::{serialize_methods, RouteDef};
use crate::collections::{IdList, IdListError, Identified};
use crate::error::{EngineError, Result};
use crate::ids::{ResponseId, RouteId, ValidatorId};
use crate::matcher::{PathMatcher, PathParams};
use crate::request::MockRequest;
use crate::response::{Response, ResponseSelector};
use crate::security::{Auth, Authenticator};
use crate::validator::ResponseValidator;
use http::Method;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Responses and validators, always updated together under one lock.
#[derive(Debug, Default)]
struct RouteState {
    responses: IdList<Arc<Response>>,
    validators: IdList<Arc<ResponseValidator>>,
}

/// A configured rule mapping a path pattern and methods to candidate responses.
#[derive(Debug, Deserialize)]
#[serde(try_from = "RouteDef")]
pub struct Route {
    id: RouteId,
    path: PathMatcher,
    methods: Vec<Method>,
    auth: Auth,
    selector: ResponseSelector,
    state: RwLock<RouteState>,
    hits: AtomicU64,
}

impl TryFrom<RouteDef> for Route {
    type Error = EngineError;

    fn try_from(def: RouteDef) -> Result<Self> {
        Route::from_def(def)
    }
}

/// Reject `response` unless it passes at least one validator (or there are none).
fn check_response(validators: &IdList<Arc<ResponseValidator>>, response: &Response) -> Result<()> {
    if validators.is_empty() || validators.iter().any(|v| v.accepts(response)) {
        return Ok(());
    }
    Err(EngineError::Validation(format!(
        "Response \"{}\" doesn't match any of the configured validators.",
        response.id()
    )))
}

impl Route {
    /// Build a route from its definition.
    ///
    /// # Errors
    ///
    /// - [`EngineError::PathPattern`] if the path does not compile
    /// - [`EngineError::InvalidDefinition`] if no method is listed
    /// - [`EngineError::DuplicateResponse`] / [`EngineError::DuplicateValidator`]
    ///   for repeated ids
    /// - [`EngineError::Validation`] if a response passes none of the validators
    pub fn from_def(def: RouteDef) -> Result<Self> {
        let path = PathMatcher::compile(&def.path)?;

        let mut methods: Vec<Method> = Vec::with_capacity(def.methods.len());
        for method in def.methods {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        if methods.is_empty() {
            return Err(EngineError::InvalidDefinition(format!(
                "route '{}' must allow at least one HTTP method",
                path
            )));
        }

        let validators = IdList::try_from_iter(def.response_validators.into_iter().map(Arc::new))
            .map_err(|e| match e {
                IdListError::Duplicate(id) | IdListError::Missing(id) => {
                    EngineError::DuplicateValidator(id.to_string())
                }
            })?;
        let mut responses = IdList::new();
        for response in def.responses {
            check_response(&validators, &response)?;
            responses
                .add(Arc::new(response))
                .map_err(|e| match e {
                    IdListError::Duplicate(id) | IdListError::Missing(id) => {
                        EngineError::DuplicateResponse(id.to_string())
                    }
                })?;
        }

        Ok(Self {
            id: def.id.unwrap_or_default(),
            path,
            methods,
            auth: def.auth,
            selector: def.selector,
            state: RwLock::new(RouteState {
                responses,
                validators,
            }),
            hits: AtomicU64::new(def.hits),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, RouteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RouteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route identifier.
    #[must_use]
    pub fn id(&self) -> &RouteId {
        &self.id
    }

    /// Compiled path pattern.
    #[must_use]
    pub fn path(&self) -> &PathMatcher {
        &self.path
    }

    /// Allowed methods in configured order.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Authentication policy.
    #[must_use]
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Response selection strategy.
    #[must_use]
    pub fn selector(&self) -> ResponseSelector {
        self.selector
    }

    /// Number of responses delivered through this route.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Match a method and path; `None` when either does not fit.
    #[must_use]
    pub fn match_parts(&self, method: &Method, path: &str) -> Option<PathParams> {
        if !self.methods.contains(method) {
            return None;
        }
        self.path.match_path(path)
    }

    /// Match a request, returning the matched method and path parameters.
    #[must_use]
    pub fn match_request(&self, request: &MockRequest) -> Option<(Method, PathParams)> {
        self.match_parts(&request.method, &request.path)
            .map(|params| (request.method.clone(), params))
    }

    /// Check the request against the route's authentication policy.
    ///
    /// # Errors
    ///
    /// [`EngineError::Authentication`] with the strategy's reason.
    pub fn authenticate(&self, request: &MockRequest) -> Result<()> {
        self.auth.authenticate(request)
    }

    /// Pick a response and reserve one use of it.
    ///
    /// The reservation is turned into a hit by [`Route::use_response`] or
    /// handed back with [`Route::release_response`].
    ///
    /// # Errors
    ///
    /// [`EngineError::NoSuitableResponse`] when no response is eligible.
    pub fn select_response(&self) -> Result<Arc<Response>> {
        self.selector
            .claim(self.read().responses.as_slice())
            .map(Arc::clone)
    }

    /// Hand back a response selected but never delivered.
    pub fn release_response(&self, response: &Response) {
        response.release_claim();
    }

    /// Count one delivery of `response` through this route.
    pub fn use_response(&self, response: &Response) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        response.record_hit();
    }

    /// Snapshot of the responses in selection order.
    #[must_use]
    pub fn responses(&self) -> Vec<Arc<Response>> {
        self.read().responses.iter().map(Arc::clone).collect()
    }

    /// Response by id.
    #[must_use]
    pub fn get_response(&self, id: &ResponseId) -> Option<Arc<Response>> {
        self.read().responses.get(id).map(Arc::clone)
    }

    /// Append a response after checking it against the validators.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateResponse`] if the id is taken
    /// - [`EngineError::Validation`] if no validator accepts it
    pub fn add_response(&self, response: Response) -> Result<Arc<Response>> {
        let mut state = self.write();
        if state.responses.contains(response.id()) {
            return Err(EngineError::DuplicateResponse(response.id().to_string()));
        }
        check_response(&state.validators, &response)?;
        let response = Arc::new(response);
        state
            .responses
            .add(Arc::clone(&response))
            .map_err(|_| EngineError::DuplicateResponse(response.id().to_string()))?;
        info!(route_id = %self.id, response_id = %response.id(), "Response added");
        Ok(response)
    }

    /// Substitute a response in place, keeping its position.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingResponse`] if `id` is unknown
    /// - [`EngineError::DuplicateResponse`] if the new id belongs to another response
    /// - [`EngineError::Validation`] if no validator accepts the new response
    pub fn replace_response(&self, id: &ResponseId, response: Response) -> Result<Arc<Response>> {
        let mut state = self.write();
        if !state.responses.contains(id) {
            return Err(EngineError::MissingResponse(id.to_string()));
        }
        check_response(&state.validators, &response)?;
        let response = Arc::new(response);
        state
            .responses
            .replace(id, Arc::clone(&response))
            .map_err(|e| match e {
                IdListError::Duplicate(dup) => EngineError::DuplicateResponse(dup.to_string()),
                IdListError::Missing(missing) => EngineError::MissingResponse(missing.to_string()),
            })?;
        Ok(response)
    }

    /// Remove a response.
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingResponse`] if `id` is unknown.
    pub fn remove_response(&self, id: &ResponseId) -> Result<Arc<Response>> {
        let removed = self
            .write()
            .responses
            .remove(id)
            .ok_or_else(|| EngineError::MissingResponse(id.to_string()))?;
        info!(route_id = %self.id, response_id = %id, "Response removed");
        Ok(removed)
    }

    /// Remove every response.
    pub fn clear_responses(&self) {
        self.write().responses.clear();
    }

    /// Snapshot of the validators.
    #[must_use]
    pub fn validators(&self) -> Vec<Arc<ResponseValidator>> {
        self.read().validators.iter().map(Arc::clone).collect()
    }

    /// Validator by id.
    #[must_use]
    pub fn get_validator(&self, id: &ValidatorId) -> Option<Arc<ResponseValidator>> {
        self.read().validators.get(id).map(Arc::clone)
    }

    /// Add a validator.
    ///
    /// The first validator must accept every existing response; further
    /// validators only widen what is accepted and are not re-checked.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateValidator`] if the id is taken
    /// - [`EngineError::Validation`] if it would orphan an existing response
    pub fn add_response_validator(
        &self,
        validator: ResponseValidator,
    ) -> Result<Arc<ResponseValidator>> {
        let mut state = self.write();
        if state.validators.contains(validator.id()) {
            return Err(EngineError::DuplicateValidator(validator.id().to_string()));
        }
        if state.validators.is_empty() {
            for response in &state.responses {
                validator.validate(response).map_err(|e| {
                    EngineError::Validation(format!(
                        "existing response \"{}\" rejected by new validator: {e}",
                        response.id()
                    ))
                })?;
            }
        }
        let validator = Arc::new(validator);
        state
            .validators
            .add(Arc::clone(&validator))
            .map_err(|_| EngineError::DuplicateValidator(validator.id().to_string()))?;
        debug!(route_id = %self.id, validator_id = %validator.id(), "Response validator added");
        Ok(validator)
    }

    /// Remove a validator unless that would leave a response matching none
    /// of the remaining ones.
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingValidator`] if `id` is unknown
    /// - [`EngineError::Validation`] if a response would be orphaned
    pub fn remove_response_validator(&self, id: &ValidatorId) -> Result<Arc<ResponseValidator>> {
        let mut state = self.write();
        let index = state
            .validators
            .index_of(id)
            .ok_or_else(|| EngineError::MissingValidator(id.to_string()))?;
        let remaining = IdList::try_from_iter(
            state
                .validators
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, v)| Arc::clone(v)),
        )
        .map_err(|_| EngineError::DuplicateValidator(id.to_string()))?;
        for response in &state.responses {
            check_response(&remaining, response)?;
        }
        let removed = state
            .validators
            .remove(id)
            .ok_or_else(|| EngineError::MissingValidator(id.to_string()))?;
        debug!(route_id = %self.id, validator_id = %id, "Response validator removed");
        Ok(removed)
    }

    /// Remove every validator.
    pub fn clear_response_validators(&self) {
        self.write().validators.clear();
    }
}

impl Identified for Route {
    type Id = RouteId;

    fn id(&self) -> &RouteId {
        &self.id
    }
}

struct Methods<'a>(&'a [Method]);

impl Serialize for Methods<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_methods(self.0, serializer)
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let state = self.read();
        let mut out = serializer.serialize_struct("Route", 8)?;
        out.serialize_field("id", &self.id)?;
        out.serialize_field("path", &self.path)?;
        out.serialize_field("methods", &Methods(&self.methods))?;
        out.serialize_field("auth", &self.auth)?;
        out.serialize_field("selector", &self.selector)?;
        out.serialize_field("responses", &state.responses)?;
        out.serialize_field("response_validators", &state.validators)?;
        out.serialize_field("hits", &self.hits())?;
        out.end()
    }
}
