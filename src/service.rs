//! Per-request flow for mocked endpoints.
//!
//! [`MockService::handle`] walks one request through
//! `RECEIVED → ROUTE_MATCHED | NO_ROUTE → AUTHENTICATED | AUTH_FAILED →
//! RESPONSE_SELECTED → DELAYED → SENT`. Every failure along the way resolves
//! to a fallback reply; nothing is surfaced to the client as an error.

use crate::error::EngineError;
use crate::matcher::PathParams;
use crate::request::MockRequest;
use crate::response::{RenderedResponse, Response, TemplateContext};
use crate::router::{RouteMatch, Router};
use http::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Detail of the bare 404 reply used when no error response is configured.
pub const NOT_FOUND_DETAIL: &str = "No route or response was found for your request.";

/// Default path prefix reserved for the management API.
pub const DEFAULT_INTERNAL_PREFIX: &str = "/internal";

/// Answers mocked requests from a shared [`Router`].
#[derive(Debug, Clone)]
pub struct MockService {
    router: Arc<Router>,
    internal_prefix: String,
    apply_delays: bool,
}

impl MockService {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            internal_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
            apply_delays: true,
        }
    }

    /// Reserve a different prefix for management paths. An empty prefix
    /// reserves nothing.
    #[must_use]
    pub fn with_internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    /// Skip configured delays (dry runs, tests).
    #[must_use]
    pub fn without_delays(mut self) -> Self {
        self.apply_delays = false;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Whether `path` belongs to the management API.
    #[must_use]
    pub fn is_internal(&self, path: &str) -> bool {
        if self.internal_prefix.is_empty() {
            return false;
        }
        match path.strip_prefix(self.internal_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Produce the reply for one request.
    pub async fn handle(&self, request: &MockRequest) -> RenderedResponse {
        if self.is_internal(&request.path) {
            warn!(path = %request.path, "Internal path is not served by mocked routes");
            return self.not_found(request).await;
        }

        let Some(matched) = self.router.match_request(request) else {
            return self.not_found(request).await;
        };

        if let Err(err) = matched.route.authenticate(request) {
            return self.unauthorized(&matched, request, err).await;
        }

        let response = match matched.route.select_response() {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    route_id = %matched.route.id(),
                    error = %err,
                    "No response available for matched route"
                );
                return self.not_found(request).await;
            }
        };

        info!(
            route_id = %matched.route.id(),
            response_id = %response.id(),
            status = response.status_code(),
            "Response selected"
        );
        let mut reservation = Reservation::new(Arc::clone(&response));
        let context = TemplateContext::from_request(&matched.path_params, request);
        let rendered = self.deliver(&response, &context).await;
        matched.route.use_response(&response);
        reservation.delivered();
        rendered
    }

    async fn deliver(&self, response: &Response, context: &TemplateContext) -> RenderedResponse {
        let rendered = response.render(context);
        if self.apply_delays {
            response.delay().apply().await;
        }
        rendered
    }

    /// Deliver a reserved error response and count the hit on it.
    async fn deliver_error(
        &self,
        response: &Arc<Response>,
        request: &MockRequest,
        params: &PathParams,
    ) -> RenderedResponse {
        let mut reservation = Reservation::new(Arc::clone(response));
        let context = TemplateContext::from_request(params, request);
        let rendered = self.deliver(response, &context).await;
        response.record_hit();
        reservation.delivered();
        rendered
    }

    async fn not_found(&self, request: &MockRequest) -> RenderedResponse {
        match self.router.get_error_response(StatusCode::NOT_FOUND) {
            Some(response) => {
                self.deliver_error(&response, request, &PathParams::default())
                    .await
            }
            None => RenderedResponse::detail(StatusCode::NOT_FOUND, NOT_FOUND_DETAIL),
        }
    }

    async fn unauthorized(
        &self,
        matched: &RouteMatch,
        request: &MockRequest,
        err: EngineError,
    ) -> RenderedResponse {
        let reason = match err {
            EngineError::Authentication(reason) => reason,
            other => other.to_string(),
        };
        warn!(
            route_id = %matched.route.id(),
            auth = matched.route.auth().method(),
            reason = %reason,
            "Authentication failed"
        );

        let fallback = matched
            .route
            .auth()
            .unauthorized_response()
            .filter(|r| r.try_claim())
            .map(Arc::clone)
            .or_else(|| self.router.get_error_response(StatusCode::UNAUTHORIZED));
        match fallback {
            Some(response) => {
                self.deliver_error(&response, request, &matched.path_params)
                    .await
            }
            None => RenderedResponse::detail(StatusCode::UNAUTHORIZED, &reason),
        }
    }
}

/// One reserved use of a response. Dropped before delivery completes (the
/// request future was cancelled during the delay), the use is handed back.
struct Reservation {
    response: Arc<Response>,
    delivered: bool,
}

impl Reservation {
    fn new(response: Arc<Response>) -> Self {
        Self {
            response,
            delivered: false,
        }
    }

    fn delivered(&mut self) {
        self.delivered = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.delivered {
            debug!(response_id = %self.response.id(), "Delivery abandoned, use released");
            self.response.release_claim();
        }
    }
}
