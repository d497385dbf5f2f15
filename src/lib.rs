//! # decoy
//!
//! **decoy** is an HTTP service-virtualization engine: it stands in for a real
//! HTTP service during testing and answers incoming requests with configured
//! mock responses.
//!
//! ## Overview
//!
//! An operator registers routes. Each route combines a typed path pattern,
//! a set of allowed methods, an optional authentication strategy, a list of
//! candidate responses and an optional list of JSON-Schema response
//! validators. For every request the engine picks the first matching route,
//! authenticates the request, selects one response with the route's strategy
//! (`first`, `random` by weight, or `balanced` by hit count), waits for the
//! response's delay and renders the reply.
//!
//! ## Architecture
//!
//! - **[`matcher`]** - `{name:type}` path patterns compiled to anchored regexes
//! - **[`route`]** - one mocked endpoint and its response/validator CRUD
//! - **[`router`]** - ordered routes, global error responses, lock-free reads
//! - **[`response`]** - responses, selection strategies, body templating
//! - **[`validator`]** - JSON-Schema checks binding responses to a contract
//! - **[`security`]** - token, basic, form, cookie and HMAC-signed-URL auth
//! - **[`service`]** - the per-request state machine with its fallbacks
//! - **[`config`]** / **[`openapi`]** / **[`hot_reload`]** - bootstrap and live reload
//! - **[`logging`]** - `tracing-subscriber` setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant T as Transport
//!     participant S as MockService
//!     participant R as Router
//!     participant Rt as Route
//!     participant Rs as Response
//!
//!     T->>S: handle(MockRequest)
//!     S->>R: match_request
//!     alt no route
//!         R-->>S: None
//!         S-->>T: 404 error response / {"detail": ...}
//!     else matched
//!         R-->>S: RouteMatch
//!         S->>Rt: authenticate
//!         alt rejected
//!             S-->>T: unauthorized / 401 error response
//!         else accepted
//!             S->>Rt: select_response
//!             S->>Rs: render + delay
//!             S->>Rt: use_response (hit counters)
//!             S-->>T: RenderedResponse
//!         end
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use decoy::request::MockRequest;
//! use decoy::response::Response;
//! use decoy::route::RouteDef;
//! use decoy::router::Router;
//! use decoy::service::MockService;
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let router = Arc::new(Router::new());
//! router
//!     .add_route_def(
//!         RouteDef::new("/users/{id:integer}")
//!             .with_response(Response::new(200, json!({"id": "{{id}}"})).unwrap()),
//!     )
//!     .unwrap();
//!
//! let service = MockService::new(router);
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
//! let reply = runtime.block_on(service.handle(&MockRequest::new(Method::GET, "/users/42")));
//! assert_eq!(reply.status.as_u16(), 200);
//! assert_eq!(reply.body_text(), r#"{"id":"42"}"#);
//! ```
//!
//! ## Configuration
//!
//! Bootstrap routes and error responses come from a JSON, YAML or TOML file
//! (see [`config::EngineConfig`]) and may be extended with routes derived
//! from an OpenAPI document. The `decoy` binary loads it:
//!
//! ```bash
//! decoy check --config config.yaml
//! decoy match --config config.yaml --method GET --url /users/42
//! ```
//!
//! ## Concurrency
//!
//! Routers are shared as `Arc<Router>`. Matching never blocks on writers; a
//! route's responses sit behind a per-route lock and every hit counter is an
//! atomic, so requests to different routes never contend. Delays suspend only
//! the requesting task.

pub mod cli;
pub mod collections;
pub mod config;
pub mod delay;
pub mod error;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod matcher;
pub mod openapi;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod security;
pub mod service;
pub mod validator;
pub mod validator_cache;

pub use error::{EngineError, Result};
pub use request::MockRequest;
pub use response::{RenderedResponse, Response, ResponseSelector};
pub use route::{Route, RouteDef};
pub use router::{RouteMatch, Router};
pub use service::MockService;
