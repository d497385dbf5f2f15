//! # Router Module
//!
//! The router holds the ordered set of routes and the global error responses,
//! and dispatches every incoming request to the **first** route that matches.
//!
//! ## Overview
//!
//! - Routes are tried in registration order; insertion order is match priority.
//! - Route ids are unique within a router.
//! - Global error responses are keyed by status code (not unique) and picked
//!   with the router's error selector, for the 404 (no route) and 401 (auth
//!   failed) fallbacks.
//!
//! ## Concurrency
//!
//! The route list and error responses form one immutable snapshot held in an
//! [`arc_swap::ArcSwap`]. Matching loads the current snapshot without taking
//! a lock; every mutation runs under a writer mutex, builds a new snapshot and
//! swaps it in atomically. A request that matched a route keeps an `Arc` to it,
//! so deleting the route concurrently never yields a half-deleted match.
//!
//! ## Example
//!
//! ```rust
//! use decoy::request::MockRequest;
//! use decoy::response::Response;
//! use decoy::route::RouteDef;
//! use decoy::router::Router;
//! use http::Method;
//! use serde_json::json;
//!
//! let router = Router::new();
//! router
//!     .add_route_def(
//!         RouteDef::new("/users/{id:integer}")
//!             .with_response(Response::new(200, json!({"id": "{{id}}"})).unwrap()),
//!     )
//!     .unwrap();
//!
//! let matched = router.match_request(&MockRequest::new(Method::GET, "/users/7")).unwrap();
//! assert_eq!(matched.path_params.get("id"), Some("7"));
//! ```

mod core;

pub use self::core::{RouteMatch, Router};
