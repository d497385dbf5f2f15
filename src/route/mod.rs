//! # Route Module
//!
//! A route maps a path pattern plus a set of HTTP methods and an
//! authentication policy to an ordered list of candidate responses.
//!
//! ## Invariant
//!
//! When a route has response validators, every one of its responses must
//! pass **at least one** of them. Every mutating operation re-checks this
//! before committing and leaves the route unchanged when it would break.
//!
//! ## Concurrency
//!
//! The path, methods, auth and selector are immutable after construction, so
//! matching never locks. Responses and validators live behind one `RwLock`
//! so a request never sees a list mid-update; hit counters are atomics.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "id": "get-user",
//!   "path": "/users/{id:integer}",
//!   "methods": ["GET", "HEAD"],
//!   "auth": {"method": "token", "token": "abc"},
//!   "selector": "balanced",
//!   "responses": [{"status_code": 200, "body": {"id": "{{id}}"}}],
//!   "response_validators": [{"status_code": 200, "json_schema": {"type": "object"}}]
//! }
//! ```

mod core;
mod def;

pub use self::core::Route;
pub use self::def::{RouteDef, SUPPORTED_METHODS};
pub(crate) use self::def::parse_method;
