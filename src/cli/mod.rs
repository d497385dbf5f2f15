//! # CLI Module
//!
//! Command-line front end of the `decoy` binary.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Load a configuration (plus its OpenAPI bootstrap), build the router and
//! list the routes in match order:
//!
//! ```bash
//! decoy check --config config.yaml
//! [route] GET /users/{id:integer} -> 01J9... (2 responses, 1 validators)
//! ```
//!
//! ### `match`
//!
//! Run one simulated request through the engine and print the reply:
//!
//! ```bash
//! decoy match --config config.json --method POST --url '/login?next=/' \
//!     -H 'content-type: application/x-www-form-urlencoded' --form user=alice --no-delay
//! ```
//!
//! Logging is configured from `DECOY_LOG_*` before any command runs; see
//! [`crate::logging`].

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
