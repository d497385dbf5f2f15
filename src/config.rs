//! # Configuration
//!
//! [`EngineConfig`] is the bootstrap state of an engine: routes, global error
//! responses, the OpenAPI document to derive extra routes from, HMAC
//! tolerances and the management prefix.
//!
//! ## Sources
//!
//! 1. A file whose path comes from the CLI or `DECOY_CONFIG_PATH`
//!    (default `config.json`). The format follows the extension: `.json`,
//!    `.yaml`/`.yml` or `.toml`.
//! 2. Environment overrides, applied on top of the file:
//!
//! | Variable | Field |
//! |---|---|
//! | `DECOY_OPENAPI_BOOTSTRAP` | `openapi_bootstrap` |
//! | `DECOY_HMAC_PAST_TOLERANCE` | `hmac.past_seconds` |
//! | `DECOY_HMAC_FUTURE_TOLERANCE` | `hmac.future_seconds` |
//! | `DECOY_INTERNAL_PREFIX` | `internal_prefix` |
//!
//! ## Example
//!
//! ```json
//! {
//!   "routes": [
//!     {
//!       "path": "/users/{id:integer}",
//!       "methods": ["GET"],
//!       "responses": [{"status_code": 200, "body": {"id": "{{id}}"}}]
//!     }
//!   ],
//!   "error_responses": [{"status_code": 404, "body": {"error": "nope"}}]
//! }
//! ```

use crate::openapi;
use crate::response::{Response, ResponseSelector};
use crate::route::{Route, RouteDef};
use crate::router::Router;
use crate::security::HmacTolerance;
use crate::service::{MockService, DEFAULT_INTERNAL_PREFIX};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "DECOY_CONFIG_PATH";
/// Config file used when nothing else is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

fn default_error_selector() -> ResponseSelector {
    ResponseSelector::First
}

fn default_internal_prefix() -> String {
    DEFAULT_INTERNAL_PREFIX.to_string()
}

/// Bootstrap configuration of an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Bootstrap routes, in match order
    #[serde(default)]
    pub routes: Vec<RouteDef>,
    /// Bootstrap global error responses
    #[serde(default)]
    pub error_responses: Vec<Response>,
    /// Selector for global error responses
    #[serde(default = "default_error_selector")]
    pub error_selector: ResponseSelector,
    /// OpenAPI document to derive extra routes from
    #[serde(default, alias = "openapi_boostrap", skip_serializing_if = "Option::is_none")]
    pub openapi_bootstrap: Option<PathBuf>,
    /// Default signed-URL tolerances
    #[serde(default)]
    pub hmac: HmacTolerance,
    /// Path prefix reserved for the management API
    #[serde(default = "default_internal_prefix")]
    pub internal_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            error_responses: Vec::new(),
            error_selector: default_error_selector(),
            openapi_bootstrap: None,
            hmac: HmacTolerance::default(),
            internal_prefix: default_internal_prefix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    fn of(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("toml") => Ok(Format::Toml),
            other => bail!(
                "unsupported configuration format {:?} for {} (expected .json, .yaml, .yml or .toml)",
                other.unwrap_or(""),
                path.display()
            ),
        }
    }
}

impl EngineConfig {
    /// Config file path: `explicit`, else `DECOY_CONFIG_PATH`, else `config.json`.
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Parse a config file without environment overrides.
    ///
    /// # Errors
    ///
    /// Unreadable file, unknown extension or invalid content.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let format = Format::of(path)?;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot load configuration file \"{}\"", path.display()))?;
        Self::from_str(&content, format)
            .with_context(|| format!("Invalid configuration file \"{}\"", path.display()))
    }

    fn from_str(content: &str, format: Format) -> anyhow::Result<Self> {
        Ok(match format {
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Toml => toml::from_str(content)?,
        })
    }

    /// Load the file at [`EngineConfig::resolve_path`] and apply the process
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_file`] and [`EngineConfig::apply_env`].
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = Self::resolve_path(explicit);
        let mut config = Self::from_file(&path)?;
        let env: HashMap<String, String> = std::env::vars().collect();
        config.apply_env(&env)?;
        info!(
            config = %path.display(),
            routes_count = config.routes.len(),
            error_responses_count = config.error_responses.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Apply `DECOY_*` overrides from `vars`.
    ///
    /// # Errors
    ///
    /// A tolerance variable that is not a whole number of seconds.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> anyhow::Result<()> {
        if let Some(path) = vars.get("DECOY_OPENAPI_BOOTSTRAP") {
            self.openapi_bootstrap = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(prefix) = vars.get("DECOY_INTERNAL_PREFIX") {
            self.internal_prefix = prefix.clone();
        }
        if let Some(raw) = vars.get("DECOY_HMAC_PAST_TOLERANCE") {
            self.hmac.past_seconds = raw
                .trim()
                .parse()
                .with_context(|| format!("DECOY_HMAC_PAST_TOLERANCE={raw} is not a number of seconds"))?;
        }
        if let Some(raw) = vars.get("DECOY_HMAC_FUTURE_TOLERANCE") {
            self.hmac.future_seconds = raw.trim().parse().with_context(|| {
                format!("DECOY_HMAC_FUTURE_TOLERANCE={raw} is not a number of seconds")
            })?;
        }
        Ok(())
    }

    /// Build every bootstrap route: config routes first, then OpenAPI-derived
    /// ones. HMAC defaults are applied to strategies without their own.
    ///
    /// # Errors
    ///
    /// Invalid route definitions or an unreadable OpenAPI document.
    pub fn build_routes(&self) -> anyhow::Result<Vec<Route>> {
        let mut defs = self.routes.clone();
        if let Some(document) = &self.openapi_bootstrap {
            defs.extend(openapi::load_routes(document)?);
        }

        defs.into_iter()
            .enumerate()
            .map(|(index, mut def)| {
                def.auth.apply_hmac_defaults(self.hmac);
                let path = def.path.clone();
                Route::from_def(def)
                    .with_context(|| format!("route #{index} ({path}) is invalid"))
            })
            .collect()
    }

    /// Fill `router` with this configuration in one atomic step.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::build_routes`]; duplicate ids are also rejected.
    /// The router is untouched on error.
    pub fn apply_to(&self, router: &Router) -> anyhow::Result<()> {
        let routes = self.build_routes()?;
        router
            .replace_all(routes, self.error_responses.clone(), self.error_selector)
            .context("configuration cannot be applied")
    }

    /// Fresh router holding this configuration.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::apply_to`].
    pub fn build_router(&self) -> anyhow::Result<Router> {
        let router = Router::with_error_selector(self.error_selector);
        self.apply_to(&router)?;
        Ok(router)
    }

    /// Service answering from `router` with this configuration's prefix.
    #[must_use]
    pub fn service(&self, router: Arc<Router>) -> MockService {
        MockService::new(router).with_internal_prefix(self.internal_prefix.clone())
    }
}
