//! # Hot Reload
//!
//! Watches the configuration file and swaps the router's contents whenever it
//! changes, without restarting the process.
//!
//! A reload parses the file, applies the environment overrides, derives the
//! OpenAPI routes and builds every route before touching the router; the new
//! routes, error responses and error selector are then published in one
//! atomic step. If anything fails the error is logged and the previous
//! contents keep serving.
//!
//! ```rust,no_run
//! use decoy::hot_reload::watch_config;
//! use decoy::router::Router;
//! use std::sync::Arc;
//!
//! let router = Arc::new(Router::new());
//! // keep the watcher alive for as long as reloads are wanted
//! let _watcher = watch_config("config.json", Arc::clone(&router))?;
//! # Ok::<(), notify::Error>(())
//! ```

use crate::config::EngineConfig;
use crate::router::Router;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Reload `path` into `router` once.
///
/// # Errors
///
/// Any configuration or route error; the router is untouched in that case.
pub fn reload(path: &Path, router: &Router) -> anyhow::Result<()> {
    let config = EngineConfig::load(Some(path))?;
    config.apply_to(router)?;
    info!(
        config = %path.display(),
        routes_count = router.routes().len(),
        "hot-reload: configuration applied"
    );
    Ok(())
}

/// Watch `config_path` and reload `router` on every modification.
///
/// The parent directory is watched so that editors replacing the file
/// atomically (write to temp, rename) are picked up too.
///
/// # Errors
///
/// Fails if the watcher cannot be created or the directory watched.
pub fn watch_config<P>(config_path: P, router: Arc<Router>) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
{
    let path: PathBuf = config_path.as_ref().to_path_buf();
    let file_name = path.file_name().map(ToOwned::to_owned);
    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let reload_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref());
                if !touches_config {
                    return;
                }
                if let Err(e) = reload(&reload_path, &router) {
                    error!(
                        config = %reload_path.display(),
                        error = %format!("{e:#}"),
                        "hot-reload: keeping previous configuration"
                    );
                }
            }
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
    info!(config = %path.display(), "hot-reload: watching configuration");
    Ok(watcher)
}
