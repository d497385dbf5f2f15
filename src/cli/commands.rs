use crate::config::EngineConfig;
use crate::logging::{init_logging, LogConfig};
use crate::request::MockRequest;
use crate::response::RenderedResponse;
use crate::router::Router;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line interface for decoy
#[derive(Parser, Debug)]
#[command(name = "decoy")]
#[command(about = "HTTP service-virtualization engine", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a configuration and list the resulting routes
    Check {
        /// Configuration file (JSON, YAML or TOML); falls back to
        /// DECOY_CONFIG_PATH, then config.json
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run one simulated request and print the reply
    Match {
        /// Configuration file (JSON, YAML or TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Absolute URL or path with optional query
        #[arg(short, long)]
        url: String,

        /// Header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Cookie as `name=value` (repeatable)
        #[arg(long = "cookie")]
        cookies: Vec<String>,

        /// Form field as `name=value` (repeatable)
        #[arg(long = "form")]
        form: Vec<String>,

        /// Raw request body
        #[arg(short, long)]
        body: Option<String>,

        /// Skip configured response delays
        #[arg(long, default_value_t = false)]
        no_delay: bool,
    },
}

/// Parse arguments, initialise logging and run the selected command.
///
/// # Errors
///
/// Returns an error if:
/// - Logging cannot be initialised
/// - The configuration or OpenAPI bootstrap cannot be loaded
/// - A route definition is invalid
/// - A `match` argument is malformed
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging = init_logging(&LogConfig::from_env())?;

    match cli.command {
        Commands::Check { config } => {
            let config = EngineConfig::load(config.as_deref())?;
            let router = config.build_router()?;
            for line in describe_routes(&router) {
                println!("{line}");
            }
            println!(
                "{} routes, {} error responses",
                router.routes().len(),
                router.error_responses().len()
            );
            Ok(())
        }
        Commands::Match {
            config,
            method,
            url,
            headers,
            cookies,
            form,
            body,
            no_delay,
        } => {
            let config = EngineConfig::load(config.as_deref())?;
            let router = Arc::new(config.build_router()?);
            let request = build_request(&method, &url, &headers, &cookies, &form, body)?;

            let mut service = config.service(router);
            if no_delay {
                service = service.without_delays();
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .context("failed to start the async runtime")?;
            let reply = runtime.block_on(service.handle(&request));
            print!("{}", format_reply(&reply));
            Ok(())
        }
    }
}

/// One `[route] METHODS PATH -> id (...)` line per route, in match order.
pub(crate) fn describe_routes(router: &Router) -> Vec<String> {
    router
        .routes()
        .iter()
        .map(|route| {
            let methods: Vec<&str> = route.methods().iter().map(Method::as_str).collect();
            format!(
                "[route] {} {} -> {} ({} responses, {} validators)",
                methods.join(","),
                route.path(),
                route.id(),
                route.responses().len(),
                route.validators().len()
            )
        })
        .collect()
}

fn split_pair<'a>(raw: &'a str, separator: char, what: &str) -> anyhow::Result<(&'a str, &'a str)> {
    raw.split_once(separator)
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| anyhow!("{what} '{raw}' must look like name{separator}value"))
}

pub(crate) fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    cookies: &[String],
    form: &[String],
    body: Option<String>,
) -> anyhow::Result<MockRequest> {
    let method = crate::route::parse_method(method)
        .ok_or_else(|| anyhow!("unsupported HTTP method '{method}'"))?;
    let mut request = MockRequest::from_url(method, url);
    for header in headers {
        let (name, value) = split_pair(header, ':', "header")?;
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }
    for cookie in cookies {
        let (name, value) = split_pair(cookie, '=', "cookie")?;
        request = request.with_cookie(name, value);
    }
    for field in form {
        let (name, value) = split_pair(field, '=', "form field")?;
        request = request.with_form_field(name, value);
    }
    Ok(request)
}

/// Status line, headers, blank line, body.
pub(crate) fn format_reply(reply: &RenderedResponse) -> String {
    let mut out = format!("{}\n", reply.status);
    for (name, value) in &reply.headers {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out.push('\n');
    out.push_str(&reply.body_text());
    out.push('\n');
    out
}
