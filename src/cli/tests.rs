//! Unit tests for CLI commands

use super::commands::{build_request, describe_routes, format_reply};
use crate::cli::{Cli, Commands};
use crate::response::{RenderedResponse, Response};
use crate::route::RouteDef;
use crate::router::Router;
use clap::Parser;
use http::{Method, StatusCode};
use serde_json::json;

#[test]
fn test_check_command_parses() {
    let cli = Cli::try_parse_from(["decoy", "check", "--config", "mocks.yaml"]).unwrap();
    match cli.command {
        Commands::Check { config } => {
            assert_eq!(config.unwrap().to_string_lossy(), "mocks.yaml");
        }
        _ => panic!("Expected Check command"),
    }

    let cli = Cli::try_parse_from(["decoy", "check"]).unwrap();
    assert!(matches!(cli.command, Commands::Check { config: None }));
}

#[test]
fn test_match_command_with_flags() {
    let cli = Cli::try_parse_from([
        "decoy",
        "match",
        "--method",
        "post",
        "--url",
        "/login?next=/",
        "-H",
        "x-trace: 1",
        "-H",
        "accept: */*",
        "--cookie",
        "session=abc",
        "--form",
        "user=alice",
        "--no-delay",
    ])
    .unwrap();

    match cli.command {
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
            assert!(config.is_none());
            assert_eq!(method, "post");
            assert_eq!(url, "/login?next=/");
            assert_eq!(headers, vec!["x-trace: 1", "accept: */*"]);
            assert_eq!(cookies, vec!["session=abc"]);
            assert_eq!(form, vec!["user=alice"]);
            assert!(body.is_none());
            assert!(no_delay);
        }
        _ => panic!("Expected Match command"),
    }
}

#[test]
fn test_match_requires_url() {
    assert!(Cli::try_parse_from(["decoy", "match"]).is_err());
}

#[test]
fn test_build_request() {
    let request = build_request(
        "patch",
        "http://localhost:8080/items/3?x=1",
        &["Authorization: Bearer t".to_string()],
        &["a=b".to_string()],
        &["user=alice".to_string()],
        None,
    )
    .unwrap();
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.path, "/items/3");
    assert_eq!(request.query, "x=1");
    assert_eq!(request.header("authorization"), Some("Bearer t"));
    assert_eq!(request.cookie("a"), Some("b"));
    assert_eq!(request.form_field("user"), Some("alice"));
}

#[test]
fn test_build_request_parses_form_body() {
    let request = build_request(
        "POST",
        "/login",
        &["Content-Type: application/x-www-form-urlencoded".to_string()],
        &[],
        &[],
        Some("user=bob&password=pw".to_string()),
    )
    .unwrap();
    assert_eq!(request.form_field("password"), Some("pw"));
}

#[test]
fn test_build_request_rejects_bad_input() {
    assert!(build_request("BREW", "/", &[], &[], &[], None).is_err());
    assert!(build_request("GET", "/", &["no-colon".to_string()], &[], &[], None).is_err());
    assert!(build_request("GET", "/", &[], &["=v".to_string()], &[], None).is_err());
}

#[test]
fn test_describe_routes() {
    let router = Router::new();
    router
        .add_route_def(
            RouteDef::new("/users/{id:integer}")
                .with_id("users")
                .with_methods([Method::GET, Method::HEAD])
                .with_response(Response::new(200, json!({})).unwrap()),
        )
        .unwrap();
    assert_eq!(
        describe_routes(&router),
        vec!["[route] GET,HEAD /users/{id:integer} -> users (1 responses, 0 validators)"]
    );
}

#[test]
fn test_format_reply() {
    let reply = RenderedResponse::detail(StatusCode::NOT_FOUND, "gone");
    let text = format_reply(&reply);
    assert!(text.starts_with("404 Not Found\n"));
    assert!(text.contains("content-type: application/json\n"));
    assert!(text.ends_with("\n\n{\"detail\":\"gone\"}\n"));
}
