use decoy::config::EngineConfig;
use decoy::hot_reload;
use decoy::response::ResponseSelector;
use decoy::router::Router;
use http::{Method, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;
use common::requests::get;
use common::temp_files::{create_temp_file, create_temp_json, create_temp_yaml};

const OPENAPI: &str = r#"
openapi: 3.0.3
info: { title: Bootstrap, version: "1" }
paths:
  /users/{id}:
    get:
      operationId: get_user
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
      responses:
        "200":
          description: OK
          content:
            application/json:
              schema:
                type: object
                required: [id]
"#;

fn route_ids(router: &Router) -> Vec<String> {
    router.routes().iter().map(|r| r.id().to_string()).collect()
}

#[test]
fn test_config_formats_load_the_same_routes() {
    let json = create_temp_json(
        r#"{"routes": [{"id": "ping", "path": "/ping", "responses": [{"status_code": 200, "body": "pong"}]}]}"#,
    );
    let yaml = create_temp_yaml(
        "routes:\n  - id: ping\n    path: /ping\n    responses:\n      - status_code: 200\n        body: pong\n",
    );
    let toml = create_temp_file(
        "[[routes]]\nid = \"ping\"\npath = \"/ping\"\n\n[[routes.responses]]\nstatus_code = 200\nbody = \"pong\"\n",
        "toml",
    );

    for file in [&json, &yaml, &toml] {
        let config = EngineConfig::from_file(file.path()).unwrap();
        let router = config.build_router().unwrap();
        assert_eq!(route_ids(&router), vec!["ping"]);
        let matched = router.match_parts(&Method::GET, "/ping").unwrap();
        assert_eq!(matched.route.responses().len(), 1);
    }
}

#[test]
fn test_invalid_config_files() {
    let unknown_ext = create_temp_file("{}", "ini");
    assert!(EngineConfig::from_file(unknown_ext.path()).is_err());

    let broken = create_temp_json("{\"routes\": [");
    assert!(EngineConfig::from_file(broken.path()).is_err());

    let bad_route = create_temp_json(r#"{"routes": [{"path": "/a/{id:date}"}]}"#);
    let config = EngineConfig::from_file(bad_route.path()).unwrap();
    let err = config.build_router().unwrap_err();
    assert!(format!("{err:#}").contains("route #0 (/a/{id:date}) is invalid"));
}

#[test]
fn test_openapi_bootstrap_appends_after_config_routes() {
    let openapi = create_temp_yaml(OPENAPI);
    let config = create_temp_json(&format!(
        r#"{{
            "openapi_boostrap": {path:?},
            "routes": [{{"id": "admin", "path": "/users/0"}}]
        }}"#,
        path = openapi.path().display().to_string()
    ));

    let config = EngineConfig::from_file(config.path()).unwrap();
    let router = config.build_router().unwrap();
    assert_eq!(route_ids(&router), vec!["admin", "get_user"]);

    let derived = router.get_route(&"get_user".into()).unwrap();
    assert_eq!(derived.path().pattern(), "/users/{id:integer}");
    assert_eq!(derived.validators().len(), 1);
    assert!(router.match_parts(&Method::GET, "/users/12").is_some());
}

#[tokio::test]
async fn test_config_service_uses_internal_prefix() {
    let file = create_temp_yaml(
        "internal_prefix: /admin\nerror_responses:\n  - status_code: 404\n    body: gone\nroutes:\n  - path: /internal/x\n    responses:\n      - status_code: 200\n",
    );
    let config = EngineConfig::from_file(file.path()).unwrap();
    let service = config.service(Arc::new(config.build_router().unwrap()));

    assert_eq!(service.handle(&get("/internal/x")).await.status, StatusCode::OK);
    let reply = service.handle(&get("/admin/routes")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body_text(), "gone");
}

#[test]
fn test_reload_swaps_contents_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"error_selector": "balanced", "routes": [{"id": "a", "path": "/a"}, {"id": "b", "path": "/b"}]}"#,
    )
    .unwrap();

    let router = Router::new();
    hot_reload::reload(&path, &router).unwrap();
    assert_eq!(route_ids(&router), vec!["a", "b"]);
    assert_eq!(router.error_selector(), ResponseSelector::Balanced);

    // second route is invalid: nothing changes
    std::fs::write(
        &path,
        r#"{"routes": [{"id": "c", "path": "/c"}, {"id": "d", "path": "/d", "methods": []}]}"#,
    )
    .unwrap();
    assert!(hot_reload::reload(&path, &router).is_err());
    assert_eq!(route_ids(&router), vec!["a", "b"]);

    std::fs::write(&path, "not json").unwrap();
    assert!(hot_reload::reload(&path, &router).is_err());
    assert_eq!(route_ids(&router), vec!["a", "b"]);

    std::fs::write(&path, r#"{"routes": [{"id": "c", "path": "/c"}]}"#).unwrap();
    hot_reload::reload(&path, &router).unwrap();
    assert_eq!(route_ids(&router), vec!["c"]);
    assert_eq!(router.error_selector(), ResponseSelector::First);
}

#[test]
fn test_watcher_reloads_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"routes": [{"id": "before", "path": "/x"}]}"#).unwrap();

    let router = Arc::new(Router::new());
    hot_reload::reload(&path, &router).unwrap();
    let _watcher = hot_reload::watch_config(&path, Arc::clone(&router)).unwrap();

    // give the backend a moment to register the watch
    std::thread::sleep(Duration::from_millis(200));
    std::fs::write(&path, r#"{"routes": [{"id": "after", "path": "/x"}]}"#).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while route_ids(&router) != vec!["after"] && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(route_ids(&router), vec!["after"]);
}
