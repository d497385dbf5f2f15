use super::{normalize, PathMatcher, PlaceholderType};
use crate::error::EngineError;

#[test]
fn test_normalize_adds_leading_slash() {
    assert_eq!(normalize("users"), "/users");
    assert_eq!(normalize("/users"), "/users");
    assert_eq!(normalize("/users/"), "/users/");
    assert_eq!(normalize(""), "/");
}

#[test]
fn test_normalize_is_idempotent() {
    for raw in ["", "/", "a", "/a/b/", "a/{id:integer}", "//x", " spaced "] {
        assert_eq!(normalize(&normalize(raw)), normalize(raw), "input {raw:?}");
    }
}

#[test]
fn test_literal_pattern_matches_only_itself() {
    let m = PathMatcher::compile("users").unwrap();
    assert_eq!(m.pattern(), "/users");
    let params = m.match_path("/users").unwrap();
    assert!(params.is_empty());
    assert!(m.match_path("users").is_some());
    assert!(m.match_path("/users/").is_none());
    assert!(m.match_path("/users/1").is_none());
    assert!(m.match_path("/api/users").is_none());
}

#[test]
fn test_literal_regex_characters_are_escaped() {
    let m = PathMatcher::compile("/v1.0/items+(all)").unwrap();
    assert!(m.match_path("/v1.0/items+(all)").is_some());
    assert!(m.match_path("/v1x0/items+(all)").is_none());
}

#[test]
fn test_integer_placeholder() {
    let m = PathMatcher::compile("/users/{id:integer}/books").unwrap();
    let params = m.match_path("/users/1234/books").unwrap();
    assert_eq!(params.get("id"), Some("1234"));
    assert!(m.match_path("/users/12a4/books").is_none());
    assert!(m.match_path("/users/0123/books").is_none());
    assert!(m.match_path("/users//books").is_none());
}

#[test]
fn test_number_placeholder() {
    let m = PathMatcher::compile("/price/{value:number}").unwrap();
    assert_eq!(m.match_path("/price/12").unwrap().get("value"), Some("12"));
    assert_eq!(m.match_path("/price/12.5").unwrap().get("value"), Some("12.5"));
    assert_eq!(m.match_path("/price/12,5").unwrap().get("value"), Some("12,5"));
    assert!(m.match_path("/price/1.2.3").is_none());
    assert!(m.match_path("/price/.5").is_none());
}

#[test]
fn test_string_placeholder() {
    let m = PathMatcher::compile("/files/{name:string}").unwrap();
    assert_eq!(
        m.match_path("/files/report-2024.pdf").unwrap().get("name"),
        Some("report-2024.pdf")
    );
    assert!(m.match_path("/files/a/b").is_none());
    assert!(m.match_path("/files/a b").is_none());
    assert!(m.match_path("/files/").is_none());
}

#[test]
fn test_boolean_and_uuid4_placeholders() {
    let m = PathMatcher::compile("/flags/{on:boolean}/{id:uuid4}").unwrap();
    let params = m
        .match_path("/flags/1/3f2b8c1e-9d4a-4b7e-8f21-0c5d6e7f8a9b")
        .unwrap();
    assert_eq!(params.get("on"), Some("1"));
    assert_eq!(params.get("id"), Some("3f2b8c1e-9d4a-4b7e-8f21-0c5d6e7f8a9b"));
    // version nibble must be 4
    assert!(m
        .match_path("/flags/1/3f2b8c1e-9d4a-1b7e-8f21-0c5d6e7f8a9b")
        .is_none());
    assert!(m
        .match_path("/flags/2/3f2b8c1e-9d4a-4b7e-8f21-0c5d6e7f8a9b")
        .is_none());
}

#[test]
fn test_placeholder_inside_segment() {
    let m = PathMatcher::compile("/api/v{version:integer}/endpoint").unwrap();
    assert_eq!(
        m.match_path("/api/v1234/endpoint").unwrap().get("version"),
        Some("1234")
    );
    assert!(m.match_path("/api/version/endpoint").is_none());
}

#[test]
fn test_params_in_pattern_order() {
    let m = PathMatcher::compile("/a/{x:string}/b/{y:integer}").unwrap();
    let params = m.match_path("/a/foo/b/7").unwrap();
    let pairs: Vec<(&str, &str)> = params.iter().collect();
    assert_eq!(pairs, vec![("x", "foo"), ("y", "7")]);
    assert_eq!(params.to_map().len(), 2);
}

#[test]
fn test_unknown_placeholder_type_is_construction_error() {
    let err = PathMatcher::compile("/a/{x:float}").unwrap_err();
    assert!(matches!(err, EngineError::PathPattern { .. }));
}

#[test]
fn test_duplicate_and_invalid_names_rejected() {
    assert!(PathMatcher::compile("/a/{x:integer}/{x:string}").is_err());
    assert!(PathMatcher::compile("/a/{1x:integer}").is_err());
}

#[test]
fn test_placeholder_type_parse() {
    assert_eq!("uuid4".parse::<PlaceholderType>(), Ok(PlaceholderType::Uuid4));
    assert!("int".parse::<PlaceholderType>().is_err());
}

#[test]
fn test_serde_uses_pattern_string() {
    let m: PathMatcher = serde_json::from_str("\"users/{id:integer}\"").unwrap();
    assert_eq!(serde_json::to_string(&m).unwrap(), "\"/users/{id:integer}\"");
    assert!(serde_json::from_str::<PathMatcher>("\"/x/{y:nope}\"").is_err());
}
