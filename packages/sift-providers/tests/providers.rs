use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		sift_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn default_headers_must_be_strings() {
	let mut headers = Map::new();

	headers.insert("x-retries".to_string(), Value::from(3));

	let err = sift_providers::auth_headers("secret", &headers)
		.expect_err("Expected non-string header error.");

	assert!(err.to_string().contains("must be strings"));
}

#[test]
fn default_headers_are_forwarded() {
	let mut headers = Map::new();

	headers.insert("x-tenant".to_string(), Value::from("docs"));

	let built = sift_providers::auth_headers("secret", &headers).expect("Failed to build headers.");

	assert_eq!(built.get("x-tenant").expect("Missing x-tenant header."), "docs");
}
