use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use sift_api::{routes, state::AppState};
use sift_config::{EmbeddingProviderConfig, LlmProviderConfig};
use sift_service::{BoxFuture, EmbeddingProvider, LlmProvider, Providers};
use sift_testkit::TestDatabase;

struct UnitEmbedding;
impl EmbeddingProvider for UnitEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		let vecs = vec![vec![1.0, 0.0, 0.0]; texts.len()];

		Box::pin(async move { Ok(vecs) })
	}
}

struct EchoLlm;
impl LlmProvider for EchoLlm {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_system_text: &'a str,
		_user_text: &'a str,
	) -> BoxFuture<'a, sift_providers::Result<String>> {
		Box::pin(async { Ok("Grounded answer.".to_string()) })
	}
}

async fn test_state(test_db: &TestDatabase) -> AppState {
	let config = sift_testkit::test_config(test_db.config(), 3);
	let providers = Providers::new(Arc::new(UnitEmbedding), Arc::new(EchoLlm));

	AppState::with_providers(config, providers).await.expect("Failed to initialize app state.")
}

async fn post_json(app: Router, uri: &str, payload: serde_json::Value) -> (StatusCode, serde_json::Value) {
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri(uri)
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call route.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = serde_json::from_slice(&body).expect("Failed to parse response.");

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let app = routes::router(state.clone());
	let _ = routes::admin_router(state);
	let response = app
		.oneshot(Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."))
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn search_returns_items_and_diagnostics() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let db = test_db.connect().await.expect("Failed to connect.");
	let seeded = sift_testkit::seed_chunk(
		&db,
		"https://example.com/doc",
		"Hello world extract.",
		"hello world",
		Some(&[0.5, 0.1, -0.2]),
	)
	.await
	.expect("Failed to seed chunk.");
	let (status, json) = post_json(
		routes::router(state),
		"/v1/search",
		serde_json::json!({ "query": "hello", "top_k": 1 }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["items"][0]["chunk_id"], seeded.chunk_id);
	assert_eq!(json["diagnostics"]["ranked_chunks"][0]["from_bm25"], true);
	assert_eq!(json["diagnostics"]["ranked_chunks"][0]["url"], "https://example.com/doc");
	assert_eq!(json["diagnostics"]["config"]["vector_candidate_k"], 50);
	assert_eq!(json["diagnostics"]["candidate_counts"]["merged"], 1);
	assert!(json["diagnostics"].get("error").is_none());
}

#[tokio::test]
async fn blank_query_is_bad_request() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let (status, json) =
		post_json(routes::router(state), "/v1/search", serde_json::json!({ "query": "  " })).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn context_and_answer_over_empty_corpus() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let (status, json) = post_json(
		routes::router(state.clone()),
		"/v1/context",
		serde_json::json!({ "query": "anything" }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["passages"], serde_json::json!([]));
	assert_eq!(json["context"], "");
	assert_eq!(json["diagnostics"]["error"], "No embeddings found in database");

	let (status, json) =
		post_json(routes::router(state), "/v1/answer", serde_json::json!({ "query": "anything" }))
			.await;
	let types = json["events"]
		.as_array()
		.expect("events should be an array")
		.iter()
		.map(|event| event["type"].as_str().unwrap_or_default().to_string())
		.collect::<Vec<_>>();

	assert_eq!(status, StatusCode::OK);
	assert_eq!(types, vec!["delta", "debug", "sources", "done"]);
	assert_eq!(json["events"][1]["debug"]["error"], "No context available");
}

#[tokio::test]
async fn answer_streams_llm_reply_with_sources() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let db = test_db.connect().await.expect("Failed to connect.");

	sift_testkit::seed_chunk(
		&db,
		"https://example.com/myway",
		"MyWay is a prepaid program.",
		"myway prepaid",
		Some(&[1.0, 0.0, 0.0]),
	)
	.await
	.expect("Failed to seed chunk.");

	let (status, json) = post_json(
		routes::router(state),
		"/v1/answer",
		serde_json::json!({ "query": "What is MyWay?", "max_extracts": 2 }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["events"][0], serde_json::json!({ "type": "delta", "text": "Grounded answer." }));
	assert_eq!(json["events"][1]["debug"]["llm_request"]["model"], "test-llm");
	assert_eq!(json["events"][2]["sources"][0]["url"], "https://example.com/myway");
	assert_eq!(json["events"][2]["sources"][0]["from_vector"], true);
	assert_eq!(json["events"][3]["type"], "done");
}

#[tokio::test]
async fn admin_backfill_then_refresh() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let state = test_state(&test_db).await;
	let db = test_db.connect().await.expect("Failed to connect.");

	sift_testkit::seed_chunk(&db, "https://example.com/a", "Extract", "pending chunk", None)
		.await
		.expect("Failed to seed chunk.");

	let (status, json) =
		post_json(routes::admin_router(state.clone()), "/v1/admin/index/refresh", serde_json::json!({}))
			.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["status"], "unavailable");

	let (status, json) = post_json(
		routes::admin_router(state),
		"/v1/admin/embeddings/backfill",
		serde_json::json!({ "batch_size": 8 }),
	)
	.await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["backfill"], serde_json::json!({ "total_chunks": 1, "pending": 1, "embedded": 1 }));
	assert_eq!(json["index"]["status"], "ready");
	assert_eq!(json["index"]["chunks"], 1);
	assert_eq!(json["index"]["dimensions"], 3);
}
