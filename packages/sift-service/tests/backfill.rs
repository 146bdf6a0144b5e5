use std::sync::Arc;

use sift_config::{EmbeddingProviderConfig, LlmProviderConfig};
use sift_service::{
	BackfillReport, BoxFuture, EmbeddingProvider, Error, IndexStatus, LlmProvider, Providers,
	SearchRequest, SiftService,
};
use sift_testkit::TestDatabase;

/// Embeds each text as a one-hot vector picked by its length.
struct LengthEmbedding {
	dim: usize,
}
impl EmbeddingProvider for LengthEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		let vecs = texts
			.iter()
			.map(|text| {
				let mut vec = vec![0.0; self.dim];

				vec[text.len() % self.dim] = 1.0;

				vec
			})
			.collect();

		Box::pin(async move { Ok(vecs) })
	}
}

struct NoLlm;
impl LlmProvider for NoLlm {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_system_text: &'a str,
		_user_text: &'a str,
	) -> BoxFuture<'a, sift_providers::Result<String>> {
		Box::pin(async { Ok(String::new()) })
	}
}

async fn service(test_db: &TestDatabase, embedding_dim: usize, config_dim: u32) -> SiftService {
	let cfg = sift_testkit::test_config(test_db.config(), config_dim);
	let db = test_db.connect().await.expect("Failed to connect.");
	let providers =
		Providers::new(Arc::new(LengthEmbedding { dim: embedding_dim }), Arc::new(NoLlm));

	SiftService::with_providers(cfg, db, providers).expect("Failed to build service.")
}

#[tokio::test]
async fn backfill_embeds_pending_chunks_in_batches() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = test_db.connect().await.expect("Failed to connect.");
	let seeded = sift_testkit::seed_chunk(&db, "https://example.com/a", "Extract", "one", None)
		.await
		.expect("Failed to seed chunk.");

	for (idx, text) in ["three", "five!", "seven"].iter().enumerate() {
		sift_testkit::seed_sibling_chunk(&db, seeded.extract_id, idx as i64 + 1, text, None)
			.await
			.expect("Failed to seed sibling.");
	}

	sift_testkit::seed_chunk(&db, "https://example.com/b", "Other", "done", Some(&[1.0, 0.0, 0.0]))
		.await
		.expect("Failed to seed chunk.");

	let service = service(&test_db, 3, 3).await;
	let report = service.embed_pending_chunks(Some(3)).await.expect("Backfill failed.");

	assert_eq!(report, BackfillReport { total_chunks: 5, pending: 4, embedded: 4 });
	assert_eq!(service.index.status(), IndexStatus::Unavailable);

	let status = service.refresh_index().await.expect("Refresh failed.");

	assert!(matches!(status, IndexStatus::Ready { chunks: 5, .. }));

	let again = service.embed_pending_chunks(None).await.expect("Backfill failed.");

	assert_eq!(again, BackfillReport { total_chunks: 5, pending: 0, embedded: 0 });

	let response = service
		.search(SearchRequest { query: "seven".to_string(), top_k: Some(1) })
		.await
		.expect("Search failed.");

	assert_eq!(response.items.len(), 1);
	assert!(response.diagnostics.ranked_chunks[0].from_bm25);
}

#[tokio::test]
async fn backfill_rejects_wrong_dimensions() {
	let test_db = TestDatabase::new().await.expect("Failed to create test database.");
	let db = test_db.connect().await.expect("Failed to connect.");

	sift_testkit::seed_chunk(&db, "https://example.com/a", "Extract", "text", None)
		.await
		.expect("Failed to seed chunk.");

	let service = service(&test_db, 2, 3).await;
	let err = service.embed_pending_chunks(None).await.expect_err("Backfill should fail.");

	assert!(matches!(err, Error::Provider { .. }), "{err:?}");
	assert_eq!(
		service.build_or_refresh_index(false).await.expect("Build failed."),
		IndexStatus::Unavailable
	);
}
