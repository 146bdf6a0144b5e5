use serde::Serialize;

use sift_storage::{queries, vector};

use crate::{Error, Result, SiftService, index::IndexStatus};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
	pub total_chunks: u64,
	pub pending: u64,
	pub embedded: u64,
}

impl SiftService {
	/// Returns the published index, building it when `force` is set or nothing is published yet.
	pub async fn build_or_refresh_index(&self, force: bool) -> Result<IndexStatus> {
		if force {
			return self.refresh_index().await;
		}

		let index = self.index.get_or_build(&self.db).await?;

		Ok(index.map(|index| index.status()).unwrap_or(IndexStatus::Unavailable))
	}

	pub async fn refresh_index(&self) -> Result<IndexStatus> {
		let status = self.index.refresh(&self.db).await?;

		tracing::info!(?status, "Retrieval index refreshed.");

		Ok(status)
	}

	/// Embeds every chunk that has no stored embedding. The index is left untouched.
	pub async fn embed_pending_chunks(&self, batch_size: Option<u32>) -> Result<BackfillReport> {
		let batch_size = batch_size.unwrap_or(self.cfg.retrieval.embed_batch_size);

		if batch_size == 0 {
			return Err(Error::InvalidRequest {
				message: "batch_size must be greater than zero.".to_string(),
			});
		}

		let total_chunks = queries::count_chunks(&self.db).await? as u64;
		let pending = queries::count_chunks_without_embeddings(&self.db).await? as u64;
		let expected_dim = self.cfg.providers.embedding.dimensions as usize;
		let mut embedded = 0_u64;

		while embedded < pending {
			let batch =
				queries::list_chunks_without_embeddings(&self.db, batch_size as i64).await?;

			if batch.is_empty() {
				break;
			}

			let texts = batch.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
			let vecs = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;

			if vecs.len() != batch.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} chunks.",
						vecs.len(),
						batch.len()
					),
				});
			}
			if vecs.iter().any(|vec| vec.len() != expected_dim) {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}

			let mut tx = self.db.pool.begin().await.map_err(sift_storage::Error::from)?;

			for (chunk, vec) in batch.iter().zip(&vecs) {
				queries::insert_embedding_tx(&mut tx, chunk.id, &vector::encode_f32_le(vec))
					.await?;
			}

			tx.commit().await.map_err(sift_storage::Error::from)?;

			embedded += batch.len() as u64;

			tracing::info!(embedded, pending, "Embedded chunk batch.");
		}

		Ok(BackfillReport { total_chunks, pending, embedded })
	}
}
