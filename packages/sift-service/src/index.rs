//! In-memory retrieval index: a dense matrix for vector scoring plus an inverted index for BM25.

mod handle;

pub use handle::IndexHandle;

use ahash::AHashMap;
use serde::Serialize;
use time::OffsetDateTime;

use sift_domain::tokenize;
use sift_storage::{db::Db, models::ChunkEmbeddingRow, queries, vector};

use crate::Result;

/// One `(row, term frequency)` entry of a term's postings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
	pub row: u32,
	pub tf: u32,
}

#[derive(Debug)]
pub struct RetrievalIndex {
	chunk_ids: Vec<i64>,
	matrix: Vec<f32>,
	dim: usize,
	doc_lens: Vec<u32>,
	avg_doc_len: f32,
	doc_freq: AHashMap<String, u32>,
	postings: AHashMap<String, Vec<Posting>>,
	built_at: OffsetDateTime,
}
impl RetrievalIndex {
	/// Builds an index from embedded chunk rows. Returns `None` when no row carries a usable
	/// embedding.
	pub fn build(rows: &[ChunkEmbeddingRow]) -> Option<Self> {
		let mut chunk_ids = Vec::with_capacity(rows.len());
		let mut matrix = Vec::new();
		let mut dim = 0_usize;
		let mut doc_lens = Vec::with_capacity(rows.len());
		let mut doc_freq = AHashMap::<String, u32>::new();
		let mut postings = AHashMap::<String, Vec<Posting>>::new();

		for row in rows {
			let vec = match vector::decode_f32_le(&row.embedding) {
				Ok(vec) => vec,
				Err(err) => {
					tracing::warn!(chunk_id = row.chunk_id, error = %err, "Skipping malformed embedding.");

					continue;
				},
			};

			if dim == 0 {
				dim = vec.len();
			} else if vec.len() != dim {
				tracing::warn!(
					chunk_id = row.chunk_id,
					expected = dim,
					actual = vec.len(),
					"Skipping embedding with mismatched dimension."
				);

				continue;
			}

			let idx = chunk_ids.len() as u32;
			let tokens = tokenize::tokenize(&row.text);
			let mut tf = AHashMap::<String, u32>::new();

			for token in &tokens {
				*tf.entry(token.clone()).or_default() += 1;
			}
			for (term, count) in tf {
				*doc_freq.entry(term.clone()).or_default() += 1;

				postings.entry(term).or_default().push(Posting { row: idx, tf: count });
			}

			chunk_ids.push(row.chunk_id);
			matrix.extend_from_slice(&vec);
			doc_lens.push(tokens.len() as u32);
		}

		if chunk_ids.is_empty() {
			return None;
		}

		let avg_doc_len = doc_lens.iter().map(|len| *len as f64).sum::<f64>() / doc_lens.len() as f64;

		Some(Self {
			chunk_ids,
			matrix,
			dim,
			doc_lens,
			avg_doc_len: avg_doc_len as f32,
			doc_freq,
			postings,
			built_at: OffsetDateTime::now_utc(),
		})
	}

	/// Reads every embedded chunk from the corpus store and builds the index.
	pub async fn load(db: &Db) -> Result<Option<Self>> {
		let rows = queries::list_chunk_embeddings(db).await?;
		let index = Self::build(&rows);

		match &index {
			Some(index) => tracing::info!(
				rows = rows.len(),
				chunks = index.len(),
				dim = index.dim(),
				terms = index.term_count(),
				"Retrieval index built."
			),
			None => tracing::info!(rows = rows.len(), "No embeddings available for the retrieval index."),
		}

		Ok(index)
	}

	pub fn len(&self) -> usize {
		self.chunk_ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunk_ids.is_empty()
	}

	pub fn dim(&self) -> usize {
		self.dim
	}

	pub fn term_count(&self) -> usize {
		self.doc_freq.len()
	}

	pub fn chunk_id(&self, row: usize) -> i64 {
		self.chunk_ids[row]
	}

	pub fn chunk_ids(&self) -> &[i64] {
		&self.chunk_ids
	}

	/// The stored vector for `row`.
	pub fn row(&self, row: usize) -> &[f32] {
		&self.matrix[row * self.dim..(row + 1) * self.dim]
	}

	pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
		self.matrix.chunks_exact(self.dim)
	}

	pub fn doc_len(&self, row: usize) -> u32 {
		self.doc_lens[row]
	}

	pub fn avg_doc_len(&self) -> f32 {
		self.avg_doc_len
	}

	pub fn doc_freq(&self, term: &str) -> u32 {
		self.doc_freq.get(term).copied().unwrap_or(0)
	}

	pub fn postings(&self, term: &str) -> &[Posting] {
		self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn status(&self) -> IndexStatus {
		IndexStatus::Ready {
			chunks: self.len(),
			dimensions: self.dim,
			terms: self.term_count(),
			built_at: self.built_at,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatus {
	Ready {
		chunks: usize,
		dimensions: usize,
		terms: usize,
		#[serde(with = "crate::time_serde")]
		built_at: OffsetDateTime,
	},
	Unavailable,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn row(chunk_id: i64, text: &str, vec: &[f32]) -> ChunkEmbeddingRow {
		ChunkEmbeddingRow {
			chunk_id,
			text: text.to_string(),
			embedding: vector::encode_f32_le(vec),
		}
	}

	#[test]
	fn builds_matrix_and_postings_in_row_order() {
		let rows = vec![
			row(7, "alpha beta beta", &[1.0, 0.0]),
			row(3, "Beta gamma", &[0.0, 1.0]),
		];
		let index = RetrievalIndex::build(&rows).expect("Index should build.");

		assert_eq!(index.chunk_ids(), &[7, 3]);
		assert_eq!(index.row(1), &[0.0, 1.0]);
		assert_eq!(index.doc_len(0), 3);
		assert_eq!(index.doc_len(1), 2);
		assert!((index.avg_doc_len() - 2.5).abs() < 1e-6);
		assert_eq!(index.doc_freq("beta"), 2);
		assert_eq!(index.doc_freq("missing"), 0);
		assert_eq!(index.postings("beta"), &[Posting { row: 0, tf: 2 }, Posting { row: 1, tf: 1 }]);
		assert!(index.postings("missing").is_empty());
	}

	#[test]
	fn no_embeddings_means_no_index() {
		assert!(RetrievalIndex::build(&[]).is_none());
	}

	#[test]
	fn malformed_rows_are_skipped() {
		let truncated = ChunkEmbeddingRow {
			chunk_id: 1,
			text: "broken".to_string(),
			embedding: vec![0, 0, 128],
		};
		let rows = vec![
			truncated,
			row(2, "kept", &[1.0, 0.0, 0.0]),
			row(3, "wrong dimension", &[1.0, 0.0]),
			row(4, "also kept", &[0.0, 1.0, 0.0]),
		];
		let index = RetrievalIndex::build(&rows).expect("Index should build.");

		assert_eq!(index.chunk_ids(), &[2, 4]);
		assert_eq!(index.dim(), 3);
		assert_eq!(index.doc_freq("broken"), 0);
		assert_eq!(index.doc_freq("dimension"), 0);
	}

	#[test]
	fn empty_text_rows_have_zero_length() {
		let index = RetrievalIndex::build(&[row(1, "", &[1.0])]).expect("Index should build.");

		assert_eq!(index.doc_len(0), 0);
		assert_eq!(index.avg_doc_len(), 0.0);
		assert_eq!(index.term_count(), 0);
	}
}
