use crate::index::RetrievalIndex;

/// Scores every indexed row by its best dot product against any query embedding.
pub fn vector_scores(index: &RetrievalIndex, queries: &[Vec<f32>]) -> Vec<f32> {
	index
		.rows()
		.map(|row| {
			queries.iter().map(|query| dot(query, row)).fold(f32::NEG_INFINITY, f32::max)
		})
		.collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
	a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
	use sift_storage::{models::ChunkEmbeddingRow, vector};

	use super::*;

	#[test]
	fn takes_max_over_query_variants() {
		let rows = [[1.0, 0.0], [0.0, 1.0], [0.6, 0.8]]
			.iter()
			.enumerate()
			.map(|(idx, vec)| ChunkEmbeddingRow {
				chunk_id: idx as i64,
				text: String::new(),
				embedding: vector::encode_f32_le(vec),
			})
			.collect::<Vec<_>>();
		let index = RetrievalIndex::build(&rows).expect("Index should build.");
		let scores = vector_scores(&index, &[vec![1.0, 0.0], vec![0.0, 1.0]]);

		assert_eq!(scores, vec![1.0, 1.0, 0.8]);

		let single = vector_scores(&index, &[vec![0.5, 0.5]]);

		assert!((single[2] - 0.7).abs() < 1e-6);
	}
}
