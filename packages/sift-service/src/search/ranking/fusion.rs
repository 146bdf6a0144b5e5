use std::collections::BTreeSet;

use super::cmp_f32_desc;

const ZERO_SPREAD: f32 = 1e-12;

/// A row that survived fusion, with the scores that placed it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FusedCandidate {
	pub row: usize,
	pub score: f32,
	pub from_vector: bool,
	pub from_bm25: bool,
	pub vector_norm: f32,
	pub bm25_norm: f32,
}

/// Scales values into `[0, 1]`. A zero spread maps everything to zero.
pub fn min_max_normalize(values: &[f32]) -> Vec<f32> {
	let Some(lo) = values.iter().copied().reduce(f32::min) else {
		return Vec::new();
	};
	let hi = values.iter().copied().fold(lo, f32::max);
	let spread = hi - lo;

	if spread <= ZERO_SPREAD {
		return vec![0.0; values.len()];
	}

	values.iter().map(|value| (value - lo) / spread).collect()
}

/// Merges both candidate pools and ranks the union by `alpha * vector + (1 - alpha) * bm25`,
/// normalizing each axis over the union only.
pub fn fuse(
	vector_idx: &[usize],
	bm25_idx: &[usize],
	vector_scores: &[f32],
	bm25_scores: &[f32],
	alpha: f32,
	top_k: usize,
) -> Vec<FusedCandidate> {
	let vector_set = vector_idx.iter().copied().collect::<BTreeSet<_>>();
	let bm25_set = bm25_idx.iter().copied().collect::<BTreeSet<_>>();
	let union = vector_set.union(&bm25_set).copied().collect::<Vec<_>>();

	if union.is_empty() {
		return Vec::new();
	}

	let vector_norm =
		min_max_normalize(&union.iter().map(|row| vector_scores[*row]).collect::<Vec<_>>());
	let bm25_norm =
		min_max_normalize(&union.iter().map(|row| bm25_scores[*row]).collect::<Vec<_>>());
	let mut fused = union
		.iter()
		.enumerate()
		.map(|(pos, row)| FusedCandidate {
			row: *row,
			score: alpha * vector_norm[pos] + (1.0 - alpha) * bm25_norm[pos],
			from_vector: vector_set.contains(row),
			from_bm25: bm25_set.contains(row),
			vector_norm: vector_norm[pos],
			bm25_norm: bm25_norm[pos],
		})
		.collect::<Vec<_>>();

	fused.sort_by(|a, b| cmp_f32_desc(a.score, b.score));
	fused.truncate(top_k);

	fused
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_to_unit_range() {
		assert_eq!(min_max_normalize(&[1.0, 3.0]), vec![0.0, 1.0]);
		assert_eq!(min_max_normalize(&[5.0]), vec![0.0]);
		assert_eq!(min_max_normalize(&[2.0, 2.0, 2.0]), vec![0.0, 0.0, 0.0]);
		assert!(min_max_normalize(&[]).is_empty());
		assert_eq!(min_max_normalize(&[-1.0, 0.0, 1.0]), vec![0.0, 0.5, 1.0]);
	}

	#[test]
	fn fusion_scores_stay_in_unit_range() {
		let vector_scores = [0.9, -0.3, 0.1, 0.5, 0.0];
		let bm25_scores = [0.0, 4.2, 1.1, 0.0, 7.5];

		for alpha in [0.0, 0.25, 0.7, 1.0] {
			let fused = fuse(&[0, 3, 2], &[4, 1, 2], &vector_scores, &bm25_scores, alpha, 10);

			assert_eq!(fused.len(), 5);

			for candidate in fused {
				assert!((0.0..=1.0).contains(&candidate.score), "{alpha}: {candidate:?}");
			}
		}
	}

	#[test]
	fn marks_pool_membership_and_truncates() {
		let vector_scores = [1.0, 0.0, 0.5];
		let bm25_scores = [0.0, 2.0, 1.0];
		let fused = fuse(&[0, 2], &[1, 2], &vector_scores, &bm25_scores, 0.7, 2);

		assert_eq!(fused.len(), 2);
		assert_eq!(fused[0].row, 0);
		assert!(fused[0].from_vector && !fused[0].from_bm25);
		assert_eq!(fused[1].row, 2);
		assert!(fused[1].from_vector && fused[1].from_bm25);
		assert!((fused[1].score - 0.5).abs() < 1e-6);
	}

	#[test]
	fn ties_keep_ascending_row_order() {
		let fused = fuse(&[3, 1], &[2], &[0.0, 1.0, 1.0, 1.0], &[0.0, 0.0, 0.0, 0.0], 0.7, 10);

		assert_eq!(fused.iter().map(|c| c.row).collect::<Vec<_>>(), vec![1, 2, 3]);
	}

	#[test]
	fn empty_pools_yield_nothing() {
		assert!(fuse(&[], &[], &[], &[], 0.7, 5).is_empty());
	}
}
