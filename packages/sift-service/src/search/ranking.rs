mod bm25;
mod fusion;
mod vector;

pub use bm25::{Bm25Params, bm25_scores};
pub use fusion::{FusedCandidate, fuse};
pub use vector::vector_scores;

use std::cmp::Ordering;

/// Orders scores descending with NaN last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Row indices of the `k` highest scores, best first. Equal scores keep ascending row order.
pub fn top_indices(scores: &[f32], k: usize) -> Vec<usize> {
	if k == 0 || scores.is_empty() {
		return Vec::new();
	}

	let k = k.min(scores.len());
	let cmp = |a: &usize, b: &usize| cmp_f32_desc(scores[*a], scores[*b]).then(a.cmp(b));
	let mut idx = (0..scores.len()).collect::<Vec<_>>();

	if k < idx.len() {
		idx.select_nth_unstable_by(k - 1, cmp);
		idx.truncate(k);
	}

	idx.sort_by(cmp);

	idx
}
