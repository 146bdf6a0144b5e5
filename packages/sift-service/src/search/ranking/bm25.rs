use ahash::AHashSet;

use crate::index::RetrievalIndex;

#[derive(Clone, Copy, Debug)]
pub struct Bm25Params {
	pub k1: f32,
	pub b: f32,
}

/// BM25 score per indexed row. Repeated query terms count once.
pub fn bm25_scores(index: &RetrievalIndex, terms: &[String], params: Bm25Params) -> Vec<f32> {
	let num_docs = index.len();
	let mut scores = vec![0.0_f32; num_docs];

	if num_docs == 0 || terms.is_empty() {
		return scores;
	}

	let k1 = params.k1 as f64;
	let b = params.b as f64;
	let avg_doc_len = if index.avg_doc_len() > 0.0 { index.avg_doc_len() as f64 } else { 1.0 };
	let mut seen = AHashSet::new();

	for term in terms {
		if !seen.insert(term.as_str()) {
			continue;
		}

		let df = index.doc_freq(term) as f64;

		if df <= 0.0 {
			continue;
		}

		let idf = (1.0 + (num_docs as f64 - df + 0.5) / (df + 0.5)).ln();

		for posting in index.postings(term) {
			let row = posting.row as usize;
			let tf = posting.tf as f64;
			let doc_len = index.doc_len(row) as f64;
			let denom = tf + k1 * (1.0 - b + b * (doc_len / avg_doc_len));

			if denom <= 0.0 {
				continue;
			}

			scores[row] += (idf * (tf * (k1 + 1.0)) / denom) as f32;
		}
	}

	scores
}
