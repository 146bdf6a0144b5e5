mod ranking;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use sift_config::Retrieval;
use sift_domain::tokenize;
use sift_storage::queries;

use crate::{Error, Result, SiftService, assemble::Provenance, index::RetrievalIndex};
use ranking::{Bm25Params, FusedCandidate};

const NO_EMBEDDINGS: &str = "No embeddings found in database";
const PREVIEW_CHARS: usize = 220;

#[derive(Clone, Debug, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	pub top_k: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub items: Vec<ScoredChunk>,
	pub diagnostics: SearchDiagnostics,
}

/// A fused score paired with the chunk it ranks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoredChunk {
	pub score: f32,
	pub chunk_id: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchDiagnostics {
	pub trace_id: Uuid,
	pub query: String,
	pub query_variants: Vec<String>,
	pub config: RetrievalConfigSnapshot,
	pub candidate_counts: CandidateCounts,
	pub timings: SearchTimings,
	pub ranked_chunks: Vec<RankedChunk>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl SearchDiagnostics {
	fn new(query: &str, cfg: &Retrieval) -> Self {
		Self {
			trace_id: Uuid::new_v4(),
			query: query.to_string(),
			query_variants: Vec::new(),
			config: RetrievalConfigSnapshot::from(cfg),
			candidate_counts: CandidateCounts::default(),
			timings: SearchTimings::default(),
			ranked_chunks: Vec::new(),
			created_at: OffsetDateTime::now_utc(),
			error: None,
		}
	}

	/// Scoring provenance for a ranked chunk, if it made the final list.
	pub fn provenance(&self, chunk_id: i64) -> Option<Provenance> {
		self.ranked_chunks.iter().find(|item| item.chunk_id == chunk_id).map(|item| Provenance {
			from_vector: item.from_vector,
			from_bm25: item.from_bm25,
			vector_score_raw: item.vector_score_raw,
			bm25_score_raw: item.bm25_score_raw,
			vector_score_norm: item.vector_score_norm,
			bm25_score_norm: item.bm25_score_norm,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RetrievalConfigSnapshot {
	pub vector_candidate_k: u32,
	pub bm25_candidate_k: u32,
	pub fusion_alpha: f32,
	pub bm25_k1: f32,
	pub bm25_b: f32,
}
impl From<&Retrieval> for RetrievalConfigSnapshot {
	fn from(cfg: &Retrieval) -> Self {
		Self {
			vector_candidate_k: cfg.vector_candidate_k,
			bm25_candidate_k: cfg.bm25_candidate_k,
			fusion_alpha: cfg.fusion_alpha,
			bm25_k1: cfg.bm25_k1,
			bm25_b: cfg.bm25_b,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CandidateCounts {
	pub vector: usize,
	pub bm25: usize,
	pub merged: usize,
}

/// Stage durations in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SearchTimings {
	pub vector_ms: f64,
	pub bm25_ms: f64,
	pub fusion_ms: f64,
	pub total_ms: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedChunk {
	pub rank: u32,
	pub score: f32,
	pub chunk_id: i64,
	pub extract_id: i64,
	pub url: String,
	pub from_vector: bool,
	pub from_bm25: bool,
	pub vector_score_raw: f32,
	pub bm25_score_raw: f32,
	pub vector_score_norm: f32,
	pub bm25_score_norm: f32,
	pub chunk_preview: String,
}

impl SiftService {
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must not be empty.".to_string() });
		}

		let top_k = req.top_k.unwrap_or(self.cfg.retrieval.default_top_k);

		if top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let mut diagnostics = SearchDiagnostics::new(query, &self.cfg.retrieval);
		let Some(index) = self.index.get_or_build(&self.db).await? else {
			tracing::warn!(trace_id = %diagnostics.trace_id, "No embeddings found in database.");

			diagnostics.error = Some(NO_EMBEDDINGS.to_string());
			diagnostics.timings.total_ms = elapsed_ms(started);

			return Ok(SearchResponse { items: Vec::new(), diagnostics });
		};

		diagnostics.query_variants = self.expander().expand(query);

		let vector_started = Instant::now();
		let query_vecs = self.embed_queries(&index, &diagnostics.query_variants).await?;
		let vector_scores = ranking::vector_scores(&index, &query_vecs);
		let vector_k = top_k.max(self.cfg.retrieval.vector_candidate_k) as usize;
		let vector_idx = ranking::top_indices(&vector_scores, vector_k);

		diagnostics.timings.vector_ms = elapsed_ms(vector_started);

		let bm25_started = Instant::now();
		let mut terms = tokenize::tokenize(query);

		terms.extend(tokenize::tokenize_all(diagnostics.query_variants.iter().map(String::as_str)));

		let params =
			Bm25Params { k1: self.cfg.retrieval.bm25_k1, b: self.cfg.retrieval.bm25_b };
		let bm25_scores = ranking::bm25_scores(&index, &terms, params);
		let bm25_k = top_k.max(self.cfg.retrieval.bm25_candidate_k) as usize;
		let bm25_idx = ranking::top_indices(&bm25_scores, bm25_k);

		diagnostics.timings.bm25_ms = elapsed_ms(bm25_started);

		if vector_idx.is_empty() && bm25_idx.is_empty() {
			diagnostics.timings.total_ms = elapsed_ms(started);

			return Ok(SearchResponse { items: Vec::new(), diagnostics });
		}

		let fusion_started = Instant::now();
		let fused = ranking::fuse(
			&vector_idx,
			&bm25_idx,
			&vector_scores,
			&bm25_scores,
			self.cfg.retrieval.fusion_alpha,
			top_k as usize,
		);

		diagnostics.timings.fusion_ms = elapsed_ms(fusion_started);
		diagnostics.candidate_counts = CandidateCounts {
			vector: vector_idx.len(),
			bm25: bm25_idx.len(),
			merged: merged_count(&vector_idx, &bm25_idx),
		};

		diagnostics.ranked_chunks =
			self.rank_details(&index, &fused, &vector_scores, &bm25_scores).await?;

		// Chunks dropped from the store since the build are skipped in both lists.
		let items = diagnostics
			.ranked_chunks
			.iter()
			.map(|detail| ScoredChunk { score: detail.score, chunk_id: detail.chunk_id })
			.collect::<Vec<_>>();
		diagnostics.timings.total_ms = elapsed_ms(started);

		tracing::info!(
			trace_id = %diagnostics.trace_id,
			variants = diagnostics.query_variants.len(),
			vector_candidates = diagnostics.candidate_counts.vector,
			bm25_candidates = diagnostics.candidate_counts.bm25,
			merged_candidates = diagnostics.candidate_counts.merged,
			returned = items.len(),
			total_ms = diagnostics.timings.total_ms,
			"Hybrid search completed."
		);
		tracing::debug!(
			trace_id = %diagnostics.trace_id,
			vector_ms = diagnostics.timings.vector_ms,
			bm25_ms = diagnostics.timings.bm25_ms,
			fusion_ms = diagnostics.timings.fusion_ms,
			"Hybrid search timings."
		);

		Ok(SearchResponse { items, diagnostics })
	}

	async fn embed_queries(
		&self,
		index: &RetrievalIndex,
		variants: &[String],
	) -> Result<Vec<Vec<f32>>> {
		let vecs = self.providers.embedding.embed(&self.cfg.providers.embedding, variants).await?;

		if vecs.len() != variants.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} query variants.",
					vecs.len(),
					variants.len()
				),
			});
		}
		if let Some(vec) = vecs.iter().find(|vec| vec.len() != index.dim()) {
			return Err(Error::Provider {
				message: format!(
					"Query embedding has {} dimensions; the index has {}.",
					vec.len(),
					index.dim()
				),
			});
		}

		Ok(vecs)
	}

	async fn rank_details(
		&self,
		index: &RetrievalIndex,
		fused: &[FusedCandidate],
		vector_scores: &[f32],
		bm25_scores: &[f32],
	) -> Result<Vec<RankedChunk>> {
		let chunk_ids = fused.iter().map(|candidate| index.chunk_id(candidate.row)).collect::<Vec<_>>();
		let origins = queries::fetch_chunk_origins(&self.db, &chunk_ids).await?;
		let mut ranked = Vec::with_capacity(fused.len());

		for (candidate, chunk_id) in fused.iter().zip(chunk_ids) {
			let Some(origin) = origins.get(&chunk_id) else {
				tracing::warn!(chunk_id, "Ranked chunk is missing from the corpus store.");

				continue;
			};

			ranked.push(RankedChunk {
				rank: ranked.len() as u32 + 1,
				score: candidate.score,
				chunk_id,
				extract_id: origin.extract_id,
				url: origin.url.clone(),
				from_vector: candidate.from_vector,
				from_bm25: candidate.from_bm25,
				vector_score_raw: vector_scores[candidate.row],
				bm25_score_raw: bm25_scores[candidate.row],
				vector_score_norm: candidate.vector_norm,
				bm25_score_norm: candidate.bm25_norm,
				chunk_preview: preview(&origin.chunk_text),
			});
		}

		Ok(ranked)
	}
}

fn merged_count(vector_idx: &[usize], bm25_idx: &[usize]) -> usize {
	let mut rows = vector_idx.iter().chain(bm25_idx).collect::<Vec<_>>();

	rows.sort_unstable();
	rows.dedup();

	rows.len()
}

/// Collapses whitespace and keeps the first 220 characters.
fn preview(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(PREVIEW_CHARS).collect()
}

fn elapsed_ms(started: Instant) -> f64 {
	started.elapsed().as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preview_collapses_whitespace_and_truncates() {
		assert_eq!(preview("  hello \n\t world  "), "hello world");

		let long = "word ".repeat(100);
		let short = preview(&long);

		assert_eq!(short.chars().count(), PREVIEW_CHARS);
		assert!(short.starts_with("word word"));
	}

	#[test]
	fn merged_count_ignores_overlap() {
		assert_eq!(merged_count(&[0, 1, 2], &[2, 3]), 4);
		assert_eq!(merged_count(&[], &[]), 0);
	}
}
