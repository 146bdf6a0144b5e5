//! Maps ranked chunks back to their parent extracts and source pages.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use sift_storage::{models::ChunkOrigin, queries};

use crate::{Result, SiftService, search::{ScoredChunk, SearchDiagnostics}};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Passage {
	pub score: f32,
	pub chunk_id: i64,
	pub extract_id: i64,
	pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceLink {
	pub score: f32,
	pub chunk_id: i64,
	pub extract_id: i64,
	pub url: String,
	#[serde(flatten)]
	pub provenance: Option<Provenance>,
}

/// How a chunk reached the final ranking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Provenance {
	pub from_vector: bool,
	pub from_bm25: bool,
	pub vector_score_raw: f32,
	pub bm25_score_raw: f32,
	pub vector_score_norm: f32,
	pub bm25_score_norm: f32,
}

impl SiftService {
	pub async fn assemble_passages(
		&self,
		ranked: &[ScoredChunk],
		max_count: usize,
	) -> Result<Vec<Passage>> {
		let origins = self.chunk_origins(ranked).await?;

		Ok(passages_from(ranked, &origins, max_count))
	}

	pub async fn assemble_sources(
		&self,
		ranked: &[ScoredChunk],
		max_count: usize,
		provenance: Option<&SearchDiagnostics>,
	) -> Result<Vec<SourceLink>> {
		let origins = self.chunk_origins(ranked).await?;

		Ok(sources_from(ranked, &origins, max_count, provenance))
	}

	pub(crate) async fn chunk_origins(
		&self,
		ranked: &[ScoredChunk],
	) -> Result<HashMap<i64, ChunkOrigin>> {
		let chunk_ids = ranked.iter().map(|item| item.chunk_id).collect::<Vec<_>>();

		Ok(queries::fetch_chunk_origins(&self.db, &chunk_ids).await?)
	}
}

/// One passage per extract in rank order, first occurrence wins.
pub fn passages_from(
	ranked: &[ScoredChunk],
	origins: &HashMap<i64, ChunkOrigin>,
	max_count: usize,
) -> Vec<Passage> {
	first_per_extract(ranked, origins, max_count)
		.map(|(item, origin)| Passage {
			score: item.score,
			chunk_id: item.chunk_id,
			extract_id: origin.extract_id,
			text: origin.extract_text.trim().to_string(),
		})
		.collect()
}

pub fn sources_from(
	ranked: &[ScoredChunk],
	origins: &HashMap<i64, ChunkOrigin>,
	max_count: usize,
	provenance: Option<&SearchDiagnostics>,
) -> Vec<SourceLink> {
	first_per_extract(ranked, origins, max_count)
		.map(|(item, origin)| SourceLink {
			score: item.score,
			chunk_id: item.chunk_id,
			extract_id: origin.extract_id,
			url: origin.url.clone(),
			provenance: provenance.and_then(|diagnostics| diagnostics.provenance(item.chunk_id)),
		})
		.collect()
}

fn first_per_extract<'a>(
	ranked: &'a [ScoredChunk],
	origins: &'a HashMap<i64, ChunkOrigin>,
	max_count: usize,
) -> impl Iterator<Item = (&'a ScoredChunk, &'a ChunkOrigin)> {
	let mut seen = HashSet::new();

	ranked
		.iter()
		.filter_map(move |item| {
			let Some(origin) = origins.get(&item.chunk_id) else {
				tracing::warn!(chunk_id = item.chunk_id, "Skipping chunk without a parent extract.");

				return None;
			};

			seen.insert(origin.extract_id).then_some((item, origin))
		})
		.take(max_count)
}
