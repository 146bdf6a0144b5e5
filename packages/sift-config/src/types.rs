use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub answer: Answer,
	#[serde(default)]
	pub sites: Vec<Site>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
	/// A `sqlite:` URL. `sqlite::memory:` keeps the corpus in process memory.
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Tunables for the hybrid retrieval core.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Floor for the dense candidate pool. The pool size is `max(top_k, floor)`.
	pub vector_candidate_k: u32,
	/// Floor for the BM25 candidate pool. The pool size is `max(top_k, floor)`.
	pub bm25_candidate_k: u32,
	/// Weight of the normalized dense score in the fused score.
	pub fusion_alpha: f32,
	pub bm25_k1: f32,
	pub bm25_b: f32,
	pub default_top_k: u32,
	pub max_extracts: u32,
	pub embed_batch_size: u32,
	pub synonyms: Vec<SynonymGroup>,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			vector_candidate_k: 50,
			bm25_candidate_k: 50,
			fusion_alpha: 0.70,
			bm25_k1: 1.5,
			bm25_b: 0.75,
			default_top_k: 10,
			max_extracts: 6,
			embed_batch_size: 64,
			synonyms: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynonymGroup {
	pub canonical: String,
	pub aliases: Vec<String>,
	#[serde(default)]
	pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Answer {
	/// Notes prepended to every context block sent to the LLM.
	pub glossary: Vec<String>,
	pub cache_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct Site {
	pub name: String,
	pub root_url: String,
	pub selector: String,
	pub breadcrumb_selector: String,
	pub split: SplitStrategy,
}

/// How a site's extracts are cut into chunks by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
	#[serde(alias = "split_md_sections")]
	MarkdownSections,
	#[serde(alias = "split_paragraphs")]
	Paragraphs,
	WholeExtract,
}
impl SplitStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MarkdownSections => "markdown_sections",
			Self::Paragraphs => "paragraphs",
			Self::WholeExtract => "whole_extract",
		}
	}
}
