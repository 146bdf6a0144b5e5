pub mod admin;
pub mod answer;
pub mod assemble;
pub mod context;
pub mod index;
pub mod search;
pub mod time_serde;

mod error;

pub use admin::BackfillReport;
pub use answer::{
	AnswerCache, AnswerDebug, AnswerEvent, AnswerRequest, AnswerResponse, CachedAnswer,
	LlmRequest, MemoryAnswerCache,
};
pub use assemble::{Passage, Provenance, SourceLink};
pub use context::{ContextRequest, ContextResponse};
pub use error::{Error, Result};
pub use index::{IndexHandle, IndexStatus, RetrievalIndex};
pub use search::{
	CandidateCounts, RankedChunk, RetrievalConfigSnapshot, ScoredChunk, SearchDiagnostics,
	SearchRequest, SearchResponse, SearchTimings,
};

use std::{future::Future, pin::Pin, sync::Arc};

use sift_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use sift_domain::synonyms::QueryExpander;
use sift_providers::{embedding, llm};
use sift_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>>;
}

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_text: &'a str,
		user_text: &'a str,
	) -> BoxFuture<'a, sift_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub llm: Arc<dyn LlmProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>) -> Self {
		Self { embedding, llm }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), llm: provider }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	pub index: IndexHandle,
	pub answer_cache: Option<Arc<dyn AnswerCache>>,
	expander: QueryExpander,
}
impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Result<Self> {
		let expander = QueryExpander::new(&cfg.retrieval.synonyms)?;
		let answer_cache = if cfg.answer.cache_enabled {
			Some(Arc::new(MemoryAnswerCache::default()) as Arc<dyn AnswerCache>)
		} else {
			None
		};

		Ok(Self { cfg, db, providers, index: IndexHandle::default(), answer_cache, expander })
	}

	pub fn with_answer_cache(mut self, cache: Arc<dyn AnswerCache>) -> Self {
		self.answer_cache = Some(cache);

		self
	}

	pub fn expander(&self) -> &QueryExpander {
		&self.expander
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sift_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl LlmProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		system_text: &'a str,
		user_text: &'a str,
	) -> BoxFuture<'a, sift_providers::Result<String>> {
		Box::pin(llm::complete(cfg, system_text, user_text))
	}
}
