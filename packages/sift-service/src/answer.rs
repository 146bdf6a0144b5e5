//! Grounded answers: cache lookup, retrieval, one LLM call, and a closed event stream.

use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	BoxFuture, Result, SiftService,
	assemble::SourceLink,
	context::{self, ContextRequest},
	search::SearchDiagnostics,
};

const DELTA_CHARS: usize = 80;
const NO_CONTEXT_REPLY: &str = "I couldn't find relevant context in the embeddings database.";
const NO_CONTEXT_ERROR: &str = "No context available";

#[derive(Clone, Debug, Deserialize)]
pub struct AnswerRequest {
	pub query: String,
	pub top_k: Option<u32>,
	pub max_extracts: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerResponse {
	pub events: Vec<AnswerEvent>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerEvent {
	Delta { text: String },
	Sources { sources: Vec<SourceLink> },
	Debug { debug: Box<AnswerDebug> },
	Cache { cache_id: Uuid },
	Error { message: String },
	Done,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerDebug {
	pub query: String,
	pub cached: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache_id: Option<Uuid>,
	pub retrieval: Option<SearchDiagnostics>,
	pub sources: Vec<SourceLink>,
	pub llm_request: Option<LlmRequest>,
	pub llm_response_text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct LlmRequest {
	pub model: String,
	pub system_text: String,
	pub user_text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CachedAnswer {
	pub id: Uuid,
	pub question: String,
	pub answer_text: String,
	pub sources: Vec<SourceLink>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// Previously accepted answers keyed by [`question_cache_key`].
pub trait AnswerCache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<CachedAnswer>>;

	fn put<'a>(&'a self, key: String, answer: CachedAnswer) -> BoxFuture<'a, ()>;
}

#[derive(Default)]
pub struct MemoryAnswerCache {
	entries: Mutex<HashMap<String, CachedAnswer>>,
}
impl AnswerCache for MemoryAnswerCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Option<CachedAnswer>> {
		let hit = self.entries.lock().unwrap_or_else(|err| err.into_inner()).get(key).cloned();

		Box::pin(async move { hit })
	}

	fn put<'a>(&'a self, key: String, answer: CachedAnswer) -> BoxFuture<'a, ()> {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).insert(key, answer);

		Box::pin(async {})
	}
}

impl SiftService {
	pub async fn answer(&self, req: AnswerRequest) -> Result<AnswerResponse> {
		let cache_key = question_cache_key(&req.query);

		if let Some(cache) = &self.answer_cache
			&& let Some(hit) = cache.get(&cache_key).await
		{
			tracing::info!(cache_id = %hit.id, "Answer served from cache.");

			return Ok(AnswerResponse { events: cached_events(&req.query, hit) });
		}

		let ctx = self
			.context(ContextRequest {
				query: req.query.clone(),
				top_k: req.top_k,
				max_extracts: req.max_extracts,
			})
			.await?;
		let mut events = Vec::new();

		if ctx.context.is_empty() {
			tracing::info!(trace_id = %ctx.diagnostics.trace_id, "No context available for the LLM.");

			events.push(AnswerEvent::Delta { text: NO_CONTEXT_REPLY.to_string() });
			events.push(AnswerEvent::Debug {
				debug: Box::new(AnswerDebug {
					query: req.query,
					cached: false,
					cache_id: None,
					retrieval: Some(ctx.diagnostics),
					sources: ctx.sources.clone(),
					llm_request: None,
					llm_response_text: String::new(),
					error: Some(NO_CONTEXT_ERROR.to_string()),
				}),
			});
			events.push(AnswerEvent::Sources { sources: ctx.sources });
			events.push(AnswerEvent::Done);

			return Ok(AnswerResponse { events });
		}

		let (system_text, user_text) = context::llm_prompt(&req.query, &ctx.context);
		let llm_cfg = &self.cfg.providers.llm;
		let text = match self.providers.llm.complete(llm_cfg, &system_text, &user_text).await {
			Ok(text) => text,
			Err(err) => {
				tracing::warn!(trace_id = %ctx.diagnostics.trace_id, error = %err, "LLM call failed.");

				events.push(AnswerEvent::Error { message: format!("Provider error: {err}") });
				events.push(AnswerEvent::Done);

				return Ok(AnswerResponse { events });
			},
		};

		if !text.is_empty() {
			events.push(AnswerEvent::Delta { text: text.clone() });
		}

		events.push(AnswerEvent::Debug {
			debug: Box::new(AnswerDebug {
				query: req.query.clone(),
				cached: false,
				cache_id: None,
				retrieval: Some(ctx.diagnostics),
				sources: ctx.sources.clone(),
				llm_request: Some(LlmRequest { model: llm_cfg.model.clone(), system_text, user_text }),
				llm_response_text: text.clone(),
				error: None,
			}),
		});

		if let Some(cache) = &self.answer_cache
			&& !text.is_empty()
		{
			let answer = CachedAnswer {
				id: Uuid::new_v4(),
				question: normalize_question(&req.query),
				answer_text: text,
				sources: ctx.sources.clone(),
				created_at: OffsetDateTime::now_utc(),
			};

			cache.put(cache_key, answer).await;
		}

		events.push(AnswerEvent::Sources { sources: ctx.sources });
		events.push(AnswerEvent::Done);

		Ok(AnswerResponse { events })
	}
}

/// Lowercases, trims, and collapses internal whitespace.
pub fn normalize_question(text: &str) -> String {
	text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

pub fn question_cache_key(text: &str) -> String {
	blake3::hash(normalize_question(text).as_bytes()).to_hex().to_string()
}

fn cached_events(query: &str, hit: CachedAnswer) -> Vec<AnswerEvent> {
	let mut events = vec![AnswerEvent::Cache { cache_id: hit.id }];

	events.extend(
		split_chars(&hit.answer_text, DELTA_CHARS)
			.into_iter()
			.map(|text| AnswerEvent::Delta { text }),
	);
	events.push(AnswerEvent::Debug {
		debug: Box::new(AnswerDebug {
			query: query.to_string(),
			cached: true,
			cache_id: Some(hit.id),
			retrieval: None,
			sources: hit.sources.clone(),
			llm_request: None,
			llm_response_text: hit.answer_text,
			error: None,
		}),
	});
	events.push(AnswerEvent::Sources { sources: hit.sources });
	events.push(AnswerEvent::Done);

	events
}

fn split_chars(text: &str, size: usize) -> Vec<String> {
	let chars = text.chars().collect::<Vec<_>>();

	chars.chunks(size).map(|chunk| chunk.iter().collect()).collect()
}
