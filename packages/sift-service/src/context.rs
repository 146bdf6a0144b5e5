use serde::{Deserialize, Serialize};

use crate::{
	Result, SiftService,
	assemble::{self, Passage, SourceLink},
	search::{SearchDiagnostics, SearchRequest},
};

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
const SYSTEM_PROMPT: &str = "Answer the question using only the provided context. If the answer is not in the context, say you don't know.";

#[derive(Clone, Debug, Deserialize)]
pub struct ContextRequest {
	pub query: String,
	pub top_k: Option<u32>,
	pub max_extracts: Option<u32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContextResponse {
	pub passages: Vec<Passage>,
	pub sources: Vec<SourceLink>,
	pub context: String,
	pub diagnostics: SearchDiagnostics,
}

impl SiftService {
	/// Searches, then gathers the parent passages, source links, and the LLM context block.
	pub async fn context(&self, req: ContextRequest) -> Result<ContextResponse> {
		let max_extracts = req.max_extracts.unwrap_or(self.cfg.retrieval.max_extracts) as usize;
		let search =
			self.search(SearchRequest { query: req.query, top_k: req.top_k }).await?;
		let origins = self.chunk_origins(&search.items).await?;
		let passages = assemble::passages_from(&search.items, &origins, max_extracts);
		let sources = assemble::sources_from(
			&search.items,
			&origins,
			max_extracts,
			Some(&search.diagnostics),
		);
		let context = build_context(&passages, &self.cfg.answer.glossary);

		Ok(ContextResponse { passages, sources, context, diagnostics: search.diagnostics })
	}
}

/// Glossary notes first, then one block per passage.
pub fn build_context(passages: &[Passage], glossary: &[String]) -> String {
	let notes = glossary.iter().map(|note| format!("[glossary]\n{note}"));
	let blocks = passages.iter().map(|passage| {
		format!("[extract_id={} score={:.4}]\n{}", passage.extract_id, passage.score, passage.text)
	});

	notes.chain(blocks).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// System and user messages for a grounded answer.
pub fn llm_prompt(query: &str, context: &str) -> (String, String) {
	(SYSTEM_PROMPT.to_string(), format!("Question: {query}\n\nContext:\n{context}"))
}
