#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Page {
	pub id: i64,
	pub url: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Extract {
	pub id: i64,
	pub page_id: i64,
	pub extract_index: i64,
	pub text: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Chunk {
	pub id: i64,
	pub extract_id: i64,
	pub chunk_index: i64,
	pub text: String,
}

/// One embedded chunk as the index builder consumes it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChunkEmbeddingRow {
	pub chunk_id: i64,
	pub text: String,
	pub embedding: Vec<u8>,
}

/// A chunk resolved to its parent extract and source page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChunkOrigin {
	pub chunk_id: i64,
	pub chunk_text: String,
	pub extract_id: i64,
	pub extract_text: String,
	pub page_id: i64,
	pub url: String,
}
