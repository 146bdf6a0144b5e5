use std::collections::HashMap;

use sqlx::{Executor, QueryBuilder, Sqlite, Transaction};

use crate::{
	Result,
	db::Db,
	models::{Chunk, ChunkEmbeddingRow, ChunkOrigin},
};

pub const ORIGIN_BATCH_SIZE: usize = 10_000;

pub async fn insert_page(db: &Db, url: &str) -> Result<i64> {
	let id = sqlx::query_scalar::<_, i64>(
		"\
INSERT INTO pages (url)
VALUES (?1)
ON CONFLICT (url) DO UPDATE SET url = excluded.url
RETURNING id",
	)
	.bind(url)
	.fetch_one(&db.pool)
	.await?;

	Ok(id)
}

pub async fn insert_extract(
	db: &Db,
	page_id: i64,
	extract_index: i64,
	text: &str,
) -> Result<i64> {
	let result = sqlx::query(
		"INSERT INTO extracts (page_id, extract_index, text) VALUES (?1, ?2, ?3)",
	)
	.bind(page_id)
	.bind(extract_index)
	.bind(text)
	.execute(&db.pool)
	.await?;

	Ok(result.last_insert_rowid())
}

pub async fn insert_chunk(
	db: &Db,
	extract_id: i64,
	chunk_index: i64,
	text: &str,
) -> Result<i64> {
	let result = sqlx::query(
		"INSERT INTO chunks (extract_id, chunk_index, text) VALUES (?1, ?2, ?3)",
	)
	.bind(extract_id)
	.bind(chunk_index)
	.bind(text)
	.execute(&db.pool)
	.await?;

	Ok(result.last_insert_rowid())
}

pub async fn insert_embedding(db: &Db, chunk_id: i64, embedding: &[u8]) -> Result<()> {
	insert_embedding_exec(&db.pool, chunk_id, embedding).await?;

	Ok(())
}

pub async fn insert_embedding_tx(
	tx: &mut Transaction<'_, Sqlite>,
	chunk_id: i64,
	embedding: &[u8],
) -> Result<()> {
	insert_embedding_exec(&mut **tx, chunk_id, embedding).await?;

	Ok(())
}

/// Every embedded chunk, in embedding insertion order.
pub async fn list_chunk_embeddings(db: &Db) -> Result<Vec<ChunkEmbeddingRow>> {
	let rows = sqlx::query_as::<_, ChunkEmbeddingRow>(
		"\
SELECT c.id AS chunk_id, COALESCE(c.text, '') AS text, e.embedding AS embedding
FROM embeddings e
JOIN chunks c ON c.id = e.chunk_id
ORDER BY e.id ASC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn list_chunks_without_embeddings(db: &Db, limit: i64) -> Result<Vec<Chunk>> {
	let rows = sqlx::query_as::<_, Chunk>(
		"\
SELECT c.id, c.extract_id, c.chunk_index, c.text
FROM chunks c
LEFT JOIN embeddings e ON e.chunk_id = c.id
WHERE e.id IS NULL
ORDER BY c.id ASC
LIMIT ?1",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn count_chunks(db: &Db) -> Result<i64> {
	let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunks")
		.fetch_one(&db.pool)
		.await?;

	Ok(count)
}

pub async fn count_chunks_without_embeddings(db: &Db) -> Result<i64> {
	let count = sqlx::query_scalar::<_, i64>(
		"\
SELECT COUNT(*)
FROM chunks c
LEFT JOIN embeddings e ON e.chunk_id = c.id
WHERE e.id IS NULL",
	)
	.fetch_one(&db.pool)
	.await?;

	Ok(count)
}

/// Resolves each chunk id to its parent extract and page. Unknown ids are absent from the map.
///
/// Ids are bound in batches of [`ORIGIN_BATCH_SIZE`] to stay under SQLite's variable limit.
pub async fn fetch_chunk_origins(db: &Db, chunk_ids: &[i64]) -> Result<HashMap<i64, ChunkOrigin>> {
	let mut origins = HashMap::new();

	for batch in chunk_ids.chunks(ORIGIN_BATCH_SIZE) {
		let rows = fetch_chunk_origins_batch(db, batch).await?;

		origins.extend(rows.into_iter().map(|row| (row.chunk_id, row)));
	}

	Ok(origins)
}

async fn fetch_chunk_origins_batch(db: &Db, chunk_ids: &[i64]) -> Result<Vec<ChunkOrigin>> {
	let mut builder = QueryBuilder::<Sqlite>::new(
		"\
SELECT
	c.id AS chunk_id,
	c.text AS chunk_text,
	x.id AS extract_id,
	x.text AS extract_text,
	p.id AS page_id,
	p.url AS url
FROM chunks c
JOIN extracts x ON x.id = c.extract_id
JOIN pages p ON p.id = x.page_id
WHERE c.id IN (",
	);
	let mut separated = builder.separated(", ");

	for chunk_id in chunk_ids {
		separated.push_bind(*chunk_id);
	}

	separated.push_unseparated(")");

	let rows = builder.build_query_as::<ChunkOrigin>().fetch_all(&db.pool).await?;

	Ok(rows)
}

async fn insert_embedding_exec<'e, E>(executor: E, chunk_id: i64, embedding: &[u8]) -> Result<()>
where
	E: Executor<'e, Database = Sqlite>,
{
	sqlx::query(
		"\
INSERT INTO embeddings (chunk_id, embedding)
VALUES (?1, ?2)
ON CONFLICT (chunk_id) DO UPDATE
SET embedding = excluded.embedding",
	)
	.bind(chunk_id)
	.bind(embedding)
	.execute(executor)
	.await?;

	Ok(())
}
