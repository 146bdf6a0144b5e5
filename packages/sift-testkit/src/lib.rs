mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	path::{Path, PathBuf},
};

use serde_json::Map;
use uuid::Uuid;

use sift_config::{
	Answer, Config, EmbeddingProviderConfig, LlmProviderConfig, Providers, Retrieval, Service,
	Sqlite, Storage,
};
use sift_storage::{db::Db, queries, vector};

const SIDECAR_SUFFIXES: [&str; 3] = ["", "-wal", "-shm"];

/// A throwaway SQLite database file with the corpus schema applied.
pub struct TestDatabase {
	name: String,
	path: PathBuf,
	dsn: String,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new() -> Result<Self> {
		let name = format!("sift_test_{}", Uuid::new_v4().simple());
		let path = env::temp_dir().join(format!("{name}.sqlite"));
		let dsn = format!("sqlite://{}", path.display());
		let db = Self { name, path, dsn, cleaned: false };
		let conn = db.connect().await?;

		conn.ensure_schema().await?;
		conn.pool.close().await;

		Ok(db)
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn config(&self) -> Sqlite {
		Sqlite { dsn: self.dsn.clone(), pool_max_conns: 4 }
	}

	pub async fn connect(&self) -> Result<Db> {
		Ok(Db::connect(&self.config()).await?)
	}

	pub fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner()
	}

	fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		remove_database_files(&self.path)?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if let Err(err) = self.cleanup_inner() {
			eprintln!("Test database cleanup failed: {err}.");
		}
	}
}

/// A config pointing at `sqlite` with placeholder providers and default retrieval settings.
pub fn test_config(sqlite: Sqlite, dimensions: u32) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage { sqlite },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-llm".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval::default(),
		answer: Answer::default(),
		sites: Vec::new(),
	}
}

/// Ids created by [`seed_chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededChunk {
	pub page_id: i64,
	pub extract_id: i64,
	pub chunk_id: i64,
}

/// Inserts a page (reused by URL), a fresh extract, and one chunk. The chunk is embedded only
/// when `embedding` is given; the vector is stored as-is.
pub async fn seed_chunk(
	db: &Db,
	url: &str,
	extract_text: &str,
	chunk_text: &str,
	embedding: Option<&[f32]>,
) -> Result<SeededChunk> {
	let page_id = queries::insert_page(db, url).await?;
	let extract_id = queries::insert_extract(db, page_id, 0, extract_text).await?;
	let chunk_id = queries::insert_chunk(db, extract_id, 0, chunk_text).await?;

	if let Some(embedding) = embedding {
		queries::insert_embedding(db, chunk_id, &vector::encode_f32_le(embedding)).await?;
	}

	Ok(SeededChunk { page_id, extract_id, chunk_id })
}

/// Adds another chunk under an existing extract.
pub async fn seed_sibling_chunk(
	db: &Db,
	extract_id: i64,
	chunk_index: i64,
	chunk_text: &str,
	embedding: Option<&[f32]>,
) -> Result<i64> {
	let chunk_id = queries::insert_chunk(db, extract_id, chunk_index, chunk_text).await?;

	if let Some(embedding) = embedding {
		queries::insert_embedding(db, chunk_id, &vector::encode_f32_le(embedding)).await?;
	}

	Ok(chunk_id)
}

fn remove_database_files(path: &Path) -> Result<()> {
	for suffix in SIDECAR_SUFFIXES {
		let mut target = path.as_os_str().to_owned();

		target.push(suffix);

		match fs::remove_file(&target) {
			Ok(()) => {},
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
			Err(err) =>
				return Err(Error::Message(format!(
					"Failed to remove test database file {}: {err}.",
					Path::new(&target).display()
				))),
		}
	}

	Ok(())
}
