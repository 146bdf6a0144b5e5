use std::str::FromStr;

use sqlx::{
	SqlitePool,
	sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{Result, schema};

pub struct Db {
	pub pool: SqlitePool,
}
impl Db {
	pub async fn connect(cfg: &sift_config::Sqlite) -> Result<Self> {
		let options =
			SqliteConnectOptions::from_str(&cfg.dsn)?.create_if_missing(true).foreign_keys(true);
		// In-memory databases live as long as their connection, so pooled connections never
		// expire.
		let pool = SqlitePoolOptions::new()
			.max_connections(cfg.pool_max_conns)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let mut tx = self.pool.begin().await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
