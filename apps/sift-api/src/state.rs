use std::sync::Arc;

use sift_service::{Providers, SiftService};
use sift_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub async fn new(config: sift_config::Config) -> color_eyre::Result<Self> {
		Self::with_providers(config, Providers::default()).await
	}

	pub async fn with_providers(
		config: sift_config::Config,
		providers: Providers,
	) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.sqlite).await?;

		db.ensure_schema().await?;

		let service = SiftService::with_providers(config, db, providers)?;

		Ok(Self { service: Arc::new(service) })
	}
}
