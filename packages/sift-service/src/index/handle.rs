use std::{
	future::Future,
	sync::{Arc, RwLock},
};

use tokio::sync::Mutex;

use sift_storage::db::Db;

use super::{IndexStatus, RetrievalIndex};
use crate::Result;

/// Shared owner of the current retrieval index.
///
/// Readers clone the published `Arc` without waiting on builds. Builds and refreshes are
/// serialized by `build_lock`, and a new index replaces the old one in a single swap. A refresh
/// that finds no embeddings leaves the published index in place.
#[derive(Default)]
pub struct IndexHandle {
	current: RwLock<Option<Arc<RetrievalIndex>>>,
	build_lock: Mutex<()>,
}
impl IndexHandle {
	pub fn current(&self) -> Option<Arc<RetrievalIndex>> {
		self.current.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub async fn get_or_build(&self, db: &Db) -> Result<Option<Arc<RetrievalIndex>>> {
		self.get_or_build_with(|| RetrievalIndex::load(db)).await
	}

	pub async fn get_or_build_with<F, Fut>(&self, build: F) -> Result<Option<Arc<RetrievalIndex>>>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Option<RetrievalIndex>>>,
	{
		if let Some(index) = self.current() {
			return Ok(Some(index));
		}

		let _guard = self.build_lock.lock().await;

		if let Some(index) = self.current() {
			return Ok(Some(index));
		}

		let built = build().await?.map(Arc::new);

		self.publish(built.clone());

		Ok(built)
	}

	pub async fn refresh(&self, db: &Db) -> Result<IndexStatus> {
		self.refresh_with(|| RetrievalIndex::load(db)).await
	}

	pub async fn refresh_with<F, Fut>(&self, build: F) -> Result<IndexStatus>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Option<RetrievalIndex>>>,
	{
		let _guard = self.build_lock.lock().await;
		let Some(built) = build().await? else {
			tracing::warn!("No embeddings available; retrieval index left unchanged.");

			return Ok(self.status());
		};
		let status = built.status();

		self.publish(Some(Arc::new(built)));

		Ok(status)
	}

	pub fn clear(&self) {
		self.publish(None);
	}

	pub fn status(&self) -> IndexStatus {
		status_of(self.current().as_deref())
	}

	fn publish(&self, index: Option<Arc<RetrievalIndex>>) {
		*self.current.write().unwrap_or_else(|err| err.into_inner()) = index;
	}
}

fn status_of(index: Option<&RetrievalIndex>) -> IndexStatus {
	index.map(RetrievalIndex::status).unwrap_or(IndexStatus::Unavailable)
}
