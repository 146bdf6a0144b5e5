use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use sift_service::{
	AnswerRequest, AnswerResponse, BackfillReport, ContextRequest, ContextResponse, Error,
	IndexStatus, SearchRequest, SearchResponse,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BackfillRequest {
	pub batch_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BackfillResponse {
	pub backfill: BackfillReport,
	pub index: IndexStatus,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider call failed.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage call failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Corpus store is unavailable.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/context", post(context))
		.route("/v1/answer", post(answer))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/index/refresh", post(refresh_index))
		.route("/v1/admin/embeddings/backfill", post(backfill_embeddings))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn context(
	State(state): State<AppState>,
	Json(payload): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, ApiError> {
	let response = state.service.context(payload).await?;

	Ok(Json(response))
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer(payload).await?;

	Ok(Json(response))
}

async fn refresh_index(State(state): State<AppState>) -> Result<Json<IndexStatus>, ApiError> {
	let status = state.service.refresh_index().await?;

	Ok(Json(status))
}

async fn backfill_embeddings(
	State(state): State<AppState>,
	Json(payload): Json<BackfillRequest>,
) -> Result<Json<BackfillResponse>, ApiError> {
	let backfill = state.service.embed_pending_chunks(payload.batch_size).await?;
	let index = state.service.refresh_index().await?;

	Ok(Json(BackfillResponse { backfill, index }))
}
