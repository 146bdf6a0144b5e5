pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		match err {
			sift_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			sift_storage::Error::InvalidArgument(message) => Self::Storage { message },
		}
	}
}

impl From<sift_providers::Error> for Error {
	fn from(err: sift_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<sift_domain::Error> for Error {
	fn from(err: sift_domain::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
