pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid synonym group {canonical:?}: {source}")]
	SynonymPattern { canonical: String, source: regex::Error },
}
