mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Answer, Config, EmbeddingProviderConfig, LlmProviderConfig, Providers, Retrieval, Service,
	Site, SplitStrategy, Sqlite, Storage, SynonymGroup,
};

use std::{collections::HashSet, fs, net::SocketAddr, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.sqlite.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.sqlite.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	match cfg.service.admin_bind.parse::<SocketAddr>() {
		Ok(addr) if addr.ip().is_loopback() => {},
		Ok(_) => {
			return Err(Error::Validation {
				message: "service.admin_bind must be a loopback address.".to_string(),
			});
		},
		Err(_) => {
			return Err(Error::Validation {
				message: "service.admin_bind must be a socket address.".to_string(),
			});
		},
	}

	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	validate_retrieval(&cfg.retrieval)?;

	let mut roots = HashSet::new();

	for site in &cfg.sites {
		if site.root_url.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("sites.{}.root_url must be non-empty.", site.name),
			});
		}
		if !roots.insert(site.root_url.as_str()) {
			return Err(Error::Validation {
				message: format!("sites.root_url {} is configured more than once.", site.root_url),
			});
		}
	}

	Ok(())
}

fn validate_retrieval(retrieval: &Retrieval) -> Result<()> {
	for (label, value) in [
		("retrieval.vector_candidate_k", retrieval.vector_candidate_k),
		("retrieval.bm25_candidate_k", retrieval.bm25_candidate_k),
		("retrieval.default_top_k", retrieval.default_top_k),
		("retrieval.max_extracts", retrieval.max_extracts),
		("retrieval.embed_batch_size", retrieval.embed_batch_size),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if !retrieval.fusion_alpha.is_finite() {
		return Err(Error::Validation {
			message: "retrieval.fusion_alpha must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&retrieval.fusion_alpha) {
		return Err(Error::Validation {
			message: "retrieval.fusion_alpha must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !retrieval.bm25_k1.is_finite() || retrieval.bm25_k1 < 0.0 {
		return Err(Error::Validation {
			message: "retrieval.bm25_k1 must be a finite number of zero or greater.".to_string(),
		});
	}
	if !retrieval.bm25_b.is_finite() || !(0.0..=1.0).contains(&retrieval.bm25_b) {
		return Err(Error::Validation {
			message: "retrieval.bm25_b must be in the range 0.0-1.0.".to_string(),
		});
	}

	for group in &retrieval.synonyms {
		if group.aliases.is_empty() {
			return Err(Error::Validation {
				message: format!(
					"retrieval.synonyms.{}.aliases must be non-empty.",
					group.canonical
				),
			});
		}
		if group.aliases.iter().any(|alias| alias.trim().is_empty()) {
			return Err(Error::Validation {
				message: format!(
					"retrieval.synonyms.{}.aliases must not contain blank entries.",
					group.canonical
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for group in &mut cfg.retrieval.synonyms {
		for alias in &mut group.aliases {
			let trimmed = alias.trim();

			if trimmed.len() != alias.len() {
				*alias = trimmed.to_string();
			}
		}
	}

	cfg.answer.glossary.retain(|note| !note.trim().is_empty());
}
