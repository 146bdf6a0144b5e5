use std::collections::HashSet;

use regex::{NoExpand, Regex, RegexBuilder};

use crate::{Error, Result};
use sift_config::SynonymGroup;

/// Rewrites a query into every phrasing the configured synonym groups allow.
#[derive(Debug, Clone)]
pub struct QueryExpander {
	groups: Vec<CompiledGroup>,
}

#[derive(Debug, Clone)]
struct CompiledGroup {
	pattern: Regex,
	aliases: Vec<String>,
}

impl QueryExpander {
	pub fn new(groups: &[SynonymGroup]) -> Result<Self> {
		let mut compiled = Vec::with_capacity(groups.len());

		for group in groups {
			if group.aliases.is_empty() {
				continue;
			}

			let alternation =
				group.aliases.iter().map(|alias| regex::escape(alias)).collect::<Vec<_>>().join("|");
			let pattern = RegexBuilder::new(&format!(r"\b({alternation})\b"))
				.case_insensitive(true)
				.build()
				.map_err(|source| Error::SynonymPattern {
					canonical: group.canonical.clone(),
					source,
				})?;

			compiled.push(CompiledGroup { pattern, aliases: group.aliases.clone() });
		}

		Ok(Self { groups: compiled })
	}

	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	/// Returns the distinct variants of `query`, the original first.
	///
	/// Each group rewrites every variant that mentions one of its aliases into one copy per
	/// alias, replacing all matched spans. Variants produced by one group feed the next.
	pub fn expand(&self, query: &str) -> Vec<String> {
		let mut variants = vec![query.to_string()];

		for group in &self.groups {
			let mut next = Vec::with_capacity(variants.len() * group.aliases.len());
			let mut seen = HashSet::new();

			for value in &variants {
				push_variant(&mut next, &mut seen, value.clone());

				if !group.pattern.is_match(value) {
					continue;
				}

				for alias in &group.aliases {
					let replaced = group.pattern.replace_all(value, NoExpand(alias)).into_owned();

					push_variant(&mut next, &mut seen, replaced);
				}
			}

			variants = next;
		}

		variants
	}
}

fn push_variant(out: &mut Vec<String>, seen: &mut HashSet<String>, value: String) {
	if seen.insert(value.clone()) {
		out.push(value);
	}
}
