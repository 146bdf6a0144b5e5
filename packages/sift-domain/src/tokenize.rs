/// Splits text into lowercase `[a-z0-9]+` terms.
///
/// Text is lowercased first, then every character outside ASCII letters and digits acts as a
/// separator. There is no stemming and no stopword list.
pub fn tokenize(text: &str) -> Vec<String> {
	let lowered = text.to_lowercase();
	let mut out = Vec::new();
	let mut current = String::new();

	for ch in lowered.chars() {
		if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
			current.push(ch);
		} else if !current.is_empty() {
			out.push(std::mem::take(&mut current));
		}
	}

	if !current.is_empty() {
		out.push(current);
	}

	out
}

/// Tokens of several texts, concatenated in order. Duplicates are kept.
pub fn tokenize_all<'a, I>(texts: I) -> Vec<String>
where
	I: IntoIterator<Item = &'a str>,
{
	let mut out = Vec::new();

	for text in texts {
		out.extend(tokenize(text));
	}

	out
}
