use sift_config::SynonymGroup;
use sift_domain::{synonyms::QueryExpander, tokenize};

fn prepay_group() -> SynonymGroup {
	SynonymGroup {
		canonical: "myway".to_string(),
		aliases: vec!["myway".to_string(), "prepay".to_string(), "prepaid".to_string()],
		note: Some("Prepay and MyWay refer to the same program.".to_string()),
	}
}

#[test]
fn expanded_variants_tokenize_into_every_alias() {
	let expander = QueryExpander::new(&[prepay_group()]).expect("Failed to build expander.");
	let variants = expander.expand("How do I top up MyWay?");
	let terms = tokenize::tokenize_all(variants.iter().map(String::as_str));

	for alias in ["myway", "prepay", "prepaid"] {
		assert!(terms.iter().any(|term| term == alias), "missing {alias}");
	}
	assert!(variants.contains(&"How do I top up MyWay?".to_string()));
}

#[test]
fn empty_group_list_is_identity() {
	let expander = QueryExpander::new(&[]).expect("Failed to build expander.");

	assert!(expander.is_empty());
	assert_eq!(expander.expand(""), vec![String::new()]);
}
