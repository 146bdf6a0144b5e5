use serde::Serializer;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

#[cfg(test)]
mod tests {
	use serde::Serialize;
	use time::macros::datetime;

	use super::*;

	#[derive(Serialize)]
	struct Stamped {
		#[serde(serialize_with = "serialize")]
		at: OffsetDateTime,
	}

	#[test]
	fn serializes_as_rfc3339() {
		let value = Stamped { at: datetime!(2026-01-02 03:04:05 UTC) };
		let json = serde_json::to_value(&value).expect("Failed to serialize timestamp.");

		assert_eq!(json["at"], "2026-01-02T03:04:05Z");
	}
}
