//! Raw embedding layout: packed little-endian `f32`, four bytes per component.

use crate::{Error, Result};

pub fn encode_f32_le(vec: &[f32]) -> Vec<u8> {
	let mut out = Vec::with_capacity(vec.len() * 4);

	for value in vec {
		out.extend_from_slice(&value.to_le_bytes());
	}

	out
}

pub fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f32>> {
	if bytes.is_empty() {
		return Err(Error::InvalidArgument("Embedding blob is empty.".to_string()));
	}
	if bytes.len() % 4 != 0 {
		return Err(Error::InvalidArgument(format!(
			"Embedding blob length {} is not a multiple of 4.",
			bytes.len()
		)));
	}

	Ok(bytes
		.chunks_exact(4)
		.map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
		.collect())
}
