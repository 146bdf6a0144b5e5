pub mod synonyms;
pub mod tokenize;

mod error;

pub use error::{Error, Result};
