mod resolve;
mod search;
mod types;

pub use resolve::{disambiguate, resolve_identity, MAX_PROMPT_CANDIDATES};
pub use search::normalize_query;
pub use types::{Disambiguation, Resolution};

#[cfg(test)]
mod tests;
