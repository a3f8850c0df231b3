//! Deterministic JSON serialization for the store files.
//!
//! Keeps the files readable and stable between writes:
//! - Sorting object keys alphabetically (via `BTreeMap`)
//! - Using 2-space indentation
//! - Adding trailing newline

mod json;

pub use json::*;
