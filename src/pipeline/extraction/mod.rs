//! Extraction engine: recognized text + document type → structured fields.
//!
//! Pure and deterministic. Every field has an ordered regex list and the
//! first match wins; misses fall back to empty values.

pub mod extractors;
pub mod patterns;
pub mod types;

pub use extractors::extract_with;
pub use patterns::{Field, PatternTable};
pub use types::*;

use crate::models::DocumentType;

/// Extract with the built-in German pattern table.
pub fn extract(text: &str, document_type: DocumentType) -> ExtractedData {
    extract_with(PatternTable::german(), text, document_type)
}
