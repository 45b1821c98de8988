//! Title validation
//!
//! Titles double as storage keys, so this check is what keeps request paths
//! from reaching outside the data directory.

/// A title is valid iff it is non-empty and ASCII alphanumeric only
pub fn is_valid_title(title: &str) -> bool {
    !title.is_empty() && title.bytes().all(|b| b.is_ascii_alphanumeric())
}
