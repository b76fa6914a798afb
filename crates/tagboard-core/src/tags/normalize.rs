//! Tag normalization: every countable representation of a project's tags.
//!
//! A project stores tags in two shapes:
//!
//! ```text
//! "hashtags":            ["VIP", " summer "]
//! "categorizedHashtags": { "Sponsor": ["Acme"] }
//! ```
//!
//! which normalize to the representation set
//! `{"vip", "summer", "acme", "sponsor:acme"}`. Flat tags contribute only
//! their bare form; categorized tags contribute the bare form and the
//! `category:tag` composite.

use std::collections::BTreeSet;

use serde_json::Value;

/// Field holding the flat tag list on a project document.
pub const FLAT_FIELD: &str = "hashtags";

/// Field holding the category → tags map on a project document.
pub const CATEGORIZED_FIELD: &str = "categorizedHashtags";

/// Separator between category and tag in composite representations.
pub const CATEGORY_SEPARATOR: char = ':';

/// Canonical comparison form of a tag: trimmed and case-folded.
///
/// Returns `None` for empty or whitespace-only input.
#[must_use]
pub fn canonicalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Build the `category:tag` composite from raw parts.
///
/// Returns `None` when either part canonicalizes to empty.
#[must_use]
pub fn composite(category: &str, tag: &str) -> Option<String> {
    let category = canonicalize(category)?;
    let tag = canonicalize(tag)?;
    Some(format!("{category}{CATEGORY_SEPARATOR}{tag}"))
}

/// Split a representation into `(category, tag)` when it is a composite.
#[must_use]
pub fn split_composite(representation: &str) -> Option<(&str, &str)> {
    representation
        .split_once(CATEGORY_SEPARATOR)
        .filter(|(category, tag)| !category.is_empty() && !tag.is_empty())
}

fn string_entries(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Derive all representations from the two raw tag fields.
///
/// Absent fields, fields of the wrong JSON type, and non-string list entries
/// are treated as empty.
#[must_use]
pub fn representations(flat: Option<&Value>, categorized: Option<&Value>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    out.extend(string_entries(flat).filter_map(canonicalize));

    if let Some(map) = categorized.and_then(Value::as_object) {
        for (category, tags) in map {
            for tag in string_entries(Some(tags)) {
                let Some(bare) = canonicalize(tag) else {
                    continue;
                };
                if let Some(scoped) = composite(category, &bare) {
                    out.insert(scoped);
                }
                out.insert(bare);
            }
        }
    }

    out
}

/// Derive all representations from a whole project document.
#[must_use]
pub fn project_representations(doc: &Value) -> BTreeSet<String> {
    representations(doc.get(FLAT_FIELD), doc.get(CATEGORIZED_FIELD))
}
