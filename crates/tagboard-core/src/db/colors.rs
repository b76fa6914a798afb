//! Hashtag → display color mapping.

use std::collections::BTreeMap;

use rusqlite::{Connection, params};

use super::timestamp_now;
use crate::error::TagboardError;
use crate::tags::normalize::canonicalize;

/// Snapshot of the whole color mapping, keyed by canonical tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTable {
    pub colors: BTreeMap<String, String>,
}

impl ColorTable {
    /// Color for a tag, or `fallback` when the tag has none.
    #[must_use]
    pub fn color_for<'a>(&'a self, tag: &str, fallback: &'a str) -> &'a str {
        canonicalize(tag)
            .and_then(|canonical| self.colors.get(&canonical))
            .map_or(fallback, String::as_str)
    }
}

/// Set the color for a tag.
///
/// # Errors
///
/// Returns [`TagboardError::InvalidTag`] for a blank tag,
/// [`TagboardError::MissingParameter`] for a blank color, or a store error.
pub fn set_color(conn: &Connection, tag: &str, color: &str) -> Result<String, TagboardError> {
    let canonical = canonicalize(tag).ok_or_else(|| TagboardError::InvalidTag(tag.to_string()))?;
    let color = color.trim();
    if color.is_empty() {
        return Err(TagboardError::MissingParameter("color"));
    }
    conn.execute(
        "INSERT INTO hashtag_colors (tag, color, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(tag) DO UPDATE SET color = excluded.color, updated_at = excluded.updated_at",
        params![canonical, color, timestamp_now()],
    )?;
    Ok(canonical)
}

/// Load the full color table.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn load_colors(conn: &Connection) -> Result<ColorTable, TagboardError> {
    let mut stmt = conn.prepare("SELECT tag, color FROM hashtag_colors ORDER BY tag")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut colors = BTreeMap::new();
    for row in rows {
        let (tag, color): (String, String) = row?;
        colors.insert(tag, color);
    }
    Ok(ColorTable { colors })
}
