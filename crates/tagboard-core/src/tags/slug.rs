//! Slug registry: canonical tag → stable opaque identifier.
//!
//! Slugs back shareable per-tag report links, so once a tag has a slug it
//! keeps it forever, even when no project uses the tag any more. Entries are
//! created with `INSERT … ON CONFLICT(tag) DO NOTHING` and then read back, so
//! concurrent first-time resolutions of the same tag (from separate
//! connections or processes) all observe the single winning row.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{
    Connection, OptionalExtension, Transaction, TransactionBehavior, params, params_from_iter,
};
use serde::Serialize;
use uuid::Uuid;

use super::normalize::canonicalize;
use crate::db::timestamp_now;
use crate::error::TagboardError;

/// SQLite's default host-parameter ceiling is 999; stay well below it.
const LOOKUP_CHUNK: usize = 500;

const INSERT_IF_ABSENT_SQL: &str = "INSERT INTO hashtag_slugs (tag, slug, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?3) \
     ON CONFLICT(tag) DO NOTHING";

/// One registry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugEntry {
    pub tag: String,
    pub slug: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Generate a fresh identifier: a random UUID v4 (122 random bits).
///
/// Never derived from tag text, so recasing or renaming a tag's display form
/// cannot change an issued link.
#[must_use]
pub fn generate_slug() -> String {
    Uuid::new_v4().to_string()
}

fn canonical_or_invalid(tag: &str) -> Result<String, TagboardError> {
    canonicalize(tag).ok_or_else(|| TagboardError::InvalidTag(tag.to_string()))
}

fn read_slug(conn: &Connection, tag: &str) -> rusqlite::Result<String> {
    conn.query_row(
        "SELECT slug FROM hashtag_slugs WHERE tag = ?1",
        params![tag],
        |row| row.get(0),
    )
}

/// Resolve a tag to its slug, creating the registry entry on first sight.
///
/// Idempotent: every call for the same canonical tag returns the same slug.
///
/// # Errors
///
/// Returns [`TagboardError::InvalidTag`] for blank input, or a store error.
pub fn resolve(conn: &Connection, tag: &str) -> Result<String, TagboardError> {
    let canonical = canonical_or_invalid(tag)?;

    let candidate = generate_slug();
    let inserted = conn.execute(
        INSERT_IF_ABSENT_SQL,
        params![canonical, candidate, timestamp_now()],
    )?;
    let slug = read_slug(conn, &canonical)?;

    if inserted == 1 {
        tracing::info!(tag = %canonical, slug = %slug, "registered hashtag slug");
    } else {
        tracing::trace!(tag = %canonical, "hashtag slug already registered");
    }
    Ok(slug)
}

fn lookup_existing(
    conn: &Connection,
    tags: &[&String],
    out: &mut BTreeMap<String, String>,
) -> rusqlite::Result<()> {
    for chunk in tags.chunks(LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("SELECT tag, slug FROM hashtag_slugs WHERE tag IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (tag, slug) = row?;
            out.insert(tag, slug);
        }
    }
    Ok(())
}

/// Resolve many tags at once.
///
/// One read pass finds existing entries; identifiers are generated only for
/// misses, which are inserted in a single immediate transaction and read back
/// so racing writers still converge on one row per tag.
///
/// Every input is validated before anything is written.
///
/// # Errors
///
/// Returns [`TagboardError::InvalidTag`] if any input is blank, or a store
/// error. A store error may leave earlier batches resolved; retrying is safe.
pub fn resolve_all<'a>(
    conn: &Connection,
    tags: impl IntoIterator<Item = &'a str>,
) -> Result<BTreeMap<String, String>, TagboardError> {
    let canonical: BTreeSet<String> = tags
        .into_iter()
        .map(canonical_or_invalid)
        .collect::<Result<_, _>>()?;

    let mut resolved = BTreeMap::new();
    if canonical.is_empty() {
        return Ok(resolved);
    }

    let all: Vec<&String> = canonical.iter().collect();
    lookup_existing(conn, &all, &mut resolved)?;

    let misses: Vec<&String> = canonical
        .iter()
        .filter(|tag| !resolved.contains_key(*tag))
        .collect();
    if misses.is_empty() {
        return Ok(resolved);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let mut created = 0usize;
    {
        let now = timestamp_now();
        let mut stmt = tx.prepare(INSERT_IF_ABSENT_SQL)?;
        for tag in &misses {
            created += stmt.execute(params![tag, generate_slug(), now])?;
        }
    }
    lookup_existing(&tx, &misses, &mut resolved)?;
    tx.commit()?;

    tracing::debug!(
        requested = canonical.len(),
        missed = misses.len(),
        created,
        "resolved hashtag slugs in batch"
    );
    Ok(resolved)
}

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<SlugEntry> {
    Ok(SlugEntry {
        tag: row.get(0)?,
        slug: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

/// Reverse lookup used by shareable report links.
///
/// # Errors
///
/// Returns [`TagboardError::MissingParameter`] for a blank slug,
/// [`TagboardError::SlugNotFound`] when no entry matches, or a store error.
pub fn lookup_slug(conn: &Connection, slug: &str) -> Result<SlugEntry, TagboardError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(TagboardError::MissingParameter("slug"));
    }
    conn.query_row(
        "SELECT tag, slug, created_at, updated_at FROM hashtag_slugs WHERE slug = ?1",
        params![slug],
        map_entry,
    )
    .optional()?
    .ok_or_else(|| TagboardError::SlugNotFound(slug.to_string()))
}

/// Fetch the registry entry for a tag without creating one.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn find_tag(conn: &Connection, tag: &str) -> Result<Option<SlugEntry>, TagboardError> {
    let Some(canonical) = canonicalize(tag) else {
        return Ok(None);
    };
    Ok(conn
        .query_row(
            "SELECT tag, slug, created_at, updated_at FROM hashtag_slugs WHERE tag = ?1",
            params![canonical],
            map_entry,
        )
        .optional()?)
}

/// All registry entries ordered by tag.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn list_entries(conn: &Connection) -> Result<Vec<SlugEntry>, TagboardError> {
    let mut stmt = conn
        .prepare("SELECT tag, slug, created_at, updated_at FROM hashtag_slugs ORDER BY tag")?;
    let rows = stmt.query_map([], map_entry)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}
