//! Document collections: JSON objects stored one per row.
//!
//! The core never trusts stored document shape. Writers accept any JSON
//! object; readers hand back the raw text and let the tag normalizer and the
//! reference scanner narrow it.

use rusqlite::{Connection, params};
use serde_json::Value;

use super::timestamp_now;
use crate::error::TagboardError;
use crate::tags::slug::generate_slug;

/// The JSON-document collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Event records carrying `hashtags` and `categorizedHashtags`.
    Projects,
    /// Chart/report definitions carrying formula-bearing `elements`.
    Charts,
}

impl Collection {
    const fn table(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Charts => "chart_configurations",
        }
    }

    const fn id_column(self) -> &'static str {
        match self {
            Self::Projects => "project_id",
            Self::Charts => "chart_id",
        }
    }

    /// Document fields consulted, in order, for the document identifier.
    #[must_use]
    pub const fn id_fields(self) -> &'static [&'static str] {
        match self {
            Self::Projects => &["_id", "id", "projectId"],
            Self::Charts => &["chartId", "_id", "id"],
        }
    }
}

/// A stored document as read back from a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub doc_json: String,
}

fn document_id(collection: Collection, doc: &serde_json::Map<String, Value>) -> Option<String> {
    collection.id_fields().iter().find_map(|field| match doc.get(*field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Insert or replace documents in a collection. Returns the ids written in
/// input order.
///
/// Documents without an identifier field get a freshly generated one, which
/// is also written back into the stored JSON under the first id field.
///
/// # Errors
///
/// Returns [`TagboardError::InvalidDocument`] when an entry is not a JSON
/// object (nothing is written in that case), or a store error.
pub fn upsert_documents(
    conn: &Connection,
    collection: Collection,
    docs: &[Value],
) -> Result<Vec<String>, TagboardError> {
    let mut prepared = Vec::with_capacity(docs.len());
    for (index, doc) in docs.iter().enumerate() {
        let Value::Object(map) = doc else {
            return Err(TagboardError::InvalidDocument {
                index,
                reason: "expected a JSON object".to_string(),
            });
        };
        let mut map = map.clone();
        let id = if let Some(id) = document_id(collection, &map) {
            id
        } else {
            let id = generate_slug();
            map.insert(
                collection.id_fields()[0].to_string(),
                Value::String(id.clone()),
            );
            id
        };
        prepared.push((id, serde_json::to_string(&Value::Object(map))?));
    }

    let sql = format!(
        "INSERT INTO {table} ({id_col}, doc_json, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?3) \
         ON CONFLICT({id_col}) DO UPDATE SET \
             doc_json = excluded.doc_json, \
             updated_at = excluded.updated_at",
        table = collection.table(),
        id_col = collection.id_column(),
    );

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        let now = timestamp_now();
        for (id, json) in &prepared {
            stmt.execute(params![id, json, now])?;
        }
    }
    tx.commit()?;

    tracing::debug!(
        collection = collection.table(),
        count = prepared.len(),
        "upserted documents"
    );
    Ok(prepared.into_iter().map(|(id, _)| id).collect())
}

/// Visit every document of a collection in id order.
///
/// The visitor sees each row exactly once; a storage error aborts the scan
/// and is returned, so callers never mistake a failed read for an empty
/// collection.
///
/// # Errors
///
/// Returns a store error if the query or any row read fails.
pub fn scan_documents(
    conn: &Connection,
    collection: Collection,
    mut visit: impl FnMut(StoredDocument),
) -> Result<usize, TagboardError> {
    let sql = format!(
        "SELECT {id_col}, doc_json FROM {table} ORDER BY {id_col}",
        table = collection.table(),
        id_col = collection.id_column(),
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut scanned = 0usize;
    while let Some(row) = rows.next()? {
        visit(StoredDocument {
            id: row.get(0)?,
            doc_json: row.get(1)?,
        });
        scanned += 1;
    }
    Ok(scanned)
}

/// Count the documents in a collection.
///
/// # Errors
///
/// Returns a store error if the count query fails.
pub fn count_documents(conn: &Connection, collection: Collection) -> Result<usize, TagboardError> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or(0))
}
