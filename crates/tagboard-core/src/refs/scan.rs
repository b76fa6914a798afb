//! Reverse index from a content-asset key to the chart elements that embed it.
//!
//! Chart definitions are stored as loose JSON:
//!
//! ```text
//! { "chartId": "kpi-1", "title": "Reach", "type": "kpi",
//!   "elements": [ { "formula": "[MEDIA:logo] ..." }, ... ] }
//! ```
//!
//! The scan is read-only and tolerant: definitions without an `elements`
//! array, or stored text that does not parse, are skipped with a warning.
//! An empty result means "unused" and is a success; callers use a non-zero
//! count to block or confirm a destructive delete.

use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::tokens::references_key;
use crate::db::documents::{Collection, scan_documents};
use crate::error::TagboardError;

const UNKNOWN_KIND: &str = "unknown";

/// One element that references the scanned key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceHit {
    pub referenced_key: String,
    /// `<chartId>#<elementIndex>`, the deduplication identity.
    pub element_id: String,
    pub chart_id: String,
    pub title: String,
    pub kind: String,
    pub element_index: usize,
    /// Human pointer into the definition, e.g. `elements[2] (Sponsor logo)`.
    pub location_hint: String,
}

/// Outcome of scanning every chart definition for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceScan {
    pub hits: Vec<ReferenceHit>,
    pub definitions_scanned: usize,
    pub definitions_skipped: usize,
}

impl ReferenceScan {
    /// Number of distinct referencing elements.
    #[must_use]
    pub fn usage_count(&self) -> usize {
        self.hits.len()
    }
}

fn string_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Collect the referencing elements of one parsed definition.
///
/// Returns `None` when the definition has no usable `elements` array.
#[must_use]
pub fn scan_definition(doc: &Value, stored_id: &str, key: &str) -> Option<Vec<ReferenceHit>> {
    let elements = doc.get("elements").and_then(Value::as_array)?;

    let chart_id = string_field(doc, "chartId").unwrap_or(stored_id);
    let title = string_field(doc, "title").unwrap_or_default();
    let kind = string_field(doc, "type").unwrap_or(UNKNOWN_KIND);

    let mut seen = BTreeSet::new();
    let mut hits = Vec::new();
    for (index, element) in elements.iter().enumerate() {
        let Some(formula) = string_field(element, "formula") else {
            continue;
        };
        if !references_key(formula, key) {
            continue;
        }
        let element_id = format!("{chart_id}#{index}");
        if !seen.insert(element_id.clone()) {
            continue;
        }
        let location_hint = string_field(element, "label").map_or_else(
            || format!("elements[{index}]"),
            |label| format!("elements[{index}] ({label})"),
        );
        hits.push(ReferenceHit {
            referenced_key: key.to_string(),
            element_id,
            chart_id: chart_id.to_string(),
            title: title.to_string(),
            kind: kind.to_string(),
            element_index: index,
            location_hint,
        });
    }
    Some(hits)
}

/// Scan every chart definition for elements referencing `key`.
///
/// # Errors
///
/// Returns a store error if the collection cannot be read.
pub fn scan_references(conn: &Connection, key: &str) -> Result<ReferenceScan, TagboardError> {
    let mut hits = Vec::new();
    let mut seen = BTreeSet::new();
    let mut skipped = 0usize;

    let scanned = scan_documents(conn, Collection::Charts, |stored| {
        let parsed = match serde_json::from_str::<Value>(&stored.doc_json) {
            Ok(doc) => doc,
            Err(error) => {
                skipped += 1;
                tracing::warn!(chart_id = %stored.id, error = %error, "skipping unparsable chart definition");
                return;
            }
        };
        let Some(found) = scan_definition(&parsed, &stored.id, key) else {
            skipped += 1;
            tracing::debug!(chart_id = %stored.id, "chart definition has no elements list");
            return;
        };
        for hit in found {
            if seen.insert(hit.element_id.clone()) {
                hits.push(hit);
            }
        }
    })?;

    tracing::debug!(
        key,
        definitions = scanned,
        skipped,
        usage = hits.len(),
        "scanned asset references"
    );
    Ok(ReferenceScan {
        hits,
        definitions_scanned: scanned,
        definitions_skipped: skipped,
    })
}

/// One referencing chart element in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartReference {
    pub chart_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub element_index: usize,
}

/// `{ success, slug, usageCount, charts: [{ chartId, title, type, elementIndex }] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceUsageResponse {
    pub success: bool,
    pub slug: String,
    pub usage_count: usize,
    pub charts: Vec<ChartReference>,
}

impl From<ReferenceHit> for ChartReference {
    fn from(hit: ReferenceHit) -> Self {
        Self {
            chart_id: hit.chart_id,
            title: hit.title,
            kind: hit.kind,
            element_index: hit.element_index,
        }
    }
}

/// Reference usage query for a required key.
///
/// The key is validated before any scan starts.
///
/// # Errors
///
/// Returns [`TagboardError::MissingParameter`] for an absent or blank key, or
/// a store error.
pub fn reference_usage(
    conn: &Connection,
    key: Option<&str>,
) -> Result<ReferenceUsageResponse, TagboardError> {
    let key = key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(TagboardError::MissingParameter("slug"))?;

    let scan = scan_references(conn, key)?;
    Ok(ReferenceUsageResponse {
        success: true,
        slug: key.to_string(),
        usage_count: scan.usage_count(),
        charts: scan.hits.into_iter().map(ChartReference::from).collect(),
    })
}
