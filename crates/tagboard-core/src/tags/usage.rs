//! Hashtag usage aggregation over the project collection.
//!
//! Counts are per document: a representation appearing several times in one
//! project still adds one. Results are ordered by count descending, then by
//! canonical tag ascending (byte order) so repeated calls over unchanged data
//! return identical output.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use super::normalize::project_representations;
use super::slug::resolve_all;
use crate::db::documents::{Collection, scan_documents};
use crate::error::TagboardError;

/// Raw result of one pass over the project collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageScan {
    /// Representation → number of projects containing it.
    pub counts: BTreeMap<String, usize>,
    /// Projects read from the store.
    pub projects_scanned: usize,
    /// Projects whose stored JSON could not be parsed.
    pub projects_skipped: usize,
}

impl UsageScan {
    /// Fold one parsed project document into the counts.
    pub fn add_document(&mut self, doc: &Value) {
        for representation in project_representations(doc) {
            *self.counts.entry(representation).or_insert(0) += 1;
        }
    }

    /// Representations ordered by count descending, then tag ascending.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| rank_order(a.1, a.0, b.1, b.0));
        ranked
    }
}

fn rank_order(count_a: usize, tag_a: &str, count_b: usize, tag_b: &str) -> Ordering {
    count_b.cmp(&count_a).then_with(|| tag_a.cmp(tag_b))
}

/// Scan every project and count representations.
///
/// Read-only; takes no locks and reflects whatever is committed when each row
/// is read.
///
/// # Errors
///
/// Returns a store error if the collection cannot be read. A failed scan is
/// never reported as empty counts.
pub fn scan_usage(conn: &Connection) -> Result<UsageScan, TagboardError> {
    let mut scan = UsageScan::default();
    let mut skipped = 0usize;

    let scanned = scan_documents(conn, Collection::Projects, |stored| {
        match serde_json::from_str::<Value>(&stored.doc_json) {
            Ok(doc) => scan.add_document(&doc),
            Err(error) => {
                skipped += 1;
                tracing::warn!(
                    project_id = %stored.id,
                    error = %error,
                    "skipping project with unparsable document"
                );
            }
        }
    })?;

    scan.projects_scanned = scanned;
    scan.projects_skipped = skipped;
    tracing::debug!(
        projects = scanned,
        skipped,
        distinct = scan.counts.len(),
        "scanned hashtag usage"
    );
    Ok(scan)
}

/// Options for the usage read path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageOptions {
    /// Attach scan diagnostics to the response.
    pub include_debug: bool,
    /// Return at most this many rows (after ranking).
    pub limit: Option<usize>,
}

/// One row of the usage response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashtagCount {
    pub hashtag: String,
    pub slug: String,
    pub count: usize,
}

/// Scan diagnostics attached when requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDebug {
    pub projects_scanned: usize,
    pub projects_skipped: usize,
    pub distinct_hashtags: usize,
    pub total_occurrences: usize,
}

/// `{ success, hashtags: [{ hashtag, slug, count }], debug? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashtagUsageResponse {
    pub success: bool,
    pub hashtags: Vec<HashtagCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<UsageDebug>,
}

/// Tag usage query: scan, resolve a slug for every discovered
/// representation, merge, and rank.
///
/// # Errors
///
/// Returns a store error if the scan or slug resolution fails.
pub fn hashtag_usage(
    conn: &Connection,
    options: UsageOptions,
) -> Result<HashtagUsageResponse, TagboardError> {
    let scan = scan_usage(conn)?;
    let slugs = resolve_all(conn, scan.counts.keys().map(String::as_str))?;

    let mut hashtags = Vec::with_capacity(scan.counts.len());
    for (tag, count) in scan.ranked() {
        // resolve_all returns an entry for every canonical input; the
        // representations are already canonical.
        let Some(slug) = slugs.get(tag) else {
            tracing::warn!(tag, "no slug resolved for representation");
            continue;
        };
        hashtags.push(HashtagCount {
            hashtag: tag.to_string(),
            slug: slug.clone(),
            count,
        });
    }
    if let Some(limit) = options.limit {
        hashtags.truncate(limit);
    }

    let debug = options.include_debug.then(|| UsageDebug {
        projects_scanned: scan.projects_scanned,
        projects_skipped: scan.projects_skipped,
        distinct_hashtags: scan.counts.len(),
        total_occurrences: scan.counts.values().sum(),
    });

    Ok(HashtagUsageResponse {
        success: true,
        hashtags,
        debug,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::documents::upsert_documents;
    use crate::db::test_store;
    use serde_json::json;

    fn scan_of(docs: &[Value]) -> UsageScan {
        let mut scan = UsageScan::default();
        for doc in docs {
            scan.add_document(doc);
        }
        scan
    }

    #[test]
    fn dual_representation_counts_both_forms() {
        let scan = scan_of(&[json!({ "categorizedHashtags": { "sponsor": ["acme"] } })]);
        assert_eq!(scan.counts.len(), 2);
        assert_eq!(scan.counts["acme"], 1);
        assert_eq!(scan.counts["sponsor:acme"], 1);
    }

    #[test]
    fn count_is_per_document() {
        let scan = scan_of(&[
            json!({ "hashtags": ["vip", "vip"] }),
            json!({ "hashtags": ["VIP"], "categorizedHashtags": { "tier": ["vip"] } }),
        ]);
        assert_eq!(scan.counts["vip"], 2);
        assert_eq!(scan.counts["tier:vip"], 1);
    }

    #[test]
    fn ranking_breaks_ties_lexically() {
        let mut scan = UsageScan::default();
        scan.counts.insert("c".into(), 1);
        scan.counts.insert("b".into(), 3);
        scan.counts.insert("a".into(), 3);

        let expected = vec![("a", 3), ("b", 3), ("c", 1)];
        assert_eq!(scan.ranked(), expected);
        assert_eq!(scan.ranked(), expected, "ranking must be stable");
    }

    #[test]
    fn empty_collection_is_valid_empty_result() {
        let conn = test_store();
        let response = hashtag_usage(&conn, UsageOptions::default()).expect("usage");
        assert!(response.success);
        assert!(response.hashtags.is_empty());
        assert!(response.debug.is_none());
    }

    #[test]
    fn usage_resolves_slugs_and_ranks() {
        let conn = test_store();
        upsert_documents(
            &conn,
            Collection::Projects,
            &[
                json!({"_id": "p1", "hashtags": ["summer", "vip"]}),
                json!({"_id": "p2", "hashtags": ["summer"], "categorizedHashtags": {"sponsor": ["acme"]}}),
                json!({"_id": "p3", "hashtags": ["Summer", "acme"]}),
            ],
        )
        .expect("load");

        let response = hashtag_usage(
            &conn,
            UsageOptions {
                include_debug: true,
                limit: None,
            },
        )
        .expect("usage");

        let rows: Vec<(&str, usize)> = response
            .hashtags
            .iter()
            .map(|h| (h.hashtag.as_str(), h.count))
            .collect();
        assert_eq!(
            rows,
            vec![("summer", 3), ("acme", 2), ("sponsor:acme", 1), ("vip", 1)]
        );

        let registry = crate::tags::slug::list_entries(&conn).expect("registry");
        assert_eq!(registry.len(), 4);
        for row in &response.hashtags {
            let entry = registry
                .iter()
                .find(|e| e.tag == row.hashtag)
                .expect("registry entry for every row");
            assert_eq!(entry.slug, row.slug);
        }

        let debug = response.debug.expect("debug requested");
        assert_eq!(debug.projects_scanned, 3);
        assert_eq!(debug.distinct_hashtags, 4);
        assert_eq!(debug.total_occurrences, 7);
    }

    #[test]
    fn slugs_stay_stable_across_requests_and_tag_removal() {
        let conn = test_store();
        upsert_documents(
            &conn,
            Collection::Projects,
            &[json!({"_id": "p1", "hashtags": ["gala", "vip"]})],
        )
        .expect("load");
        let first = hashtag_usage(&conn, UsageOptions::default()).expect("usage");
        let gala_slug = first
            .hashtags
            .iter()
            .find(|h| h.hashtag == "gala")
            .map(|h| h.slug.clone())
            .expect("gala row");

        upsert_documents(
            &conn,
            Collection::Projects,
            &[json!({"_id": "p1", "hashtags": ["vip"]})],
        )
        .expect("edit");
        let second = hashtag_usage(&conn, UsageOptions::default()).expect("usage");
        assert!(second.hashtags.iter().all(|h| h.hashtag != "gala"));

        upsert_documents(
            &conn,
            Collection::Projects,
            &[json!({"_id": "p1", "hashtags": ["vip", "GALA"]})],
        )
        .expect("restore");
        let third = hashtag_usage(&conn, UsageOptions::default()).expect("usage");
        let restored = third
            .hashtags
            .iter()
            .find(|h| h.hashtag == "gala")
            .expect("gala row");
        assert_eq!(restored.slug, gala_slug);
    }

    #[test]
    fn unparsable_document_is_skipped_not_fatal() {
        let conn = test_store();
        upsert_documents(
            &conn,
            Collection::Projects,
            &[json!({"_id": "good", "hashtags": ["ok"]})],
        )
        .expect("load");
        conn.execute(
            "INSERT INTO projects (project_id, doc_json, created_at, updated_at) \
             VALUES ('bad', '{not json', 't', 't')",
            [],
        )
        .expect("insert corrupt row");

        let scan = scan_usage(&conn).expect("scan");
        assert_eq!(scan.projects_scanned, 2);
        assert_eq!(scan.projects_skipped, 1);
        assert_eq!(scan.counts["ok"], 1);
    }

    #[test]
    fn store_failure_propagates_instead_of_empty() {
        let conn = test_store();
        conn.execute_batch("DROP TABLE projects").expect("drop");
        let err = hashtag_usage(&conn, UsageOptions::default()).expect_err("must fail");
        assert!(matches!(err, TagboardError::Store(_)));
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let conn = test_store();
        upsert_documents(
            &conn,
            Collection::Projects,
            &[
                json!({"_id": "p1", "hashtags": ["a", "b"]}),
                json!({"_id": "p2", "hashtags": ["b"]}),
            ],
        )
        .expect("load");
        let response = hashtag_usage(
            &conn,
            UsageOptions {
                include_debug: false,
                limit: Some(1),
            },
        )
        .expect("usage");
        assert_eq!(response.hashtags.len(), 1);
        assert_eq!(response.hashtags[0].hashtag, "b");
    }
}
