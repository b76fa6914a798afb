//! End-to-end read paths over an on-disk store: load documents, then query
//! tag usage and content references the way an API handler would.

use rusqlite::{Connection, params};
use serde_json::{Value, json};
use tagboard_core::TagboardError;
use tagboard_core::db::documents::{Collection, upsert_documents};
use tagboard_core::db::{open_store, store_path};
use tagboard_core::refs::reference_usage;
use tagboard_core::tags::slug::lookup_slug;
use tagboard_core::tags::{UsageOptions, hashtag_usage};
use tempfile::TempDir;

fn seeded_store() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("tempdir");
    let conn = open_store(&store_path(dir.path())).expect("open store");

    let projects = [
        json!({ "_id": "p1", "hashtags": ["VIP", "vip", "summer"] }),
        json!({ "_id": "p2", "hashtags": ["vip"], "categorizedHashtags": { "sponsor": ["Acme"] } }),
        json!({ "_id": "p3", "categorizedHashtags": { "Sponsor": ["acme", "globex"] } }),
        json!({ "_id": "p4", "hashtags": "not-a-list", "categorizedHashtags": [] }),
    ];
    upsert_documents(&conn, Collection::Projects, &projects).expect("load projects");

    let charts = [
        json!({
            "chartId": "wall",
            "title": "Sponsor wall",
            "type": "image",
            "elements": [
                { "formula": "[MEDIA:logo]" },
                { "formula": "[MEDIA:logo][TEXT:logo]" },
                { "formula": "[MEDIA:logo-dark]" }
            ]
        }),
        json!({ "chartId": "kpi", "elements": [{ "formula": "SUM(x) [TEXT:intro]" }] }),
        json!({ "chartId": "broken", "elements": "nope" }),
    ];
    upsert_documents(&conn, Collection::Charts, &charts).expect("load charts");

    (dir, conn)
}

fn corrupt_row(conn: &Connection, table: &str, id_column: &str, id: &str) {
    conn.execute(
        &format!(
            "INSERT INTO {table} ({id_column}, doc_json, created_at, updated_at) \
             VALUES (?1, '{{not json', '', '')"
        ),
        params![id],
    )
    .expect("insert corrupt row");
}

#[test]
fn usage_counts_ranks_and_resolves_every_representation() {
    let (_dir, conn) = seeded_store();
    let response = hashtag_usage(&conn, UsageOptions::default()).expect("usage");

    let rows: Vec<(&str, usize)> = response
        .hashtags
        .iter()
        .map(|row| (row.hashtag.as_str(), row.count))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("acme", 2),
            ("sponsor:acme", 2),
            ("vip", 2),
            ("globex", 1),
            ("sponsor:globex", 1),
            ("summer", 1),
        ]
    );
    assert!(response.success);
    assert!(response.debug.is_none());

    for row in &response.hashtags {
        assert_eq!(lookup_slug(&conn, &row.slug).expect("registered").tag, row.hashtag);
    }

    let again = hashtag_usage(&conn, UsageOptions::default()).expect("usage again");
    assert_eq!(again, response, "repeat calls over unchanged data are identical");
}

#[test]
fn usage_skips_unparsable_projects_and_reports_them_in_debug() {
    let (_dir, conn) = seeded_store();
    corrupt_row(&conn, "projects", "project_id", "bad");

    let response = hashtag_usage(
        &conn,
        UsageOptions {
            include_debug: true,
            limit: Some(2),
        },
    )
    .expect("usage");

    assert_eq!(response.hashtags.len(), 2);
    let debug = response.debug.expect("debug requested");
    assert_eq!(debug.projects_skipped, 1);
    assert_eq!(debug.projects_scanned, 5);
    assert_eq!(debug.distinct_hashtags, 6);
    assert_eq!(debug.total_occurrences, 9);
}

#[test]
fn usage_over_empty_store_is_a_success() {
    let dir = TempDir::new().expect("tempdir");
    let conn = open_store(&store_path(dir.path())).expect("open store");
    let response = hashtag_usage(&conn, UsageOptions::default()).expect("usage");

    let body: Value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(body, json!({ "success": true, "hashtags": [] }));
}

#[test]
fn reference_usage_reports_each_element_once() {
    let (_dir, conn) = seeded_store();
    corrupt_row(&conn, "chart_configurations", "chart_id", "zzz-bad");

    let response = reference_usage(&conn, Some("logo")).expect("refs");
    let body = serde_json::to_value(&response).expect("serialize");
    assert_eq!(
        body,
        json!({
            "success": true,
            "slug": "logo",
            "usageCount": 2,
            "charts": [
                { "chartId": "wall", "title": "Sponsor wall", "type": "image", "elementIndex": 0 },
                { "chartId": "wall", "title": "Sponsor wall", "type": "image", "elementIndex": 1 }
            ]
        })
    );
}

#[test]
fn unreferenced_key_is_an_empty_success() {
    let (_dir, conn) = seeded_store();
    let response = reference_usage(&conn, Some("banner")).expect("refs");
    assert!(response.success);
    assert_eq!(response.usage_count, 0);
    assert!(response.charts.is_empty());
}

#[test]
fn missing_key_is_rejected_before_scanning() {
    let (_dir, conn) = seeded_store();
    conn.execute_batch("DROP TABLE chart_configurations")
        .expect("drop table");

    for key in [None, Some(""), Some("   ")] {
        let err = reference_usage(&conn, key).expect_err("missing key");
        assert!(matches!(err, TagboardError::MissingParameter("slug")));
        assert!(err.is_client_error());
    }

    let err = reference_usage(&conn, Some("logo")).expect_err("store failure");
    assert!(matches!(err, TagboardError::Store(_)));
    assert!(!err.is_client_error());
}
