//! Content assets (images and text blocks) referenced from chart formulas.
//!
//! Deleting an asset that a formula still embeds would silently break the
//! chart, so [`delete_asset`] runs the reference scan first and refuses while
//! the usage count is non-zero unless the caller forces it.

use std::{fmt, str::FromStr};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

use super::timestamp_now;
use crate::error::TagboardError;
use crate::refs::scan::{ReferenceHit, scan_references};

/// The two asset kinds a formula token can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Media,
    Text,
}

impl AssetKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown asset kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset kind '{0}', expected one of: media, text")]
pub struct ParseAssetKindError(String);

impl FromStr for AssetKind {
    type Err = ParseAssetKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "media" | "image" => Ok(Self::Media),
            "text" => Ok(Self::Text),
            _ => Err(ParseAssetKindError(s.to_string())),
        }
    }
}

/// A stored content asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAsset {
    pub key: String,
    pub kind: AssetKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn required_key(key: &str) -> Result<&str, TagboardError> {
    let key = key.trim();
    if key.is_empty() {
        Err(TagboardError::MissingParameter("key"))
    } else {
        Ok(key)
    }
}

fn map_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContentAsset> {
    let kind: String = row.get(1)?;
    let kind = kind.parse::<AssetKind>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;
    Ok(ContentAsset {
        key: row.get(0)?,
        kind,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Create or replace an asset, keeping its original creation time.
///
/// # Errors
///
/// Returns [`TagboardError::MissingParameter`] for a blank key, or a store
/// error.
pub fn upsert_asset(
    conn: &Connection,
    key: &str,
    kind: AssetKind,
    title: &str,
    content: Option<&str>,
) -> Result<ContentAsset, TagboardError> {
    let key = required_key(key)?;
    conn.execute(
        "INSERT INTO content_assets (asset_key, kind, title, content, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
         ON CONFLICT(asset_key) DO UPDATE SET \
             kind = excluded.kind, \
             title = excluded.title, \
             content = excluded.content, \
             updated_at = excluded.updated_at",
        params![key, kind.as_str(), title, content, timestamp_now()],
    )?;
    get_asset(conn, key)
}

/// Fetch one asset by key.
///
/// # Errors
///
/// Returns [`TagboardError::AssetNotFound`] when absent, or a store error.
pub fn get_asset(conn: &Connection, key: &str) -> Result<ContentAsset, TagboardError> {
    let key = required_key(key)?;
    conn.query_row(
        "SELECT asset_key, kind, title, content, created_at, updated_at \
         FROM content_assets WHERE asset_key = ?1",
        params![key],
        map_asset,
    )
    .optional()?
    .ok_or_else(|| TagboardError::AssetNotFound(key.to_string()))
}

/// All assets ordered by key.
///
/// # Errors
///
/// Returns a store error if the query fails.
pub fn list_assets(conn: &Connection) -> Result<Vec<ContentAsset>, TagboardError> {
    let mut stmt = conn.prepare(
        "SELECT asset_key, kind, title, content, created_at, updated_at \
         FROM content_assets ORDER BY asset_key",
    )?;
    let rows = stmt.query_map([], map_asset)?;
    let mut assets = Vec::new();
    for row in rows {
        assets.push(row?);
    }
    Ok(assets)
}

/// Result of a delete that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub key: String,
    /// References still present at delete time (non-zero only when forced).
    pub dangling: Vec<ReferenceHit>,
}

/// Delete an asset after checking that no chart element still embeds it.
///
/// # Errors
///
/// - [`TagboardError::MissingParameter`] for a blank key
/// - [`TagboardError::AssetNotFound`] when the asset does not exist
/// - [`TagboardError::AssetInUse`] when references exist and `force` is off
/// - a store error if the scan or delete fails (nothing is deleted)
pub fn delete_asset(
    conn: &Connection,
    key: &str,
    force: bool,
) -> Result<DeleteReport, TagboardError> {
    let asset = get_asset(conn, key)?;
    let scan = scan_references(conn, &asset.key)?;

    if scan.usage_count() > 0 && !force {
        return Err(TagboardError::AssetInUse {
            key: asset.key,
            usage_count: scan.usage_count(),
        });
    }
    if scan.usage_count() > 0 {
        tracing::warn!(
            key = %asset.key,
            usage = scan.usage_count(),
            "force-deleting referenced content asset"
        );
    }

    conn.execute(
        "DELETE FROM content_assets WHERE asset_key = ?1",
        params![asset.key],
    )?;
    tracing::info!(key = %asset.key, "deleted content asset");

    Ok(DeleteReport {
        key: asset.key,
        dangling: scan.hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::documents::{Collection, upsert_documents};
    use crate::db::test_store;
    use serde_json::json;

    #[test]
    fn kind_parses_aliases_and_rejects_unknown() {
        assert_eq!("MEDIA".parse::<AssetKind>(), Ok(AssetKind::Media));
        assert_eq!("image".parse::<AssetKind>(), Ok(AssetKind::Media));
        assert_eq!(" text ".parse::<AssetKind>(), Ok(AssetKind::Text));
        assert!("video".parse::<AssetKind>().is_err());
    }

    #[test]
    fn upsert_keeps_created_at() {
        let conn = test_store();
        let first = upsert_asset(&conn, "logo", AssetKind::Media, "Logo", None).expect("insert");
        let second =
            upsert_asset(&conn, "logo", AssetKind::Media, "Logo v2", Some("https://x/y.png"))
                .expect("update");
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.title, "Logo v2");
        assert_eq!(list_assets(&conn).expect("list").len(), 1);
    }

    #[test]
    fn delete_unreferenced_asset() {
        let conn = test_store();
        upsert_asset(&conn, "banner", AssetKind::Media, "", None).expect("insert");
        let report = delete_asset(&conn, "banner", false).expect("delete");
        assert!(report.dangling.is_empty());
        assert!(matches!(
            get_asset(&conn, "banner"),
            Err(TagboardError::AssetNotFound(_))
        ));
    }

    #[test]
    fn delete_referenced_asset_is_blocked_unless_forced() {
        let conn = test_store();
        upsert_asset(&conn, "logo", AssetKind::Media, "Logo", None).expect("insert");
        upsert_documents(
            &conn,
            Collection::Charts,
            &[json!({"chartId": "c1", "elements": [{"formula": "[MEDIA:logo]"}]})],
        )
        .expect("load chart");

        let err = delete_asset(&conn, "logo", false).expect_err("blocked");
        assert!(matches!(
            err,
            TagboardError::AssetInUse { usage_count: 1, .. }
        ));
        assert!(get_asset(&conn, "logo").is_ok(), "asset must survive");

        let report = delete_asset(&conn, "logo", true).expect("forced");
        assert_eq!(report.dangling.len(), 1);
        assert!(get_asset(&conn, "logo").is_err());
    }

    #[test]
    fn delete_missing_asset_is_not_found() {
        let conn = test_store();
        let err = delete_asset(&conn, "ghost", false).expect_err("missing");
        assert!(matches!(err, TagboardError::AssetNotFound(_)));
        let err = delete_asset(&conn, " ", false).expect_err("blank");
        assert!(matches!(err, TagboardError::MissingParameter("key")));
    }
}
