//! Canonical SQLite schema for the tagboard document store.
//!
//! - `projects` and `chart_configurations` hold one JSON document per row;
//!   the core only ever scans them
//! - `hashtag_slugs` is the slug registry, unique on both `tag` and `slug`
//! - `hashtag_colors` and `content_assets` are small relational tables
//! - `store_meta` tracks the applied schema version

/// Migration v1: document collections, slug registry, and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY CHECK (length(trim(project_id)) > 0),
    doc_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chart_configurations (
    chart_id TEXT PRIMARY KEY CHECK (length(trim(chart_id)) > 0),
    doc_json TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS hashtag_slugs (
    tag TEXT PRIMARY KEY CHECK (length(trim(tag)) > 0),
    slug TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    initialized_at TEXT NOT NULL DEFAULT ''
);

INSERT OR IGNORE INTO store_meta (id, schema_version, initialized_at)
VALUES (1, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'));
";

/// Migration v2: color mapping and content assets.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS hashtag_colors (
    tag TEXT PRIMARY KEY CHECK (length(trim(tag)) > 0),
    color TEXT NOT NULL CHECK (length(trim(color)) > 0),
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS content_assets (
    asset_key TEXT PRIMARY KEY CHECK (length(trim(asset_key)) > 0),
    kind TEXT NOT NULL CHECK (kind IN ('media', 'text')),
    title TEXT NOT NULL DEFAULT '',
    content TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_assets_kind
    ON content_assets(kind, asset_key);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Tables every migrated store must contain.
pub const REQUIRED_TABLES: &[&str] = &[
    "projects",
    "chart_configurations",
    "hashtag_slugs",
    "hashtag_colors",
    "content_assets",
    "store_meta",
];
