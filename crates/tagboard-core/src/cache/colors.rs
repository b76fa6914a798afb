//! Cached hashtag color table.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use super::{DerivedCache, FetchError, Fetcher, InvalidationBus};
use crate::db::colors::{ColorTable, load_colors, set_color};
use crate::db::try_open_store;
use crate::error::TagboardError;

/// Dataset name published on the bus when colors change.
pub const COLOR_DATASET: &str = "hashtag-colors";

/// Reads the color table from a store file, one connection per fetch.
#[derive(Debug, Clone)]
pub struct ColorFetcher {
    store: PathBuf,
}

impl ColorFetcher {
    #[must_use]
    pub const fn new(store: PathBuf) -> Self {
        Self { store }
    }
}

impl Fetcher<ColorTable> for ColorFetcher {
    fn fetch(&self) -> Result<ColorTable, FetchError> {
        let conn = try_open_store(&self.store)
            .map_err(|e| FetchError::new(COLOR_DATASET, e))?
            .ok_or_else(|| {
                FetchError::new(
                    COLOR_DATASET,
                    format!("store not found at {}", self.store.display()),
                )
            })?;
        load_colors(&conn).map_err(|e| FetchError::new(COLOR_DATASET, e))
    }
}

/// Build an EMPTY color cache over the store at `store`.
#[must_use]
pub fn color_cache(store: PathBuf) -> Arc<DerivedCache<ColorTable>> {
    DerivedCache::new(COLOR_DATASET, ColorFetcher::new(store))
}

/// Write a color and tell every mounted consumer to re-read the table.
///
/// # Errors
///
/// Propagates [`set_color`] failures; nothing is published when the write fails.
pub fn set_color_and_invalidate(
    conn: &Connection,
    bus: &dyn InvalidationBus,
    tag: &str,
    color: &str,
) -> Result<String, TagboardError> {
    let canonical = set_color(conn, tag, color)?;
    bus.publish(COLOR_DATASET);
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheState, Consumer, LocalBus};
    use crate::db::{open_store, store_path};
    use tempfile::TempDir;

    #[test]
    fn missing_store_is_a_fetch_error() {
        let dir = TempDir::new().expect("tempdir");
        let cache = color_cache(store_path(dir.path()));
        let err = cache.get().expect_err("no store yet");
        assert_eq!(err.dataset, COLOR_DATASET);
        assert_eq!(cache.state(), CacheState::Empty);
    }

    #[test]
    fn consumers_see_new_colors_after_invalidation() {
        let dir = TempDir::new().expect("tempdir");
        let path = store_path(dir.path());
        let conn = open_store(&path).expect("open store");
        set_color(&conn, "vip", "#111111").expect("seed");

        let bus = LocalBus::new();
        let cache = color_cache(path);
        let first = Consumer::mount(&cache, &bus);
        let second = Consumer::mount(&cache, &bus);

        assert_eq!(first.render().expect("render").color_for("vip", "-"), "#111111");
        assert_eq!(second.render().expect("render").color_for("vip", "-"), "#111111");
        assert_eq!(cache.fetch_count(), 1);

        set_color_and_invalidate(&conn, &bus, "vip", "#222222").expect("update");
        assert_eq!(first.render().expect("render").color_for("vip", "-"), "#222222");
        assert_eq!(second.render().expect("render").color_for("vip", "-"), "#222222");
        assert_eq!(cache.fetch_count(), 3, "each consumer refetches on its own");
    }

    #[test]
    fn failed_write_publishes_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let conn = open_store(&store_path(dir.path())).expect("open store");
        let bus = LocalBus::new();
        let sub = bus.subscribe();

        assert!(set_color_and_invalidate(&conn, &bus, " ", "#fff").is_err());
        assert!(!sub.take(COLOR_DATASET));
    }
}
