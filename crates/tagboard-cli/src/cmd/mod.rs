pub mod assets;
pub mod colors;
pub mod completions;
pub mod hashtags;
pub mod init;
pub mod load;
pub mod refs;
pub mod slug;

use std::path::Path;

use rusqlite::Connection;
use tagboard_core::config::{ProjectConfig, load_project_config};
use tagboard_core::db::open_project_store;
use tagboard_core::error::TagboardError;

/// Open the project store, mapping a missing or broken store to a coded error.
pub fn open_db(project_root: &Path) -> anyhow::Result<Connection> {
    Ok(open_project_store(project_root)?)
}

/// Load `.tagboard/config.toml`, surfacing parse failures as config errors.
pub fn project_config(project_root: &Path) -> anyhow::Result<ProjectConfig> {
    load_project_config(project_root)
        .map_err(|e| TagboardError::Config(format!("{e:#}")).into())
}
