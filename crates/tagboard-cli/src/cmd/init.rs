use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::output::{OutputMode, pretty_kv, render_mode};
use tagboard_core::config::{default_project_config_toml, project_config_path};
use tagboard_core::db::{STORE_DIR, migrations::current_schema_version, open_store, store_path};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Re-initialize even if `.tagboard/` already exists. Existing data is kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "tagboard.db\ntagboard.db-wal\ntagboard.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    success: bool,
    store: String,
    config: String,
    schema_version: u32,
}

/// Execute `tb init`. Creates the project skeleton:
///
/// ```text
/// .tagboard/
///   tagboard.db   (SQLite store, migrated to the latest schema)
///   config.toml   (default project config)
///   .gitignore    (store files)
/// ```
///
/// # Errors
///
/// Returns an error if `.tagboard/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    let store_dir = project_root.join(STORE_DIR);

    if store_dir.exists() && !args.force {
        anyhow::bail!("{STORE_DIR}/ already exists. Use `tb init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&store_dir)
        .with_context(|| format!("Failed to create {}", store_dir.display()))?;

    let config_path = project_config_path(project_root);
    std::fs::write(&config_path, default_project_config_toml()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = store_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let db_path = store_path(project_root);
    let conn = open_store(&db_path)?;
    let schema_version = current_schema_version(&conn)?;
    tracing::info!(path = %db_path.display(), schema_version, "initialized store");

    let result = InitOutput {
        success: true,
        store: db_path.display().to_string(),
        config: config_path.display().to_string(),
        schema_version,
    };
    render_mode(
        output,
        &result,
        |r, w| writeln!(w, "initialized\t{}", r.store),
        |r, w| {
            writeln!(w, "✓ Initialized {STORE_DIR}/ project structure.")?;
            writeln!(w)?;
            pretty_kv(w, "Store", &r.store)?;
            pretty_kv(w, "Config", &r.config)?;
            pretty_kv(w, "Schema", r.schema_version.to_string())?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  tb load --projects projects.json --charts charts.json")?;
            writeln!(w, "  tb hashtags")
        },
    )
}
