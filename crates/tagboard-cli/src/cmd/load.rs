//! `tb load`: bulk upsert of project and chart documents from JSON files.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use super::open_db;
use crate::output::{OutputMode, pretty_kv, render_mode};
use tagboard_core::db::documents::{Collection, count_documents, upsert_documents};
use tagboard_core::error::TagboardError;

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// JSON array of project documents.
    #[arg(long, value_name = "FILE")]
    pub projects: Option<PathBuf>,

    /// JSON array of chart definitions.
    #[arg(long, value_name = "FILE")]
    pub charts: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadOutput {
    success: bool,
    projects_loaded: usize,
    charts_loaded: usize,
    projects_total: usize,
    charts_total: usize,
}

fn read_documents(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;
    match parsed {
        Value::Array(docs) => Ok(docs),
        _ => Err(TagboardError::InvalidDocument {
            index: 0,
            reason: format!("{} must contain a JSON array", path.display()),
        }
        .into()),
    }
}

fn read_optional(path: Option<&Path>) -> Result<Option<(&Path, Vec<Value>)>> {
    path.map(|path| read_documents(path).map(|docs| (path, docs)))
        .transpose()
}

fn load_collection(
    conn: &rusqlite::Connection,
    collection: Collection,
    input: Option<(&Path, Vec<Value>)>,
) -> Result<usize> {
    let Some((path, docs)) = input else {
        return Ok(0);
    };
    let ids = upsert_documents(conn, collection, &docs)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    tracing::info!(file = %path.display(), documents = ids.len(), ?collection, "loaded documents");
    Ok(ids.len())
}

/// Execute `tb load`.
///
/// Each file is written in one transaction; a file with any non-object entry
/// is rejected without writing.
///
/// # Errors
///
/// Returns an error if neither file is given, a file is unreadable or not a
/// JSON array of objects, or the store fails.
pub fn run_load(args: &LoadArgs, output: OutputMode, project_root: &Path) -> Result<()> {
    if args.projects.is_none() && args.charts.is_none() {
        return Err(TagboardError::MissingParameter("--projects or --charts").into());
    }

    let conn = open_db(project_root)?;
    // Parse both files before writing either.
    let projects = read_optional(args.projects.as_deref())?;
    let charts = read_optional(args.charts.as_deref())?;

    let projects_loaded = load_collection(&conn, Collection::Projects, projects)?;
    let charts_loaded = load_collection(&conn, Collection::Charts, charts)?;

    let result = LoadOutput {
        success: true,
        projects_loaded,
        charts_loaded,
        projects_total: count_documents(&conn, Collection::Projects)?,
        charts_total: count_documents(&conn, Collection::Charts)?,
    };
    render_mode(
        output,
        &result,
        |r, w| writeln!(w, "{}\t{}", r.projects_loaded, r.charts_loaded),
        |r, w| {
            let projects = format!("{} loaded ({} total)", r.projects_loaded, r.projects_total);
            let charts = format!("{} loaded ({} total)", r.charts_loaded, r.charts_total);
            pretty_kv(w, "Projects", projects)?;
            pretty_kv(w, "Charts", charts)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagboard_core::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn non_array_file_is_an_invalid_document() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("projects.json");
        std::fs::write(&path, r#"{"hashtags": ["vip"]}"#).expect("write");

        let err = read_documents(&path).expect_err("object is not an array");
        let code = err.downcast_ref::<TagboardError>().map(TagboardError::code);
        assert_eq!(code, Some(ErrorCode::InvalidDocument));
    }

    #[test]
    fn array_file_parses() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("charts.json");
        std::fs::write(&path, r#"[{"chartId": "a"}, {"chartId": "b"}]"#).expect("write");
        assert_eq!(read_documents(&path).expect("parse").len(), 2);
    }
}
