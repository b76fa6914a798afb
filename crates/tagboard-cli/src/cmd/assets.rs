//! `tb assets`: content assets with reference-guarded deletion.

use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use super::open_db;
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};
use tagboard_core::db::assets::{AssetKind, ContentAsset, delete_asset, list_assets, upsert_asset};

#[derive(Args, Debug)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub command: AssetsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AssetsCommand {
    #[command(about = "Create or update a content asset")]
    Add(AssetAddArgs),

    #[command(about = "Delete a content asset unless charts still reference it")]
    Rm(AssetRmArgs),

    #[command(about = "List content assets")]
    List,
}

#[derive(Args, Debug)]
pub struct AssetAddArgs {
    /// Asset key, as written in formula tokens (`[MEDIA:<key>]`).
    pub key: String,

    /// Asset kind: media or text.
    #[arg(long)]
    pub kind: AssetKind,

    /// Display title.
    #[arg(long, default_value = "")]
    pub title: String,

    /// Inline content or a media URL.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug)]
pub struct AssetRmArgs {
    /// Asset key to delete.
    pub key: String,

    /// Delete even if chart elements still reference the asset.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct AssetOutput {
    success: bool,
    asset: ContentAsset,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteOutput {
    success: bool,
    key: String,
    dangling_references: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    success: bool,
    assets: Vec<ContentAsset>,
}

pub fn run_assets(args: &AssetsArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    match &args.command {
        AssetsCommand::Add(add) => {
            let conn = open_db(project_root)?;
            let asset = upsert_asset(&conn, &add.key, add.kind, &add.title, add.content.as_deref())?;
            tracing::info!(key = %asset.key, kind = %asset.kind, "saved content asset");
            let result = AssetOutput {
                success: true,
                asset,
            };
            render_mode(
                output,
                &result,
                |r, w| writeln!(w, "{}\t{}", r.asset.key, r.asset.kind),
                |r, w| {
                    writeln!(w, "✓ Saved asset {}", r.asset.key)?;
                    pretty_kv(w, "Kind", r.asset.kind.to_string())?;
                    pretty_kv(w, "Title", &r.asset.title)
                },
            )
        }
        AssetsCommand::Rm(rm) => {
            let conn = open_db(project_root)?;
            let report = delete_asset(&conn, &rm.key, rm.force)?;
            let result = DeleteOutput {
                success: true,
                key: report.key,
                dangling_references: report.dangling.into_iter().map(|hit| hit.element_id).collect(),
            };
            render(output, &result, |r, w| {
                writeln!(w, "✓ Deleted asset {}", r.key)?;
                for element in &r.dangling_references {
                    writeln!(w, "  warning: {element} still references it")?;
                }
                Ok(())
            })
        }
        AssetsCommand::List => {
            let conn = open_db(project_root)?;
            let result = ListOutput {
                success: true,
                assets: list_assets(&conn)?,
            };
            render_mode(
                output,
                &result,
                |r, w| {
                    for asset in &r.assets {
                        writeln!(w, "{}\t{}\t{}", asset.key, asset.kind, asset.title)?;
                    }
                    Ok(())
                },
                |r, w| {
                    pretty_section(w, &format!("{} content asset(s)", r.assets.len()))?;
                    for asset in &r.assets {
                        let kind = asset.kind.to_string();
                        writeln!(w, "{:<24}  {kind:<5}  {}", asset.key, asset.title)?;
                    }
                    Ok(())
                },
            )
        }
    }
}
