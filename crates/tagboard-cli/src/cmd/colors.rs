//! `tb colors`: hashtag color mapping, read through the derived-data cache.

use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use super::{open_db, project_config};
use crate::output::{OutputMode, pretty_section, render_mode};
use tagboard_core::cache::colors::{color_cache, set_color_and_invalidate};
use tagboard_core::cache::{Consumer, LocalBus};
use tagboard_core::db::store_path;
use tagboard_core::error::TagboardError;
use tagboard_core::tags::canonicalize;

#[derive(Args, Debug)]
pub struct ColorsArgs {
    #[command(subcommand)]
    pub command: ColorsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ColorsCommand {
    #[command(about = "Assign a display color to a tag")]
    Set(ColorSetArgs),

    #[command(about = "List tag colors")]
    List(ColorListArgs),
}

#[derive(Args, Debug)]
pub struct ColorSetArgs {
    /// Tag to color.
    pub tag: String,

    /// Color value, e.g. `#ff8800`.
    pub color: String,
}

#[derive(Args, Debug, Default)]
pub struct ColorListArgs {
    /// Show the effective color (with fallback) for these tags only.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ColorRow {
    tag: String,
    color: String,
}

#[derive(Debug, Serialize)]
struct ColorsOutput {
    success: bool,
    fallback: String,
    colors: Vec<ColorRow>,
}

pub fn run_colors(args: &ColorsArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let fallback = project_config(project_root)?.colors.fallback;
    let conn = open_db(project_root)?;
    let bus = LocalBus::new();
    let cache = color_cache(store_path(project_root));
    let consumer = Consumer::mount(&cache, &bus);

    let colors = match &args.command {
        ColorsCommand::Set(set) => {
            let tag = set_color_and_invalidate(&conn, &bus, &set.tag, &set.color)?;
            let table = consumer.render().map_err(TagboardError::from)?;
            vec![ColorRow {
                color: table.color_for(&tag, &fallback).to_string(),
                tag,
            }]
        }
        ColorsCommand::List(list) => {
            let table = consumer.render().map_err(TagboardError::from)?;
            if list.tags.is_empty() {
                table
                    .colors
                    .iter()
                    .map(|(tag, color)| ColorRow {
                        tag: tag.clone(),
                        color: color.clone(),
                    })
                    .collect()
            } else {
                list.tags
                    .iter()
                    .map(|tag| {
                        let canonical = canonicalize(tag)
                            .ok_or_else(|| TagboardError::InvalidTag(tag.clone()))?;
                        Ok(ColorRow {
                            color: table.color_for(&canonical, &fallback).to_string(),
                            tag: canonical,
                        })
                    })
                    .collect::<Result<Vec<_>, TagboardError>>()?
            }
        }
    };
    tracing::debug!(fetches = cache.fetch_count(), "color table served");

    let result = ColorsOutput {
        success: true,
        fallback,
        colors,
    };
    render_mode(
        output,
        &result,
        |r, w| {
            for row in &r.colors {
                writeln!(w, "{}\t{}", row.tag, row.color)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Tag colors (fallback {})", r.fallback))?;
            for row in &r.colors {
                writeln!(w, "{:<9}  {}", row.color, row.tag)?;
            }
            Ok(())
        },
    )
}
