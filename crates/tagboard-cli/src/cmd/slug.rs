//! `tb slug`: resolve tags to stable slugs and look slugs back up.

use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use super::open_db;
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode};
use tagboard_core::tags::SlugEntry;
use tagboard_core::tags::slug::{list_entries, lookup_slug, resolve_all};

#[derive(Args, Debug)]
pub struct SlugArgs {
    #[command(subcommand)]
    pub command: SlugCommand,
}

#[derive(Subcommand, Debug)]
pub enum SlugCommand {
    #[command(about = "Resolve tags to slugs, registering new tags")]
    Resolve(ResolveArgs),

    #[command(about = "Show the tag behind a slug")]
    Show(ShowArgs),

    #[command(about = "List every registered tag and slug")]
    List,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Tags to resolve (case and surrounding whitespace are ignored).
    #[arg(required = true)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Slug to look up.
    pub slug: String,
}

#[derive(Debug, Serialize)]
struct ResolvedSlug {
    tag: String,
    slug: String,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    success: bool,
    slugs: Vec<ResolvedSlug>,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    success: bool,
    #[serde(flatten)]
    entry: SlugEntry,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    success: bool,
    entries: Vec<SlugEntry>,
}

pub fn run_slug(args: &SlugArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let conn = open_db(project_root)?;
    match &args.command {
        SlugCommand::Resolve(resolve) => {
            let resolved = resolve_all(&conn, resolve.tags.iter().map(String::as_str))?;
            let result = ResolveOutput {
                success: true,
                slugs: resolved
                    .into_iter()
                    .map(|(tag, slug)| ResolvedSlug { tag, slug })
                    .collect(),
            };
            render(output, &result, |r, w| {
                for row in &r.slugs {
                    writeln!(w, "{}\t{}", row.tag, row.slug)?;
                }
                Ok(())
            })
        }
        SlugCommand::Show(show) => {
            let entry = lookup_slug(&conn, &show.slug)?;
            let result = ShowOutput {
                success: true,
                entry,
            };
            render_mode(
                output,
                &result,
                |r, w| writeln!(w, "{}\t{}", r.entry.slug, r.entry.tag),
                |r, w| {
                    pretty_kv(w, "Tag", &r.entry.tag)?;
                    pretty_kv(w, "Slug", &r.entry.slug)?;
                    pretty_kv(w, "Created", &r.entry.created_at)?;
                    pretty_kv(w, "Updated", &r.entry.updated_at)
                },
            )
        }
        SlugCommand::List => {
            let result = ListOutput {
                success: true,
                entries: list_entries(&conn)?,
            };
            render_mode(
                output,
                &result,
                |r, w| {
                    for entry in &r.entries {
                        writeln!(w, "{}\t{}", entry.tag, entry.slug)?;
                    }
                    Ok(())
                },
                |r, w| {
                    pretty_section(w, &format!("{} registered tag(s)", r.entries.len()))?;
                    for entry in &r.entries {
                        writeln!(w, "{:<36}  {}", entry.slug, entry.tag)?;
                    }
                    Ok(())
                },
            )
        }
    }
}
