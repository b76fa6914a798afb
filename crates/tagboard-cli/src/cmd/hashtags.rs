//! `tb hashtags`: tag usage across all projects.

use std::path::Path;

use clap::Args;

use super::{open_db, project_config};
use crate::output::{OutputMode, pretty_section, render_mode};
use tagboard_core::tags::{UsageOptions, hashtag_usage};

#[derive(Args, Debug, Default)]
pub struct HashtagsArgs {
    /// Include scan diagnostics in the response.
    #[arg(long)]
    pub debug: bool,

    /// Maximum number of hashtags to list.
    #[arg(long, short)]
    pub limit: Option<usize>,
}

fn usage_options(args: &HashtagsArgs, project_root: &Path) -> anyhow::Result<UsageOptions> {
    let config = project_config(project_root)?;
    Ok(UsageOptions {
        include_debug: args.debug || config.usage.include_debug,
        limit: args.limit.or(config.usage.limit),
    })
}

pub fn run_hashtags(
    args: &HashtagsArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let options = usage_options(args, project_root)?;
    let conn = open_db(project_root)?;
    let response = hashtag_usage(&conn, options)?;

    render_mode(
        output,
        &response,
        |r, w| {
            for row in &r.hashtags {
                writeln!(w, "{}\t{}\t{}", row.count, row.hashtag, row.slug)?;
            }
            Ok(())
        },
        |r, w| {
            if r.hashtags.is_empty() {
                return writeln!(w, "No hashtags found.");
            }
            let width = r
                .hashtags
                .iter()
                .map(|row| row.hashtag.chars().count())
                .max()
                .unwrap_or(0)
                .max("HASHTAG".len());
            pretty_section(w, &format!("{:>6}  {:<width$}  SLUG", "COUNT", "HASHTAG"))?;
            for row in &r.hashtags {
                writeln!(w, "{:>6}  {:<width$}  {}", row.count, row.hashtag, row.slug)?;
            }
            if let Some(debug) = &r.debug {
                writeln!(w)?;
                writeln!(
                    w,
                    "scanned {} project(s), skipped {}, {} distinct, {} occurrence(s)",
                    debug.projects_scanned,
                    debug.projects_skipped,
                    debug.distinct_hashtags,
                    debug.total_occurrences
                )?;
            }
            Ok(())
        },
    )
}
