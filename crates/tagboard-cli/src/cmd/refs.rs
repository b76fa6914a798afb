//! `tb refs`: which chart elements embed a content asset.

use std::path::Path;

use clap::Args;

use super::open_db;
use crate::output::{OutputMode, pretty_section, render_mode};
use tagboard_core::refs::reference_usage;

#[derive(Args, Debug, Default)]
pub struct RefsArgs {
    /// Asset key to look for in chart formulas.
    pub key: Option<String>,
}

pub fn run_refs(args: &RefsArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let conn = open_db(project_root)?;
    let response = reference_usage(&conn, args.key.as_deref())?;

    render_mode(
        output,
        &response,
        |r, w| {
            for chart in &r.charts {
                writeln!(w, "{}\t{}\t{}", chart.chart_id, chart.element_index, chart.kind)?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(
                w,
                &format!("`{}` is used by {} chart element(s)", r.slug, r.usage_count),
            )?;
            for chart in &r.charts {
                let title = if chart.title.is_empty() {
                    "(untitled)"
                } else {
                    chart.title.as_str()
                };
                writeln!(
                    w,
                    "  {}[{}]  {:<8}  {title}",
                    chart.chart_id, chart.element_index, chart.kind
                )?;
            }
            Ok(())
        },
    )
}
