#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tagboard: hashtag usage, stable tag slugs, and asset reference tracking",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (defaults to pretty on a TTY, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output (alias for `--format json`).
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a tagboard project",
        long_about = "Create .tagboard/ with a default config and a migrated store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    tb init\n\n    # Rewrite the config, keeping existing data\n    tb init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Load project and chart documents",
        long_about = "Upsert JSON arrays of project documents and chart definitions into the store.",
        after_help = "EXAMPLES:\n    tb load --projects projects.json --charts charts.json"
    )]
    Load(cmd::load::LoadArgs),

    #[command(
        next_help_heading = "Read",
        about = "Count hashtag usage across projects",
        long_about = "Count how many projects use each hashtag, in both bare and category:tag form, with stable slugs.",
        after_help = "EXAMPLES:\n    # Top ten hashtags\n    tb hashtags --limit 10\n\n    # Include scan diagnostics\n    tb hashtags --debug --json"
    )]
    Hashtags(cmd::hashtags::HashtagsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Resolve or look up hashtag slugs",
        after_help = "EXAMPLES:\n    tb slug resolve VIP \"sponsor:acme\"\n    tb slug show 3f0c9a52-0d4e-4c61-9b8e-2a8f1e6d7c10\n    tb slug list"
    )]
    Slug(cmd::slug::SlugArgs),

    #[command(
        next_help_heading = "Read",
        about = "Find chart elements that embed an asset",
        after_help = "EXAMPLES:\n    tb refs logo\n    tb refs logo --json"
    )]
    Refs(cmd::refs::RefsArgs),

    #[command(
        next_help_heading = "Metadata",
        about = "Manage content assets",
        after_help = "EXAMPLES:\n    tb assets add logo --kind media --title \"Sponsor logo\"\n    tb assets rm logo\n    tb assets rm logo --force"
    )]
    Assets(cmd::assets::AssetsArgs),

    #[command(
        next_help_heading = "Metadata",
        about = "Manage hashtag display colors",
        after_help = "EXAMPLES:\n    tb colors set vip \"#ff8800\"\n    tb colors list --tag vip --tag summer"
    )]
    Colors(cmd::colors::ColorsArgs),

    #[command(next_help_heading = "Setup", about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TAGBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tagboard=debug,info"
        } else {
            "tagboard=info,warn"
        })
    });

    let format = env::var("TAGBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Load(args) => cmd::load::run_load(args, output, &project_root),
        Commands::Hashtags(args) => cmd::hashtags::run_hashtags(args, output, &project_root),
        Commands::Slug(args) => cmd::slug::run_slug(args, output, &project_root),
        Commands::Refs(args) => cmd::refs::run_refs(args, output, &project_root),
        Commands::Assets(args) => cmd::assets::run_assets(args, output, &project_root),
        Commands::Colors(args) => cmd::colors::run_colors(args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if let Err(render_failure) = render_error(output, &CliError::from_anyhow(&e)) {
                eprintln!("error: {e:#} (and failed to render it: {render_failure})");
            }
            ExitCode::FAILURE
        }
    }
}
