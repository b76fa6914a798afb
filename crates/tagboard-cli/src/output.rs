//! Shared output layer for pretty/text/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: aligned tables for humans, tab-separated rows for pipes, or
//! the stable JSON response bodies.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the user config
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use tagboard_core::config::{load_user_config, resolve_output};
use tagboard_core::error::TagboardError;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (tables, sections, visual framing).
    Pretty,
    /// Tab-separated rows for scripts and pipes.
    Text,
    /// The JSON response bodies.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    fn from_resolved(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

/// Core resolution logic, separated from I/O for testability.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    user_output: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    let flag = format_flag.or(json_flag.then_some(OutputMode::Json));
    OutputMode::from_resolved(&resolve_output(
        flag.map(OutputMode::as_str),
        user_output,
        format_env,
        is_tty,
    ))
}

/// Resolve the output mode from CLI flags, environment, user config, and TTY
/// defaults.
///
/// An unreadable user config is logged and ignored.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let user_output = match load_user_config() {
        Ok(config) => config.output,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable user config");
            None
        }
    };
    let env_val = std::env::var("FORMAT").ok();
    resolve_output_mode_inner(
        format_flag,
        json_flag,
        env_val.as_deref(),
        user_output.as_deref(),
        io::stdout().is_terminal(),
    )
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_mode(&mut out, mode, value, text_fn, pretty_fn)
}

fn write_mode<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, out)?,
        OutputMode::Pretty => pretty_fn(value, out)?,
    }
    Ok(())
}

/// Render a serializable value; pretty and text share one renderer.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human_fn, &human_fn)
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E4001").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// HTTP-style status class of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl CliError {
    /// Create a simple error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
            status: None,
        }
    }

    /// Build from any command failure, keeping codes when the root cause is
    /// a [`TagboardError`].
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<TagboardError>())
            .map_or_else(|| Self::new(format!("{error:#}")), Self::from)
    }
}

impl From<&TagboardError> for CliError {
    fn from(err: &TagboardError) -> Self {
        let code = err.code();
        Self {
            message: err.to_string(),
            suggestion: Some(err.suggestion()),
            error_code: Some(code.code().to_string()),
            status: Some(code.status()),
        }
    }
}

/// Render an error to stderr in the requested format.
///
/// JSON mode writes `{"success": false, "error": {...}}`.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "success": false,
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        count: usize,
    }

    fn sample() -> Sample {
        Sample {
            name: "vip".into(),
            count: 3,
        }
    }

    fn captured(f: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buf = Vec::new();
        f(&mut buf);
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn format_flag_wins_over_json_env_and_config() {
        let mode =
            resolve_output_mode_inner(Some(OutputMode::Text), true, Some("pretty"), Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_wins_over_env() {
        let mode = resolve_output_mode_inner(None, true, Some("text"), None, true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn env_wins_over_user_config() {
        let mode = resolve_output_mode_inner(None, false, Some("TEXT"), Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn user_config_applies_without_flag_or_env() {
        let mode = resolve_output_mode_inner(None, false, None, Some("json"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn tty_detection_is_the_fallback() {
        assert_eq!(
            resolve_output_mode_inner(None, false, Some("yaml"), None, true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, None, None, false),
            OutputMode::Text
        );
    }

    #[test]
    fn json_mode_serializes_value() {
        let text = captured(|buf| {
            write_mode(buf, OutputMode::Json, &sample(), |_, _| Ok(()), |_, _| Ok(()))
                .expect("render");
        });
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["name"], "vip");
        assert_eq!(parsed["count"], 3);
    }

    #[test]
    fn text_and_pretty_use_their_own_renderers() {
        let text = captured(|buf| {
            write_mode(
                buf,
                OutputMode::Text,
                &sample(),
                |v, w| writeln!(w, "{}\t{}", v.count, v.name),
                |_, w| writeln!(w, "pretty"),
            )
            .expect("render");
        });
        assert_eq!(text, "3\tvip\n");
    }

    #[test]
    fn cli_error_from_tagboard_error_keeps_code() {
        let err = TagboardError::MissingParameter("slug");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2001"));
        assert_eq!(cli.status, Some(400));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn cli_error_from_anyhow_finds_wrapped_tagboard_error() {
        let err = anyhow::Error::new(TagboardError::SlugNotFound("abc".into()))
            .context("slug show failed");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E4001"));
        assert_eq!(cli.status, Some(404));

        let plain = CliError::from_anyhow(&anyhow::anyhow!("disk on fire"));
        assert_eq!(plain.message, "disk on fire");
        assert!(plain.error_code.is_none());
    }

    #[test]
    fn json_error_envelope_has_success_false() {
        let err = CliError::from(&TagboardError::AssetNotFound("logo".into()));
        let text = captured(|buf| write_error(buf, OutputMode::Json, &err).expect("render"));
        let parsed: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"]["error_code"], "E4002");
        assert_eq!(parsed["error"]["status"], 404);
    }

    #[test]
    fn human_error_includes_code_and_suggestion() {
        let err = CliError::from(&TagboardError::MissingParameter("slug"));
        let text = captured(|buf| write_error(buf, OutputMode::Pretty, &err).expect("render"));
        assert!(text.starts_with("error[E2001]: missing required parameter `slug`"));
        assert!(text.contains("suggestion:"));
    }
}
