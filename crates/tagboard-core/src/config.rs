use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::STORE_DIR;

/// File name of the project config inside the store directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Per-project settings read from `.tagboard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub colors: ColorsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageConfig {
    /// Attach scan diagnostics to every usage response.
    #[serde(default)]
    pub include_debug: bool,
    /// Cap on returned rows; unlimited when absent.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorsConfig {
    #[serde(default = "default_fallback_color")]
    pub fallback: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Path of the project config for a project root.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(STORE_DIR).join(CONFIG_FILE)
}

/// Load the project config, falling back to defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<config_dir>/tagboard/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tagboard").join(CONFIG_FILE);
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Default project config serialized for `tb init`.
///
/// # Errors
///
/// Returns an error if TOML serialization fails.
pub fn default_project_config_toml() -> Result<String> {
    toml::to_string_pretty(&ProjectConfig::default()).context("serialize default config")
}

/// Canonical output mode name for a raw setting, if recognized.
#[must_use]
pub fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

/// Precedence: explicit flag, `FORMAT` env, user config, then TTY detection.
/// Unrecognized values at any level fall through to the next.
#[must_use]
pub fn resolve_output(
    cli_format: Option<&str>,
    user_output: Option<&str>,
    env_format: Option<&str>,
    stdout_is_tty: bool,
) -> String {
    [cli_format, env_format, user_output]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode)
        .unwrap_or(if stdout_is_tty { "pretty" } else { "text" })
        .to_string()
}

fn default_fallback_color() -> String {
    "#6b7280".to_string()
}
