//! # Configuration Loader
//!
//! Reads the TOML file into the [`AppConfig`] DTO and layers the hosted
//! backend credentials from the environment on top. Value checks live in
//! [`AppConfig::validate`].

use std::path::{Path, PathBuf};

use anyhow::Context;
use pf_core::config::AppConfig;
use tracing::{debug, info};

pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Load configuration from a TOML file.
///
/// Missing sections and keys keep their defaults.
///
/// # Errors
///
/// Returns error if the file cannot be read, is not valid TOML, or carries
/// out-of-range values.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let config = AppConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
    debug!(path = %config_path.display(), "config loaded");
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
pub fn load_or_default(config_path: &Path) -> anyhow::Result<AppConfig> {
    if !config_path.exists() {
        info!(path = %config_path.display(), "config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    load_config(config_path.to_path_buf())
}

/// Overrides the Supabase connection with non-empty values from `lookup`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    if let Some(url) = non_empty(SUPABASE_URL_VAR) {
        config.supabase.url = url;
    }
    if let Some(anon_key) = non_empty(SUPABASE_ANON_KEY_VAR) {
        config.supabase.anon_key = anon_key;
    }
}
