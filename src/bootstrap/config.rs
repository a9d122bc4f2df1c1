//! Resolves the effective configuration: TOML file, then `.env` and the
//! process environment for the hosted backend credentials.

use std::path::{Path, PathBuf};

use anyhow::Context;
use pf_core::config::AppConfig;
use pf_infra::config::{apply_env_overrides, load_or_default};

pub const DEFAULT_CONFIG_FILE: &str = "printforge.toml";

/// Load configuration from `config_path` (or `printforge.toml` in the
/// working directory) and apply environment overrides.
pub fn load_config(config_path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = load_or_default(Path::new(&path))?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
        .validate()
        .context("Configuration is invalid after environment overrides")?;
    Ok(config)
}
