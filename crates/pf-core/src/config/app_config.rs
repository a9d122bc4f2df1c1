//! Application configuration domain model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::upload::MAX_FILE_SIZE_BYTES;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upload: UploadConfig,
    pub processing: ProcessingConfig,
    pub auth: AuthConfig,
    pub supabase: SupabaseConfig,
}

/// Upload simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub tick_interval_ms: u64,
    /// Per-tick progress increment is drawn from `[0, max_increment)`.
    pub max_increment: f64,
    pub failure_probability: f64,
    pub max_file_size_bytes: u64,
}

/// Processing simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub tick_interval_ms: u64,
    pub max_increment: f64,
    pub eta_step_secs: u32,
    pub initial_eta_secs: u32,
    /// Progress shown when the dashboard mounts.
    pub seed_progress: f64,
    pub fault_check_delay_ms: u64,
    pub fault_probability: f64,
    /// Delay between completion and navigating to the download center.
    pub handoff_delay_ms: u64,
    /// Address used for the "contact support" link.
    pub support_email: String,
}

/// Auth callback timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub settling_delay_ms: u64,
    pub success_redirect_delay_ms: u64,
    pub error_redirect_delay_ms: u64,
    pub provider_error_redirect_delay_ms: u64,
    /// Origin the OAuth provider redirects back to.
    pub app_origin: String,
}

/// Hosted auth / database connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            max_increment: 30.0,
            failure_probability: 0.1,
            max_file_size_bytes: MAX_FILE_SIZE_BYTES,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            max_increment: 3.0,
            eta_step_secs: 5,
            initial_eta_secs: 180,
            seed_progress: 15.0,
            fault_check_delay_ms: 10_000,
            fault_probability: 0.05,
            handoff_delay_ms: 2000,
            support_email: "support@printforge.ai".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            settling_delay_ms: 2000,
            success_redirect_delay_ms: 1000,
            error_redirect_delay_ms: 3000,
            provider_error_redirect_delay_ms: 5000,
            app_origin: "http://localhost:4028".to_string(),
        }
    }
}

impl AppConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("upload.failure_probability", self.upload.failure_probability)?;
        check_probability(
            "processing.fault_probability",
            self.processing.fault_probability,
        )?;
        check_positive("upload.tick_interval_ms", self.upload.tick_interval_ms)?;
        check_positive("processing.tick_interval_ms", self.processing.tick_interval_ms)?;
        if !(self.upload.max_increment.is_finite() && self.upload.max_increment > 0.0) {
            return Err(ConfigError::Invalid {
                field: "upload.max_increment",
                reason: "must be a positive number".to_string(),
            });
        }
        if !(self.processing.max_increment.is_finite() && self.processing.max_increment > 0.0) {
            return Err(ConfigError::Invalid {
                field: "processing.max_increment",
                reason: "must be a positive number".to_string(),
            });
        }
        Ok(())
    }

    /// Whether a hosted session backend is configured.
    pub fn has_supabase(&self) -> bool {
        !self.supabase.url.trim().is_empty() && !self.supabase.anon_key.trim().is_empty()
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not within [0, 1]"),
        })
    }
}

fn check_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

impl UploadConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl ProcessingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn fault_check_delay(&self) -> Duration {
        Duration::from_millis(self.fault_check_delay_ms)
    }

    pub fn handoff_delay(&self) -> Duration {
        Duration::from_millis(self.handoff_delay_ms)
    }
}

impl AuthConfig {
    pub fn settling_delay(&self) -> Duration {
        Duration::from_millis(self.settling_delay_ms)
    }

    pub fn success_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.success_redirect_delay_ms)
    }

    pub fn error_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.error_redirect_delay_ms)
    }

    pub fn provider_error_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.provider_error_redirect_delay_ms)
    }

    /// Callback URL handed to the OAuth provider.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.app_origin.trim_end_matches('/'))
    }
}
