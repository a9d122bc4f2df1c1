//! Configuration DTOs.
//!
//! Pure data mapped from TOML. Loading from disk and the environment lives
//! in the infrastructure layer.

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, ConfigError, ProcessingConfig, SupabaseConfig, UploadConfig,
};
