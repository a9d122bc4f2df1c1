//! # pf-infra
//!
//! Adapters for the ports declared in `pf-core`: tokio timers, system clock,
//! `rand` sources, preview registry, navigation channel, session backends and
//! the TOML configuration loader.

pub mod config;
pub mod navigation;
mod pkce;
pub mod preview;
pub mod random;
pub mod session;
pub mod supabase;
pub mod time;

pub use navigation::ChannelNavigator;
pub use preview::InMemoryPreviewRegistry;
pub use random::{SeededRandomSource, ThreadRandomSource};
pub use time::{SystemClock, TokioDelay, TokioScheduler};
