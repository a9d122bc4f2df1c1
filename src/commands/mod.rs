//! CLI commands. Each one drives a use case through the wired ports and
//! prints what the corresponding screen would show.

pub mod auth;
pub mod callback;
pub mod models;
pub mod process;
pub mod upload;
