//! Download center domain module.

pub mod model;

pub use model::{format_file_size, CompletedRun, DownloadTicket, GeneratedModel};
