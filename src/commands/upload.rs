//! `printforge upload`: run the simulated transfer for local image files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use pf_app::usecases::UploadStats;
use pf_core::upload::SelectedFile;
use tracing::info;

use crate::bootstrap::AppDeps;

/// Rounds of `--retry-failed` before giving up on flaky files.
const MAX_RETRY_ROUNDS: usize = 3;

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Images to upload (JPEG, PNG or SVG, up to 10 MB each)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Re-queue failed transfers until they succeed (bounded)
    #[arg(long)]
    pub retry_failed: bool,
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

pub fn selected_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SelectedFile::new(name, metadata.len(), mime_for_path(path)))
}

pub async fn run(deps: &AppDeps, args: UploadArgs) -> anyhow::Result<UploadStats> {
    let selected = args
        .files
        .iter()
        .map(|path| selected_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let workspace = deps.upload_workspace();
    let report = workspace.submit_files(selected)?;
    for rejected in &report.rejected {
        println!("rejected  {rejected}");
    }

    let poll = deps.config.upload.tick_interval();
    let mut retry_rounds = 0;
    loop {
        tokio::time::sleep(poll).await;
        let stats = workspace.stats();
        if stats.is_uploading {
            continue;
        }
        if args.retry_failed && stats.failed > 0 && retry_rounds < MAX_RETRY_ROUNDS {
            retry_rounds += 1;
            let requeued = workspace.retry_failed()?;
            info!(requeued, round = retry_rounds, "retrying failed uploads");
            continue;
        }
        break;
    }

    for file in workspace.files() {
        match file.error() {
            Some(error) => println!("failed    {} ({error})", file.name),
            None => println!("uploaded  {} ({:.0}%)", file.name, file.progress()),
        }
    }
    let stats = workspace.stats();
    println!(
        "{} uploaded, {} failed, {} rejected",
        stats.uploaded,
        stats.failed,
        report.rejected.len()
    );
    workspace.teardown();
    Ok(stats)
}
