//! `printforge process`: watch a simulated processing run through to the
//! download center.

use clap::Args;
use pf_app::usecases::{ProcessingSnapshot, RunSource};
use pf_core::download::{format_file_size, DownloadTicket};
use pf_core::navigation::{Navigation, Route};
use pf_core::ProcessingStatus;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::bootstrap::AppDeps;

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Name of the uploaded source image
    #[arg(long, default_value = "sketch_design_v2.png")]
    pub file_name: String,

    /// Size of the source image in bytes
    #[arg(long, default_value_t = 2_457_600)]
    pub file_size: u64,

    /// Restart from scratch when a simulated fault hits, up to this many times
    #[arg(long, default_value_t = 0)]
    pub auto_retry: usize,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    Completed(DownloadTicket),
    Failed { code: String },
    Cancelled,
}

fn print_snapshot(snapshot: &ProcessingSnapshot) {
    let state = &snapshot.state;
    println!(
        "{:<22} {:>5.1}%  eta {:>3}s  [{}]",
        state.current_stage.label(),
        state.progress,
        state.estimated_time_remaining,
        state.status.as_str()
    );
}

pub async fn run(
    deps: &AppDeps,
    navigations: &mut UnboundedReceiver<Navigation>,
    args: ProcessArgs,
) -> anyhow::Result<RunEnd> {
    let orchestrator = deps.processing_orchestrator(RunSource {
        file_name: args.file_name,
        file_size: args.file_size,
    });
    print_snapshot(&orchestrator.start()?);

    let mut ticker = tokio::time::interval(deps.config.processing.tick_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    let mut retries_left = args.auto_retry;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                orchestrator.cancel();
            }
            navigation = navigations.recv() => {
                let Some(navigation) = navigation else {
                    anyhow::bail!("navigation channel closed");
                };
                match (navigation.route, navigation.completed_run) {
                    (Route::DownloadCenter, Some(run)) => {
                        let mut center = deps.download_center();
                        let model = center.record_completed_run(&run);
                        let (id, name, size) =
                            (model.id.clone(), model.name.clone(), model.file_size);
                        let ticket = center.prepare_download(&id)?;
                        println!(
                            "completed in {}s: {name} ({})",
                            run.processing_time_secs,
                            format_file_size(size)
                        );
                        println!("download  {} -> {}", ticket.file_name, ticket.url);
                        return Ok(RunEnd::Completed(ticket));
                    }
                    (Route::UploadWorkspace, _) => {
                        println!("processing cancelled");
                        return Ok(RunEnd::Cancelled);
                    }
                    (route, _) => info!(%route, "ignoring navigation"),
                }
            }
            _ = ticker.tick() => {
                let snapshot = orchestrator.snapshot();
                print_snapshot(&snapshot);
                if snapshot.state.status != ProcessingStatus::Error {
                    continue;
                }
                let Some(fault) = snapshot.fault else {
                    continue;
                };
                let details = fault.kind.details();
                println!("{}: {} ({})", details.title, fault.details, fault.code);
                if let Some(contact) = orchestrator.support_contact() {
                    println!("support   {contact}");
                }
                if fault.kind.is_retryable() && retries_left > 0 {
                    retries_left -= 1;
                    warn!(code = %fault.code, retries_left, "restarting after simulated fault");
                    print_snapshot(&orchestrator.retry_from_start()?);
                } else {
                    orchestrator.cancel();
                    // Drain the cancel navigation so it does not leak into
                    // a later command.
                    let _ = navigations.try_recv();
                    return Ok(RunEnd::Failed { code: fault.code });
                }
            }
        }
    }
}
