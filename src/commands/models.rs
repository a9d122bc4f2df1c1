//! `printforge models`: browse the mock download center.

use clap::Args;
use pf_core::download::format_file_size;
use pf_core::ModelId;

use crate::bootstrap::AppDeps;

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Print the download ticket and share text for one model
    #[arg(long)]
    pub show: Option<String>,
}

pub fn run(deps: &AppDeps, args: ModelsArgs) -> anyhow::Result<()> {
    let center = deps.download_center();

    if let Some(id) = args.show {
        let id = ModelId::from(id);
        let ticket = center.prepare_download(&id)?;
        let share = center.share_text(&id)?;
        println!("download  {} -> {}", ticket.file_name, ticket.url);
        println!("share     {}", share.title);
        println!("          {}", share.text);
        return Ok(());
    }

    let models = center.current().into_iter().chain(center.history());
    for model in models {
        println!(
            "{:<16} {:<32} {:>9}  {}",
            model.id.as_str(),
            model.name,
            format_file_size(model.file_size),
            model.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
