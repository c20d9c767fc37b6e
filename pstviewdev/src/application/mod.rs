pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use pstview_core::Result;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let open = cli.open;
    match cli.command {
        Commands::Sample {
            out,
            deterministic,
            min_gain,
        } => handlers::handle_sample(out, deterministic, min_gain),
        Commands::Folders { archive } => handlers::handle_folders(archive, &open).await,
        Commands::Entries { archive, folder } => {
            handlers::handle_entries(archive, folder, &open).await
        }
        Commands::Show {
            archive,
            folder,
            entry,
        } => handlers::handle_show(archive, folder, entry, &open).await,
        Commands::Export {
            archive,
            folder,
            dir,
        } => handlers::handle_export(archive, folder, dir, &open).await,
        Commands::Cat {
            archive,
            start,
            len,
        } => handlers::handle_cat(archive, start, len, &open).await,
    }
}
