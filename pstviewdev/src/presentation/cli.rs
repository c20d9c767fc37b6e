use clap::{Args, Parser, Subcommand};
use pstview_core::config::DEFAULT_UNIT_SIZE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "pstviewdev: browse mailbox archives", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub open: OpenArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct OpenArgs {
    /// Block size of the read cache, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_UNIT_SIZE)]
    pub unit_size: usize,

    /// Code page for ANSI strings (e.g. windows1251)
    #[arg(long, global = true)]
    pub ansi_encoding: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a small demo snapshot
    Sample {
        out: PathBuf,

        #[arg(long)]
        deterministic: bool,

        #[arg(long, default_value_t = 0.05)]
        min_gain: f32,
    },

    /// List the folder tree
    Folders { archive: PathBuf },

    /// List the entries of one folder (index from `folders`)
    Entries { archive: PathBuf, folder: usize },

    /// Print one entry as EML or vCard
    Show {
        archive: PathBuf,
        folder: usize,
        entry: usize,
    },

    /// Write every entry of a folder to a directory
    Export {
        archive: PathBuf,
        folder: usize,
        dir: PathBuf,
    },

    /// Dump raw archive bytes through the block cache
    Cat {
        archive: PathBuf,
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long)]
        len: Option<u64>,
    },
}
