//! Command-line surface: one `reduce` subcommand today, with room for the
//! `bin`/`map` stages to join it later as siblings.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "s3log-reduce", version, about = "Reduces raw S3 access logs to small per-day TSV projections")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity; overrides `RUST_LOG` when given.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reduce a tree of raw `*.log` files into a matching tree of TSV files.
    Reduce(ReduceArgs),
}

#[derive(Debug, Parser)]
pub struct ReduceArgs {
    /// Load defaults from a YAML config file; any flag below overrides it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub raw_s3_logs_folder_path: Option<PathBuf>,

    #[arg(long)]
    pub reduced_s3_logs_folder_path: Option<PathBuf>,

    #[arg(long)]
    pub maximum_number_of_workers: Option<usize>,

    #[arg(long)]
    pub maximum_buffer_size_in_bytes: Option<u64>,

    #[arg(long = "excluded-year")]
    pub excluded_years: Vec<String>,

    #[arg(long = "excluded-ip")]
    pub excluded_ips: Vec<String>,

    #[arg(long)]
    pub operation_type: Option<String>,

    #[arg(long)]
    pub base_folder_path: Option<PathBuf>,

    /// Enumerate and log the files that would be processed without writing
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}
