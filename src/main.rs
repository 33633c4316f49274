mod cli;
mod config;
mod telemetry;

use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use s3log_batch::{ErrorCollector, ScheduleConfig};
use s3log_parse::DandiObjectKeyHandler;
use tracing::{error, info};

use cli::{Cli, Command, ReduceArgs};
use config::ReduceConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match cli.command {
        Command::Reduce(args) => match run_reduce(args) {
            Ok(()) => ExitCode::from(exitcode::OK as u8),
            Err(message) => {
                error!("{message}");
                ExitCode::from(exitcode::DATAERR as u8)
            }
        },
    }
}

fn run_reduce(args: ReduceArgs) -> Result<(), String> {
    let config = build_config(args)?;

    let base_folder_path = config.resolved_base_folder_path();
    let error_collector =
        Arc::new(ErrorCollector::new(&base_folder_path).map_err(|e| format!("failed to initialize error collector: {e}"))?);

    let schedule = ScheduleConfig {
        raw_logs_root: config.raw_s3_logs_folder_path.clone(),
        reduced_logs_root: config.reduced_s3_logs_folder_path.clone(),
        operation_type: config.operation_type.clone(),
        excluded_ips: config.excluded_ips.clone(),
        excluded_years: config.excluded_years.iter().cloned().collect(),
        maximum_buffer_size_in_bytes: config.maximum_buffer_size_in_bytes,
        worker_count: config.maximum_number_of_workers,
    };

    let object_key_handler = Arc::new(DandiObjectKeyHandler);
    let outcomes = s3log_batch::run(&schedule, object_key_handler, error_collector)
        .map_err(|e| format!("reduce batch failed: {e}"))?;

    let (reduced, skipped, failed) = outcomes.iter().fold((0, 0, 0), |(r, s, f), outcome| match outcome {
        s3log_batch::TaskOutcome::Reduced(..) => (r + 1, s, f),
        s3log_batch::TaskOutcome::Skipped(_) => (r, s + 1, f),
        s3log_batch::TaskOutcome::Failed(_) => (r, s, f + 1),
    });
    info!(reduced, skipped, failed, "batch complete");

    Ok(())
}

fn build_config(args: ReduceArgs) -> Result<ReduceConfig, String> {
    let mut config: ReduceConfig = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            serde_yaml::from_str(&contents).map_err(|e| format!("failed to parse {}: {e}", path.display()))?
        }
        None => ReduceConfig {
            raw_s3_logs_folder_path: Default::default(),
            reduced_s3_logs_folder_path: Default::default(),
            maximum_number_of_workers: 1,
            maximum_buffer_size_in_bytes: 4 * 10u64.pow(9),
            excluded_years: Vec::new(),
            excluded_ips: HashSet::new(),
            operation_type: "REST.GET.OBJECT".to_owned(),
            base_folder_path: None,
        },
    };

    if let Some(path) = args.raw_s3_logs_folder_path {
        config.raw_s3_logs_folder_path = path;
    }
    if let Some(path) = args.reduced_s3_logs_folder_path {
        config.reduced_s3_logs_folder_path = path;
    }
    if let Some(n) = args.maximum_number_of_workers {
        config.maximum_number_of_workers = n;
    }
    if let Some(n) = args.maximum_buffer_size_in_bytes {
        config.maximum_buffer_size_in_bytes = n;
    }
    if !args.excluded_years.is_empty() {
        config.excluded_years = args.excluded_years;
    }
    if !args.excluded_ips.is_empty() {
        config.excluded_ips.extend(args.excluded_ips);
    }
    if let Some(operation_type) = args.operation_type {
        config.operation_type = operation_type;
    }
    if let Some(base_folder_path) = args.base_folder_path {
        config.base_folder_path = Some(base_folder_path);
    }

    if config.raw_s3_logs_folder_path.as_os_str().is_empty() {
        return Err("raw_s3_logs_folder_path is required (via --config or --raw-s3-logs-folder-path)".to_owned());
    }
    if config.reduced_s3_logs_folder_path.as_os_str().is_empty() {
        return Err("reduced_s3_logs_folder_path is required (via --config or --reduced-s3-logs-folder-path)".to_owned());
    }

    if args.dry_run {
        let files = s3log_batch::discover_raw_log_files(&config.raw_s3_logs_folder_path)
            .map_err(|e| format!("failed to enumerate raw logs: {e}"))?;
        for path in &files {
            info!(path = %path.display(), "would reduce");
        }
        info!(count = files.len(), "dry run complete, nothing written");
        std::process::exit(exitcode::OK);
    }

    Ok(config)
}
