//! Discovers raw log files under a root directory and dispatches their
//! reduction across one or more worker threads (component C5).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Local};
use rand::seq::SliceRandom;
use s3log_common::{CreateDirectorySnafu, Error, NotADirectorySnafu};
use s3log_fileio::{reduce_file, FileReductionReport};
use s3log_parse::ObjectKeyHandler;
use snafu::{ensure, ResultExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error_collector::ErrorCollector;

/// Earliest year the archive is expected to hold; directories below this are
/// never pre-created.
const EARLIEST_ARCHIVE_YEAR: i32 = 2019;

/// Parameters shared by every task the scheduler dispatches.
pub struct ScheduleConfig {
    pub raw_logs_root: PathBuf,
    pub reduced_logs_root: PathBuf,
    pub operation_type: String,
    pub excluded_ips: HashSet<String>,
    pub excluded_years: HashSet<String>,
    pub maximum_buffer_size_in_bytes: u64,
    pub worker_count: usize,
}

/// Whether any path component of `path` is a year in `excluded_years`
/// (the on-disk layout nests files as `<year>/<month>/<day>.log`).
fn is_excluded_by_year(path: &Path, excluded_years: &HashSet<String>) -> bool {
    if excluded_years.is_empty() {
        return false;
    }
    path.components()
        .any(|component| excluded_years.contains(component.as_os_str().to_string_lossy().as_ref()))
}

/// What happened to one raw log file.
pub enum TaskOutcome {
    Reduced(PathBuf, FileReductionReport),
    Skipped(PathBuf),
    Failed(PathBuf),
}

/// Recursively finds every `*.log` file under `root` whose stem is entirely
/// digits (the day-of-month convention), matching `rglob("*.log")` filtered
/// by `path.stem.isdigit()` in the original tooling.
pub fn discover_raw_log_files(root: &Path) -> Result<Vec<PathBuf>, Error> {
    ensure!(root.is_dir(), NotADirectorySnafu { path: root.to_path_buf() });

    let pattern = root.join("**").join("*.log");
    let pattern = pattern.to_string_lossy().into_owned();

    let mut paths = Vec::new();
    for path in glob::glob(&pattern).expect("pattern built from a valid path is a valid glob").flatten() {
        let is_numeric_stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()));
        if is_numeric_stem {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn reduced_path_for(raw_logs_root: &Path, reduced_logs_root: &Path, raw_path: &Path) -> PathBuf {
    let relative = raw_path.strip_prefix(raw_logs_root).unwrap_or(raw_path);
    reduced_logs_root.join(relative).with_extension("tsv")
}

/// Pre-creates `<reduced_root>/<year>/<month>` for every year in
/// `[2019, current_year)` not named in `excluded_years`, and every month
/// `01..=12`, so no worker ever races another on `mkdir` for the common
/// case of a file landing in an already-expected month.
fn pre_create_year_month_subtrees(reduced_root: &Path, excluded_years: &HashSet<String>) -> Result<(), Error> {
    let current_year = Local::now().year();
    for year in EARLIEST_ARCHIVE_YEAR..current_year {
        let year_label = year.to_string();
        if excluded_years.contains(&year_label) {
            continue;
        }
        for month in 1..=12 {
            let month_dir = reduced_root.join(&year_label).join(format!("{month:02}"));
            std::fs::create_dir_all(&month_dir).context(CreateDirectorySnafu { path: month_dir })?;
        }
    }
    Ok(())
}

/// Splits `paths` into `worker_count` disjoint, owned partitions via
/// round-robin assignment.
fn partition_for_workers(paths: Vec<PathBuf>, worker_count: usize) -> Vec<Vec<PathBuf>> {
    let mut partitions: Vec<Vec<PathBuf>> = (0..worker_count).map(|_| Vec::new()).collect();
    for (index, path) in paths.into_iter().enumerate() {
        partitions[index % worker_count].push(path);
    }
    partitions
}

/// Runs every discovered file through [`reduce_file`], resuming a previous
/// run by skipping any file whose reduced output already exists.
///
/// Every worker is handed its own disjoint slice of the (already shuffled)
/// path list up front — there is no queue or other mutable state shared
/// between worker threads while they run, matching the "parallel OS
/// workers exchanging no in-memory state" model this scheduler implements.
/// A worker's numeric index is used only to label its diagnostics and
/// never to decide which files it receives.
pub fn run(
    config: &ScheduleConfig,
    object_key_handler: Arc<dyn ObjectKeyHandler>,
    error_collector: Arc<ErrorCollector>,
) -> Result<Vec<TaskOutcome>, Error> {
    pre_create_year_month_subtrees(&config.reduced_logs_root, &config.excluded_years)?;

    let mut raw_paths: Vec<PathBuf> = discover_raw_log_files(&config.raw_logs_root)?
        .into_iter()
        .filter(|path| !is_excluded_by_year(path, &config.excluded_years))
        .collect();
    // `glob` does not yield paths in a stable or balanced order; shuffle so a
    // batch of workers converges at roughly the same time.
    raw_paths.shuffle(&mut rand::rng());
    info!(count = raw_paths.len(), "discovered raw log files");

    let worker_count = config.worker_count.max(1);
    let per_worker_buffer_size = if worker_count == 1 {
        config.maximum_buffer_size_in_bytes
    } else {
        (config.maximum_buffer_size_in_bytes / worker_count as u64).max(1)
    };

    if worker_count == 1 {
        return Ok(run_worker("0", raw_paths, config, per_worker_buffer_size, object_key_handler.as_ref(), error_collector.as_ref()));
    }

    let partitions = partition_for_workers(raw_paths, worker_count);

    let outcomes = std::thread::scope(|scope| {
        let handles: Vec<_> = partitions
            .into_iter()
            .enumerate()
            .map(|(worker_index, assigned_paths)| {
                let object_key_handler = Arc::clone(&object_key_handler);
                let error_collector = Arc::clone(&error_collector);
                let task_label = format!("w{worker_index}");
                scope.spawn(move || {
                    run_worker(
                        &task_label,
                        assigned_paths,
                        config,
                        per_worker_buffer_size,
                        object_key_handler.as_ref(),
                        error_collector.as_ref(),
                    )
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker thread panicked"))
            .collect()
    });

    Ok(outcomes)
}

fn run_worker(
    task_label: &str,
    assigned_paths: Vec<PathBuf>,
    config: &ScheduleConfig,
    buffer_size: u64,
    object_key_handler: &dyn ObjectKeyHandler,
    error_collector: &ErrorCollector,
) -> Vec<TaskOutcome> {
    let mut outcomes = Vec::with_capacity(assigned_paths.len());

    for raw_path in assigned_paths {
        let reduced_path = reduced_path_for(&config.raw_logs_root, &config.reduced_logs_root, &raw_path);
        if reduced_path.exists() {
            debug!(path = %raw_path.display(), "skipping file already reduced");
            outcomes.push(TaskOutcome::Skipped(raw_path));
            continue;
        }

        if let Some(parent) = reduced_path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                let task_id = Uuid::new_v4().to_string()[..5].to_owned();
                let _ = error_collector.collect_message(
                    "parallel",
                    &format!("Worker {task_label} could not create output directory for {}", raw_path.display()),
                    Some(&task_id),
                );
                outcomes.push(TaskOutcome::Failed(raw_path));
                continue;
            }
        }

        match reduce_file(
            &raw_path,
            &reduced_path,
            &config.operation_type,
            &config.excluded_ips,
            object_key_handler,
            buffer_size,
        ) {
            Ok(report) => {
                let task_id = Uuid::new_v4().to_string()[..5].to_owned();
                for diagnostic in &report.diagnostics {
                    if let Err(error) = error_collector.collect(diagnostic, Some(&task_id)) {
                        warn!(%error, "failed to write diagnostic to error collector");
                    }
                }
                outcomes.push(TaskOutcome::Reduced(raw_path, report));
            }
            Err(error) => {
                let task_id = Uuid::new_v4().to_string()[..5].to_owned();
                let message = format!("Worker {task_label} reducing {} failed!\n\n{error}", raw_path.display());
                let _ = error_collector.collect_message("parallel", &message, Some(&task_id));
                outcomes.push(TaskOutcome::Failed(raw_path));
            }
        }
    }

    outcomes
}
