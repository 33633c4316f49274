//! Appends structured per-line and per-file diagnostics to category-tagged
//! text files under `<base>/errors/` (component C6).

use std::path::PathBuf;

use chrono::Local;
use s3log_common::{CreateDirectorySnafu, Error, WriteFileSnafu};
use s3log_parse::Diagnostic;
use snafu::ResultExt;

/// Writes diagnostics to append-only files, one per (version, date,
/// category, task id) tuple. Per-task isolation means no locking is needed:
/// distinct worker tasks never write to the same file.
pub struct ErrorCollector {
    errors_folder_path: PathBuf,
}

impl ErrorCollector {
    pub fn new(base_folder_path: impl Into<PathBuf>) -> Result<Self, Error> {
        let errors_folder_path = base_folder_path.into().join("errors");
        std::fs::create_dir_all(&errors_folder_path).context(CreateDirectorySnafu {
            path: errors_folder_path.clone(),
        })?;
        Ok(Self { errors_folder_path })
    }

    /// Appends `diagnostic` to its category's file, tagging the file name
    /// with `task_id` when one is given (parallel runs always give one).
    pub fn collect(&self, diagnostic: &Diagnostic, task_id: Option<&str>) -> Result<(), Error> {
        self.collect_message(diagnostic.category, &diagnostic.message, task_id)
    }

    /// Appends a free-form message under `category` without going through a
    /// [`Diagnostic`] value, for whole-task failures (e.g. a worker panic)
    /// that never produced one.
    pub fn collect_message(&self, category: &str, message: &str, task_id: Option<&str>) -> Result<(), Error> {
        let file_path = self.errors_folder_path.join(error_file_name(category, task_id));
        let padded = format!("{message}\n\n");

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .context(WriteFileSnafu { path: file_path.clone() })?;
        file.write_all(padded.as_bytes())
            .context(WriteFileSnafu { path: file_path })?;
        Ok(())
    }
}

fn error_file_name(category: &str, task_id: Option<&str>) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let date = Local::now().format("%y%m%d");
    match task_id {
        Some(task_id) => format!("v{version}_{date}_{category}_errors_{task_id}.txt"),
        None => format!("v{version}_{date}_{category}_errors.txt"),
    }
}
