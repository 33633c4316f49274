//! Bundles every input the reduce core needs, loadable from a YAML file and
//! overridable by CLI flags.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_operation_type() -> String {
    "REST.GET.OBJECT".to_owned()
}

fn default_maximum_number_of_workers() -> usize {
    1
}

fn default_maximum_buffer_size_in_bytes() -> u64 {
    4 * 10u64.pow(9)
}

/// Every parameter the reduce core (C3-C5) needs for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceConfig {
    pub raw_s3_logs_folder_path: PathBuf,
    pub reduced_s3_logs_folder_path: PathBuf,

    #[serde(default = "default_maximum_number_of_workers")]
    pub maximum_number_of_workers: usize,

    #[serde(default = "default_maximum_buffer_size_in_bytes")]
    pub maximum_buffer_size_in_bytes: u64,

    #[serde(default)]
    pub excluded_years: Vec<String>,

    #[serde(default)]
    pub excluded_ips: HashSet<String>,

    #[serde(default = "default_operation_type")]
    pub operation_type: String,

    /// Where diagnostics (C6) and other run-scoped state live. Defaults to
    /// `~/.s3log_reduce`, mirroring the base folder the teacher project's
    /// upstream tooling resolves the same way.
    pub base_folder_path: Option<PathBuf>,
}

impl ReduceConfig {
    pub fn resolved_base_folder_path(&self) -> PathBuf {
        if let Some(path) = &self.base_folder_path {
            return path.clone();
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".s3log_reduce"))
            .unwrap_or_else(|| PathBuf::from(".s3log_reduce"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        let config = ReduceConfig {
            raw_s3_logs_folder_path: PathBuf::from("/raw"),
            reduced_s3_logs_folder_path: PathBuf::from("/reduced"),
            maximum_number_of_workers: 4,
            maximum_buffer_size_in_bytes: 1_000_000,
            excluded_years: vec!["2019".to_owned()],
            excluded_ips: HashSet::from(["203.0.113.1".to_owned()]),
            operation_type: "REST.GET.OBJECT".to_owned(),
            base_folder_path: None,
        };

        let yaml = serde_yaml::to_string(&config).unwrap();
        let round_tripped: ReduceConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(round_tripped.raw_s3_logs_folder_path, config.raw_s3_logs_folder_path);
        assert_eq!(round_tripped.maximum_number_of_workers, 4);
        assert_eq!(round_tripped.excluded_ips, config.excluded_ips);
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let yaml = "raw_s3_logs_folder_path: /raw\nreduced_s3_logs_folder_path: /reduced\n";
        let config: ReduceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.maximum_number_of_workers, 1);
        assert_eq!(config.maximum_buffer_size_in_bytes, 4_000_000_000);
        assert_eq!(config.operation_type, "REST.GET.OBJECT");
    }
}
