use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    BenchmarkConfig, MetricsSettings, StageSelection, SubmitSettings, TrackingTarget,
    DEFAULT_HISTORY_SERVER, JAR_NAME,
};
use crate::error::DriverError;
use crate::utils::{parse_byte_count, parse_positive_f64};

/// Run the Spark Terasort benchmark on a YARN cluster.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Total data size in TiB
    #[arg(long = "total_tb", default_value = "1", value_parser = parse_positive_f64)]
    pub total_tb: f64,
    /// Size of one input partition in bytes (e.g. 2.5e9)
    #[arg(long = "input_part_size", default_value = "2.5e9", value_parser = parse_byte_count)]
    pub input_part_size: u64,
    /// Number of worker nodes in the cluster
    #[arg(long = "num_workers", default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub num_workers: u32,
    /// Map tasks run concurrently on each worker
    #[arg(long = "map_parallelism", default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub map_parallelism: u32,
    /// Use the external shuffle service
    #[arg(long = "external_shuffle")]
    pub external_shuffle: bool,
    /// Use push-based shuffle (implies --external_shuffle)
    #[arg(long = "push_based_shuffle")]
    pub push_based_shuffle: bool,

    /// Generate the input data
    #[arg(long = "generate_input", help_heading = "Steps to run (all if none is given)")]
    pub generate_input: bool,
    /// Sort the input data
    #[arg(long = "sort", help_heading = "Steps to run (all if none is given)")]
    pub sort: bool,
    /// Validate the sorted output
    #[arg(long = "validate_output", help_heading = "Steps to run (all if none is given)")]
    pub validate_output: bool,

    /// [OPT] Path to the Terasort jar
    #[arg(long = "jar", env = "TERASORT_JAR")]
    pub jar: Option<PathBuf>,
    /// Submission tool used to launch jobs
    #[arg(long = "spark_submit", env = "SPARK_SUBMIT", default_value = "spark-submit")]
    pub spark_submit: String,
    /// Base URL of the history server applications API
    #[arg(long = "history_server", default_value = DEFAULT_HISTORY_SERVER)]
    pub history_server: String,
    /// [OPT] Endpoint receiving metrics as JSON posts
    #[arg(long = "tracking_url", conflicts_with = "tracking_file")]
    pub tracking_url: Option<String>,
    /// [OPT] File receiving metrics as JSON lines (offline tracking)
    #[arg(long = "tracking_file")]
    pub tracking_file: Option<PathBuf>,
    /// [OPT] Directory receiving one log file per stage
    #[arg(long = "log_dir")]
    pub log_dir: Option<PathBuf>,
    /// Print the submissions without running them
    #[arg(long = "dry_run")]
    pub dry_run: bool,
}

impl Args {
    /// Resolve the arguments into a [`BenchmarkConfig`].
    pub fn resolve(self) -> Result<BenchmarkConfig, DriverError> {
        let tracking = match (self.tracking_url, self.tracking_file) {
            (Some(url), _) => TrackingTarget::Http(url),
            (None, Some(path)) => TrackingTarget::File(path),
            (None, None) => TrackingTarget::Log,
        };
        let submit = SubmitSettings {
            spark_submit: self.spark_submit,
            jar: self.jar.unwrap_or_else(default_jar),
            log_dir: self.log_dir,
            dry_run: self.dry_run,
        };
        let metrics = MetricsSettings {
            history_server: self.history_server,
            tracking,
        };
        BenchmarkConfig::new(
            self.total_tb,
            self.input_part_size,
            self.num_workers,
            self.map_parallelism,
            self.external_shuffle,
            self.push_based_shuffle,
            StageSelection::resolve(self.generate_input, self.sort, self.validate_output),
            submit,
            metrics,
        )
    }
}

/// The jar as `mvn package` leaves it, relative to the working directory.
pub fn default_jar() -> PathBuf {
    PathBuf::from("target").join(JAR_NAME)
}
