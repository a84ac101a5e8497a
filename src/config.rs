//! The resolved benchmark configuration.
//!
//! A [`BenchmarkConfig`] is built once per run from the command line (see
//! [`crate::cmd::driver`]) and never changes afterwards.

use std::path::PathBuf;

use crate::error::DriverError;
use crate::Stage;

/// Bytes per TiB as the benchmark counts them (decimal, like the Terasort
/// jobs themselves).
pub const BYTES_PER_TB: f64 = 1e12;

/// Name of the Terasort jar produced by `mvn package`.
pub const JAR_NAME: &str = "spark-terasort-1.2-SNAPSHOT-jar-with-dependencies.jar";

/// Default location of the history server's application API.
pub const DEFAULT_HISTORY_SERVER: &str = "http://localhost:18080/api/v1/applications";

/// Which stages a run submits.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StageSelection {
    pub generate_input: bool,
    pub sort: bool,
    pub validate_output: bool,
}

impl StageSelection {
    /// Select the flagged stages, or every stage when none is flagged.
    pub fn resolve(generate_input: bool, sort: bool, validate_output: bool) -> Self {
        if !(generate_input || sort || validate_output) {
            return Self::all();
        }
        Self {
            generate_input,
            sort,
            validate_output,
        }
    }

    pub fn all() -> Self {
        Self {
            generate_input: true,
            sort: true,
            validate_output: true,
        }
    }

    pub fn contains(&self, stage: Stage) -> bool {
        match stage {
            Stage::GenerateInput => self.generate_input,
            Stage::Sort => self.sort,
            Stage::ValidateOutput => self.validate_output,
        }
    }

    /// Enabled stages in submission order.
    pub fn enabled(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL
            .into_iter()
            .filter(move |stage| self.contains(*stage))
    }
}

/// How to reach `spark-submit` and the Terasort jobs.
#[derive(Clone, Debug)]
pub struct SubmitSettings {
    /// Submission tool, looked up on `PATH` unless it is a path.
    pub spark_submit: String,
    /// The Terasort jar.
    pub jar: PathBuf,
    /// Directory receiving one log file per stage, if any.
    pub log_dir: Option<PathBuf>,
    /// Only print the submissions.
    pub dry_run: bool,
}

/// Where collected metrics go.
#[derive(Clone, Debug, PartialEq)]
pub enum TrackingTarget {
    /// POST each record to a tracking endpoint.
    Http(String),
    /// Append each record to a local JSON-lines file.
    File(PathBuf),
    /// Only write records to the log.
    Log,
}

#[derive(Clone, Debug)]
pub struct MetricsSettings {
    /// Base URL of the history server's `applications` resource.
    pub history_server: String,
    pub tracking: TrackingTarget,
}

/// A fully resolved benchmark configuration.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Requested data size in TiB.
    pub total_tb: f64,
    /// `total_tb` in bytes.
    pub total_data_size: u64,
    /// Target size of one input partition in bytes.
    pub input_part_size: u64,
    /// Number of map tasks needed to generate the input.
    pub num_mappers: u64,
    pub num_workers: u32,
    /// Map tasks per worker node.
    pub map_parallelism: u32,
    /// Use the external shuffle service. Always set when push-based shuffle is.
    pub external_shuffle: bool,
    pub push_based_shuffle: bool,
    pub stages: StageSelection,
    pub submit: SubmitSettings,
    pub metrics: MetricsSettings,
}

impl BenchmarkConfig {
    /// Derive the sizing parameters of a run.
    ///
    /// Returns [`DriverError::InvalidConfig`] when a parameter is out of
    /// range or the data size rounds to zero bytes.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        total_tb: f64,
        input_part_size: u64,
        num_workers: u32,
        map_parallelism: u32,
        external_shuffle: bool,
        push_based_shuffle: bool,
        stages: StageSelection,
        submit: SubmitSettings,
        metrics: MetricsSettings,
    ) -> Result<Self, DriverError> {
        if !(total_tb.is_finite() && total_tb > 0.0) {
            return Err(DriverError::InvalidConfig(format!(
                "total_tb must be positive, got {}",
                total_tb
            )));
        }
        if input_part_size == 0 {
            return Err(DriverError::InvalidConfig(
                "input_part_size must be positive".to_string(),
            ));
        }
        if num_workers == 0 || map_parallelism == 0 {
            return Err(DriverError::InvalidConfig(
                "num_workers and map_parallelism must be at least 1".to_string(),
            ));
        }
        if (total_tb * BYTES_PER_TB).round() >= u64::MAX as f64 {
            return Err(DriverError::InvalidConfig(format!(
                "total_tb={} does not fit in a 64-bit byte count",
                total_tb
            )));
        }
        let total_data_size = total_data_size(total_tb);
        if total_data_size == 0 {
            return Err(DriverError::InvalidConfig(format!(
                "total_tb={} is less than one byte",
                total_tb
            )));
        }
        Ok(Self {
            total_tb,
            total_data_size,
            input_part_size,
            num_mappers: num_mappers(total_data_size, input_part_size),
            num_workers,
            map_parallelism,
            external_shuffle: external_shuffle || push_based_shuffle,
            push_based_shuffle,
            stages,
            submit,
            metrics,
        })
    }

    /// Executors requested from YARN: one per map slot in the cluster.
    pub fn num_executors(&self) -> u64 {
        u64::from(self.num_workers) * u64::from(self.map_parallelism)
    }
}

/// `total_tb` in bytes, rounded to the nearest byte.
pub fn total_data_size(total_tb: f64) -> u64 {
    (total_tb * BYTES_PER_TB).round() as u64
}

/// Number of partitions of at most `input_part_size` bytes covering
/// `total_data_size` bytes.
pub fn num_mappers(total_data_size: u64, input_part_size: u64) -> u64 {
    total_data_size.div_ceil(input_part_size)
}
