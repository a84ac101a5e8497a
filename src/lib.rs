//! A driver for the Spark Terasort benchmark.
//!
//! The driver resolves a benchmark configuration, then submits up to three
//! jobs (generate input, sort, validate output) to a YARN cluster through
//! `spark-submit`. The sort itself runs inside Spark; this crate only builds
//! the submissions, waits for them, and reports metrics scraped from the
//! Spark history server to an experiment tracker.

use std::fmt;

pub mod cmd;
pub mod config;
pub mod driver;
pub mod error;
pub mod history;
pub mod submit;
pub mod tracking;
pub mod utils;

/////////////////////////////////////////////////////////////////////////////
// Benchmark stages
/////////////////////////////////////////////////////////////////////////////

/// Package holding the pre-built Terasort jobs inside the jar.
pub const TERASORT_PKG: &str = "com.github.ehiggs.spark.terasort";

/// One cluster job of the benchmark.
///
/// Stages are ordered: a run always submits them in the order they are
/// declared here.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Stage {
    GenerateInput,
    Sort,
    ValidateOutput,
}

impl Stage {
    /// Every stage, in submission order.
    pub const ALL: [Stage; 3] = [Stage::GenerateInput, Stage::Sort, Stage::ValidateOutput];

    /// The command-line name of the stage, which doubles as its flag name.
    pub fn name(self) -> &'static str {
        match self {
            Stage::GenerateInput => "generate_input",
            Stage::Sort => "sort",
            Stage::ValidateOutput => "validate_output",
        }
    }

    /// Simple name of the job class run by this stage.
    pub fn job_name(self) -> &'static str {
        match self {
            Stage::GenerateInput => "TeraGen",
            Stage::Sort => "TeraSort",
            Stage::ValidateOutput => "TeraValidate",
        }
    }

    /// Fully qualified name of the job class run by this stage.
    pub fn class_name(self) -> String {
        format!("{}.{}", TERASORT_PKG, self.job_name())
    }

    /// File name used when the stage output is kept on disk.
    pub fn log_file_name(self) -> String {
        format!("{}.log", self.job_name().to_lowercase())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
