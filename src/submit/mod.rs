//! Builds the `spark-submit` invocations for each benchmark stage.
//!
//! # Example
//!
//! ```no_run
//! # use sparksort::cmd::driver::Args;
//! # use clap::Parser;
//! use sparksort::{submit, Stage};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Args::parse().resolve()?;
//! let command = submit::build(&config, Stage::Sort);
//! println!("$ {}", command);
//! # Ok(())
//! # }
//! ```

use std::ffi::OsStr;
use std::fmt;

use itertools::Itertools;

use crate::config::BenchmarkConfig;
use crate::Stage;

pub mod runner;

/// Cluster directory holding the generated input.
pub const INPUT_DIR: &str = "/terasort/input";
/// Cluster directory receiving the sorted output.
pub const OUTPUT_DIR: &str = "/terasort/output";
/// Cluster directory receiving the validation report.
pub const VALIDATE_DIR: &str = "/terasort/validate";

/// Resource manager every job is submitted to.
pub const MASTER: &str = "yarn";

/// Cores per executor. Executors are sized to a single map slot.
pub const EXECUTOR_CORES: u32 = 1;

/// A program and its arguments, kept as separate tokens.
///
/// Arguments are handed to the process-spawn API one by one, so they may
/// contain spaces. The [`Display`](fmt::Display) form joins them with single
/// spaces and is only meant for logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionCommand {
    program: String,
    args: Vec<String>,
}

impl SubmissionCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a `--conf key=value` override.
    pub fn conf(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.arg("--conf").arg(format!("{}={}", key, value))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsStr::new)
    }

    /// Every token, program first.
    pub fn tokens(&self) -> impl DoubleEndedIterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Whether `token` appears among the arguments.
    pub fn contains(&self, token: &str) -> bool {
        self.args.iter().any(|arg| arg == token)
    }
}

impl fmt::Display for SubmissionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens().join(" "))
    }
}

/// Build the submission running `stage` under `config`.
pub fn build(config: &BenchmarkConfig, stage: Stage) -> SubmissionCommand {
    let mut cmd = SubmissionCommand::new(config.submit.spark_submit.as_str());

    if config.external_shuffle || config.push_based_shuffle {
        cmd.conf("spark.shuffle.service.enabled", true);
    }
    if config.push_based_shuffle {
        cmd.conf("spark.shuffle.push.enabled", true);
    }
    cmd.arg("--num-executors")
        .arg(config.num_executors().to_string())
        .arg("--executor-cores")
        .arg(EXECUTOR_CORES.to_string());
    if stage == Stage::GenerateInput {
        cmd.conf("spark.default.parallelism", config.num_mappers);
    }

    cmd.arg("--class")
        .arg(stage.class_name())
        .arg("--master")
        .arg(MASTER)
        .arg(config.submit.jar.to_string_lossy());
    cmd.args(positional_args(config, stage));
    cmd
}

fn positional_args(config: &BenchmarkConfig, stage: Stage) -> Vec<String> {
    match stage {
        Stage::GenerateInput => vec![config.total_data_size.to_string(), INPUT_DIR.to_string()],
        Stage::Sort => vec![INPUT_DIR.to_string(), OUTPUT_DIR.to_string()],
        Stage::ValidateOutput => vec![OUTPUT_DIR.to_string(), VALIDATE_DIR.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::config;

    #[test]
    fn generate_command_line() {
        let cmd = build(&config(false, false), Stage::GenerateInput);
        assert_eq!(
            cmd.to_string(),
            "spark-submit --num-executors 64 --executor-cores 1 \
             --conf spark.default.parallelism=400 \
             --class com.github.ehiggs.spark.terasort.TeraGen --master yarn \
             /opt/terasort/spark-terasort-1.2-SNAPSHOT-jar-with-dependencies.jar \
             1000000000000 /terasort/input"
        );
    }

    #[test]
    fn sort_and_validate_paths() {
        let config = config(false, false);
        let sort = build(&config, Stage::Sort);
        let tail: Vec<_> = sort.tokens().rev().take(2).collect();
        assert_eq!(tail, vec![OUTPUT_DIR, INPUT_DIR]);
        assert!(sort.contains("com.github.ehiggs.spark.terasort.TeraSort"));

        let validate = build(&config, Stage::ValidateOutput);
        let tail: Vec<_> = validate.tokens().rev().take(2).collect();
        assert_eq!(tail, vec![VALIDATE_DIR, OUTPUT_DIR]);
        assert!(validate.contains("com.github.ehiggs.spark.terasort.TeraValidate"));
    }

    #[test]
    fn parallelism_only_for_generate() {
        let config = config(false, false);
        assert!(build(&config, Stage::GenerateInput).contains("spark.default.parallelism=400"));
        for stage in [Stage::Sort, Stage::ValidateOutput] {
            let cmd = build(&config, stage);
            assert!(!cmd.to_string().contains("spark.default.parallelism"));
        }
    }

    #[test]
    fn executors_for_every_stage() {
        let config = config(false, false);
        for stage in Stage::ALL {
            let cmd = build(&config, stage);
            let tokens: Vec<_> = cmd.tokens().collect();
            let at = tokens.iter().position(|t| *t == "--num-executors").unwrap();
            assert_eq!(tokens[at + 1], "64");
            assert!(cmd.contains("--executor-cores"));
        }
    }

    #[test]
    fn shuffle_overrides() {
        let plain = config(false, false);
        let external = config(true, false);
        let push = config(false, true);
        for stage in Stage::ALL {
            let cmd = build(&plain, stage);
            assert!(!cmd.contains("spark.shuffle.service.enabled=true"));
            assert!(!cmd.contains("spark.shuffle.push.enabled=true"));

            let cmd = build(&external, stage);
            assert!(cmd.contains("spark.shuffle.service.enabled=true"));
            assert!(!cmd.contains("spark.shuffle.push.enabled=true"));

            let cmd = build(&push, stage);
            assert!(cmd.contains("spark.shuffle.service.enabled=true"));
            assert!(cmd.contains("spark.shuffle.push.enabled=true"));
        }
    }

    #[test]
    fn overrides_precede_class() {
        let cmd = build(&config(true, true), Stage::Sort);
        let tokens: Vec<_> = cmd.tokens().collect();
        let class = tokens.iter().position(|t| *t == "--class").unwrap();
        let conf = tokens.iter().rposition(|t| *t == "--conf").unwrap();
        assert!(conf < class);
        assert_eq!(tokens[0], "spark-submit");
    }

    #[test]
    fn arguments_keep_spaces() {
        let mut cmd = SubmissionCommand::new("echo");
        cmd.arg("two words").arg("x");
        assert_eq!(cmd.get_args().count(), 2);
        assert_eq!(cmd.to_string(), "echo two words x");
    }
}
