//! Runs submissions as child processes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::process::Command;

use crate::error::DriverError;
use crate::submit::SubmissionCommand;
use crate::Stage;

/// Lines of stderr echoed to the log when a submission fails.
const FAILURE_TAIL_LINES: usize = 20;

/// What one finished submission printed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobResult {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    /// `spark-submit` reports the YARN application id here.
    pub stderr: String,
}

/// Something that can run a stage's submission to completion.
///
/// A launcher returns an error for any unsuccessful submission, so a
/// returned [`JobResult`] always belongs to a job that succeeded.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    async fn launch(&self, stage: Stage, command: &SubmissionCommand) -> Result<JobResult>;
}

impl<T: Launcher + ?Sized> Launcher for &T {
    async fn launch(&self, stage: Stage, command: &SubmissionCommand) -> Result<JobResult> {
        (**self).launch(stage, command).await
    }
}

/// Spawns the submission tool and waits for it.
#[derive(Clone, Debug, Default)]
pub struct ProcessLauncher {
    log_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self { log_dir }
    }

    async fn keep_logs(&self, dir: &Path, stage: Stage, result: &JobResult) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let path = dir.join(stage.log_file_name());
        let mut contents = String::with_capacity(result.stdout.len() + result.stderr.len());
        contents.push_str(&result.stdout);
        contents.push_str(&result.stderr);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{} output written to {}", stage, path.display());
        Ok(())
    }
}

impl Launcher for ProcessLauncher {
    async fn launch(&self, stage: Stage, command: &SubmissionCommand) -> Result<JobResult> {
        info!("$ {}", command);
        let output = Command::new(command.program())
            .args(command.get_args())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to start `{}`", command.program()))?;

        let result = JobResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if let Some(dir) = &self.log_dir {
            self.keep_logs(dir, stage, &result).await?;
        }

        if !output.status.success() {
            let lines: Vec<&str> = result.stderr.lines().collect();
            for line in &lines[lines.len().saturating_sub(FAILURE_TAIL_LINES)..] {
                error!("[{}] {}", stage, line);
            }
            return Err(DriverError::StageFailed {
                stage,
                command: command.to_string(),
                code: result.code,
            }
            .into());
        }
        Ok(result)
    }
}

/// Logs submissions instead of running them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunLauncher;

impl Launcher for DryRunLauncher {
    async fn launch(&self, stage: Stage, command: &SubmissionCommand) -> Result<JobResult> {
        info!("[dry run] {}: $ {}", stage, command);
        Ok(JobResult {
            code: Some(0),
            ..JobResult::default()
        })
    }
}
